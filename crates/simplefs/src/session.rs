//! Working directory state.
//!
//! The display path is a cache of the navigation history, never rebuilt
//! from the tree, so it has to move in lockstep with the inode number.

use crate::ROOT_INODE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    cwd: u32,
    path: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::root()
    }
}

impl Session {
    pub fn root() -> Self {
        Self {
            cwd: ROOT_INODE,
            path: String::from("/"),
        }
    }

    pub fn cwd(&self) -> u32 {
        self.cwd
    }

    /// Absolute path, `/`-terminated except for bare root.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn reset(&mut self, root: u32) {
        self.cwd = root;
        self.path.clear();
        self.path.push('/');
    }

    /// Moves into child directory `name` whose inode is `target`.
    pub fn enter(&mut self, name: &str, target: u32) {
        self.cwd = target;
        self.path.push_str(name);
        self.path.push('/');
    }

    /// Moves to `parent`, dropping the last component of the display path.
    pub fn leave(&mut self, parent: u32) {
        self.cwd = parent;
        if self.path.len() > 1 {
            let trimmed = &self.path[..self.path.len() - 1];
            let cut = trimmed.rfind('/').map_or(1, |i| i + 1);
            self.path.truncate(cut);
        }
    }

    /// Stays put; `.` resolves to the current directory.
    pub fn stay(&mut self, target: u32) {
        self.cwd = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_root() {
        let session = Session::default();
        assert_eq!(session.cwd(), ROOT_INODE);
        assert_eq!(session.path(), "/");
    }

    #[test]
    fn enter_and_leave_keep_path_in_lockstep() {
        let mut session = Session::root();
        session.enter("a", 1);
        assert_eq!(session.path(), "/a/");
        session.enter("bb", 2);
        assert_eq!(session.path(), "/a/bb/");
        assert_eq!(session.cwd(), 2);

        session.leave(1);
        assert_eq!(session.path(), "/a/");
        assert_eq!(session.cwd(), 1);
        session.leave(0);
        assert_eq!(session.path(), "/");
    }

    #[test]
    fn leaving_root_keeps_root_path() {
        let mut session = Session::root();
        session.leave(ROOT_INODE);
        assert_eq!(session.path(), "/");
        assert_eq!(session.cwd(), ROOT_INODE);
    }

    #[test]
    fn reset_returns_to_root() {
        let mut session = Session::root();
        session.enter("x", 4);
        session.reset(ROOT_INODE);
        assert_eq!(session, Session::root());
    }
}
