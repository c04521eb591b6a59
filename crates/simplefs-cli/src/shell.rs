//! Line-oriented shell over a byte console.
//!
//! All text the user sees is produced here; the volume only returns
//! structured results and errors.

use std::io::{self, BufRead, Write};

use log::debug;
use simplefs::{BlockDevice, FileType, FsError, MountedVolume, Stats};

const LINE_WIDTH: usize = 44;

const HELP: &str = "\
Available commands:
  ls             - List files and directories
  mkdir <n>      - Create a directory
  touch <n>      - Create an empty file
  cat <n>        - Print a file's contents
  write <f> <t>  - Append text <t> to file <f> (created if missing)
  cd <n>         - Change directory ('..' to go up, '/' for root)
  rm <n>         - Delete a file or an empty directory
  stat           - Show disk usage statistics
  format         - Reformat the filesystem
  exit           - Leave the shell
";

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Shell<D: BlockDevice> {
    volume: MountedVolume<D>,
}

impl<D: BlockDevice> Shell<D> {
    pub fn new(volume: MountedVolume<D>) -> Self {
        Self { volume }
    }

    pub fn volume(&mut self) -> &mut MountedVolume<D> {
        &mut self.volume
    }

    pub fn into_volume(self) -> MountedVolume<D> {
        self.volume
    }

    pub fn prompt(&self) -> String {
        format!("SimpleFS:{}$ ", self.volume.current_path())
    }

    /// Reads commands until end of input or `exit`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self.prompt())?;
        out.flush()?;

        for line in input.lines() {
            if self.execute(&line?, out)? == Flow::Exit {
                break;
            }
            write!(out, "{}", self.prompt())?;
            out.flush()?;
        }
        Ok(())
    }

    /// Runs one command line, writing its output to `out`.
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Flow> {
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, rest)) = args.split_first() else {
            return Ok(Flow::Continue);
        };
        debug!("shell: {} {:?}", cmd, rest);

        match (cmd, rest) {
            ("help", _) => write!(out, "{HELP}")?,
            ("ls", _) => self.ls(out)?,
            ("mkdir", [name, ..]) => {
                if let Err(e) = self.volume.make_directory(name) {
                    report(out, &e)?;
                }
            }
            ("touch", [name, ..]) => match self.volume.create_file(name) {
                Ok(_) => writeln!(out, "File '{name}' created.")?,
                Err(e) => report(out, &e)?,
            },
            ("cat", [name, ..]) => match self.volume.read_file(name) {
                Ok(data) => writeln!(out, "{}", String::from_utf8_lossy(&data))?,
                Err(FsError::NotFound | FsError::NotAFile) => writeln!(out, "File not found.")?,
                Err(e) => report(out, &e)?,
            },
            ("write", [_]) => {}
            ("write", [name, words @ ..]) => self.write(out, name, &words.join(" "))?,
            ("cd", [name, ..]) => match self.volume.change_directory(name) {
                Ok(()) => {}
                Err(FsError::NotFound | FsError::NotADirectory) => {
                    writeln!(out, "Directory not found: {name}")?
                }
                Err(e) => report(out, &e)?,
            },
            ("rm", [name, ..]) => match self.volume.remove(name) {
                Ok(()) => writeln!(out, "Item '{name}' deleted.")?,
                Err(e) => report(out, &e)?,
            },
            ("stat", _) => render_stats(out, &self.volume.stats())?,
            ("format", _) => {
                writeln!(out, "Formatting...")?;
                match self.volume.reformat() {
                    Ok(()) => writeln!(out, "Done.")?,
                    Err(e) => report(out, &e)?,
                }
            }
            ("exit" | "quit", _) => return Ok(Flow::Exit),
            ("mkdir" | "touch" | "cat" | "cd" | "rm", []) => {
                writeln!(out, "Usage: {cmd} <name>")?
            }
            ("write", []) => writeln!(out, "Usage: write <file> <text>")?,
            _ => {
                writeln!(out, "Unknown command: {cmd}")?;
                writeln!(out, "Type 'help' for the list of commands.")?;
            }
        }
        Ok(Flow::Continue)
    }

    fn ls<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        match self.volume.list_directory() {
            Ok(entries) => {
                for entry in entries {
                    let tag = match entry.file_type {
                        FileType::Directory => 'd',
                        FileType::File => '-',
                    };
                    writeln!(out, "{tag} {}", entry.name)?;
                }
                Ok(())
            }
            Err(e) => report(out, &e),
        }
    }

    /// Appends `text`, creating the file first when it does not exist yet.
    fn write<W: Write>(&mut self, out: &mut W, name: &str, text: &str) -> io::Result<()> {
        match self.volume.lookup(name) {
            Ok(_) => {}
            Err(FsError::NotFound) => {
                if let Err(e) = self.volume.create_file(name) {
                    return report(out, &e);
                }
            }
            Err(e) => return report(out, &e),
        }

        match self.volume.append_file(name, text.as_bytes()) {
            Ok(()) => writeln!(out, "Text appended to file '{name}'."),
            Err(e) => report(out, &e),
        }
    }
}

fn report<W: Write>(out: &mut W, err: &FsError) -> io::Result<()> {
    writeln!(out, "Error: {err}.")
}

fn stat_line<W: Write>(out: &mut W, label: &str, value: &str) -> io::Result<()> {
    let pad = LINE_WIDTH.saturating_sub(label.len());
    writeln!(out, "{label}{value:>pad$}")
}

fn render_stats<W: Write>(out: &mut W, stats: &Stats) -> io::Result<()> {
    writeln!(out, "--- Filesystem statistics ---")?;
    stat_line(
        out,
        " Inodes used",
        &format!("{} / {}", stats.inodes_used, stats.inodes_total),
    )?;
    stat_line(
        out,
        " Data blocks used",
        &format!("{} / {}", stats.user_blocks_used(), stats.user_blocks_total()),
    )?;
    stat_line(out, " Space used", &format!("{} Bytes", stats.user_bytes_used()))?;
    stat_line(
        out,
        " Total space (usable)",
        &format!("{} Bytes", stats.user_bytes_total()),
    )?;
    writeln!(out, "{}", "-".repeat(LINE_WIDTH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use simplefs::{MemDisk, DEFAULT_TOTAL_BLOCKS};
    use std::io::Cursor;

    fn shell() -> Shell<MemDisk> {
        Shell::new(MountedVolume::format(MemDisk::new(DEFAULT_TOTAL_BLOCKS)).unwrap())
    }

    fn run(shell: &mut Shell<MemDisk>, line: &str) -> String {
        let mut out = Vec::new();
        shell.execute(line, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn ls_marks_directories_and_files() {
        let mut sh = shell();
        run(&mut sh, "mkdir docs");
        run(&mut sh, "touch readme");
        assert_eq!(run(&mut sh, "ls"), "d .\nd ..\nd docs\n- readme\n");
    }

    #[test]
    fn write_creates_and_joins_words() {
        let mut sh = shell();
        assert_eq!(
            run(&mut sh, "write notes hello   there world"),
            "Text appended to file 'notes'.\n"
        );
        run(&mut sh, "write notes !");
        assert_eq!(run(&mut sh, "cat notes"), "hello there world!\n");
    }

    #[test]
    fn write_without_text_does_nothing() {
        let mut sh = shell();
        assert_eq!(run(&mut sh, "write notes"), "");
        assert!(matches!(sh.volume().lookup("notes"), Err(FsError::NotFound)));
        assert_eq!(run(&mut sh, "write"), "Usage: write <file> <text>\n");
    }

    #[test]
    fn cd_updates_prompt() {
        let mut sh = shell();
        run(&mut sh, "mkdir a");
        run(&mut sh, "cd a");
        assert_eq!(sh.prompt(), "SimpleFS:/a/$ ");
        assert_eq!(run(&mut sh, "cd nowhere"), "Directory not found: nowhere\n");
        run(&mut sh, "cd ..");
        assert_eq!(sh.prompt(), "SimpleFS:/$ ");
    }

    #[test]
    fn errors_are_rendered_not_propagated() {
        let mut sh = shell();
        run(&mut sh, "mkdir a");
        assert_eq!(
            run(&mut sh, "mkdir a"),
            "Error: file or directory already exists.\n"
        );
        run(&mut sh, "cd a");
        run(&mut sh, "touch f");
        run(&mut sh, "cd ..");
        assert_eq!(run(&mut sh, "rm a"), "Error: directory is not empty.\n");
        assert_eq!(run(&mut sh, "cat a"), "File not found.\n");
        assert_eq!(run(&mut sh, "rm .."), "Error: invalid operation: cannot remove '.' or '..'.\n");
    }

    #[test]
    fn stat_renders_aligned_lines() {
        let mut sh = shell();
        let text = run(&mut sh, "stat");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "--- Filesystem statistics ---");
        assert!(lines[1].starts_with(" Inodes used"));
        assert!(lines[1].ends_with("1 / 128"));
        assert!(lines[2].ends_with("1 / 8174"));
        assert!(lines[3].ends_with("512 Bytes"));
        assert!(lines[1..5].iter().all(|l| l.len() == LINE_WIDTH));
    }

    #[test]
    fn unknown_and_usage_messages() {
        let mut sh = shell();
        assert_eq!(
            run(&mut sh, "frobnicate"),
            "Unknown command: frobnicate\nType 'help' for the list of commands.\n"
        );
        assert_eq!(run(&mut sh, "mkdir"), "Usage: mkdir <name>\n");
        assert_eq!(run(&mut sh, "   "), "");
    }

    #[test]
    fn run_loop_prints_prompts_until_exit() {
        let mut sh = shell();
        let input = Cursor::new("mkdir a\ncd a\nexit\nls\n");
        let mut out = Vec::new();
        sh.run(input, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "SimpleFS:/$ SimpleFS:/$ SimpleFS:/a/$ ");
    }

    #[test]
    fn format_command_wipes_the_volume() {
        let mut sh = shell();
        run(&mut sh, "mkdir a");
        run(&mut sh, "cd a");
        assert_eq!(run(&mut sh, "format"), "Formatting...\nDone.\n");
        assert_eq!(sh.prompt(), "SimpleFS:/$ ");
        assert_eq!(run(&mut sh, "ls"), "d .\nd ..\n");
    }
}
