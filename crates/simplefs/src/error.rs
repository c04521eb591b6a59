#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("name too long (max {max} bytes)")]
    NameTooLong { max: usize },

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("file or directory already exists")]
    AlreadyExists,

    #[error("file or directory not found")]
    NotFound,

    #[error("not a directory")]
    NotADirectory,

    #[error("not a file")]
    NotAFile,

    #[error("directory is full")]
    DirectoryFull,

    #[error("no free inodes")]
    NoFreeInode,

    #[error("disk full")]
    NoFreeDataBlock,

    #[error("file reached the maximum size")]
    FileTooLarge,

    #[error("directory is not empty")]
    DirectoryNotEmpty,

    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    #[error("block {index} out of range (device has {total} blocks)")]
    BlockOutOfRange { index: u32, total: u32 },

    #[error("inode {0} out of range")]
    InodeOutOfRange(u32),

    #[error("bit {index} out of range (bitmap has {len} bits)")]
    BitOutOfRange { index: u32, len: u32 },

    #[error("inode {0} has an unknown type tag")]
    CorruptInode(u32),

    #[error("device too small: {blocks} blocks, need at least {needed}")]
    DeviceTooSmall { blocks: u32, needed: u32 },

    #[error("invalid layout: {0}")]
    InvalidLayout(&'static str),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, FsError>;
