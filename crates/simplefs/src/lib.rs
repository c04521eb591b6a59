//! SimpleFS: a single-volume filesystem engine over a fixed-size block device.
//!
//! On-disk layout (block indices):
//! - 0: Superblock
//! - 1: Inode bitmap
//! - 2..: Data bitmap (one bit per device block)
//! - next: Inode table
//! - rest: Data area
//!
//! Navigation is one path component at a time from a single working
//! directory held by the [`MountedVolume`].

pub mod bitmap;
pub mod block;
pub mod dir;
pub mod error;
pub mod file;
pub mod inode;
pub mod layout;
pub mod session;
pub mod volume;

pub use block::{BlockDevice, FileDisk, MemDisk};
pub use dir::DirEntry;
pub use error::{FsError, Result};
pub use inode::{FileType, Inode};
pub use layout::{Layout, Superblock};
pub use session::Session;
pub use volume::{EntryInfo, ListEntry, MountedVolume, Stats};

pub const BLOCK_SIZE: usize = 512;
pub const FS_MAGIC: u32 = 0x5346_534A; // "SFSJ"
pub const NUM_INODES: u32 = 128;
pub const DEFAULT_TOTAL_BLOCKS: u32 = 8192; // 4 MiB
pub const MAX_DIRECT_POINTERS: usize = 12;
pub const MAX_FILENAME_LEN: usize = 28; // including the NUL terminator
pub const ROOT_INODE: u32 = 0;

/// Largest file the direct pointers can address.
pub const MAX_FILE_SIZE: usize = MAX_DIRECT_POINTERS * BLOCK_SIZE;

/// One raw block.
pub type Block = [u8; BLOCK_SIZE];
