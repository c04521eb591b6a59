//! Block store: whole-block indexed access to the storage medium.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{FsError, Result};
use crate::{Block, BLOCK_SIZE};

pub trait BlockDevice {
    /// Number of addressable blocks.
    fn num_blocks(&self) -> u32;

    /// Reads block `index` into `buf`. `index` must be below `num_blocks()`.
    fn read_block(&mut self, index: u32, buf: &mut Block) -> Result<()>;

    /// Writes `buf` to block `index`. `index` must be below `num_blocks()`.
    fn write_block(&mut self, index: u32, buf: &Block) -> Result<()>;

    /// Pushes buffered writes to the medium.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn check_index(&self, index: u32) -> Result<()> {
        let total = self.num_blocks();
        if index >= total {
            return Err(FsError::BlockOutOfRange { index, total });
        }
        Ok(())
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for Box<D> {
    fn num_blocks(&self) -> u32 {
        (**self).num_blocks()
    }

    fn read_block(&mut self, index: u32, buf: &mut Block) -> Result<()> {
        (**self).read_block(index, buf)
    }

    fn write_block(&mut self, index: u32, buf: &Block) -> Result<()> {
        (**self).write_block(index, buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// RAM-backed disk.
#[derive(Clone)]
pub struct MemDisk {
    blocks: Vec<Block>,
}

impl MemDisk {
    pub fn new(num_blocks: u32) -> Self {
        Self {
            blocks: vec![[0; BLOCK_SIZE]; num_blocks as usize],
        }
    }

    /// Raw view of one block, for inspecting images in tests and tools.
    pub fn block(&self, index: u32) -> Option<&Block> {
        self.blocks.get(index as usize)
    }
}

impl BlockDevice for MemDisk {
    fn num_blocks(&self) -> u32 {
        self.blocks.len() as u32
    }

    fn read_block(&mut self, index: u32, buf: &mut Block) -> Result<()> {
        self.check_index(index)?;
        buf.copy_from_slice(&self.blocks[index as usize]);
        Ok(())
    }

    fn write_block(&mut self, index: u32, buf: &Block) -> Result<()> {
        self.check_index(index)?;
        self.blocks[index as usize].copy_from_slice(buf);
        Ok(())
    }
}

/// Disk image stored in a host file.
pub struct FileDisk {
    file: File,
    num_blocks: u32,
}

impl FileDisk {
    /// Creates (or resizes) the image at `path` to hold `num_blocks` blocks.
    pub fn create(path: impl AsRef<Path>, num_blocks: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.set_len(num_blocks as u64 * BLOCK_SIZE as u64)?;

        Ok(Self { file, num_blocks })
    }

    /// Opens an existing image; the block count comes from the file length.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let num_blocks = (file.metadata()?.len() / BLOCK_SIZE as u64) as u32;

        Ok(Self { file, num_blocks })
    }

    fn seek_to(&mut self, index: u32) -> Result<()> {
        let pos = index as u64 * BLOCK_SIZE as u64;
        self.file.seek(SeekFrom::Start(pos))?;
        Ok(())
    }
}

impl BlockDevice for FileDisk {
    fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    fn read_block(&mut self, index: u32, buf: &mut Block) -> Result<()> {
        self.check_index(index)?;
        self.seek_to(index)?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, index: u32, buf: &Block) -> Result<()> {
        self.check_index(index)?;
        self.seek_to(index)?;
        self.file.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_disk_round_trips_whole_blocks() {
        let mut disk = MemDisk::new(4);
        let mut block = [0u8; BLOCK_SIZE];
        block[0] = 0xAB;
        block[BLOCK_SIZE - 1] = 0xCD;
        disk.write_block(3, &block).unwrap();

        let mut out = [0u8; BLOCK_SIZE];
        disk.read_block(3, &mut out).unwrap();
        assert_eq!(out, block);
    }

    #[test]
    fn out_of_range_access_is_rejected() {
        let mut disk = MemDisk::new(2);
        let mut buf = [0u8; BLOCK_SIZE];
        assert!(matches!(
            disk.read_block(2, &mut buf),
            Err(FsError::BlockOutOfRange { index: 2, total: 2 })
        ));
        assert!(matches!(
            disk.write_block(7, &buf),
            Err(FsError::BlockOutOfRange { index: 7, total: 2 })
        ));
    }

    #[test]
    fn file_disk_persists_across_reopen() {
        let path = std::env::temp_dir().join(format!("simplefs-block-{}.img", std::process::id()));
        let mut block = [0u8; BLOCK_SIZE];
        block[10] = 42;
        {
            let mut disk = FileDisk::create(&path, 8).unwrap();
            disk.write_block(5, &block).unwrap();
            disk.flush().unwrap();
        }

        let mut disk = FileDisk::open(&path).unwrap();
        assert_eq!(disk.num_blocks(), 8);
        let mut out = [0u8; BLOCK_SIZE];
        disk.read_block(5, &mut out).unwrap();
        assert_eq!(out[10], 42);
        assert!(disk.read_block(8, &mut out).is_err());

        std::fs::remove_file(&path).unwrap();
    }
}
