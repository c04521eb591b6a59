//! Superblock and region geometry.
//!
//! Region starts are computed once by [`Layout::for_blocks`] at format time
//! and persisted in the superblock; mount only ever reads them back.

use bytemuck::{Pod, Zeroable};

use crate::bitmap::Bitmap;
use crate::block::BlockDevice;
use crate::error::{FsError, Result};
use crate::inode::INODE_SIZE;
use crate::{Block, BLOCK_SIZE, FS_MAGIC, NUM_INODES, ROOT_INODE};

pub const SUPERBLOCK_BLOCK: u32 = 0;
pub const INODE_BITMAP_START: u32 = 1;
pub const DATA_BITMAP_START: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Superblock {
    pub magic: u32,
    pub total_blocks: u32,
    pub inode_bitmap_start: u32,
    pub data_bitmap_start: u32,
    pub inode_table_start: u32,
    pub data_area_start: u32,
    pub root_inode: u32,
}

impl Superblock {
    pub fn read<D: BlockDevice>(device: &mut D) -> Result<Self> {
        let mut buf: Block = [0; BLOCK_SIZE];
        device.read_block(SUPERBLOCK_BLOCK, &mut buf)?;
        Ok(bytemuck::pod_read_unaligned(
            &buf[..core::mem::size_of::<Self>()],
        ))
    }

    pub fn write<D: BlockDevice>(&self, device: &mut D) -> Result<()> {
        let mut buf: Block = [0; BLOCK_SIZE];
        buf[..core::mem::size_of::<Self>()].copy_from_slice(bytemuck::bytes_of(self));
        device.write_block(SUPERBLOCK_BLOCK, &buf)
    }

    pub fn is_valid(&self) -> bool {
        self.magic == FS_MAGIC
    }
}

/// Region geometry in block indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub total_blocks: u32,
    pub inode_bitmap_start: u32,
    pub inode_bitmap_blocks: u32,
    pub data_bitmap_start: u32,
    pub data_bitmap_blocks: u32,
    pub inode_table_start: u32,
    pub inode_table_blocks: u32,
    pub data_area_start: u32,
}

impl Layout {
    /// Inode table size in blocks; records are packed across block boundaries.
    pub fn inode_table_blocks() -> u32 {
        (NUM_INODES as usize * INODE_SIZE).div_ceil(BLOCK_SIZE) as u32
    }

    /// Geometry for a device of `total_blocks` blocks.
    pub fn for_blocks(total_blocks: u32) -> Result<Self> {
        let inode_bitmap_blocks = Bitmap::blocks_for(NUM_INODES);
        let data_bitmap_start = INODE_BITMAP_START + inode_bitmap_blocks;
        let data_bitmap_blocks = Bitmap::blocks_for(total_blocks);
        let inode_table_start = data_bitmap_start + data_bitmap_blocks;
        let inode_table_blocks = Self::inode_table_blocks();
        let data_area_start = inode_table_start + inode_table_blocks;

        // Room for the root directory's block at least.
        let needed = data_area_start + 1;
        if total_blocks < needed {
            return Err(FsError::DeviceTooSmall {
                blocks: total_blocks,
                needed,
            });
        }

        Ok(Self {
            total_blocks,
            inode_bitmap_start: INODE_BITMAP_START,
            inode_bitmap_blocks,
            data_bitmap_start,
            data_bitmap_blocks,
            inode_table_start,
            inode_table_blocks,
            data_area_start,
        })
    }

    /// Rebuilds the geometry from persisted start blocks.
    pub fn from_superblock(sb: &Superblock, device_blocks: u32) -> Result<Self> {
        if sb.total_blocks == 0 || sb.total_blocks > device_blocks {
            return Err(FsError::InvalidLayout("total_blocks exceeds the device"));
        }
        if !(SUPERBLOCK_BLOCK < sb.inode_bitmap_start
            && sb.inode_bitmap_start < sb.data_bitmap_start
            && sb.data_bitmap_start < sb.inode_table_start
            && sb.inode_table_start < sb.data_area_start
            && sb.data_area_start < sb.total_blocks)
        {
            return Err(FsError::InvalidLayout("regions out of order"));
        }
        if sb.data_area_start - sb.inode_table_start < Self::inode_table_blocks() {
            return Err(FsError::InvalidLayout("inode table region too small"));
        }
        if sb.root_inode >= NUM_INODES {
            return Err(FsError::InvalidLayout("root inode out of range"));
        }

        Ok(Self {
            total_blocks: sb.total_blocks,
            inode_bitmap_start: sb.inode_bitmap_start,
            inode_bitmap_blocks: sb.data_bitmap_start - sb.inode_bitmap_start,
            data_bitmap_start: sb.data_bitmap_start,
            data_bitmap_blocks: sb.inode_table_start - sb.data_bitmap_start,
            inode_table_start: sb.inode_table_start,
            inode_table_blocks: sb.data_area_start - sb.inode_table_start,
            data_area_start: sb.data_area_start,
        })
    }

    pub fn superblock(&self) -> Superblock {
        Superblock {
            magic: FS_MAGIC,
            total_blocks: self.total_blocks,
            inode_bitmap_start: self.inode_bitmap_start,
            data_bitmap_start: self.data_bitmap_start,
            inode_table_start: self.inode_table_start,
            data_area_start: self.data_area_start,
            root_inode: ROOT_INODE,
        }
    }
}
