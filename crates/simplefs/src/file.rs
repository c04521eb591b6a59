//! File data engine: whole-file reads and append-only growth.

use log::debug;

use crate::bitmap::Bitmap;
use crate::block::BlockDevice;
use crate::error::{FsError, Result};
use crate::inode::{Inode, InodeTable};
use crate::{Block, BLOCK_SIZE, MAX_DIRECT_POINTERS};

/// Returns exactly `inode.size` bytes, concatenated in pointer order.
pub fn read<D: BlockDevice>(device: &mut D, inode: &Inode) -> Result<Vec<u8>> {
    let mut remaining = inode.size as usize;
    let mut data = Vec::with_capacity(remaining);
    let mut buf: Block = [0; BLOCK_SIZE];

    for block in inode.blocks() {
        if remaining == 0 {
            break;
        }
        device.read_block(block, &mut buf)?;
        let take = remaining.min(BLOCK_SIZE);
        data.extend_from_slice(&buf[..take]);
        remaining -= take;
    }

    Ok(data)
}

/// Appends `bytes` to the file stored at inode `number`.
///
/// The partially filled last block is topped up first, then fresh
/// zero-filled blocks are allocated. The inode is written back after every
/// committed chunk. On [`FsError::FileTooLarge`] or [`FsError::NoFreeDataBlock`]
/// whatever was committed before the stop stays on disk.
pub fn append<D: BlockDevice>(
    device: &mut D,
    table: &InodeTable,
    data_bitmap: &mut Bitmap,
    number: u32,
    inode: &mut Inode,
    bytes: &[u8],
) -> Result<()> {
    if !inode.is_file() {
        return Err(FsError::NotAFile);
    }

    let mut rest = bytes;
    let mut buf: Block = [0; BLOCK_SIZE];

    let offset_in_block = inode.size as usize % BLOCK_SIZE;
    if offset_in_block > 0 && !rest.is_empty() {
        let block = inode.direct[inode.size as usize / BLOCK_SIZE];
        device.read_block(block, &mut buf)?;

        let len = rest.len().min(BLOCK_SIZE - offset_in_block);
        buf[offset_in_block..offset_in_block + len].copy_from_slice(&rest[..len]);
        device.write_block(block, &buf)?;

        inode.size += len as u32;
        table.write(device, number, inode)?;
        rest = &rest[len..];
        debug!("file {}: topped up block {} with {} bytes", number, block, len);
    }

    while !rest.is_empty() {
        let slot = inode.size as usize / BLOCK_SIZE;
        if slot >= MAX_DIRECT_POINTERS {
            return Err(FsError::FileTooLarge);
        }
        let block = data_bitmap.allocate().ok_or(FsError::NoFreeDataBlock)?;

        let len = rest.len().min(BLOCK_SIZE);
        buf.fill(0);
        buf[..len].copy_from_slice(&rest[..len]);
        device.write_block(block, &buf)?;
        data_bitmap.store(device)?;

        inode.direct[slot] = block;
        inode.size += len as u32;
        table.write(device, number, inode)?;
        rest = &rest[len..];
        debug!("file {}: wrote {} bytes to new block {}", number, len, block);
    }

    Ok(())
}
