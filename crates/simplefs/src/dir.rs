//! Directory engine.
//!
//! A directory's data blocks are arrays of fixed-size [`DirEntry`] slots. A
//! slot whose name starts with NUL is a tombstone: entries are never moved,
//! removal only clears the first name byte, and insertion reuses the first
//! tombstone it finds.

use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};
use log::debug;

use crate::block::BlockDevice;
use crate::error::{FsError, Result};
use crate::inode::Inode;
use crate::{Block, BLOCK_SIZE, MAX_FILENAME_LEN};

pub const DIR_ENTRY_SIZE: usize = core::mem::size_of::<DirEntry>();
pub const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

pub const DOT: &str = ".";
pub const DOTDOT: &str = "..";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct DirEntry {
    pub name: [u8; MAX_FILENAME_LEN],
    pub inode: u32,
}

impl DirEntry {
    pub fn new(name: &str, inode: u32) -> Result<Self> {
        validate_name(name)?;
        let mut buf = [0u8; MAX_FILENAME_LEN];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self { name: buf, inode })
    }

    pub fn is_live(&self) -> bool {
        self.name[0] != 0
    }

    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(MAX_FILENAME_LEN);
        &self.name[..end]
    }

    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    fn read_slot(block: &Block, slot: usize) -> Self {
        let at = slot * DIR_ENTRY_SIZE;
        bytemuck::pod_read_unaligned(&block[at..at + DIR_ENTRY_SIZE])
    }

    fn write_slot(&self, block: &mut Block, slot: usize) {
        let at = slot * DIR_ENTRY_SIZE;
        block[at..at + DIR_ENTRY_SIZE].copy_from_slice(bytemuck::bytes_of(self));
    }
}

/// Checks that `name` fits a directory slot as a single path component.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\0') {
        return Err(FsError::InvalidName(name.to_string()));
    }
    if name.len() >= MAX_FILENAME_LEN {
        return Err(FsError::NameTooLong {
            max: MAX_FILENAME_LEN - 1,
        });
    }
    Ok(())
}

/// Where a live entry sits on disk.
struct Slot {
    block: u32,
    index: usize,
    entry: DirEntry,
}

/// Calls `visit` for every slot of every allocated block, in pointer order.
/// Stops early when `visit` returns `Some`.
fn scan<D, T, F>(device: &mut D, dir: &Inode, mut visit: F) -> Result<Option<T>>
where
    D: BlockDevice,
    F: FnMut(u32, &Block, usize, DirEntry) -> Option<T>,
{
    let mut buf: Block = [0; BLOCK_SIZE];
    for block in dir.blocks() {
        device.read_block(block, &mut buf)?;
        for index in 0..ENTRIES_PER_BLOCK {
            let entry = DirEntry::read_slot(&buf, index);
            if let Some(found) = visit(block, &buf, index, entry) {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

fn find<D: BlockDevice>(device: &mut D, dir: &Inode, name: &str) -> Result<Option<Slot>> {
    if !dir.is_dir() {
        return Err(FsError::NotADirectory);
    }
    scan(device, dir, |block, _, index, entry| {
        (entry.is_live() && entry.name_bytes() == name.as_bytes()).then_some(Slot {
            block,
            index,
            entry,
        })
    })
}

/// Finds the live entry named exactly `name`.
pub fn lookup<D: BlockDevice>(device: &mut D, dir: &Inode, name: &str) -> Result<(u32, DirEntry)> {
    find(device, dir, name)?
        .map(|slot| (slot.entry.inode, slot.entry))
        .ok_or(FsError::NotFound)
}

/// Places `name -> inode` in the first tombstoned slot of `dir`.
///
/// Directories never grow past the blocks they already own, so a directory
/// with no tombstone left fails with [`FsError::DirectoryFull`].
pub fn insert<D: BlockDevice>(device: &mut D, dir: &Inode, name: &str, inode: u32) -> Result<()> {
    let entry = DirEntry::new(name, inode)?;
    if find(device, dir, name)?.is_some() {
        return Err(FsError::AlreadyExists);
    }

    let free = scan(device, dir, |block, buf, index, slot| {
        (!slot.is_live()).then_some((block, *buf, index))
    })?;
    let Some((block, mut buf, index)) = free else {
        return Err(FsError::DirectoryFull);
    };

    entry.write_slot(&mut buf, index);
    device.write_block(block, &buf)?;
    debug!("dir: inserted {:?} -> inode {} at block {} slot {}", name, inode, block, index);
    Ok(())
}

/// Tombstones the entry named `name`, returning the inode it pointed at.
/// The slot's inode field is left stale.
pub fn remove<D: BlockDevice>(device: &mut D, dir: &Inode, name: &str) -> Result<u32> {
    let slot = find(device, dir, name)?.ok_or(FsError::NotFound)?;

    let mut buf: Block = [0; BLOCK_SIZE];
    device.read_block(slot.block, &mut buf)?;
    buf[slot.index * DIR_ENTRY_SIZE] = 0;
    device.write_block(slot.block, &buf)?;

    debug!("dir: removed {:?} from block {} slot {}", name, slot.block, slot.index);
    Ok(slot.entry.inode)
}

/// Live entries in on-disk order, `.` and `..` included.
pub fn entries<D: BlockDevice>(device: &mut D, dir: &Inode) -> Result<Vec<DirEntry>> {
    if !dir.is_dir() {
        return Err(FsError::NotADirectory);
    }
    let mut live = Vec::new();
    scan::<_, (), _>(device, dir, |_, _, _, entry| {
        if entry.is_live() {
            live.push(entry);
        }
        None
    })?;
    Ok(live)
}

/// True when only `.` and `..` are left.
pub fn is_empty<D: BlockDevice>(device: &mut D, dir: &Inode) -> Result<bool> {
    Ok(entries(device, dir)?.len() == 2)
}

/// First block of a new directory: `.` and `..`, everything else tombstoned.
pub fn initial_block(self_inode: u32, parent_inode: u32) -> Result<Block> {
    let mut buf: Block = [0; BLOCK_SIZE];
    DirEntry::new(DOT, self_inode)?.write_slot(&mut buf, 0);
    DirEntry::new(DOTDOT, parent_inode)?.write_slot(&mut buf, 1);
    Ok(buf)
}
