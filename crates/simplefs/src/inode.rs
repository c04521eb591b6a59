//! Inode records and the inode table region.

use bytemuck::{Pod, Zeroable};

use crate::block::BlockDevice;
use crate::error::{FsError, Result};
use crate::{Block, BLOCK_SIZE, MAX_DIRECT_POINTERS};

pub const INODE_SIZE: usize = core::mem::size_of::<Inode>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FileType {
    File = 1,
    Directory = 2,
}

impl FileType {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::File),
            2 => Some(Self::Directory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Inode {
    pub kind: u8,
    pub _pad: [u8; 3],
    /// Bytes used. For directories this is informational only.
    pub size: u32,
    /// Absolute block indices; 0 marks an unallocated slot.
    pub direct: [u32; MAX_DIRECT_POINTERS],
}

impl Inode {
    pub fn new(file_type: FileType) -> Self {
        Self {
            kind: file_type as u8,
            _pad: [0; 3],
            size: 0,
            direct: [0; MAX_DIRECT_POINTERS],
        }
    }

    pub fn file_type(&self) -> Option<FileType> {
        FileType::from_raw(self.kind)
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == Some(FileType::Directory)
    }

    pub fn is_file(&self) -> bool {
        self.file_type() == Some(FileType::File)
    }

    /// Allocated direct pointers in pointer order.
    pub fn blocks(&self) -> impl Iterator<Item = u32> + '_ {
        self.direct.iter().copied().filter(|&b| b != 0)
    }

    pub fn block_count(&self) -> u32 {
        self.blocks().count() as u32
    }
}

/// Indexed access to the persisted inode array.
///
/// Records are packed back to back, so one may straddle two blocks.
#[derive(Debug, Clone, Copy)]
pub struct InodeTable {
    start_block: u32,
    count: u32,
}

impl InodeTable {
    pub fn new(start_block: u32, count: u32) -> Self {
        Self { start_block, count }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    fn locate(&self, inode: u32) -> Result<(u32, usize)> {
        if inode >= self.count {
            return Err(FsError::InodeOutOfRange(inode));
        }
        let offset = inode as usize * INODE_SIZE;
        Ok((
            self.start_block + (offset / BLOCK_SIZE) as u32,
            offset % BLOCK_SIZE,
        ))
    }

    fn straddles(within: usize) -> bool {
        within + INODE_SIZE > BLOCK_SIZE
    }

    pub fn read<D: BlockDevice>(&self, device: &mut D, inode: u32) -> Result<Inode> {
        let (block, within) = self.locate(inode)?;
        let mut window = [0u8; 2 * BLOCK_SIZE];
        read_into(device, block, &mut window[..BLOCK_SIZE])?;
        if Self::straddles(within) {
            read_into(device, block + 1, &mut window[BLOCK_SIZE..])?;
        }
        Ok(bytemuck::pod_read_unaligned(
            &window[within..within + INODE_SIZE],
        ))
    }

    pub fn write<D: BlockDevice>(&self, device: &mut D, inode: u32, record: &Inode) -> Result<()> {
        let (block, within) = self.locate(inode)?;
        let straddles = Self::straddles(within);
        let mut window = [0u8; 2 * BLOCK_SIZE];
        read_into(device, block, &mut window[..BLOCK_SIZE])?;
        if straddles {
            read_into(device, block + 1, &mut window[BLOCK_SIZE..])?;
        }

        window[within..within + INODE_SIZE].copy_from_slice(bytemuck::bytes_of(record));

        write_from(device, block, &window[..BLOCK_SIZE])?;
        if straddles {
            write_from(device, block + 1, &window[BLOCK_SIZE..])?;
        }
        Ok(())
    }
}

fn read_into<D: BlockDevice>(device: &mut D, index: u32, dst: &mut [u8]) -> Result<()> {
    let mut buf: Block = [0; BLOCK_SIZE];
    device.read_block(index, &mut buf)?;
    dst.copy_from_slice(&buf);
    Ok(())
}

fn write_from<D: BlockDevice>(device: &mut D, index: u32, src: &[u8]) -> Result<()> {
    let mut buf: Block = [0; BLOCK_SIZE];
    buf.copy_from_slice(src);
    device.write_block(index, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemDisk;
    use crate::NUM_INODES;

    #[test]
    fn record_is_56_bytes() {
        assert_eq!(INODE_SIZE, 56);
    }

    #[test]
    fn records_straddling_blocks_round_trip() {
        let mut disk = MemDisk::new(32);
        let table = InodeTable::new(4, NUM_INODES);

        // Inode 9 covers bytes 504..560 of the table: the tail of block 4 and
        // the head of block 5.
        let mut inode = Inode::new(FileType::File);
        inode.size = 1234;
        inode.direct[0] = 77;
        inode.direct[11] = 99;
        table.write(&mut disk, 9, &inode).unwrap();

        assert_eq!(table.read(&mut disk, 9).unwrap(), inode);
        assert_eq!(disk.block(4).unwrap()[504], FileType::File as u8);
        assert_eq!(&disk.block(5).unwrap()[44..48], &99u32.to_le_bytes());

        // Neighbours are untouched.
        assert_eq!(table.read(&mut disk, 8).unwrap(), Inode::zeroed());
        assert_eq!(table.read(&mut disk, 10).unwrap(), Inode::zeroed());
    }

    #[test]
    fn last_inode_fits_in_table_region() {
        let mut disk = MemDisk::new(32);
        let table = InodeTable::new(4, NUM_INODES);
        let inode = Inode::new(FileType::Directory);
        table.write(&mut disk, NUM_INODES - 1, &inode).unwrap();
        assert!(table.read(&mut disk, NUM_INODES - 1).unwrap().is_dir());
        // 128 * 56 bytes end inside the 14th table block.
        assert!(disk.block(18).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn out_of_range_inode_is_rejected() {
        let mut disk = MemDisk::new(32);
        let table = InodeTable::new(4, NUM_INODES);
        assert!(matches!(
            table.read(&mut disk, NUM_INODES),
            Err(FsError::InodeOutOfRange(128))
        ));
    }

    #[test]
    fn unknown_type_tag_has_no_file_type() {
        let inode = Inode::zeroed();
        assert_eq!(inode.file_type(), None);
        assert_eq!(inode.block_count(), 0);
    }
}
