//! The mounted volume and the operations exposed to callers.

use log::{debug, info, warn};

use crate::bitmap::Bitmap;
use crate::block::BlockDevice;
use crate::dir::{self, DOT, DOTDOT};
use crate::error::{FsError, Result};
use crate::file;
use crate::inode::{FileType, Inode, InodeTable};
use crate::layout::{Layout, Superblock};
use crate::session::Session;
use crate::{Block, BLOCK_SIZE, NUM_INODES};

/// One live entry of the current directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub file_type: FileType,
    pub name: String,
    pub inode: u32,
}

/// Metadata of a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    pub inode: u32,
    pub file_type: FileType,
    pub size: u32,
    pub blocks: u32,
}

/// Allocation counters. Data block counts cover the whole device, metadata
/// reservation included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub inodes_used: u32,
    pub inodes_total: u32,
    pub data_blocks_used: u32,
    pub data_blocks_total: u32,
    /// Blocks before the data area, permanently marked used.
    pub reserved_blocks: u32,
}

impl Stats {
    pub fn user_blocks_used(&self) -> u32 {
        self.data_blocks_used - self.reserved_blocks
    }

    pub fn user_blocks_total(&self) -> u32 {
        self.data_blocks_total - self.reserved_blocks
    }

    pub fn user_bytes_used(&self) -> u64 {
        self.user_blocks_used() as u64 * BLOCK_SIZE as u64
    }

    pub fn user_bytes_total(&self) -> u64 {
        self.user_blocks_total() as u64 * BLOCK_SIZE as u64
    }
}

/// A formatted, mounted volume.
///
/// Owns the device together with the in-memory views derived from the
/// superblock at mount time: both bitmaps, the inode table geometry and the
/// working-directory session. Every operation writes its changes through to
/// the device before returning.
pub struct MountedVolume<D: BlockDevice> {
    device: D,
    superblock: Superblock,
    layout: Layout,
    inodes: InodeTable,
    inode_bitmap: Bitmap,
    data_bitmap: Bitmap,
    session: Session,
}

/// Writes a fresh filesystem onto `device`: superblock, cleared bitmaps and
/// inode table, metadata reservation, and a root directory holding only `.`
/// and `..`. Destroys whatever was there.
pub fn format_device<D: BlockDevice>(device: &mut D) -> Result<Layout> {
    let layout = Layout::for_blocks(device.num_blocks())?;
    let superblock = layout.superblock();
    superblock.write(device)?;

    let zero: Block = [0; BLOCK_SIZE];
    for block in layout.inode_bitmap_start..layout.data_area_start {
        device.write_block(block, &zero)?;
    }

    let inodes = InodeTable::new(layout.inode_table_start, NUM_INODES);
    let mut inode_bitmap = Bitmap::empty(layout.inode_bitmap_start, NUM_INODES);
    let mut data_bitmap = Bitmap::empty(layout.data_bitmap_start, layout.total_blocks);
    for block in 0..layout.data_area_start {
        data_bitmap.set(block)?;
    }

    let root = inode_bitmap.allocate().ok_or(FsError::NoFreeInode)?;
    let root_block = data_bitmap.allocate().ok_or(FsError::NoFreeDataBlock)?;

    let mut root_inode = Inode::new(FileType::Directory);
    root_inode.size = 2 * dir::DIR_ENTRY_SIZE as u32;
    root_inode.direct[0] = root_block;
    inodes.write(device, root, &root_inode)?;
    device.write_block(root_block, &dir::initial_block(root, root)?)?;

    inode_bitmap.store(device)?;
    data_bitmap.store(device)?;
    device.flush()?;

    info!(
        "Formatted volume: {} blocks, data area at {}, root inode {} in block {}",
        layout.total_blocks, layout.data_area_start, root, root_block
    );
    Ok(layout)
}

impl<D: BlockDevice> MountedVolume<D> {
    /// Formats `device` and mounts the result.
    pub fn format(mut device: D) -> Result<Self> {
        format_device(&mut device)?;
        Self::mount(device)
    }

    /// Mounts `device`. A bad magic number means the medium is treated as
    /// uninitialised and reformatted; prior content is not salvaged.
    pub fn mount(mut device: D) -> Result<Self> {
        let mut superblock = Superblock::read(&mut device)?;
        if !superblock.is_valid() {
            warn!(
                "Invalid magic {:#x}, formatting the device",
                superblock.magic
            );
            format_device(&mut device)?;
            superblock = Superblock::read(&mut device)?;
        }

        let layout = Layout::from_superblock(&superblock, device.num_blocks())?;
        let inode_bitmap = Bitmap::load(
            &mut device,
            layout.inode_bitmap_start,
            layout.inode_bitmap_blocks,
            NUM_INODES,
        )?;
        let data_bitmap = Bitmap::load(
            &mut device,
            layout.data_bitmap_start,
            layout.data_bitmap_blocks,
            layout.total_blocks,
        )?;

        let mut session = Session::root();
        session.reset(superblock.root_inode);

        info!(
            "Mounted volume: {} blocks, {} inodes in use",
            layout.total_blocks,
            inode_bitmap.count_set()
        );

        Ok(Self {
            device,
            superblock,
            layout,
            inodes: InodeTable::new(layout.inode_table_start, NUM_INODES),
            inode_bitmap,
            data_bitmap,
            session,
        })
    }

    /// Formats the mounted device again and remounts it.
    pub fn reformat(&mut self) -> Result<()> {
        format_device(&mut self.device)?;
        let superblock = Superblock::read(&mut self.device)?;
        let layout = Layout::from_superblock(&superblock, self.device.num_blocks())?;

        self.inode_bitmap = Bitmap::load(
            &mut self.device,
            layout.inode_bitmap_start,
            layout.inode_bitmap_blocks,
            NUM_INODES,
        )?;
        self.data_bitmap = Bitmap::load(
            &mut self.device,
            layout.data_bitmap_start,
            layout.data_bitmap_blocks,
            layout.total_blocks,
        )?;
        self.inodes = InodeTable::new(layout.inode_table_start, NUM_INODES);
        self.superblock = superblock;
        self.layout = layout;
        self.session.reset(superblock.root_inode);
        Ok(())
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Flushes the device and hands it back.
    pub fn into_device(mut self) -> Result<D> {
        self.device.flush()?;
        Ok(self.device)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.device.flush()
    }

    pub fn current_path(&self) -> &str {
        self.session.path()
    }

    pub fn current_dir_inode(&self) -> u32 {
        self.session.cwd()
    }

    pub fn read_inode(&mut self, number: u32) -> Result<Inode> {
        self.inodes.read(&mut self.device, number)
    }

    fn cwd_inode(&mut self) -> Result<Inode> {
        let cwd = self.session.cwd();
        self.read_inode(cwd)
    }

    fn file_type_of(inode: &Inode, number: u32) -> Result<FileType> {
        inode.file_type().ok_or(FsError::CorruptInode(number))
    }

    /// Looks `name` up in the current directory.
    pub fn lookup(&mut self, name: &str) -> Result<u32> {
        let cwd = self.cwd_inode()?;
        Ok(dir::lookup(&mut self.device, &cwd, name)?.0)
    }

    /// Creates an empty directory `name` in the current directory.
    pub fn make_directory(&mut self, name: &str) -> Result<u32> {
        dir::validate_name(name)?;
        let cwd = self.session.cwd();
        let parent = self.cwd_inode()?;
        if dir::lookup(&mut self.device, &parent, name).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        let number = self
            .inode_bitmap
            .find_free(NUM_INODES)
            .ok_or(FsError::NoFreeInode)?;
        let block = self
            .data_bitmap
            .find_free(self.layout.total_blocks)
            .ok_or(FsError::NoFreeDataBlock)?;

        dir::insert(&mut self.device, &parent, name, number)?;

        self.inode_bitmap.set(number)?;
        self.data_bitmap.set(block)?;
        self.inode_bitmap.store(&mut self.device)?;
        self.data_bitmap.store(&mut self.device)?;

        let mut inode = Inode::new(FileType::Directory);
        inode.size = 2 * dir::DIR_ENTRY_SIZE as u32;
        inode.direct[0] = block;
        self.inodes.write(&mut self.device, number, &inode)?;
        self.device
            .write_block(block, &dir::initial_block(number, cwd)?)?;

        debug!("mkdir {:?}: inode {}, block {}", name, number, block);
        Ok(number)
    }

    /// Creates an empty file `name` in the current directory.
    pub fn create_file(&mut self, name: &str) -> Result<u32> {
        dir::validate_name(name)?;
        let parent = self.cwd_inode()?;
        if dir::lookup(&mut self.device, &parent, name).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        let number = self
            .inode_bitmap
            .find_free(NUM_INODES)
            .ok_or(FsError::NoFreeInode)?;

        dir::insert(&mut self.device, &parent, name, number)?;

        self.inode_bitmap.set(number)?;
        self.inode_bitmap.store(&mut self.device)?;
        self.inodes
            .write(&mut self.device, number, &Inode::new(FileType::File))?;

        debug!("touch {:?}: inode {}", name, number);
        Ok(number)
    }

    /// Moves the working directory by one component: `/`, `..`, `.` or the
    /// name of a child directory. Multi-component paths are not split.
    pub fn change_directory(&mut self, name: &str) -> Result<()> {
        if name == "/" {
            self.session.reset(self.superblock.root_inode);
            return Ok(());
        }

        let target = self.lookup(name)?;
        let inode = self.read_inode(target)?;
        if !inode.is_dir() {
            return Err(FsError::NotADirectory);
        }

        match name {
            DOTDOT => self.session.leave(target),
            DOT => self.session.stay(target),
            _ => self.session.enter(name, target),
        }
        Ok(())
    }

    /// Whole contents of file `name`.
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let number = self.lookup(name)?;
        let inode = self.read_inode(number)?;
        if !inode.is_file() {
            return Err(FsError::NotAFile);
        }
        file::read(&mut self.device, &inode)
    }

    /// Appends `bytes` to file `name`. See [`file::append`] for what survives
    /// a failure part way through.
    pub fn append_file(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let number = self.lookup(name)?;
        let mut inode = self.read_inode(number)?;
        file::append(
            &mut self.device,
            &self.inodes,
            &mut self.data_bitmap,
            number,
            &mut inode,
            bytes,
        )
    }

    /// Removes file or empty directory `name`, releasing its inode and data
    /// blocks. Neither `.` nor `..` can be removed.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        if name == DOT || name == DOTDOT {
            return Err(FsError::InvalidOperation("cannot remove '.' or '..'"));
        }

        let parent = self.cwd_inode()?;
        let (number, _) = dir::lookup(&mut self.device, &parent, name)?;
        let target = self.read_inode(number)?;
        if target.is_dir() && !dir::is_empty(&mut self.device, &target)? {
            return Err(FsError::DirectoryNotEmpty);
        }

        for block in target.blocks() {
            self.data_bitmap.clear(block)?;
        }
        self.inode_bitmap.clear(number)?;
        self.data_bitmap.store(&mut self.device)?;
        self.inode_bitmap.store(&mut self.device)?;

        dir::remove(&mut self.device, &parent, name)?;

        debug!(
            "rm {:?}: freed inode {} and {} blocks",
            name,
            number,
            target.block_count()
        );
        Ok(())
    }

    /// Live entries of the current directory in slot order.
    pub fn list_directory(&mut self) -> Result<Vec<ListEntry>> {
        let cwd = self.cwd_inode()?;
        let entries = dir::entries(&mut self.device, &cwd)?;

        let mut listing = Vec::with_capacity(entries.len());
        for entry in entries {
            let inode = self.read_inode(entry.inode)?;
            listing.push(ListEntry {
                file_type: Self::file_type_of(&inode, entry.inode)?,
                name: entry.name().into_owned(),
                inode: entry.inode,
            });
        }
        Ok(listing)
    }

    /// Metadata for entry `name` of the current directory.
    pub fn stat(&mut self, name: &str) -> Result<EntryInfo> {
        let number = self.lookup(name)?;
        let inode = self.read_inode(number)?;
        Ok(EntryInfo {
            inode: number,
            file_type: Self::file_type_of(&inode, number)?,
            size: inode.size,
            blocks: inode.block_count(),
        })
    }

    pub fn stats(&self) -> Stats {
        Stats {
            inodes_used: self.inode_bitmap.count_set(),
            inodes_total: self.inode_bitmap.len(),
            data_blocks_used: self.data_bitmap.count_set(),
            data_blocks_total: self.data_bitmap.len(),
            reserved_blocks: self.layout.data_area_start,
        }
    }
}
