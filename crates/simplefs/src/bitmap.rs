//! Free/used tracking for inode slots and data blocks.
//!
//! A bitmap is kept in memory as 32-bit words (bit `i` lives in word `i / 32`,
//! bit `i % 32`) and persisted little-endian into its dedicated blocks.
//! Allocation is always lowest-free-index first.

use log::debug;

use crate::block::BlockDevice;
use crate::error::{FsError, Result};
use crate::{Block, BLOCK_SIZE};

pub const BITS_PER_BLOCK: u32 = (BLOCK_SIZE * 8) as u32;
const WORDS_PER_BLOCK: usize = BLOCK_SIZE / 4;

pub struct Bitmap {
    start_block: u32,
    blocks: u32,
    len: u32,
    words: Vec<u32>,
}

impl Bitmap {
    /// Number of blocks needed to hold `len` bits.
    pub fn blocks_for(len: u32) -> u32 {
        len.div_ceil(BITS_PER_BLOCK)
    }

    /// An all-clear bitmap of `len` bits stored from `start_block`.
    pub fn empty(start_block: u32, len: u32) -> Self {
        let blocks = Self::blocks_for(len);
        Self {
            start_block,
            blocks,
            len,
            words: vec![0; blocks as usize * WORDS_PER_BLOCK],
        }
    }

    /// Reads `blocks` blocks from `start_block`, exposing the first `len` bits.
    pub fn load<D: BlockDevice>(
        device: &mut D,
        start_block: u32,
        blocks: u32,
        len: u32,
    ) -> Result<Self> {
        if Self::blocks_for(len) > blocks {
            return Err(FsError::InvalidLayout("bitmap region too small"));
        }

        let mut words = Vec::with_capacity(blocks as usize * WORDS_PER_BLOCK);
        let mut buf: Block = [0; BLOCK_SIZE];
        for i in 0..blocks {
            device.read_block(start_block + i, &mut buf)?;
            words.extend(
                buf.chunks_exact(4)
                    .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]])),
            );
        }

        Ok(Self {
            start_block,
            blocks,
            len,
            words,
        })
    }

    /// Writes every block of the bitmap back to the device.
    pub fn store<D: BlockDevice>(&self, device: &mut D) -> Result<()> {
        let mut buf: Block = [0; BLOCK_SIZE];
        for (i, chunk) in self.words.chunks(WORDS_PER_BLOCK).enumerate() {
            for (dst, word) in buf.chunks_exact_mut(4).zip(chunk) {
                dst.copy_from_slice(&word.to_le_bytes());
            }
            device.write_block(self.start_block + i as u32, &buf)?;
        }
        Ok(())
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn blocks(&self) -> u32 {
        self.blocks
    }

    fn check(&self, index: u32) -> Result<()> {
        if index >= self.len {
            return Err(FsError::BitOutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(())
    }

    pub fn is_set(&self, index: u32) -> Result<bool> {
        self.check(index)?;
        Ok((self.words[(index / 32) as usize] >> (index % 32)) & 1 == 1)
    }

    pub fn set(&mut self, index: u32) -> Result<()> {
        self.check(index)?;
        self.words[(index / 32) as usize] |= 1 << (index % 32);
        Ok(())
    }

    pub fn clear(&mut self, index: u32) -> Result<()> {
        self.check(index)?;
        self.words[(index / 32) as usize] &= !(1 << (index % 32));
        Ok(())
    }

    /// First clear bit below `limit` (capped at the bitmap length).
    pub fn find_free(&self, limit: u32) -> Option<u32> {
        let limit = limit.min(self.len);
        for (w, &word) in self.words.iter().enumerate() {
            if word == u32::MAX {
                continue;
            }
            let index = w as u32 * 32 + (!word).trailing_zeros();
            if index >= limit {
                return None;
            }
            return Some(index);
        }
        None
    }

    /// Marks the first free bit used and returns it.
    pub fn allocate(&mut self) -> Option<u32> {
        let index = self.find_free(self.len)?;
        self.words[(index / 32) as usize] |= 1 << (index % 32);
        debug!("bitmap@{}: allocated {}", self.start_block, index);
        Some(index)
    }

    pub fn count_set(&self) -> u32 {
        (0..self.len)
            .filter(|&i| (self.words[(i / 32) as usize] >> (i % 32)) & 1 == 1)
            .count() as u32
    }
}
