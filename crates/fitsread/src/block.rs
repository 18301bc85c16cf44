//! Fixed-size block access to a FITS byte source.

use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::sync::Arc;

use log::trace;

use crate::error::{Error, Result};

/// FITS block size in bytes (each logical record is one block).
pub const BLOCK_SIZE: usize = 2880;

/// FITS card (keyword record) size in bytes.
pub const CARD_SIZE: usize = 80;

/// Number of cards that fit in a single block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Returns the number of FITS blocks required to hold `num_bytes` bytes.
///
/// This is a ceiling division: 0 bytes requires 0 blocks, 1 byte requires
/// 1 block, 2880 bytes requires 1 block, 2881 bytes requires 2 blocks.
pub const fn blocks_needed(num_bytes: usize) -> usize {
    if num_bytes == 0 {
        return 0;
    }
    num_bytes.div_ceil(BLOCK_SIZE)
}

/// Byte offset of block `index`, or `None` if it does not fit in a `u64`.
fn block_offset(index: usize) -> Option<u64> {
    (index as u64).checked_mul(BLOCK_SIZE as u64)
}

/// One immutable 2880-byte block and its zero-based position in the file.
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    index: usize,
    bytes: Box<[u8; BLOCK_SIZE]>,
}

impl Block {
    /// Wrap raw bytes as the block at `index`.
    pub fn new(index: usize, bytes: Box<[u8; BLOCK_SIZE]>) -> Self {
        Block { index, bytes }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.bytes
    }

    /// Returns `true` if every byte is printable ASCII (32..=126), which is
    /// what distinguishes a header block from a data block.
    pub fn is_printable(&self) -> bool {
        self.bytes.iter().all(|b| (0x20..=0x7E).contains(b))
    }

    /// Iterate over the 36 card images in this block.
    pub fn cards(&self) -> impl Iterator<Item = &[u8; CARD_SIZE]> {
        self.bytes
            .chunks_exact(CARD_SIZE)
            .filter_map(|chunk| <&[u8; CARD_SIZE]>::try_from(chunk).ok())
    }
}

impl core::fmt::Debug for Block {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Block")
            .field("index", &self.index)
            .field("printable", &self.is_printable())
            .finish()
    }
}

/// Reads whole blocks at arbitrary indices from a seekable source.
#[derive(Debug)]
pub struct BlockReader<R> {
    inner: R,
}

impl<R: Read + Seek> BlockReader<R> {
    pub fn new(inner: R) -> Self {
        BlockReader { inner }
    }

    /// Read the block at `index`.
    ///
    /// Returns `Ok(None)` when the source ends exactly at the start of the
    /// block. A block that is present but shorter than [`BLOCK_SIZE`] is a
    /// [`Error::ShortRead`]; it is never silently truncated.
    pub fn read_block(&mut self, index: usize) -> Result<Option<Block>> {
        let offset = block_offset(index).ok_or(Error::Seek {
            block: index,
            cause: None,
        })?;
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(|e| Error::Seek {
                block: index,
                cause: Some(Arc::new(e)),
            })?;

        let mut bytes = Box::new([0u8; BLOCK_SIZE]);
        let len = fill(&mut self.inner, &mut bytes[..])?;
        trace!("block {index}: read {len} bytes at offset {offset}");

        match len {
            0 => Ok(None),
            BLOCK_SIZE => Ok(Some(Block::new(index, bytes))),
            len => Err(Error::ShortRead { block: index, len }),
        }
    }

    /// Read `count` consecutive blocks starting at `first` and return their
    /// concatenated bytes. Every block must be present in full.
    ///
    /// The buffer grows as blocks arrive, so a `count` larger than the
    /// source fails with [`Error::ShortRead`] instead of allocating up front.
    pub fn read_blocks(&mut self, first: usize, count: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for i in 0..count {
            let index = first.checked_add(i).ok_or(Error::Seek {
                block: usize::MAX,
                cause: None,
            })?;
            match self.read_block(index)? {
                Some(block) => out.extend_from_slice(block.bytes()),
                None => return Err(Error::ShortRead { block: index, len: 0 }),
            }
        }
        Ok(out)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Read until `buf` is full or the source is exhausted, returning the count.
fn fill<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
