/*!
 * Core Types
 * Address, page and chunk types shared by the allocator components
 */

use super::limits::{CHUNK_BYTES, CHUNK_PAGES, LOG_CHUNK_BYTES, PAGE_SHIFT, PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address type for memory operations
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Index of a chunk of address space
pub type ChunkIdx = usize;

/// Chunk index containing an address
#[inline]
pub const fn chunk_index(addr: Address) -> ChunkIdx {
    addr >> LOG_CHUNK_BYTES
}

/// Base address of a chunk
#[inline]
pub const fn chunk_base(chunk: ChunkIdx) -> Address {
    chunk * CHUNK_BYTES
}

/// Page offset of an address within its chunk
#[inline]
pub const fn chunk_page_index(addr: Address) -> usize {
    (addr >> PAGE_SHIFT) % CHUNK_PAGES
}

/// Address of page `page` counted from the start of `chunk`
///
/// `page` may exceed the chunk size, in which case the address lands in a
/// following chunk.
#[inline]
pub const fn page_base(chunk: ChunkIdx, page: usize) -> Address {
    chunk_base(chunk) + page * PAGE_SIZE
}

/// Half-open page range `[start, start + len)` within one chunk bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BitRange {
    pub start: usize,
    pub len: usize,
}

impl BitRange {
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Range covering a whole chunk
    pub const fn full() -> Self {
        Self::new(0, CHUNK_PAGES)
    }

    #[inline]
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the range fits inside a chunk bitmap
    #[inline]
    pub const fn fits_chunk(&self) -> bool {
        self.start <= CHUNK_PAGES && self.len <= CHUNK_PAGES - self.start
    }
}

impl From<(usize, usize)> for BitRange {
    fn from((start, len): (usize, usize)) -> Self {
        Self::new(start, len)
    }
}

/// Half-open address range `[base, limit)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddrRange {
    pub base: Address,
    pub limit: Address,
}

impl AddrRange {
    pub const fn new(base: Address, limit: Address) -> Self {
        Self { base, limit }
    }

    /// Range spanning the chunks `[start, end)`
    pub const fn from_chunks(start: ChunkIdx, end: ChunkIdx) -> Self {
        Self::new(chunk_base(start), chunk_base(end))
    }

    #[inline]
    pub const fn size(&self) -> Size {
        self.limit.saturating_sub(self.base)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.limit <= self.base
    }

    #[inline]
    pub const fn contains(&self, addr: Address) -> bool {
        addr >= self.base && addr < self.limit
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[0x{:x}, 0x{:x})", self.base, self.limit)
    }
}
