/*!
 * Memory Types
 * Common types for the page allocator
 */

use crate::core::limits::{CHUNK_BITMAP_WORDS, PAGE_SIZE};
use crate::core::types::{Address, BitRange, ChunkIdx, Size};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Page allocator operation result
pub type PageAllocResult<T> = Result<T, PageAllocError>;

/// Page allocator errors
///
/// Every variant describes a caller contract violation. The infallible entry
/// points (`grow`, `free`, `alloc`) panic with these messages; the `try_*`
/// variants hand them back instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageAllocError {
    #[error("Chunk {0:#x} has already been grown")]
    ChunkAlreadyGrown(ChunkIdx),

    #[error("Chunk {chunk:#x} lies outside the managed address space (limit {limit:#x})")]
    ChunkOutOfRange { chunk: ChunkIdx, limit: ChunkIdx },

    #[error("Bit range [{start}, {start}+{len}) exceeds the chunk bitmap")]
    BitRangeOutOfBounds { start: usize, len: usize },

    #[error("Page count must be at least 1")]
    ZeroPages,

    #[error("Address 0x{0:x} is not in a grown chunk")]
    NotGrown(Address),

    #[error("Pages [0x{addr:x}, +{npages}) are not fully allocated")]
    NotAllocated { addr: Address, npages: usize },

    #[error("Address 0x{0:x} is not page aligned")]
    MisalignedAddress(Address),

    #[error("Heap address width of {0} bits is not supported")]
    InvalidHeapAddrBits(u32),

    #[error("Summary corruption detected at level {level}, entry {index:#x}")]
    CorruptSummary { level: usize, index: usize },
}

/// Successful page allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Address of the first allocated page
    pub base: Address,
    /// Bytes of the allocated run that were scavenged beforehand
    pub scavenged: Size,
}

impl Allocation {
    /// Number of scavenged pages in the run
    pub fn scavenged_pages(&self) -> usize {
        self.scavenged / PAGE_SIZE
    }
}

/// Raw bitmap snapshot of a single chunk (diagnostics)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBits {
    pub allocated: [u64; CHUNK_BITMAP_WORDS],
    pub scavenged: [u64; CHUNK_BITMAP_WORDS],
}

/// Bulk description of an allocator's initial state
///
/// `allocated` lists every chunk to grow with the page ranges that start out
/// allocated. `scavenged` optionally lists scavenged ranges per chunk; `None`
/// means nothing is scavenged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapLayout {
    pub allocated: BTreeMap<ChunkIdx, Vec<BitRange>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scavenged: Option<BTreeMap<ChunkIdx, Vec<BitRange>>>,
}

impl HeapLayout {
    pub fn new(allocated: BTreeMap<ChunkIdx, Vec<BitRange>>) -> Self {
        Self {
            allocated,
            scavenged: None,
        }
    }

    /// Attach a scavenged-range map
    pub fn with_scavenged(mut self, scavenged: BTreeMap<ChunkIdx, Vec<BitRange>>) -> Self {
        self.scavenged = Some(scavenged);
        self
    }

    /// Add a chunk with the given allocated ranges
    pub fn with_chunk<I>(mut self, chunk: ChunkIdx, allocated: I) -> Self
    where
        I: IntoIterator<Item = BitRange>,
    {
        self.allocated
            .entry(chunk)
            .or_default()
            .extend(allocated);
        self
    }

    /// Parse a layout from its JSON form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Scavenged ranges for a chunk, empty when none were given
    pub fn scavenged_for(&self, chunk: ChunkIdx) -> &[BitRange] {
        self.scavenged
            .as_ref()
            .and_then(|m| m.get(&chunk))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Page allocator statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAllocStats {
    pub chunks: usize,
    pub total_pages: usize,
    pub free_pages: usize,
    pub scavenged_pages: usize,
    /// Longest run of free pages, counting runs that cross chunk boundaries
    pub largest_free_run: usize,
}

impl PageAllocStats {
    pub fn used_pages(&self) -> usize {
        self.total_pages - self.free_pages
    }

    pub fn usage_ratio(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        self.used_pages() as f64 / self.total_pages as f64
    }
}
