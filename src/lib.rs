/*!
 * Page Allocator Library
 * Page-granularity allocation over a sparse, lazily grown address space
 */

pub mod core;
pub mod memory;

// Re-exports
pub use crate::core::limits::{CHUNK_BYTES, CHUNK_PAGES, PAGE_SIZE};
pub use crate::core::types::{page_base, AddrRange, Address, BitRange, ChunkIdx, Size};
pub use memory::{
    Allocation, ChunkBits, HeapLayout, PageAlloc, PageAllocConfig, PageAllocError,
    PageAllocResult, PageAllocStats, PageAllocator, Summary,
};
