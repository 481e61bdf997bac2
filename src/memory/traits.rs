/*!
 * Memory Traits
 * Page allocator abstraction for collaborators
 */

use super::page_alloc::PageAlloc;
use super::types::Allocation;
use crate::core::types::{AddrRange, Address, BitRange, ChunkIdx};

/// Page-granularity allocator interface
pub trait PageAllocator {
    /// Bring a chunk under management
    fn grow(&mut self, chunk: ChunkIdx, allocated: &[BitRange], scavenged: &[BitRange]);

    /// Allocate `npages` contiguous pages, `None` on exhaustion
    fn alloc(&mut self, npages: usize) -> Option<Allocation>;

    /// Free a run previously returned by `alloc`
    fn free(&mut self, addr: Address, npages: usize);

    /// Half-open range of managed chunk indices
    fn bounds(&self) -> (ChunkIdx, ChunkIdx);

    /// Managed address ranges
    fn in_use(&self) -> Vec<AddrRange>;
}

impl PageAllocator for PageAlloc {
    fn grow(&mut self, chunk: ChunkIdx, allocated: &[BitRange], scavenged: &[BitRange]) {
        PageAlloc::grow(self, chunk, allocated, scavenged)
    }

    fn alloc(&mut self, npages: usize) -> Option<Allocation> {
        PageAlloc::alloc(self, npages)
    }

    fn free(&mut self, addr: Address, npages: usize) {
        PageAlloc::free(self, addr, npages)
    }

    fn bounds(&self) -> (ChunkIdx, ChunkIdx) {
        PageAlloc::bounds(self)
    }

    fn in_use(&self) -> Vec<AddrRange> {
        PageAlloc::in_use(self).to_vec()
    }
}
