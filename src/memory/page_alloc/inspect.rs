/*!
 * Page Allocator Inspection
 * Bounds, coverage, statistics and diagnostics
 */

use super::PageAlloc;
use crate::core::limits::CHUNK_PAGES;
use crate::core::types::{chunk_index, AddrRange, Address, ChunkIdx};
use crate::memory::chunk::Chunk;
use crate::memory::types::{ChunkBits, PageAllocResult, PageAllocStats};

impl PageAlloc {
    /// Half-open range of grown chunk indices; `(0, 0)` before the first grow
    pub fn bounds(&self) -> (ChunkIdx, ChunkIdx) {
        (self.start, self.end)
    }

    /// Address ranges under management, sorted, with consecutive chunks
    /// merged into one range
    pub fn in_use(&self) -> &[AddrRange] {
        &self.in_use
    }

    /// Whether `addr` lies in a grown chunk
    pub fn manages(&self, addr: Address) -> bool {
        self.chunks.contains(chunk_index(addr))
    }

    pub fn chunk(&self, idx: ChunkIdx) -> Option<&Chunk> {
        self.chunks.get(idx)
    }

    /// Raw bitmaps of a chunk, `None` if it was never grown
    pub fn chunk_bits(&self, idx: ChunkIdx) -> Option<ChunkBits> {
        self.chunks.get(idx).map(|chunk| ChunkBits {
            allocated: *chunk.alloc_bits(),
            scavenged: *chunk.scavenged_bits(),
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn stats(&self) -> PageAllocStats {
        let (free_pages, scavenged_pages) = self
            .chunks
            .iter()
            .fold((0, 0), |(free, scav), (_, chunk)| {
                (free + chunk.free_count(), scav + chunk.scavenged_total())
            });
        PageAllocStats {
            chunks: self.chunks.len(),
            total_pages: self.chunks.len() * CHUNK_PAGES,
            free_pages,
            scavenged_pages,
            largest_free_run: self.summary.largest_free_run(),
        }
    }

    /// Check every stored summary against the chunk bitmaps
    pub fn check_summaries(&self) -> PageAllocResult<()> {
        self.summary.verify(&self.chunks)
    }
}
