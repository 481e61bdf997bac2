/*!
 * Page Allocator Growth
 * Registering new chunks with the allocator
 */

use super::{contract_violation, PageAlloc};
use crate::core::types::{AddrRange, BitRange, ChunkIdx};
use crate::memory::types::{PageAllocError, PageAllocResult};
use log::info;

impl PageAlloc {
    /// Grow the managed space by chunk `chunk`.
    ///
    /// Pages in `allocated` start out allocated and pages in `scavenged` start
    /// out scavenged; everything else is free and unscavenged.
    ///
    /// # Panics
    ///
    /// When the chunk was already grown, lies outside the configured address
    /// space, or a range does not fit in a chunk.
    #[track_caller]
    pub fn grow(&mut self, chunk: ChunkIdx, allocated: &[BitRange], scavenged: &[BitRange]) {
        if let Err(err) = self.try_grow(chunk, allocated, scavenged) {
            contract_violation(err);
        }
    }

    /// Fallible form of [`PageAlloc::grow`]; leaves the allocator untouched
    /// on error.
    pub fn try_grow(
        &mut self,
        chunk: ChunkIdx,
        allocated: &[BitRange],
        scavenged: &[BitRange],
    ) -> PageAllocResult<()> {
        let limit = self.config.chunk_limit();
        if chunk >= limit {
            return Err(PageAllocError::ChunkOutOfRange { chunk, limit });
        }
        if let Some(bad) = allocated.iter().chain(scavenged).find(|r| !r.fits_chunk()) {
            return Err(PageAllocError::BitRangeOutOfBounds {
                start: bad.start,
                len: bad.len,
            });
        }

        let data = self.chunks.insert(chunk)?;
        for &range in allocated {
            data.set_allocated(range);
        }
        for &range in scavenged {
            data.mark_scavenged(range);
        }

        if self.chunks.len() == 1 {
            self.start = chunk;
            self.end = chunk + 1;
        } else {
            self.start = self.start.min(chunk);
            self.end = self.end.max(chunk + 1);
        }
        self.record_in_use(chunk);
        self.refresh(chunk);

        info!(
            "Grew chunk {:#x}: bounds now [{:#x}, {:#x}), {} chunks managed",
            chunk,
            self.start,
            self.end,
            self.chunks.len()
        );
        self.verify_if_enabled();
        Ok(())
    }

    /// Merge the address range of a newly grown chunk into `in_use`
    fn record_in_use(&mut self, chunk: ChunkIdx) {
        let range = AddrRange::from_chunks(chunk, chunk + 1);
        let pos = self.in_use.partition_point(|r| r.base < range.base);
        let joins_prev = pos > 0 && self.in_use[pos - 1].limit == range.base;
        let joins_next = pos < self.in_use.len() && self.in_use[pos].base == range.limit;

        match (joins_prev, joins_next) {
            (true, true) => {
                self.in_use[pos - 1].limit = self.in_use[pos].limit;
                self.in_use.remove(pos);
            }
            (true, false) => self.in_use[pos - 1].limit = range.limit,
            (false, true) => self.in_use[pos].base = range.base,
            (false, false) => self.in_use.insert(pos, range),
        }
    }
}
