/*!
 * Page Allocation
 * First-fit allocation of contiguous page runs
 */

use super::{chunk_spans, contract_violation, PageAlloc};
use crate::core::limits::PAGE_SIZE;
use crate::core::types::{Address, Size};
use crate::memory::types::{Allocation, PageAllocError};
use log::debug;

impl PageAlloc {
    /// Allocate `npages` contiguous pages at the lowest available address.
    ///
    /// Returns `None` when no free run of `npages` exists anywhere in the
    /// grown space. The returned [`Allocation`] also reports how many bytes of
    /// the run were scavenged; scavenged bits themselves are left as they
    /// were.
    ///
    /// # Panics
    ///
    /// When `npages` is zero.
    #[track_caller]
    pub fn alloc(&mut self, npages: usize) -> Option<Allocation> {
        if npages == 0 {
            contract_violation(PageAllocError::ZeroPages);
        }

        let Some(base) = self.summary.find(npages, &self.chunks) else {
            debug!(
                "No free run of {} pages in {} chunks",
                npages,
                self.chunks.len()
            );
            return None;
        };

        let scavenged = self.alloc_range(base, npages);
        debug!(
            "Allocated {} pages at 0x{:x} ({} bytes scavenged)",
            npages, base, scavenged
        );
        self.verify_if_enabled();

        Some(Allocation { base, scavenged })
    }

    /// Mark a run allocated and return its scavenged byte count, read
    /// before the alloc bits change
    fn alloc_range(&mut self, base: Address, npages: usize) -> Size {
        let mut scavenged_pages = 0;
        for (idx, range) in chunk_spans(base, npages) {
            let chunk = self.chunk_mut(idx);
            scavenged_pages += chunk.scavenged_count(range);
            chunk.set_allocated(range);
            self.refresh(idx);
        }
        scavenged_pages * PAGE_SIZE
    }
}
