/*!
 * Page Deallocation
 * Returning allocated page runs to the free pool
 */

use super::{chunk_spans, contract_violation, PageAlloc};
use crate::core::limits::{PAGE_SHIFT, PAGE_SIZE};
use crate::core::types::{page_base, Address};
use crate::memory::types::{PageAllocError, PageAllocResult};
use log::debug;

impl PageAlloc {
    /// Free `npages` pages starting at `addr`.
    ///
    /// Scavenged bits are not touched.
    ///
    /// # Panics
    ///
    /// When the run is not fully allocated, leaves the grown chunks, or
    /// `npages` is zero.
    #[track_caller]
    pub fn free(&mut self, addr: Address, npages: usize) {
        if let Err(err) = self.try_free(addr, npages) {
            contract_violation(err);
        }
    }

    /// Fallible form of [`PageAlloc::free`]. The whole run is validated
    /// before any bit changes, so an error leaves the allocator untouched.
    pub fn try_free(&mut self, addr: Address, npages: usize) -> PageAllocResult<()> {
        if npages == 0 {
            return Err(PageAllocError::ZeroPages);
        }
        if addr % PAGE_SIZE != 0 {
            return Err(PageAllocError::MisalignedAddress(addr));
        }
        // A run whose end page does not fit in usize cannot have been allocated
        if (addr >> PAGE_SHIFT).checked_add(npages).is_none() {
            return Err(PageAllocError::NotAllocated { addr, npages });
        }

        for (idx, range) in chunk_spans(addr, npages) {
            let chunk = self
                .chunks
                .get(idx)
                .ok_or(PageAllocError::NotGrown(page_base(idx, range.start)))?;
            if chunk.allocated_count(range) != range.len {
                return Err(PageAllocError::NotAllocated { addr, npages });
            }
        }

        for (idx, range) in chunk_spans(addr, npages) {
            self.chunk_mut(idx).set_free(range);
            self.refresh(idx);
        }
        debug!("Freed {} pages at 0x{:x}", npages, addr);
        self.verify_if_enabled();
        Ok(())
    }
}
