/*!
 * Page Allocator Configuration
 */

use super::types::{PageAllocError, PageAllocResult};
use crate::core::limits::{DEFAULT_HEAP_ADDR_BITS, LOG_CHUNK_BYTES};
use crate::core::types::ChunkIdx;
use serde::{Deserialize, Serialize};

/// Page allocator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageAllocConfig {
    /// Width of the managed address space; chunks at or above
    /// `1 << (heap_addr_bits - LOG_CHUNK_BYTES)` cannot be grown
    pub heap_addr_bits: u32,
    /// Re-derive and check all summaries after every mutation
    pub verify_summaries: bool,
}

impl Default for PageAllocConfig {
    fn default() -> Self {
        Self {
            heap_addr_bits: DEFAULT_HEAP_ADDR_BITS,
            verify_summaries: false,
        }
    }
}

impl PageAllocConfig {
    pub fn with_heap_addr_bits(mut self, bits: u32) -> Self {
        self.heap_addr_bits = bits;
        self
    }

    pub fn with_verify_summaries(mut self, enabled: bool) -> Self {
        self.verify_summaries = enabled;
        self
    }

    /// Check that the address width holds at least one chunk and that the
    /// limit address of the last chunk still fits in `usize`
    pub fn validate(&self) -> PageAllocResult<()> {
        if self.heap_addr_bits <= LOG_CHUNK_BYTES || self.heap_addr_bits >= usize::BITS {
            return Err(PageAllocError::InvalidHeapAddrBits(self.heap_addr_bits));
        }
        Ok(())
    }

    /// Exclusive upper bound on growable chunk indices
    pub fn chunk_limit(&self) -> ChunkIdx {
        1usize
            .checked_shl(self.heap_addr_bits.saturating_sub(LOG_CHUNK_BYTES))
            .unwrap_or(usize::MAX)
    }
}
