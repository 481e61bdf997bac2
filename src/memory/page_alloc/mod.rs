/*!
 * Page Allocator
 *
 * Page-granularity allocator over a sparse, lazily grown address space.
 *
 * ## Structure
 *
 * - **Chunk map**: owned bitmap storage for every grown chunk. Gaps between
 *   grown chunks are ungoverned and never allocated from.
 * - **Summary index**: a 5-level tree of `(start, max, end)` free-run
 *   summaries. Allocation walks it top-down to the lowest-address fit; every
 *   bitmap edit is followed by a bottom-up refresh of the touched chunks.
 * - **Bounds / in-use ranges**: the covered chunk-index range and the merged
 *   address ranges of consecutively grown chunks.
 *
 * ## Contract
 *
 * - Exhaustion is a normal outcome: `alloc` returns `None` and never grows the
 *   managed space on its own.
 * - Contract violations (double grow, freeing unallocated pages, zero-page
 *   requests) panic. `try_grow` / `try_free` report them as errors instead.
 * - Scavenged bits are only written by `grow`; `alloc` reports them and
 *   `free` leaves them alone.
 *
 * The allocator is not internally synchronized. Callers serialize access,
 * typically by owning it or wrapping it in a lock.
 */

mod allocator;
mod free;
mod grow;
mod inspect;

use super::chunk::Chunk;
use super::chunk_map::ChunkMap;
use super::config::PageAllocConfig;
use super::summary::SummaryIndex;
use super::types::{HeapLayout, PageAllocError, PageAllocResult};
use crate::core::limits::{CHUNK_PAGES, PAGE_SHIFT};
use crate::core::types::{chunk_base, AddrRange, Address, BitRange, ChunkIdx};
use log::{error, info};

/// Page allocator
#[derive(Debug)]
pub struct PageAlloc {
    config: PageAllocConfig,
    chunks: ChunkMap,
    summary: SummaryIndex,
    /// Lowest grown chunk index
    start: ChunkIdx,
    /// One past the highest grown chunk index
    end: ChunkIdx,
    /// Sorted, merged address ranges of grown chunks
    in_use: Vec<AddrRange>,
}

impl PageAlloc {
    /// Empty allocator with the default configuration
    pub fn new() -> Self {
        Self::build(PageAllocConfig::default())
    }

    /// Empty allocator with a custom configuration
    pub fn with_config(config: PageAllocConfig) -> PageAllocResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Allocator grown from a bulk layout description
    pub fn from_layout(layout: &HeapLayout) -> PageAllocResult<Self> {
        Self::from_layout_with_config(layout, PageAllocConfig::default())
    }

    pub fn from_layout_with_config(
        layout: &HeapLayout,
        config: PageAllocConfig,
    ) -> PageAllocResult<Self> {
        let mut pages = Self::with_config(config)?;
        for (&chunk, allocated) in &layout.allocated {
            pages.try_grow(chunk, allocated, layout.scavenged_for(chunk))?;
        }
        if let Some(scavenged) = &layout.scavenged {
            for chunk in scavenged.keys().filter(|c| !layout.allocated.contains_key(c)) {
                log::warn!(
                    "Ignoring scavenged ranges for chunk {:#x}: not part of the layout",
                    chunk
                );
            }
        }
        Ok(pages)
    }

    fn build(config: PageAllocConfig) -> Self {
        info!(
            "Page allocator initialized: {}-bit address space, {} pages per chunk, summary verification {}",
            config.heap_addr_bits,
            CHUNK_PAGES,
            if config.verify_summaries { "on" } else { "off" }
        );
        Self {
            config,
            chunks: ChunkMap::new(),
            summary: SummaryIndex::new(),
            start: 0,
            end: 0,
            in_use: Vec::new(),
        }
    }

    pub fn config(&self) -> &PageAllocConfig {
        &self.config
    }

    /// Refresh the summaries of a chunk after its alloc bitmap changed
    fn refresh(&mut self, idx: ChunkIdx) {
        if let Some(chunk) = self.chunks.get(idx) {
            self.summary.update(idx, chunk.summary());
        }
    }

    fn chunk_mut(&mut self, idx: ChunkIdx) -> &mut Chunk {
        match self.chunks.get_mut(idx) {
            Some(chunk) => chunk,
            None => contract_violation(PageAllocError::NotGrown(chunk_base(idx))),
        }
    }

    fn verify_if_enabled(&self) {
        if self.config.verify_summaries {
            if let Err(err) = self.check_summaries() {
                contract_violation(err);
            }
        }
    }
}

impl Default for PageAlloc {
    fn default() -> Self {
        Self::new()
    }
}

/// Split the page run `[base, base + npages pages)` at chunk boundaries.
///
/// The caller guarantees that the end page number fits in `usize`.
pub(crate) fn chunk_spans(
    base: Address,
    npages: usize,
) -> impl Iterator<Item = (ChunkIdx, BitRange)> {
    let first_page = base >> PAGE_SHIFT;
    let end_page = first_page + npages;
    let first_chunk = first_page / CHUNK_PAGES;
    let last_chunk = (end_page - 1) / CHUNK_PAGES;
    (first_chunk..=last_chunk).map(move |chunk| {
        let chunk_first = chunk * CHUNK_PAGES;
        let lo = first_page.max(chunk_first) - chunk_first;
        let hi = (end_page - chunk_first).min(CHUNK_PAGES);
        (chunk, BitRange::new(lo, hi - lo))
    })
}

/// Log and panic on a broken caller contract
#[cold]
#[track_caller]
pub(crate) fn contract_violation(err: PageAllocError) -> ! {
    error!("Page allocator contract violation: {}", err);
    panic!("{}", err)
}
