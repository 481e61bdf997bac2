/*!
 * Summary Index
 *
 * Fixed fan-out tree of [`Summary`] values over chunk indices. Level
 * `SUMMARY_LEVELS - 1` holds one summary per grown chunk; every level above
 * summarizes `SUMMARY_FANOUT` consecutive entries of the level below. The
 * root level is as wide as the address space needs.
 *
 * Every level is stored sparsely and in index order. An absent entry reads
 * as [`Summary::EMPTY`], so ungoverned address space behaves like allocated
 * pages and no run is ever placed across it.
 */

use super::Summary;
use crate::core::limits::{
    CHUNK_PAGES, MAX_PAGES_PER_ROOT, PAGE_SIZE, SUMMARY_FANOUT, SUMMARY_LEVELS,
    SUMMARY_LEVEL_BITS,
};
use crate::core::types::{chunk_base, page_base, Address, ChunkIdx};
use crate::memory::chunk_map::ChunkMap;
use crate::memory::types::{PageAllocError, PageAllocResult};
use log::{error, trace};
use std::collections::{BTreeMap, BTreeSet};

/// Level holding the per-chunk summaries
pub const LEAF_LEVEL: usize = SUMMARY_LEVELS - 1;

/// Chunk-index bits folded into each entry of `level`
#[inline]
const fn level_shift(level: usize) -> u32 {
    SUMMARY_LEVEL_BITS * (LEAF_LEVEL - level) as u32
}

/// Pages covered by one entry of `level`
#[inline]
pub const fn entry_pages(level: usize) -> usize {
    CHUNK_PAGES << level_shift(level)
}

#[inline]
const fn entry_base(level: usize, idx: usize) -> Address {
    chunk_base(idx << level_shift(level))
}

/// Outcome of scanning one window of sibling entries
enum Scan {
    /// A run starting at this address satisfies the request
    Run(Address),
    /// The first fit lies inside this entry
    Descend(usize),
    Miss,
}

/// Multi-level free-run summary tree
#[derive(Debug)]
pub struct SummaryIndex {
    levels: [BTreeMap<usize, Summary>; SUMMARY_LEVELS],
}

impl SummaryIndex {
    pub fn new() -> Self {
        Self {
            levels: std::array::from_fn(|_| BTreeMap::new()),
        }
    }

    /// Summary stored for entry `idx` of `level`
    #[inline]
    pub fn get(&self, level: usize, idx: usize) -> Summary {
        self.levels[level]
            .get(&idx)
            .copied()
            .unwrap_or(Summary::EMPTY)
    }

    #[inline]
    pub fn leaf(&self, chunk: ChunkIdx) -> Summary {
        self.get(LEAF_LEVEL, chunk)
    }

    /// Record a new leaf summary for `chunk` and propagate it upward.
    ///
    /// Propagation stops at the first ancestor whose summary does not change.
    pub fn update(&mut self, chunk: ChunkIdx, leaf: Summary) {
        if !self.set(LEAF_LEVEL, chunk, leaf) {
            return;
        }
        for level in (0..LEAF_LEVEL).rev() {
            let idx = chunk >> level_shift(level);
            let merged = self.merge_children(level, idx);
            if !self.set(level, idx, merged) {
                trace!(
                    "summary propagation for chunk {:#x} stopped at level {}",
                    chunk,
                    level
                );
                return;
            }
        }
    }

    /// Lowest address of a run of at least `npages` free pages.
    ///
    /// Walks the tree top-down. At every level the candidate window is
    /// scanned left to right, tracking the free run that ends at the current
    /// entry so runs straddling several entries are found as early as runs
    /// contained in one. The leaf step resolves the exact offset in `chunks`.
    pub fn find(&self, npages: usize, chunks: &ChunkMap) -> Option<Address> {
        let mut parent: Option<usize> = None;
        for level in 0..SUMMARY_LEVELS {
            let hit = match parent {
                None => scan(
                    self.levels[0].iter().map(|(&idx, &sum)| (idx, sum)),
                    level,
                    npages,
                ),
                Some(p) => {
                    let first = p << SUMMARY_LEVEL_BITS;
                    scan(
                        (first..first + SUMMARY_FANOUT).map(|idx| (idx, self.get(level, idx))),
                        level,
                        npages,
                    )
                }
            };
            match hit {
                Scan::Run(addr) => return Some(addr),
                Scan::Descend(idx) => parent = Some(idx),
                Scan::Miss => match parent {
                    None => return None,
                    // The parent advertised a long enough run.
                    Some(p) => corrupted(level - 1, p),
                },
            }
        }

        let chunk = parent?;
        match chunks.get(chunk).and_then(|c| c.find(npages)) {
            Some(offset) => Some(page_base(chunk, offset)),
            None => corrupted(LEAF_LEVEL, chunk),
        }
    }

    /// Longest free run across the whole index, including runs that cross
    /// root entries.
    pub fn largest_free_run(&self) -> usize {
        let mut best = 0;
        let mut size = 0;
        let mut prev: Option<usize> = None;
        for (&idx, sum) in &self.levels[0] {
            if prev.is_some_and(|p| p + 1 != idx) {
                size = 0;
            }
            prev = Some(idx);
            best = best.max(sum.max).max(size + sum.start);
            size = if sum.is_free(MAX_PAGES_PER_ROOT) {
                size + MAX_PAGES_PER_ROOT
            } else {
                sum.end
            };
        }
        best
    }

    /// Re-derive every stored summary and compare it with what is stored.
    pub fn verify(&self, chunks: &ChunkMap) -> PageAllocResult<()> {
        for (idx, chunk) in chunks.iter() {
            if self.leaf(idx) != chunk.summary() {
                return Err(PageAllocError::CorruptSummary {
                    level: LEAF_LEVEL,
                    index: idx,
                });
            }
        }
        if let Some(&idx) = self.levels[LEAF_LEVEL]
            .keys()
            .find(|&&idx| !chunks.contains(idx))
        {
            return Err(PageAllocError::CorruptSummary {
                level: LEAF_LEVEL,
                index: idx,
            });
        }

        for level in (0..LEAF_LEVEL).rev() {
            let mut parents: BTreeSet<usize> = self.levels[level + 1]
                .keys()
                .map(|&idx| idx >> SUMMARY_LEVEL_BITS)
                .collect();
            parents.extend(self.levels[level].keys().copied());

            for idx in parents {
                if self.get(level, idx) != self.merge_children(level, idx) {
                    return Err(PageAllocError::CorruptSummary { level, index: idx });
                }
            }
        }
        Ok(())
    }

    fn merge_children(&self, level: usize, idx: usize) -> Summary {
        let first = idx << SUMMARY_LEVEL_BITS;
        Summary::merge(
            (first..first + SUMMARY_FANOUT).map(|child| self.get(level + 1, child)),
            entry_pages(level + 1),
        )
    }

    /// Store `sum`, returning whether the entry changed
    fn set(&mut self, level: usize, idx: usize, sum: Summary) -> bool {
        let map = &mut self.levels[level];
        let old = map.get(&idx).copied().unwrap_or(Summary::EMPTY);
        if old == sum {
            return false;
        }
        if sum.is_empty() {
            map.remove(&idx);
        } else {
            map.insert(idx, sum);
        }
        true
    }
}

impl Default for SummaryIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan an ordered window of `(index, summary)` entries of `level`.
///
/// Gaps in the index sequence break the running run.
fn scan<I>(entries: I, level: usize, npages: usize) -> Scan
where
    I: Iterator<Item = (usize, Summary)>,
{
    let pages = entry_pages(level);
    let mut base: Address = 0;
    let mut size = 0;
    let mut prev: Option<usize> = None;

    for (idx, sum) in entries {
        if prev.is_some_and(|p| p + 1 != idx) {
            size = 0;
        }
        prev = Some(idx);

        if sum.is_empty() {
            size = 0;
            continue;
        }
        if size + sum.start >= npages {
            if size == 0 {
                base = entry_base(level, idx);
            }
            return Scan::Run(base);
        }
        if sum.max >= npages {
            return Scan::Descend(idx);
        }
        if size == 0 || !sum.is_free(pages) {
            size = sum.end;
            base = entry_base(level, idx) + (pages - sum.end) * PAGE_SIZE;
        } else {
            size += pages;
        }
    }
    Scan::Miss
}

#[cold]
fn corrupted(level: usize, idx: usize) -> ! {
    let err = PageAllocError::CorruptSummary { level, index: idx };
    error!("{}", err);
    panic!("{}", err)
}
