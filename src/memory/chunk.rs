/*!
 * Chunk Bitmaps
 * Per-page allocated and scavenged state for one chunk of address space
 *
 * Each chunk owns two bitmaps of `CHUNK_PAGES` bits. A set bit in the alloc
 * bitmap marks an allocated page; a set bit in the scavenged bitmap marks a
 * page whose backing was returned to the operating system. The two are
 * independent and only the alloc bitmap feeds the chunk's [`Summary`].
 *
 * Scanning works on whole words with `trailing_zeros` / `leading_zeros`, so
 * locating a run costs one step per word plus one per run boundary.
 */

use super::summary::Summary;
use crate::core::limits::{CHUNK_BITMAP_WORDS, CHUNK_PAGES};
use crate::core::types::BitRange;

type Bitmap = [u64; CHUNK_BITMAP_WORDS];

const WORD_BITS: usize = u64::BITS as usize;

/// Allocated and scavenged bitmaps for one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    alloc: Bitmap,
    scavenged: Bitmap,
}

impl Chunk {
    /// Fully free, unscavenged chunk
    pub fn new() -> Self {
        Self {
            alloc: [0; CHUNK_BITMAP_WORDS],
            scavenged: [0; CHUNK_BITMAP_WORDS],
        }
    }

    pub fn alloc_bits(&self) -> &[u64; CHUNK_BITMAP_WORDS] {
        &self.alloc
    }

    pub fn scavenged_bits(&self) -> &[u64; CHUNK_BITMAP_WORDS] {
        &self.scavenged
    }

    #[inline]
    pub fn is_allocated(&self, page: usize) -> bool {
        test_bit(&self.alloc, page)
    }

    #[inline]
    pub fn is_scavenged(&self, page: usize) -> bool {
        test_bit(&self.scavenged, page)
    }

    pub fn set_allocated(&mut self, range: BitRange) {
        set_range(&mut self.alloc, range);
    }

    pub fn set_free(&mut self, range: BitRange) {
        clear_range(&mut self.alloc, range);
    }

    pub fn mark_scavenged(&mut self, range: BitRange) {
        set_range(&mut self.scavenged, range);
    }

    pub fn clear_scavenged(&mut self, range: BitRange) {
        clear_range(&mut self.scavenged, range);
    }

    /// Scavenged pages within `range`
    pub fn scavenged_count(&self, range: BitRange) -> usize {
        count_range(&self.scavenged, range)
    }

    /// Allocated pages within `range`
    pub fn allocated_count(&self, range: BitRange) -> usize {
        count_range(&self.alloc, range)
    }

    pub fn free_count(&self) -> usize {
        CHUNK_PAGES - self.allocated_count(BitRange::full())
    }

    pub fn scavenged_total(&self) -> usize {
        self.scavenged_count(BitRange::full())
    }

    /// Summary of the alloc bitmap, composed word by word
    pub fn summary(&self) -> Summary {
        if self.alloc.iter().all(|&w| w == 0) {
            return Summary::free(CHUNK_PAGES);
        }
        if self.alloc.iter().all(|&w| w == u64::MAX) {
            return Summary::EMPTY;
        }
        Summary::merge(self.alloc.iter().map(|&w| word_summary(w)), WORD_BITS)
    }

    /// Offset of the first run of at least `npages` free pages
    pub fn find(&self, npages: usize) -> Option<usize> {
        if npages == 0 || npages > CHUNK_PAGES {
            return None;
        }
        self.free_runs()
            .find(|&(_, len)| len >= npages)
            .map(|(start, _)| start)
    }

    /// Maximal free runs as `(offset, len)`, lowest offset first
    pub fn free_runs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let mut cursor = 0;
        std::iter::from_fn(move || {
            let start = self.next_page(cursor, false)?;
            let end = self.next_page(start, true).unwrap_or(CHUNK_PAGES);
            cursor = end;
            Some((start, end - start))
        })
    }

    /// First page at or after `from` whose alloc bit equals `allocated`
    fn next_page(&self, from: usize, allocated: bool) -> Option<usize> {
        if from >= CHUNK_PAGES {
            return None;
        }
        let word_at = |w: usize| {
            if allocated {
                self.alloc[w]
            } else {
                !self.alloc[w]
            }
        };
        let mut w = from / WORD_BITS;
        let mut word = word_at(w) & (u64::MAX << (from % WORD_BITS));
        loop {
            if word != 0 {
                return Some(w * WORD_BITS + word.trailing_zeros() as usize);
            }
            w += 1;
            if w == CHUNK_BITMAP_WORDS {
                return None;
            }
            word = word_at(w);
        }
    }
}

impl Default for Chunk {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn test_bit(bits: &Bitmap, page: usize) -> bool {
    assert!(page < CHUNK_PAGES, "page {} outside chunk", page);
    bits[page / WORD_BITS] & (1 << (page % WORD_BITS)) != 0
}

/// Free-run summary of one alloc word, bit 0 being the lowest page
fn word_summary(word: u64) -> Summary {
    if word == 0 {
        return Summary::free(WORD_BITS);
    }
    // Each step shortens every run of free bits by one
    let mut free = !word;
    let mut max = 0;
    while free != 0 {
        free &= free << 1;
        max += 1;
    }
    Summary::new(
        word.trailing_zeros() as usize,
        max,
        word.leading_zeros() as usize,
    )
}

/// Per-word masks covering `range`
fn word_masks(range: BitRange) -> impl Iterator<Item = (usize, u64)> {
    assert!(
        range.fits_chunk(),
        "bit range [{}, +{}) exceeds chunk of {} pages",
        range.start,
        range.len,
        CHUNK_PAGES
    );
    let start = range.start;
    let end = range.end();
    let first = start / WORD_BITS;
    let last = end.div_ceil(WORD_BITS);
    (first..last).filter_map(move |w| {
        let lo = start.max(w * WORD_BITS) - w * WORD_BITS;
        let hi = end.min((w + 1) * WORD_BITS) - w * WORD_BITS;
        if lo >= hi {
            return None;
        }
        let mask = if hi - lo == WORD_BITS {
            u64::MAX
        } else {
            ((1u64 << (hi - lo)) - 1) << lo
        };
        Some((w, mask))
    })
}

fn set_range(bits: &mut Bitmap, range: BitRange) {
    for (w, mask) in word_masks(range) {
        bits[w] |= mask;
    }
}

fn clear_range(bits: &mut Bitmap, range: BitRange) {
    for (w, mask) in word_masks(range) {
        bits[w] &= !mask;
    }
}

fn count_range(bits: &Bitmap, range: BitRange) -> usize {
    word_masks(range)
        .map(|(w, mask)| (bits[w] & mask).count_ones() as usize)
        .sum()
}
