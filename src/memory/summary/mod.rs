/*!
 * Free-Run Summaries
 *
 * A [`Summary`] describes the free pages of a region with three counts:
 * - `start`: free pages from the first page up to the first allocated page
 * - `end`: free pages from the last page back to the last allocated page
 * - `max`: the longest free run anywhere in the region
 *
 * Two adjacent regions compose into the summary of their union, which lets
 * the [`SummaryIndex`] keep one summary per tree node and rebuild ancestors
 * from their children after every bitmap change.
 */

mod index;

pub use index::SummaryIndex;

use serde::{Deserialize, Serialize};

/// Leading / longest / trailing free page counts of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Summary {
    pub start: usize,
    pub max: usize,
    pub end: usize,
}

impl Summary {
    /// Summary of a fully allocated (or ungoverned) region
    pub const EMPTY: Summary = Summary::new(0, 0, 0);

    pub const fn new(start: usize, max: usize, end: usize) -> Self {
        Self { start, max, end }
    }

    /// Summary of a fully free region of `pages` pages
    pub const fn free(pages: usize) -> Self {
        Self::new(pages, pages, pages)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.max == 0
    }

    /// Whether a region of `pages` pages with this summary is entirely free
    #[inline]
    pub const fn is_free(&self, pages: usize) -> bool {
        self.start == pages
    }

    /// Compose `self` (a region of `left_pages`) with the region of
    /// `right_pages` immediately to its right.
    pub fn combine(self, right: Summary, left_pages: usize, right_pages: usize) -> Summary {
        let start = if self.start < left_pages {
            self.start
        } else {
            left_pages + right.start
        };
        let end = if right.end < right_pages {
            right.end
        } else {
            right_pages + self.end
        };
        let max = self.max.max(right.max).max(self.end + right.start);
        Summary::new(start, max, end)
    }

    /// Compose an ordered run of equally sized child summaries.
    ///
    /// An empty sequence yields [`Summary::EMPTY`].
    pub fn merge<I>(children: I, child_pages: usize) -> Summary
    where
        I: IntoIterator<Item = Summary>,
    {
        let mut iter = children.into_iter();
        let Some(first) = iter.next() else {
            return Summary::EMPTY;
        };
        let (merged, _) = iter.fold((first, child_pages), |(acc, pages), child| {
            (acc.combine(child, pages, child_pages), pages + child_pages)
        });
        merged
    }
}
