/*!
 * Page Free Tests
 * Freeing single pages and runs that straddle chunk boundaries
 */

use crate::common::{check_page_alloc, new_page_alloc, BASE};
use page_alloc::{page_base, Address, BitRange, ChunkIdx, HeapLayout, PageAlloc, PageAllocError};
use page_alloc::CHUNK_PAGES as CP;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

type Ranges = BTreeMap<ChunkIdx, Vec<BitRange>>;

fn run_free_case(before: Ranges, npages: usize, frees: &[Address], after: Ranges) {
    let mut pages = new_page_alloc(&HeapLayout::new(before));
    for &addr in frees {
        pages.free(addr, npages);
    }
    let want = new_page_alloc(&HeapLayout::new(after));
    check_page_alloc(&want, &pages);
}

#[test]
fn test_free_1() {
    run_free_case(
        chunks! { BASE => [(0, CP)] },
        1,
        &[
            page_base(BASE, 0),
            page_base(BASE, 1),
            page_base(BASE, 2),
            page_base(BASE, 3),
            page_base(BASE, 4),
        ],
        chunks! { BASE => [(5, CP - 5)] },
    );
}

#[test]
fn test_free_many_arena_1() {
    run_free_case(
        chunks! {
            BASE => [(0, CP)],
            BASE + 1 => [(0, CP)],
            BASE + 2 => [(0, CP)],
        },
        1,
        &[
            page_base(BASE, CP / 2),
            page_base(BASE + 1, 0),
            page_base(BASE + 2, CP - 1),
        ],
        chunks! {
            BASE => [(0, CP / 2), (CP / 2 + 1, CP / 2 - 1)],
            BASE + 1 => [(1, CP - 1)],
            BASE + 2 => [(0, CP - 1)],
        },
    );
}

#[test]
fn test_free_2() {
    run_free_case(
        chunks! { BASE => [(0, CP)] },
        2,
        &[
            page_base(BASE, 0),
            page_base(BASE, 2),
            page_base(BASE, 4),
            page_base(BASE, 6),
            page_base(BASE, 8),
        ],
        chunks! { BASE => [(10, CP - 10)] },
    );
}

#[test]
fn test_free_straddle_2() {
    run_free_case(
        chunks! {
            BASE => [(CP - 1, 1)],
            BASE + 1 => [(0, 1)],
        },
        2,
        &[page_base(BASE, CP - 1)],
        chunks! {
            BASE => [],
            BASE + 1 => [],
        },
    );
}

#[test]
fn test_free_5() {
    run_free_case(
        chunks! { BASE => [(0, CP)] },
        5,
        &[
            page_base(BASE, 0),
            page_base(BASE, 5),
            page_base(BASE, 10),
            page_base(BASE, 15),
            page_base(BASE, 20),
        ],
        chunks! { BASE => [(25, CP - 25)] },
    );
}

#[test]
fn test_free_64() {
    run_free_case(
        chunks! { BASE => [(0, CP)] },
        64,
        &[page_base(BASE, 0), page_base(BASE, 64), page_base(BASE, 128)],
        chunks! { BASE => [(192, CP - 192)] },
    );
}

#[test]
fn test_free_65() {
    run_free_case(
        chunks! { BASE => [(0, CP)] },
        65,
        &[page_base(BASE, 0), page_base(BASE, 65), page_base(BASE, 130)],
        chunks! { BASE => [(195, CP - 195)] },
    );
}

#[test]
fn test_free_chunk_pages() {
    run_free_case(
        chunks! { BASE => [(0, CP)] },
        CP,
        &[page_base(BASE, 0)],
        chunks! { BASE => [] },
    );
}

#[test]
fn test_free_straddle_chunk_pages() {
    run_free_case(
        chunks! {
            BASE => [(CP / 2, CP / 2)],
            BASE + 1 => [(0, CP / 2)],
        },
        CP,
        &[page_base(BASE, CP / 2)],
        chunks! {
            BASE => [],
            BASE + 1 => [],
        },
    );
}

#[test]
fn test_free_straddle_chunk_pages_plus_1() {
    run_free_case(
        chunks! {
            BASE => [(0, CP)],
            BASE + 1 => [(0, CP)],
        },
        CP + 1,
        &[page_base(BASE, CP / 2)],
        chunks! {
            BASE => [(0, CP / 2)],
            BASE + 1 => [(CP / 2 + 1, CP / 2 - 1)],
        },
    );
}

#[test]
fn test_free_chunk_pages_times_2() {
    run_free_case(
        chunks! {
            BASE => [(0, CP)],
            BASE + 1 => [(0, CP)],
        },
        CP * 2,
        &[page_base(BASE, 0)],
        chunks! {
            BASE => [],
            BASE + 1 => [],
        },
    );
}

#[test]
fn test_free_straddle_chunk_pages_times_2() {
    run_free_case(
        chunks! {
            BASE => [(0, CP)],
            BASE + 1 => [(0, CP)],
            BASE + 2 => [(0, CP)],
        },
        CP * 2,
        &[page_base(BASE, CP / 2)],
        chunks! {
            BASE => [(0, CP / 2)],
            BASE + 1 => [],
            BASE + 2 => [(CP / 2, CP / 2)],
        },
    );
}

#[test]
fn test_free_chunk_pages_times_7_plus_5() {
    run_free_case(
        chunks! {
            BASE => [(0, CP)],
            BASE + 1 => [(0, CP)],
            BASE + 2 => [(0, CP)],
            BASE + 3 => [(0, CP)],
            BASE + 4 => [(0, CP)],
            BASE + 5 => [(0, CP)],
            BASE + 6 => [(0, CP)],
            BASE + 7 => [(0, CP)],
        },
        CP * 7 + 5,
        &[page_base(BASE, 0)],
        chunks! {
            BASE => [],
            BASE + 1 => [],
            BASE + 2 => [],
            BASE + 3 => [],
            BASE + 4 => [],
            BASE + 5 => [],
            BASE + 6 => [],
            BASE + 7 => [(5, CP - 5)],
        },
    );
}

#[test]
fn test_free_keeps_scavenged_bits() {
    let layout = HeapLayout::new(chunks! { BASE => [(0, CP)] })
        .with_scavenged(chunks! { BASE => [(10, 20)] });
    let mut pages = new_page_alloc(&layout);
    let before = pages.chunk_bits(BASE).unwrap().scavenged;

    pages.free(page_base(BASE, 0), CP);
    assert_eq!(pages.chunk_bits(BASE).unwrap().scavenged, before);

    // The scavenged run is reported again on reuse
    let a = pages.alloc(CP).unwrap();
    assert_eq!(a.scavenged_pages(), 20);
}

#[test]
fn test_free_coalesces_across_chunks() {
    let mut pages = new_page_alloc(&HeapLayout::new(chunks! {
        BASE => [(0, CP)],
        BASE + 1 => [(0, CP)],
    }));
    assert_eq!(pages.alloc(1), None);

    pages.free(page_base(BASE, CP - 3), 3);
    pages.free(page_base(BASE + 1, 0), 3);
    assert_eq!(pages.stats().largest_free_run, 6);

    let a = pages.alloc(6).unwrap();
    assert_eq!(a.base, page_base(BASE, CP - 3));
}

#[test]
fn test_try_free_unallocated_fails_without_changes() {
    let mut pages = new_page_alloc(&HeapLayout::new(chunks! {
        BASE => [(0, 10)],
    }));
    let before = pages.chunk_bits(BASE);

    assert_eq!(
        pages.try_free(page_base(BASE, 5), 10),
        Err(PageAllocError::NotAllocated {
            addr: page_base(BASE, 5),
            npages: 10
        })
    );
    assert_eq!(pages.chunk_bits(BASE), before);
}

#[test]
fn test_try_free_outside_grown_chunks() {
    let mut pages = new_page_alloc(&HeapLayout::new(chunks! {
        BASE => [(0, CP)],
    }));
    assert_eq!(
        pages.try_free(page_base(BASE, CP - 1), 2),
        Err(PageAllocError::NotGrown(page_base(BASE + 1, 0)))
    );
    assert_eq!(
        pages.try_free(page_base(BASE, 0) + 1, 1),
        Err(PageAllocError::MisalignedAddress(page_base(BASE, 0) + 1))
    );
    assert_eq!(pages.try_free(page_base(BASE, 0), 0), Err(PageAllocError::ZeroPages));
}

#[test]
#[should_panic(expected = "not fully allocated")]
fn test_double_free_panics() {
    let mut pages = PageAlloc::new();
    pages.grow(BASE, &[], &[]);
    let a = pages.alloc(4).unwrap();
    pages.free(a.base, 4);
    pages.free(a.base, 4);
}

#[test]
fn test_try_free_oversized_run_fails_without_changes() {
    let mut pages = new_page_alloc(&HeapLayout::new(chunks! {
        BASE => [(0, CP)],
    }));
    let before = pages.chunk_bits(BASE);
    let addr = page_base(BASE, 0);

    // The end page of the run overflows
    assert_eq!(
        pages.try_free(addr, usize::MAX),
        Err(PageAllocError::NotAllocated {
            addr,
            npages: usize::MAX
        })
    );
    // The end page fits, but the run leaves the grown chunks
    assert_eq!(
        pages.try_free(addr, usize::MAX / 2),
        Err(PageAllocError::NotGrown(page_base(BASE + 1, 0)))
    );
    assert_eq!(pages.chunk_bits(BASE), before);
    pages.check_summaries().unwrap();
}
