/*!
 * Allocator Geometry and Limits
 *
 * Centralized location for the page, chunk and summary-tree constants.
 * Every derived value is computed from the shift constants so the geometry
 * stays consistent when one of them changes.
 */

// =============================================================================
// PAGE GEOMETRY
// =============================================================================

/// log2 of the page size
pub const PAGE_SHIFT: u32 = 13;

/// Page size in bytes (8KB)
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;

// =============================================================================
// CHUNK GEOMETRY
// =============================================================================

/// log2 of the number of pages per chunk
pub const LOG_CHUNK_PAGES: u32 = 9;

/// Pages per chunk (512)
/// [PERF] Multiple of 64 so a chunk bitmap is a whole number of u64 words
pub const CHUNK_PAGES: usize = 1 << LOG_CHUNK_PAGES;

/// log2 of the chunk size in bytes
pub const LOG_CHUNK_BYTES: u32 = LOG_CHUNK_PAGES + PAGE_SHIFT;

/// Chunk size in bytes (4MB)
pub const CHUNK_BYTES: usize = 1 << LOG_CHUNK_BYTES;

/// Number of u64 words in one chunk bitmap
pub const CHUNK_BITMAP_WORDS: usize = CHUNK_PAGES / 64;

// =============================================================================
// SUMMARY TREE
// =============================================================================

/// Number of levels in the summary tree, root included
pub const SUMMARY_LEVELS: usize = 5;

/// log2 of the fan-out of every non-root level
pub const SUMMARY_LEVEL_BITS: u32 = 3;

/// Children per summary node below the root (8)
pub const SUMMARY_FANOUT: usize = 1 << SUMMARY_LEVEL_BITS;

/// Pages covered by a single root entry
pub const MAX_PAGES_PER_ROOT: usize =
    CHUNK_PAGES << (SUMMARY_LEVEL_BITS as usize * (SUMMARY_LEVELS - 1));

// =============================================================================
// ADDRESS SPACE
// =============================================================================

/// Default width of the managed address space (256TB)
/// [LINUX-COMPAT] Matches the 48-bit user address space of x86-64 and arm64
pub const DEFAULT_HEAP_ADDR_BITS: u32 = 48;
