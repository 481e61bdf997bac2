/*!
 * Memory Module
 * Page allocation over a sparse chunked address space
 */

pub mod chunk;
pub mod chunk_map;
pub mod config;
pub mod page_alloc;
pub mod summary;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use chunk::Chunk;
pub use chunk_map::ChunkMap;
pub use config::PageAllocConfig;
pub use page_alloc::PageAlloc;
pub use summary::{Summary, SummaryIndex};
pub use traits::*;
pub use types::*;
