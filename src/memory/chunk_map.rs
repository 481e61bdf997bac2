/*!
 * Sparse Chunk Map
 * Owned chunk storage keyed by chunk index
 *
 * Only chunks that have been grown are present. Absent indices are
 * ungoverned address space: nothing can be allocated there and no free run
 * extends across them.
 */

use super::chunk::Chunk;
use super::types::{PageAllocError, PageAllocResult};
use crate::core::types::ChunkIdx;
use ahash::RandomState;
use std::collections::HashMap;

/// Chunk index to chunk storage
#[derive(Debug, Default)]
pub struct ChunkMap {
    chunks: HashMap<ChunkIdx, Box<Chunk>, RandomState>,
}

impl ChunkMap {
    pub fn new() -> Self {
        Self {
            chunks: HashMap::with_hasher(RandomState::new()),
        }
    }

    /// Insert a fresh, fully free chunk
    pub fn insert(&mut self, idx: ChunkIdx) -> PageAllocResult<&mut Chunk> {
        use std::collections::hash_map::Entry;

        match self.chunks.entry(idx) {
            Entry::Occupied(_) => Err(PageAllocError::ChunkAlreadyGrown(idx)),
            Entry::Vacant(slot) => Ok(slot.insert(Box::new(Chunk::new())).as_mut()),
        }
    }

    #[inline]
    pub fn contains(&self, idx: ChunkIdx) -> bool {
        self.chunks.contains_key(&idx)
    }

    #[inline]
    pub fn get(&self, idx: ChunkIdx) -> Option<&Chunk> {
        self.chunks.get(&idx).map(Box::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, idx: ChunkIdx) -> Option<&mut Chunk> {
        self.chunks.get_mut(&idx).map(Box::as_mut)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Unordered iteration over grown chunks
    pub fn iter(&self) -> impl Iterator<Item = (ChunkIdx, &Chunk)> {
        self.chunks.iter().map(|(&idx, chunk)| (idx, chunk.as_ref()))
    }
}
