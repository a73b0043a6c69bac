//! Decoded chunk caching for external raster sources

use std::sync::Arc;
use dashmap::DashMap;
use crossbeam::queue::SegQueue;

/// Bounded cache of decoded TIFF strips or tiles, keyed by
/// (sample plane, chunk index). Oldest insertions are evicted first.
pub struct ChunkCache {
    chunks: DashMap<(usize, usize), Arc<Vec<u8>>>,
    order: SegQueue<(usize, usize)>,
    capacity: usize,
}

impl ChunkCache {
    /// Creates a cache; a capacity of 0 disables caching
    pub fn new(capacity: usize) -> Self {
        Self {
            chunks: DashMap::new(),
            order: SegQueue::new(),
            capacity,
        }
    }

    pub fn get(&self, plane: usize, chunk: usize) -> Option<Arc<Vec<u8>>> {
        self.chunks.get(&(plane, chunk)).map(|entry| Arc::clone(entry.value()))
    }

    /// Stores a decoded chunk and returns the shared handle
    pub fn put(&self, plane: usize, chunk: usize, data: Vec<u8>) -> Arc<Vec<u8>> {
        let data = Arc::new(data);
        if self.capacity == 0 {
            return data;
        }

        while self.chunks.len() >= self.capacity {
            match self.order.pop() {
                Some(old) => {
                    self.chunks.remove(&old);
                }
                None => break,
            }
        }

        if self.chunks.insert((plane, chunk), Arc::clone(&data)).is_none() {
            self.order.push((plane, chunk));
        }
        data
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn clear(&self) {
        self.chunks.clear();
        while self.order.pop().is_some() {}
    }
}

impl Default for ChunkCache {
    fn default() -> Self {
        Self::new(64)
    }
}
