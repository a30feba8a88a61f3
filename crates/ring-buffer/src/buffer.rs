//! Frame Ring Implementation

use std::collections::VecDeque;
use tracing::trace;

/// Fixed-capacity FIFO of recent frames.
///
/// Pushing at capacity evicts the oldest frame, so the ring always holds the
/// last `capacity` frames in insertion order. A zero-capacity ring accepts
/// pushes and stays empty.
#[derive(Debug, Clone)]
pub struct FrameRing<T> {
    /// Frames, oldest at the front
    frames: VecDeque<T>,
    /// Maximum number of frames held
    capacity: usize,
}

impl<T> FrameRing<T> {
    /// Create a new ring with given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a frame, evicting the oldest one if the ring is full
    pub fn push(&mut self, frame: T) {
        if self.capacity == 0 {
            return;
        }
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
            trace!(capacity = self.capacity, "evicted oldest frame");
        }
        self.frames.push_back(frame);
    }

    /// Get the number of frames currently in the ring
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if ring is empty
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Get the ring capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.frames.len() as f64 / self.capacity as f64
    }

    /// Most recently pushed frame
    pub fn latest(&self) -> Option<&T> {
        self.frames.back()
    }
}

impl<T: Clone> FrameRing<T> {
    /// Copy of the current contents, oldest first. Does not mutate the ring.
    pub fn snapshot(&self) -> Vec<T> {
        self.frames.iter().cloned().collect()
    }
}
