//! Bounded ring buffer for voltage samples and rotor angles.

use std::collections::VecDeque;

/// Fixed-capacity ring of `f64` samples; the oldest samples are evicted first.
///
/// The sample and angle buffers are two instances appended in lockstep, so
/// index `i` of each refers to the same instant.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: VecDeque<f64>,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a batch, evicting from the front once full.
    pub fn extend(&mut self, values: &[f64]) {
        for &v in values {
            if self.data.len() == self.capacity {
                self.data.pop_front();
            }
            self.data.push_back(v);
        }
    }

    /// Copy the current contents out, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }

    /// Change capacity, discarding all contents. A capacity change breaks the
    /// index alignment with the sibling buffer, so both are recreated.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.data = VecDeque::with_capacity(capacity);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ============================================================================
// Tests
// ============================================================================
