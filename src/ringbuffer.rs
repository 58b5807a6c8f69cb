//! Ringbuffer module for rolling chart history.
//!
//! This module provides a fixed-capacity circular buffer that keeps the most
//! recent entries in arrival order with predictable memory usage.

use std::num::NonZeroUsize;

/// A circular buffer for storing entries with fixed capacity.
///
/// Once full, every push overwrites the oldest entry (FIFO eviction).
#[derive(Debug, Clone)]
pub struct Ringbuffer<T> {
    entries: Vec<T>,
    capacity: usize,
    write_index: usize,
}

impl<T: Clone> Ringbuffer<T> {
    /// Creates a new ringbuffer with the specified capacity.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity.get()),
            capacity: capacity.get(),
            write_index: 0,
        }
    }

    /// Pushes a new entry into the ringbuffer.
    ///
    /// If the buffer is full, the oldest entry will be overwritten.
    pub fn push(&mut self, entry: T) {
        if self.entries.len() < self.capacity {
            self.entries.push(entry);
        } else {
            self.entries[self.write_index] = entry;
        }
        self.write_index = (self.write_index + 1) % self.capacity;
    }

    /// Returns all entries in chronological order (oldest to newest).
    pub fn get_history(&self) -> Vec<T> {
        if self.entries.len() < self.capacity {
            // Not yet wrapped, storage order is arrival order
            return self.entries.clone();
        }

        let mut result = Vec::with_capacity(self.capacity);
        result.extend_from_slice(&self.entries[self.write_index..]);
        result.extend_from_slice(&self.entries[..self.write_index]);
        result
    }

    /// Returns the most recently pushed entry.
    pub fn last(&self) -> Option<&T> {
        if self.entries.is_empty() {
            return None;
        }
        let index = (self.write_index + self.capacity - 1) % self.capacity;
        self.entries.get(index)
    }

    /// Returns the current number of entries in the buffer.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the maximum capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true once the buffer has reached its capacity.
    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(capacity: usize) -> Ringbuffer<i64> {
        Ringbuffer::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_ringbuffer_push_and_read() {
        let mut rb = ring(3);

        assert_eq!(rb.len(), 0);
        assert_eq!(rb.capacity(), 3);

        rb.push(1000);

        assert_eq!(rb.len(), 1);
        assert_eq!(rb.get_history(), vec![1000]);
        assert_eq!(rb.last(), Some(&1000));
    }

    #[test]
    fn test_ringbuffer_chronological_order() {
        let mut rb = ring(3);

        for i in 0..3 {
            rb.push(1000 + i * 100);
        }

        assert!(rb.is_full());
        assert_eq!(rb.get_history(), vec![1000, 1100, 1200]);
    }

    #[test]
    fn test_ringbuffer_wraparound() {
        let mut rb = ring(3);

        // Push 5 entries (will wrap around)
        for i in 0..5 {
            rb.push(1000 + i * 100);
        }

        // Should only have the last 3 entries in chronological order
        assert_eq!(rb.get_history(), vec![1200, 1300, 1400]);
        assert_eq!(rb.last(), Some(&1400));
    }

    #[test]
    fn test_ringbuffer_capacity_one() {
        let mut rb = ring(1);
        rb.push(1);
        rb.push(2);
        assert_eq!(rb.get_history(), vec![2]);
        assert_eq!(rb.last(), Some(&2));
    }

    #[test]
    fn test_ringbuffer_empty() {
        let mut rb = ring(10);
        assert!(rb.is_empty());
        assert!(rb.last().is_none());
        assert!(rb.get_history().is_empty());

        rb.push(8);
        assert!(!rb.is_empty());
        assert_eq!(rb.get_history(), vec![8]);
    }
}
