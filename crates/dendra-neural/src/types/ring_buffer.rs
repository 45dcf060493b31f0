// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Delivery ring buffer
//!
//! Events are written at an offset (in steps) from the buffer origin and read
//! back once at the same lag. Reading clears the slot. The origin moves
//! forward when the owning neuron finishes a slice.

use super::error::{DendraError, Result};

/// Fixed-size ring of per-step input values
#[derive(Debug, Clone, PartialEq)]
pub struct RingBuffer {
    slots: Vec<f64>,
    origin: usize,
}

impl RingBuffer {
    /// Create a buffer with `slots` steps of horizon (at least one)
    pub fn new(slots: usize) -> Self {
        Self {
            slots: vec![0.0; slots.max(1)],
            origin: 0,
        }
    }

    /// Number of steps an event can be scheduled ahead
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|&value| value == 0.0)
    }

    /// Accumulate `value` into the slot `offset` steps after the origin
    pub fn add_value(&mut self, offset: usize, value: f64) -> Result<()> {
        if offset >= self.slots.len() {
            return Err(DendraError::DeliveryOutOfRange {
                offset,
                slots: self.slots.len(),
            });
        }
        let index = self.index(offset);
        self.slots[index] += value;
        Ok(())
    }

    /// Read and clear the slot at `lag`
    #[inline]
    pub fn get_value(&mut self, lag: usize) -> f64 {
        debug_assert!(lag < self.slots.len(), "lag {} beyond ring buffer", lag);
        let index = self.index(lag);
        core::mem::take(&mut self.slots[index])
    }

    /// Read the slot at `lag` without clearing it
    pub fn peek(&self, lag: usize) -> f64 {
        self.slots[self.index(lag)]
    }

    /// Move the origin forward, discarding anything left in the skipped slots
    pub fn advance(&mut self, steps: usize) {
        for lag in 0..steps.min(self.slots.len()) {
            let index = self.index(lag);
            self.slots[index] = 0.0;
        }
        self.origin = (self.origin + steps) % self.slots.len();
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = 0.0);
        self.origin = 0;
    }

    #[inline]
    fn index(&self, lag: usize) -> usize {
        (self.origin + lag) % self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_read_clears_slot() {
        let mut buffer = RingBuffer::new(4);
        buffer.add_value(2, 1.5).unwrap();
        buffer.add_value(2, 0.5).unwrap();

        assert_eq!(buffer.get_value(0), 0.0);
        assert_eq!(buffer.get_value(2), 2.0);
        assert_eq!(buffer.get_value(2), 0.0); // Read clears
    }

    #[test]
    fn test_offset_beyond_horizon_rejected() {
        let mut buffer = RingBuffer::new(3);
        let err = buffer.add_value(3, 1.0).unwrap_err();
        assert_eq!(err, DendraError::DeliveryOutOfRange { offset: 3, slots: 3 });
    }

    #[test]
    fn test_advance_moves_origin() {
        let mut buffer = RingBuffer::new(4);
        buffer.add_value(3, 7.0).unwrap();
        buffer.advance(2);

        // Scheduled 3 steps ahead of the old origin = 1 step ahead of the new one
        assert_eq!(buffer.peek(1), 7.0);
        assert_eq!(buffer.get_value(1), 7.0);
    }

    #[test]
    fn test_advance_discards_unread_slots() {
        let mut buffer = RingBuffer::new(4);
        buffer.add_value(0, 1.0).unwrap();
        buffer.advance(4);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_zero_size_is_promoted() {
        let buffer = RingBuffer::new(0);
        assert_eq!(buffer.len(), 1);
    }
}
