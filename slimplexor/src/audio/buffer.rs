//! Transfer buffer
//!
//! Holds up to one period of target-format frames waiting for delivery.
//!
//! **Invariants:**
//! - Frames `[0, filled)` are well-formed target frames
//! - Bytes past the fill cursor are stale and never handed to a sink
//! - Capacity is fixed at allocation; appending past it is a caller bug
//!
//! All access is frame-indexed with a fixed stride of `frame_size` bytes.

use crate::error::{Error, Result};

/// Fixed-capacity byte buffer of target frames with a fill cursor
#[derive(Debug)]
pub struct TransferBuffer {
    bytes: Vec<u8>,
    frame_size: usize,
    capacity_frames: usize,
    filled: usize,
}

impl TransferBuffer {
    /// Allocate a zeroed buffer for `capacity_frames` frames of `frame_size` bytes
    ///
    /// Fails with [`Error::AllocationFailure`] instead of aborting when the
    /// memory cannot be reserved.
    pub fn allocate(capacity_frames: usize, frame_size: usize) -> Result<Self> {
        let bytes_needed = capacity_frames
            .checked_mul(frame_size)
            .ok_or(Error::AllocationFailure { bytes: usize::MAX })?;

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(bytes_needed)
            .map_err(|_| Error::AllocationFailure {
                bytes: bytes_needed,
            })?;
        bytes.resize(bytes_needed, 0);

        Ok(Self {
            bytes,
            frame_size,
            capacity_frames,
            filled: 0,
        })
    }

    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Number of well-formed frames resident (the fill cursor)
    pub fn filled_frames(&self) -> usize {
        self.filled
    }

    pub fn free_frames(&self) -> usize {
        self.capacity_frames - self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn is_full(&self) -> bool {
        self.filled == self.capacity_frames
    }

    /// Bytes of frame `index`, resident or not
    ///
    /// # Panics
    /// Panics if `index >= capacity_frames`.
    pub fn frame(&self, index: usize) -> &[u8] {
        assert!(index < self.capacity_frames, "frame index {} out of range", index);
        let start = index * self.frame_size;
        &self.bytes[start..start + self.frame_size]
    }

    /// Mutable bytes of frame `index`
    pub fn frame_mut(&mut self, index: usize) -> &mut [u8] {
        assert!(index < self.capacity_frames, "frame index {} out of range", index);
        let start = index * self.frame_size;
        &mut self.bytes[start..start + self.frame_size]
    }

    /// The resident frames as one contiguous byte slice
    pub fn filled_bytes(&self) -> &[u8] {
        &self.bytes[..self.filled * self.frame_size]
    }

    /// Mutable view of the `count` frames following the fill cursor
    pub(crate) fn spare_mut(&mut self, count: usize) -> &mut [u8] {
        assert!(
            count <= self.free_frames(),
            "cannot reserve {} frames, only {} free",
            count,
            self.free_frames()
        );
        let start = self.filled * self.frame_size;
        &mut self.bytes[start..start + count * self.frame_size]
    }

    /// Mark `count` frames after the fill cursor as resident
    pub(crate) fn commit(&mut self, count: usize) {
        assert!(count <= self.free_frames(), "commit past capacity");
        self.filled += count;
    }

    /// Drop the first `written` frames and move the rest to the front
    ///
    /// `written` is clamped to the fill cursor.
    pub fn consume(&mut self, written: usize) {
        let written = written.min(self.filled);
        if written == 0 {
            return;
        }

        let remaining = self.filled - written;
        if remaining > 0 {
            let src = written * self.frame_size;
            self.bytes
                .copy_within(src..src + remaining * self.frame_size, 0);
        }
        self.filled = remaining;
    }

    /// Replace the whole buffer with one period of marker-only frames
    ///
    /// Every sample byte becomes zero and the last byte of every frame
    /// becomes `marker`. The buffer is full afterwards.
    pub fn fill_with_marker(&mut self, marker: u8) {
        self.bytes.fill(0);
        if self.frame_size > 0 {
            for frame in self.bytes.chunks_exact_mut(self.frame_size) {
                frame[self.frame_size - 1] = marker;
            }
        }
        self.filled = self.capacity_frames;
    }

    /// Forget all resident frames
    pub fn clear(&mut self) {
        self.filled = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(capacity: usize, frame_size: usize, count: usize) -> TransferBuffer {
        let mut buffer = TransferBuffer::allocate(capacity, frame_size).unwrap();
        for (i, byte) in buffer.spare_mut(count).iter_mut().enumerate() {
            *byte = i as u8;
        }
        buffer.commit(count);
        buffer
    }

    #[test]
    fn test_allocate_empty() {
        let buffer = TransferBuffer::allocate(4, 12).unwrap();
        assert_eq!(buffer.capacity_frames(), 4);
        assert_eq!(buffer.frame_size(), 12);
        assert!(buffer.is_empty());
        assert_eq!(buffer.free_frames(), 4);
        assert!(buffer.filled_bytes().is_empty());
    }

    #[test]
    fn test_allocation_overflow_reported() {
        let result = TransferBuffer::allocate(usize::MAX, 16);
        assert!(matches!(result, Err(Error::AllocationFailure { .. })));
    }

    #[test]
    fn test_partial_consume_moves_tail_to_front() {
        let mut buffer = numbered(4, 3, 4);
        let tail: Vec<u8> = buffer.filled_bytes()[3 * 3..].to_vec();

        buffer.consume(3);

        assert_eq!(buffer.filled_frames(), 1);
        assert_eq!(buffer.frame(0), tail.as_slice());
    }

    #[test]
    fn test_overlapping_consume() {
        let mut buffer = numbered(5, 2, 5);
        let expected: Vec<u8> = buffer.filled_bytes()[2..].to_vec();

        buffer.consume(1);

        assert_eq!(buffer.filled_frames(), 4);
        assert_eq!(buffer.filled_bytes(), expected.as_slice());
    }

    #[test]
    fn test_consume_clamped_to_filled() {
        let mut buffer = numbered(4, 2, 2);
        buffer.consume(10);
        assert!(buffer.is_empty());
        buffer.consume(0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fill_with_marker() {
        let mut buffer = numbered(3, 4, 2);
        buffer.fill_with_marker(2);

        assert!(buffer.is_full());
        for i in 0..3 {
            assert_eq!(buffer.frame(i), &[0, 0, 0, 2]);
        }
    }

    #[test]
    #[should_panic(expected = "cannot reserve")]
    fn test_reserve_past_capacity_panics() {
        let mut buffer = TransferBuffer::allocate(2, 4).unwrap();
        buffer.spare_mut(3);
    }
}
