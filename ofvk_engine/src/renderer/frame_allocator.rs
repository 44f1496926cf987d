/// Per-frame linear allocation inside one mapped buffer

use crate::error::{Error, Result};

/// Byte range inside a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRegion<B> {
    pub buffer: B,
    pub offset: u64,
    pub range: u64,
}

/// Bump allocator over `[0, capacity)` with a fixed alignment
///
/// Offsets stay valid until the next [`reset`](Self::reset), which the renderer
/// calls at the start of every frame.
#[derive(Debug, Clone)]
pub struct LinearAllocator {
    capacity: u64,
    alignment: u64,
    head: u64,
}

impl LinearAllocator {
    /// `alignment` of 0 is treated as 1
    pub fn new(capacity: u64, alignment: u64) -> Self {
        Self {
            capacity,
            alignment: alignment.max(1),
            head: 0,
        }
    }

    /// Reserve `size` bytes and return their offset
    ///
    /// # Errors
    ///
    /// `Error::OutOfMemory` if the region does not fit in the remaining capacity.
    pub fn allocate(&mut self, size: u64) -> Result<u64> {
        let offset = align_up(self.head, self.alignment).ok_or(Error::OutOfMemory)?;
        let end = offset.checked_add(size).ok_or(Error::OutOfMemory)?;
        if end > self.capacity {
            return Err(Error::OutOfMemory);
        }
        self.head = end;
        Ok(offset)
    }

    pub fn reset(&mut self) {
        self.head = 0;
    }

    /// Bytes consumed this frame, including alignment padding
    pub fn used(&self) -> u64 {
        self.head
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn alignment(&self) -> u64 {
        self.alignment
    }
}

fn align_up(value: u64, alignment: u64) -> Option<u64> {
    let rem = value % alignment;
    if rem == 0 {
        Some(value)
    } else {
        value.checked_add(alignment - rem)
    }
}

#[cfg(test)]
#[path = "frame_allocator_tests.rs"]
mod tests;
