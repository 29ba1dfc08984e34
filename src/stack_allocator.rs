//! Stack Allocator
//!
//! Typed LIFO scratch buffer for per-step transient arrays (island velocity
//! and position buffers). Blocks are handed out as index ranges into one
//! growable backing `Vec` and must be released in exact reverse order of
//! allocation. Out-of-order release is a programming error and is
//! debug-asserted.
//!
//! The backing storage is never shrunk, so after the first few steps a
//! world's scratch memory stops allocating altogether.

use core::ops::Range;

/// A block handed out by [`StackAllocator::alloc`].
///
/// Deliberately not `Clone`: a block is released exactly once.
#[derive(Debug)]
pub struct StackBlock {
    start: usize,
    len: usize,
}

impl StackBlock {
    /// Number of elements in the block
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the block holds no elements
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

/// LIFO allocator over `T`.
#[derive(Debug)]
pub struct StackAllocator<T> {
    data: Vec<T>,
    /// Current top of stack (elements in use)
    top: usize,
    /// Start offsets of live blocks, innermost last
    entries: Vec<usize>,
    /// High-water mark in elements
    max_allocation: usize,
}

impl<T: Copy + Default> StackAllocator<T> {
    /// Create an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            top: 0,
            entries: Vec::new(),
            max_allocation: 0,
        }
    }

    /// Create an allocator with pre-reserved capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity],
            top: 0,
            entries: Vec::new(),
            max_allocation: 0,
        }
    }

    /// Allocate `count` default-initialised elements on top of the stack.
    pub fn alloc(&mut self, count: usize) -> StackBlock {
        let start = self.top;
        let end = start + count;
        if self.data.len() < end {
            self.data.resize(end, T::default());
        }
        for slot in &mut self.data[start..end] {
            *slot = T::default();
        }
        self.top = end;
        self.entries.push(start);
        self.max_allocation = self.max_allocation.max(end);
        StackBlock { start, len: count }
    }

    /// Release a block. Must be the most recently allocated live block.
    pub fn free(&mut self, block: StackBlock) {
        let last = self.entries.pop();
        debug_assert_eq!(
            last,
            Some(block.start),
            "stack allocator blocks must be freed in LIFO order"
        );
        debug_assert_eq!(block.start + block.len, self.top);
        self.top = block.start;
    }

    /// Shared view of a live block.
    #[inline]
    #[must_use]
    pub fn get(&self, block: &StackBlock) -> &[T] {
        &self.data[block.range()]
    }

    /// Mutable view of a live block.
    #[inline]
    pub fn get_mut(&mut self, block: &StackBlock) -> &mut [T] {
        let range = block.range();
        &mut self.data[range]
    }

    /// Number of live blocks
    #[inline]
    #[must_use]
    pub fn live_blocks(&self) -> usize {
        self.entries.len()
    }

    /// Elements currently in use
    #[inline]
    #[must_use]
    pub fn allocation(&self) -> usize {
        self.top
    }

    /// Largest number of elements ever in use at once
    #[inline]
    #[must_use]
    pub fn max_allocation(&self) -> usize {
        self.max_allocation
    }
}

impl<T: Copy + Default> Default for StackAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_free_lifo() {
        let mut stack: StackAllocator<f32> = StackAllocator::new();
        let a = stack.alloc(4);
        let b = stack.alloc(3);
        assert_eq!(stack.allocation(), 7);
        assert_eq!(stack.live_blocks(), 2);

        stack.get_mut(&a)[0] = 1.0;
        stack.get_mut(&b)[2] = 2.0;
        assert_eq!(stack.get(&a)[0], 1.0);
        assert_eq!(stack.get(&b)[2], 2.0);

        stack.free(b);
        stack.free(a);
        assert_eq!(stack.allocation(), 0);
        assert_eq!(stack.max_allocation(), 7);
    }

    #[test]
    fn test_reused_memory_is_reset() {
        let mut stack: StackAllocator<i32> = StackAllocator::with_capacity(8);
        let a = stack.alloc(2);
        stack.get_mut(&a)[1] = 42;
        stack.free(a);
        let b = stack.alloc(2);
        assert_eq!(stack.get(&b), &[0, 0], "reallocated block must be zeroed");
        stack.free(b);
    }

    #[test]
    fn test_empty_block() {
        let mut stack: StackAllocator<u8> = StackAllocator::default();
        let a = stack.alloc(0);
        assert!(a.is_empty());
        assert!(stack.get(&a).is_empty());
        stack.free(a);
        assert_eq!(stack.live_blocks(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "LIFO")]
    fn test_out_of_order_free_panics() {
        let mut stack: StackAllocator<f32> = StackAllocator::new();
        let a = stack.alloc(1);
        let _b = stack.alloc(1);
        stack.free(a);
    }
}
