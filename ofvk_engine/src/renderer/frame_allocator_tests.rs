//! Unit tests for frame_allocator.rs

use crate::error::Error;
use crate::renderer::LinearAllocator;

#[test]
fn test_allocations_are_aligned() {
    let mut allocator = LinearAllocator::new(1024, 256);
    assert_eq!(allocator.allocate(192).unwrap(), 0);
    assert_eq!(allocator.allocate(16).unwrap(), 256);
    assert_eq!(allocator.allocate(1).unwrap(), 512);
    assert_eq!(allocator.used(), 513);
}

#[test]
fn test_full_allocator_reports_out_of_memory() {
    let mut allocator = LinearAllocator::new(512, 256);
    allocator.allocate(256).unwrap();
    allocator.allocate(256).unwrap();
    assert_eq!(allocator.allocate(1), Err(Error::OutOfMemory));
    // Failed allocation leaves the head untouched
    assert_eq!(allocator.used(), 512);
}

#[test]
fn test_exact_fit() {
    let mut allocator = LinearAllocator::new(256, 64);
    assert_eq!(allocator.allocate(256).unwrap(), 0);
    assert_eq!(allocator.allocate(0).unwrap(), 256);
}

#[test]
fn test_reset_rewinds() {
    let mut allocator = LinearAllocator::new(512, 256);
    allocator.allocate(300).unwrap();
    allocator.reset();
    assert_eq!(allocator.used(), 0);
    assert_eq!(allocator.allocate(64).unwrap(), 0);
}

#[test]
fn test_overflow_is_out_of_memory() {
    let mut allocator = LinearAllocator::new(u64::MAX, 1);
    allocator.allocate(16).unwrap();
    assert_eq!(allocator.allocate(u64::MAX), Err(Error::OutOfMemory));
}

#[test]
fn test_zero_alignment_is_one() {
    let mut allocator = LinearAllocator::new(16, 0);
    assert_eq!(allocator.alignment(), 1);
    assert_eq!(allocator.allocate(3).unwrap(), 0);
    assert_eq!(allocator.allocate(3).unwrap(), 3);
    assert_eq!(allocator.capacity(), 16);
}
