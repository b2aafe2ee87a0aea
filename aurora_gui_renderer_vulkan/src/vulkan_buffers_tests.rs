//! Unit tests for buffer capacity policy (no GPU required)

use crate::vulkan_buffers::grown_capacity;

#[test]
fn test_capacity_rounds_up_to_granularity() {
    assert_eq!(grown_capacity(1), 4096);
    assert_eq!(grown_capacity(4096), 4096);
    assert_eq!(grown_capacity(4097), 8192);
    assert_eq!(grown_capacity(100_000), 102_400);
}

#[test]
fn test_capacity_never_zero() {
    assert_eq!(grown_capacity(0), 4096);
}

#[test]
fn test_capacity_is_monotonic() {
    let mut last = 0;
    for required in (0..64 * 1024).step_by(777) {
        let capacity = grown_capacity(required);
        assert!(capacity >= required);
        assert!(capacity >= last);
        last = capacity;
    }
}
