//! Assertion utilities for testing.
//!
//! This module provides helper functions for making assertions in tests,
//! particularly for floating-point values read back from JSON.

/// Default epsilon for floating-point comparisons
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Assert that two floating-point values are approximately equal.
///
/// # Panics
///
/// Panics if the absolute difference between `actual` and `expected` is greater than `epsilon`.
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: Option<f64>) {
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);
    let diff = (actual - expected).abs();

    assert!(
        diff <= epsilon,
        "Values not approximately equal: actual = {}, expected = {}, diff = {}, epsilon = {}",
        actual,
        expected,
        diff,
        epsilon
    );
}

/// Read a JSON number, panicking with the offending value otherwise
pub fn as_f64(value: &serde_json::Value) -> f64 {
    value
        .as_f64()
        .unwrap_or_else(|| panic!("Expected a number, got {}", value))
}

/// Assert the standard success envelope and return its `data`
pub fn assert_success(body: &serde_json::Value) -> &serde_json::Value {
    assert_eq!(body["status"], "success", "Unexpected body: {}", body);
    &body["data"]
}

/// Assert the standard error envelope
pub fn assert_error(body: &serde_json::Value) {
    assert_eq!(body["status"], "error", "Unexpected body: {}", body);
    assert!(body["message"].is_string(), "Missing message: {}", body);
    assert!(body["request_id"].is_string(), "Missing request_id: {}", body);
}

/// Assert that a list of values is non-decreasing
pub fn assert_non_decreasing(values: &[f64]) {
    for (i, pair) in values.windows(2).enumerate() {
        assert!(
            pair[0] <= pair[1],
            "Values decrease at index {}: {} > {}",
            i,
            pair[0],
            pair[1]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(1.0, 1.0, None);
        assert_approx_eq(1.0, 1.001, Some(0.01));
    }

    #[test]
    fn test_assert_non_decreasing() {
        assert_non_decreasing(&[0.0, 1.0, 1.0, 2.5]);
        assert_non_decreasing(&[]);
    }
}
