// 🌀 Fibonacci Math - Sequence, retracement/extension levels, golden ratio score
//
// Pure functions. Everything else in the crate scores through here.

use crate::policy::{EXTENSION_FRACTIONS, GOLDEN_RATIO, RETRACEMENT_FRACTIONS};
use serde::{Deserialize, Serialize};

// ============================================================================
// SEQUENCE
// ============================================================================

/// Precomputed head of the sequence (indices 0..=20)
const FIBONACCI_TABLE: [u64; 21] = [
    0, 1, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233, 377, 610, 987, 1597, 2584, 4181, 6765,
];

/// Largest index whose value fits in a u64; higher indices saturate
pub const MAX_EXACT_INDEX: usize = 93;

/// Fibonacci number at a signed index. Negative indices return 0.
pub fn fibonacci(index: i64) -> u64 {
    if index < 0 {
        return 0;
    }
    fibonacci_u(index as usize)
}

/// Fibonacci number at an unsigned index
///
/// Table lookup for small indices, otherwise iterates forward from the
/// last two table entries. Saturates at u64::MAX past MAX_EXACT_INDEX.
pub fn fibonacci_u(index: usize) -> u64 {
    if let Some(value) = FIBONACCI_TABLE.get(index) {
        return *value;
    }
    if index > MAX_EXACT_INDEX {
        return u64::MAX;
    }

    let last = FIBONACCI_TABLE.len() - 1;
    let mut prev = FIBONACCI_TABLE[last - 1];
    let mut current = FIBONACCI_TABLE[last];
    for _ in last..index {
        let next = prev + current;
        prev = current;
        current = next;
    }
    current
}

/// Largest Fibonacci number <= value, with its sequence index.
///
/// Values below 1 map to (0, 0). Where the value 1 appears twice the
/// higher index (2) is returned.
pub fn largest_fibonacci_at_most(value: f64) -> (u64, usize) {
    if value.is_nan() || value < 1.0 {
        return (0, 0);
    }

    let mut index = 2;
    while index < MAX_EXACT_INDEX && fibonacci_u(index + 1) as f64 <= value {
        index += 1;
    }
    (fibonacci_u(index), index)
}

// ============================================================================
// LEVELS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevel {
    /// Fraction applied (0.618 for the 61.8% level)
    pub fraction: f64,

    /// Resulting level
    pub value: f64,
}

impl FibonacciLevel {
    /// Fraction expressed as a percentage (61.8 for 0.618)
    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }
}

/// Seven retracement levels between `high` and `low`
///
/// `level = high - (high - low) * fraction`. Callers pass high >= low.
pub fn retracement_levels(high: f64, low: f64) -> Vec<FibonacciLevel> {
    let range = high - low;
    RETRACEMENT_FRACTIONS
        .iter()
        .map(|&fraction| FibonacciLevel {
            fraction,
            value: high - range * fraction,
        })
        .collect()
}

/// Four extension levels projecting beyond `end`
pub fn extension_levels(start: f64, end: f64) -> Vec<FibonacciLevel> {
    let range = end - start;
    EXTENSION_FRACTIONS
        .iter()
        .map(|&fraction| FibonacciLevel {
            fraction,
            value: end + range * fraction,
        })
        .collect()
}

/// Completion ratio scaled by the golden ratio and capped at it
pub fn golden_ratio_score(positive: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    ((positive / total) * GOLDEN_RATIO).min(GOLDEN_RATIO)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_sequence() {
        let expected = [0, 1, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233, 377, 610, 987];
        for (i, value) in expected.iter().enumerate() {
            assert_eq!(fibonacci(i as i64), *value);
        }
    }

    #[test]
    fn test_recurrence_beyond_table() {
        for n in 2..=MAX_EXACT_INDEX {
            assert_eq!(fibonacci_u(n), fibonacci_u(n - 1) + fibonacci_u(n - 2));
        }
        assert_eq!(fibonacci(30), 832_040);
        assert_eq!(fibonacci_u(93), 12_200_160_415_121_876_738);
    }

    #[test]
    fn test_negative_and_saturating_indices() {
        assert_eq!(fibonacci(-1), 0);
        assert_eq!(fibonacci(-100), 0);
        assert_eq!(fibonacci_u(MAX_EXACT_INDEX + 1), u64::MAX);
    }

    #[test]
    fn test_largest_fibonacci_at_most() {
        assert_eq!(largest_fibonacci_at_most(0.5), (0, 0));
        assert_eq!(largest_fibonacci_at_most(1.0), (1, 2));
        assert_eq!(largest_fibonacci_at_most(4.0), (3, 4));
        assert_eq!(largest_fibonacci_at_most(100.0), (89, 11));
        assert_eq!(largest_fibonacci_at_most(144.0), (144, 12));
    }

    #[test]
    fn test_retracement_levels_100_to_0() {
        let levels = retracement_levels(100.0, 0.0);
        let expected = [100.0, 76.4, 61.8, 50.0, 38.2, 21.4, 0.0];

        assert_eq!(levels.len(), 7);
        for (level, want) in levels.iter().zip(expected.iter()) {
            assert!(
                (level.value - want).abs() < 0.05,
                "{}% level was {}",
                level.percent(),
                level.value
            );
        }
    }

    #[test]
    fn test_extension_levels() {
        let levels = extension_levels(0.0, 100.0);
        let expected = [200.0, 261.8, 361.8, 523.6];

        assert_eq!(levels.len(), 4);
        for (level, want) in levels.iter().zip(expected.iter()) {
            assert!((level.value - want).abs() < 1e-9);
        }
    }

    #[test]
    fn test_golden_ratio_score() {
        assert_eq!(golden_ratio_score(5.0, 0.0), 0.0);
        assert!((golden_ratio_score(10.0, 10.0) - GOLDEN_RATIO).abs() < 1e-12);
        assert!(golden_ratio_score(20.0, 10.0) <= GOLDEN_RATIO);

        let mut previous = 0.0;
        for positive in 0..=10 {
            let score = golden_ratio_score(positive as f64, 10.0);
            assert!(score >= previous);
            assert!(score <= GOLDEN_RATIO);
            previous = score;
        }
    }
}
