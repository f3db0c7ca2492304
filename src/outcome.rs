//! Weighted outcome distributions.
//!
//! An [`Outcomes`] value is a list of weighted buckets describing every result
//! a component operation can produce. Weights are relative; callers that need
//! probabilities divide by [`Outcomes::total_weight`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Simulated time, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Duration(pub f64);

impl Duration {
    /// Zero elapsed time.
    pub const ZERO: Duration = Duration(0.0);

    /// Duration from seconds.
    pub fn seconds(value: f64) -> Self {
        Duration(value)
    }

    /// Duration from milliseconds.
    pub fn millis(value: f64) -> Self {
        Duration(value / 1_000.0)
    }

    /// Duration from microseconds.
    pub fn micros(value: f64) -> Self {
        Duration(value / 1_000_000.0)
    }

    /// Duration from nanoseconds.
    pub fn nanos(value: f64) -> Self {
        Duration(value / 1_000_000_000.0)
    }

    /// Length in seconds.
    pub fn as_secs(self) -> f64 {
        self.0
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0 + rhs.0)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0;
        if secs == 0.0 {
            write!(f, "0s")
        } else if secs.abs() < 1e-6 {
            write!(f, "{}ns", secs * 1e9)
        } else if secs.abs() < 1e-3 {
            write!(f, "{}us", secs * 1e6)
        } else if secs.abs() < 1.0 {
            write!(f, "{}ms", secs * 1e3)
        } else {
            write!(f, "{}s", secs)
        }
    }
}

/// Result of a single access against a storage component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccessResult {
    /// Whether the access succeeded.
    pub success: bool,
    /// Time taken by the access.
    pub latency: Duration,
}

impl AccessResult {
    /// Construct an access result.
    pub fn new(success: bool, latency: Duration) -> Self {
        Self { success, latency }
    }

    /// Sequential composition: both must succeed, latencies add up.
    pub fn and(self, other: AccessResult) -> AccessResult {
        AccessResult {
            success: self.success && other.success,
            latency: self.latency + other.latency,
        }
    }
}

/// A single weighted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket<V> {
    /// Relative weight of this bucket.
    pub weight: f64,
    /// The outcome value.
    pub value: V,
}

/// Weighted distribution of values of type `V`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcomes<V> {
    /// Buckets in insertion order.
    pub buckets: Vec<Bucket<V>>,
}

impl<V> Default for Outcomes<V> {
    fn default() -> Self {
        Self {
            buckets: Vec::new(),
        }
    }
}

impl<V> Outcomes<V> {
    /// Empty distribution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-bucket distribution with weight 1.
    pub fn deterministic(value: V) -> Self {
        Self::new().add(1.0, value)
    }

    /// Append a bucket, builder style.
    pub fn add(mut self, weight: f64, value: V) -> Self {
        self.push(weight, value);
        self
    }

    /// Append a bucket in place.
    pub fn push(&mut self, weight: f64, value: V) {
        self.buckets.push(Bucket { weight, value });
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the distribution has no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sum of all bucket weights.
    pub fn total_weight(&self) -> f64 {
        self.buckets.iter().map(|bucket| bucket.weight).sum()
    }

    /// The value of a deterministic (single bucket) distribution.
    pub fn value(&self) -> Option<&V> {
        match self.buckets.as_slice() {
            [only] => Some(&only.value),
            _ => None,
        }
    }

    /// Iterate over buckets.
    pub fn iter(&self) -> impl Iterator<Item = &Bucket<V>> {
        self.buckets.iter()
    }

    /// Map every value, keeping weights.
    pub fn map<U>(&self, mut mapper: impl FnMut(&V) -> U) -> Outcomes<U> {
        Outcomes {
            buckets: self
                .buckets
                .iter()
                .map(|bucket| Bucket {
                    weight: bucket.weight,
                    value: mapper(&bucket.value),
                })
                .collect(),
        }
    }

    /// Sequential composition with another distribution.
    ///
    /// Every pair of buckets is combined with `reducer`; the resulting weight
    /// is the product of both normalised weights.
    pub fn and_then<U, Z>(
        &self,
        other: &Outcomes<U>,
        mut reducer: impl FnMut(&V, &U) -> Z,
    ) -> Outcomes<Z> {
        let this_weight = self.total_weight();
        let other_weight = other.total_weight();
        let mut out = Outcomes::new();
        if this_weight == 0.0 || other_weight == 0.0 {
            return out;
        }
        for left in &self.buckets {
            for right in &other.buckets {
                let weight = (left.weight / this_weight) * (right.weight / other_weight);
                out.push(weight, reducer(&left.value, &right.value));
            }
        }
        out
    }
}

impl<V: Clone> Outcomes<V> {
    /// Partition buckets into those matching `matcher` and the rest.
    pub fn split(&self, mut matcher: impl FnMut(&V) -> bool) -> (Outcomes<V>, Outcomes<V>) {
        let mut matched = Outcomes::new();
        let mut unmatched = Outcomes::new();
        for bucket in &self.buckets {
            if matcher(&bucket.value) {
                matched.push(bucket.weight, bucket.value.clone());
            } else {
                unmatched.push(bucket.weight, bucket.value.clone());
            }
        }
        (matched, unmatched)
    }
}

impl<V: fmt::Display> fmt::Display for Outcomes<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (idx, bucket) in self.buckets.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", bucket.value, bucket.weight)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_outcome_has_single_value() {
        let outcome = Outcomes::deterministic(42_i64);
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome.value(), Some(&42));
        assert_eq!(outcome.total_weight(), 1.0);
    }

    #[test]
    fn multi_bucket_outcome_is_not_deterministic() {
        let outcome = Outcomes::new().add(0.5, true).add(0.5, false);
        assert_eq!(outcome.value(), None);
    }

    #[test]
    fn and_then_multiplies_normalised_weights() {
        let left = Outcomes::new()
            .add(0.9, AccessResult::new(true, Duration::millis(1.0)))
            .add(0.1, AccessResult::new(false, Duration::millis(5.0)));
        let right = Outcomes::deterministic(AccessResult::new(true, Duration::millis(2.0)));
        let combined = left.and_then(&right, |a, b| a.and(*b));

        assert_eq!(combined.len(), 2);
        assert!((combined.buckets[0].weight - 0.9).abs() < 1e-12);
        assert!(combined.buckets[0].value.success);
        assert!((combined.buckets[0].value.latency.as_secs() - 0.003).abs() < 1e-12);
        assert!(!combined.buckets[1].value.success);
    }

    #[test]
    fn split_partitions_by_predicate() {
        let outcome = Outcomes::new().add(0.7, 1_i64).add(0.2, 2).add(0.1, 3);
        let (odd, even) = outcome.split(|value| value % 2 == 1);
        assert_eq!(odd.len(), 2);
        assert_eq!(even.len(), 1);
        assert!((odd.total_weight() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn duration_display_picks_unit() {
        assert_eq!(Duration::millis(10.0).to_string(), "10ms");
        assert_eq!(Duration::seconds(2.0).to_string(), "2s");
        assert_eq!(Duration::ZERO.to_string(), "0s");
    }
}
