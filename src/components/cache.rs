//! Cache component.
//!
//! Registered without a dispatch table: calls reach it through
//! [`NativeComponent::invoke`].

use anyhow::ensure;

use crate::interpreter::ast::Literal;
use crate::interpreter::tree::{IntoVarState, VarState};
use crate::interpreter::value::ParamBundle;
use crate::outcome::{AccessResult, Duration, Outcomes};
use crate::runtime::error::{ComponentResult, NativeCallError, NativeCallResult};
use crate::runtime::registry::NativeComponent;

/// Registered type name.
pub const CACHE: &str = "Cache";

/// Parameters accepted by the constructor.
pub const CACHE_PARAMS: [&str; 2] = ["HitRate", "FailureProb"];

/// Hit rate used when `HitRate` is not overridden.
pub const DEFAULT_HIT_RATE: f64 = 0.8;

/// Failure probability used when `FailureProb` is not overridden.
pub const DEFAULT_FAILURE_PROB: f64 = 0.001;

const MIN_PROBABILITY: f64 = 1e-9;

/// An in-memory cache in front of a slower store.
#[derive(Debug, Clone, PartialEq)]
pub struct Cache {
    hit_rate: f64,
    failure_prob: f64,
    read: Outcomes<AccessResult>,
    write: Outcomes<AccessResult>,
}

fn hit_latency() -> Outcomes<Duration> {
    Outcomes::new()
        .add(90.0, Duration::nanos(100.0))
        .add(10.0, Duration::nanos(500.0))
}

fn miss_latency() -> Outcomes<Duration> {
    Outcomes::new().add(100.0, Duration::nanos(200.0))
}

fn write_latency() -> Outcomes<Duration> {
    Outcomes::new()
        .add(90.0, Duration::nanos(120.0))
        .add(10.0, Duration::nanos(600.0))
}

fn failure_latency() -> Outcomes<Duration> {
    Outcomes::new().add(100.0, Duration::millis(1.0))
}

/// Spread `probability` over the buckets of `latency`, dropping negligible
/// buckets.
fn spread(
    out: &mut Outcomes<AccessResult>,
    probability: f64,
    latency: &Outcomes<Duration>,
    success: bool,
) {
    if probability <= MIN_PROBABILITY {
        return;
    }
    let total = latency.total_weight();
    for bucket in latency.iter() {
        let weight = probability * (bucket.weight / total);
        if weight > MIN_PROBABILITY {
            out.push(weight, AccessResult::new(success, bucket.value));
        }
    }
}

impl Cache {
    /// Cache with the given hit rate and failure probability.
    pub fn new(hit_rate: f64, failure_prob: f64) -> ComponentResult<Self> {
        ensure!(
            (0.0..=1.0).contains(&hit_rate),
            "HitRate must be within [0, 1], got {}",
            hit_rate
        );
        ensure!(
            (0.0..=1.0).contains(&failure_prob),
            "FailureProb must be within [0, 1], got {}",
            failure_prob
        );

        let mut read = Outcomes::new();
        spread(&mut read, failure_prob, &failure_latency(), false);
        let remaining = 1.0 - failure_prob;
        spread(&mut read, hit_rate * remaining, &hit_latency(), true);
        spread(&mut read, (1.0 - hit_rate) * remaining, &miss_latency(), false);

        let mut write = Outcomes::new();
        spread(&mut write, failure_prob, &failure_latency(), false);
        spread(&mut write, remaining, &write_latency(), true);

        Ok(Self {
            hit_rate,
            failure_prob,
            read,
            write,
        })
    }

    /// Build from constructor parameters.
    pub fn from_params(params: &ParamBundle) -> ComponentResult<Self> {
        let hit_rate = params.float("HitRate")?.unwrap_or(DEFAULT_HIT_RATE);
        let failure_prob = params
            .float("FailureProb")?
            .unwrap_or(DEFAULT_FAILURE_PROB);
        Self::new(hit_rate, failure_prob)
    }

    /// Configured hit rate.
    pub fn hit_rate(&self) -> f64 {
        self.hit_rate
    }

    /// Configured failure probability.
    pub fn failure_prob(&self) -> f64 {
        self.failure_prob
    }

    /// Outcomes of a lookup. Misses count as unsuccessful.
    pub fn read(&self) -> Outcomes<AccessResult> {
        self.read.clone()
    }

    /// Outcomes of a store.
    pub fn write(&self) -> Outcomes<AccessResult> {
        self.write.clone()
    }
}

impl NativeComponent for Cache {
    fn method_arity(&self, method: &str) -> Option<usize> {
        match method {
            "Read" | "Write" => Some(0),
            _ => None,
        }
    }

    fn invoke(&self, method: &str, _args: &[Literal]) -> NativeCallResult<VarState> {
        match method {
            "Read" => Ok(self.read().into_var_state()),
            "Write" => Ok(self.write().into_var_state()),
            _ => Err(NativeCallError::NoSuchMethod),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_read_distribution() {
        let cache = Cache::from_params(&ParamBundle::new()).unwrap();
        let read = cache.read();
        // one failure bucket, two hit buckets, one miss bucket
        assert_eq!(read.len(), 4);
        assert!((read.total_weight() - 1.0).abs() < 1e-9);

        let (hits, rest) = read.split(|access| access.success);
        assert!((hits.total_weight() - 0.8 * 0.999).abs() < 1e-9);
        assert_eq!(rest.buckets[0].value.latency, Duration::millis(1.0));
    }

    #[test]
    fn zero_failure_probability_drops_failure_buckets() {
        let cache = Cache::new(1.0, 0.0).unwrap();
        assert!(cache.read().iter().all(|b| b.value.success));
        assert_eq!(cache.write().len(), 2);
    }

    #[test]
    fn rejects_out_of_range_hit_rate() {
        let params = ParamBundle::new().with("HitRate", Literal::Float(1.5));
        let err = Cache::from_params(&params).unwrap_err();
        assert!(err.to_string().contains("HitRate"));
    }

    #[test]
    fn reflective_invoke_answers_known_methods() {
        let cache = Cache::from_params(&ParamBundle::new()).unwrap();
        assert_eq!(cache.method_arity("Read"), Some(0));
        assert_eq!(cache.method_arity("Evict"), None);
        let state = cache.invoke("Write", &[]).unwrap();
        assert_eq!(state, cache.write().into_var_state());
    }
}
