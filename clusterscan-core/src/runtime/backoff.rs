use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use crate::config::RetryConfig;

/// Exponential per-key requeue delay with deterministic jitter.
///
/// The anchor delay is `backoff_base_ms * 2^(failures - 1)` capped at
/// `backoff_max_ms`. Jitter spreads the delay by `jitter_ratio` of the
/// anchor (at least `jitter_min_ms`) in both directions, seeded by the key
/// and failure count so one key always retries on the same schedule.
#[derive(Clone, Copy, Debug)]
pub struct Backoff {
    config: RetryConfig,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn delay<K: Hash + ?Sized>(&self, key: &K, failures: u32) -> Duration {
        let anchor = self.anchor_delay_ms(failures);
        Duration::from_millis(self.jittered_delay_for_anchor(anchor, key, failures))
    }

    fn anchor_delay_ms(&self, failures: u32) -> u64 {
        if failures == 0 {
            return 0;
        }

        let exp = (failures - 1).min(30) as i32;
        let scaled = (self.config.backoff_base_ms as f64) * 2f64.powi(exp);
        let capped = scaled.min(self.config.backoff_max_ms as f64);
        capped.max(0.0) as u64
    }

    fn jittered_delay_for_anchor<K: Hash + ?Sized>(
        &self,
        anchor_ms: u64,
        key: &K,
        failures: u32,
    ) -> u64 {
        if anchor_ms == 0 {
            return 0;
        }

        let jitter_ratio = f64::from(self.config.jitter_ratio.max(0.0));
        let jitter_span = ((anchor_ms as f64) * jitter_ratio)
            .max(self.config.jitter_min_ms as f64)
            .min(self.config.backoff_max_ms as f64);

        let lower = 0f64.max(anchor_ms as f64 - jitter_span);
        let upper = (anchor_ms as f64 + jitter_span)
            .min(self.config.backoff_max_ms as f64);
        if upper <= lower {
            return lower.round() as u64;
        }

        let unit = deterministic_unit(key, failures);
        let jittered = lower + (upper - lower) * unit;
        jittered.round() as u64
    }
}

fn deterministic_unit<K: Hash + ?Sized>(key: &K, failures: u32) -> f64 {
    let mut hasher = DefaultHasher::default();
    key.hash(&mut hasher);
    failures.hash(&mut hasher);
    let bits = hasher.finish();
    (bits as f64) / (u64::MAX as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> Backoff {
        Backoff::new(RetryConfig {
            backoff_base_ms: 500,
            backoff_max_ms: 10_000,
            jitter_ratio: 0.0,
            jitter_min_ms: 0,
        })
    }

    #[test]
    fn anchor_doubles_per_failure_until_cap() {
        let backoff = no_jitter();
        let delays: Vec<u64> = (1..=7)
            .map(|failures| backoff.delay("ns/run", failures).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![500, 1_000, 2_000, 4_000, 8_000, 10_000, 10_000]);
        assert_eq!(backoff.delay("ns/run", 0), Duration::ZERO);
    }

    #[test]
    fn jitter_stays_in_band_and_is_repeatable() {
        let backoff = Backoff::new(RetryConfig::default());
        for failures in 1..=6 {
            let anchor = backoff.anchor_delay_ms(failures) as f64;
            let span = (anchor * 0.25).max(50.0);
            let delay = backoff.delay("ns/run", failures).as_millis() as f64;
            assert!(delay >= (anchor - span).max(0.0) - 1.0);
            assert!(delay <= anchor + span + 1.0);
            assert_eq!(
                backoff.delay("ns/run", failures),
                backoff.delay("ns/run", failures)
            );
        }
    }

    #[test]
    fn large_failure_counts_do_not_overflow() {
        let backoff = Backoff::new(RetryConfig::default());
        assert!(backoff.delay("ns/run", u32::MAX) <= backoff.config().backoff_max());
    }
}
