//! Sampling policy configuration.
//!
//! Holds the thresholds the samplers branch on. The defaults are empirical
//! values kept for behavioral parity across dialects; callers may tune them
//! through the `*_with_policy` factory entry points.

use crate::error::ScoutError;
use serde::{Deserialize, Serialize};

/// Thresholds and ratios driving the sampler decision tree.
///
/// # Example
/// ```rust
/// use dbscout_core::config::SamplingPolicy;
///
/// let policy = SamplingPolicy::new()
///     .with_view_row_cap(100_000)
///     .with_max_concurrent_samples(8);
///
/// assert!(policy.validate().is_ok());
/// assert_eq!(policy.view_filter_modulus(), 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingPolicy {
    /// Upper bound on rows requested from a view, whatever the caller asks for
    pub view_row_cap: u64,
    /// Fraction of view rows the cheap probabilistic filter keeps
    pub view_filter_probability: f64,
    /// Minimum share of the capped view target the filter must return
    pub view_acceptance_ratio: f64,
    /// Minimum share of the requested size before a retry strategy runs
    pub retry_yield_ratio: f64,
    /// Row count at which block-level SYSTEM sampling replaces BERNOULLI
    pub system_sample_row_threshold: u64,
    /// Largest table MySQL shuffles whole with `ORDER BY RAND()`
    pub random_order_row_limit: u64,
    /// Concurrent table samples in one batch
    pub max_concurrent_samples: usize,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            view_row_cap: 500_000,
            view_filter_probability: 0.1,
            view_acceptance_ratio: 0.5,
            retry_yield_ratio: 0.9,
            system_sample_row_threshold: 10_000_000,
            random_order_row_limit: 1_000_000,
            max_concurrent_samples: 4,
        }
    }
}

impl SamplingPolicy {
    /// Creates a policy with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the view row cap.
    pub fn with_view_row_cap(mut self, cap: u64) -> Self {
        self.view_row_cap = cap;
        self
    }

    /// Builder method to set the view filter probability.
    pub fn with_view_filter_probability(mut self, probability: f64) -> Self {
        self.view_filter_probability = probability;
        self
    }

    /// Builder method to set the view acceptance ratio.
    pub fn with_view_acceptance_ratio(mut self, ratio: f64) -> Self {
        self.view_acceptance_ratio = ratio;
        self
    }

    /// Builder method to set the retry yield ratio.
    pub fn with_retry_yield_ratio(mut self, ratio: f64) -> Self {
        self.retry_yield_ratio = ratio;
        self
    }

    /// Builder method to set the SYSTEM sampling threshold.
    pub fn with_system_sample_row_threshold(mut self, rows: u64) -> Self {
        self.system_sample_row_threshold = rows;
        self
    }

    /// Builder method to set the MySQL full-shuffle ceiling.
    pub fn with_random_order_row_limit(mut self, rows: u64) -> Self {
        self.random_order_row_limit = rows;
        self
    }

    /// Builder method to set batch concurrency.
    pub fn with_max_concurrent_samples(mut self, concurrency: usize) -> Self {
        self.max_concurrent_samples = concurrency;
        self
    }

    /// Modulus for hash/checksum view filters (`MOD(HASH(*), m) = 0`).
    ///
    /// Derived from the filter probability, so 0.1 yields 10.
    pub fn view_filter_modulus(&self) -> u64 {
        if self.view_filter_probability > 0.0 {
            (1.0 / self.view_filter_probability).round().max(1.0) as u64
        } else {
            1
        }
    }

    /// Validates the policy.
    ///
    /// # Errors
    /// Returns a configuration error for ratios or probabilities outside
    /// `(0, 1]`, and for zero caps, thresholds or concurrency.
    pub fn validate(&self) -> crate::Result<()> {
        for (name, value) in [
            ("view_filter_probability", self.view_filter_probability),
            ("view_acceptance_ratio", self.view_acceptance_ratio),
            ("retry_yield_ratio", self.retry_yield_ratio),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ScoutError::configuration(format!(
                    "{} must be within (0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.view_row_cap == 0 {
            return Err(ScoutError::configuration(
                "view_row_cap must be greater than 0",
            ));
        }

        if self.system_sample_row_threshold == 0 {
            return Err(ScoutError::configuration(
                "system_sample_row_threshold must be greater than 0",
            ));
        }

        if self.random_order_row_limit == 0 {
            return Err(ScoutError::configuration(
                "random_order_row_limit must be greater than 0",
            ));
        }

        if self.max_concurrent_samples == 0 {
            return Err(ScoutError::configuration(
                "max_concurrent_samples must be greater than 0",
            ));
        }

        Ok(())
    }
}
