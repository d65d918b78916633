//! PostgreSQL table sampler.
//!
//! Base tables use `TABLESAMPLE BERNOULLI` (row-level) below the SYSTEM
//! threshold and `TABLESAMPLE SYSTEM` (block-level) above it. The
//! percentage targets 1.2× the requested rows so the trailing `LIMIT` is
//! usually the binding constraint. An under-yielding first pass is retried
//! once with BERNOULLI at double the percentage.

use super::sizing::calculate_sample_percentage;
use super::{
    Attempt, SampleQuery, SamplingStrategy, TableSampler, format_decimal, format_percentage,
    retry_if_under_yield, run_attempt, run_sampling,
};
use crate::adapters::{QueryAdapter, QueryError};
use crate::config::SamplingPolicy;
use crate::error::Result;
use crate::models::{Dialect, SamplingMethod, TableMetadata, TableSample};
use async_trait::async_trait;

/// Over-request factor for the TABLESAMPLE percentage
const OVERSAMPLE_FACTOR: f64 = 1.2;

/// Sampler emitting PostgreSQL SQL
#[derive(Debug, Clone, Default)]
pub struct PostgresSampler {
    policy: SamplingPolicy,
}

impl PostgresSampler {
    /// Creates a sampler with the default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sampler with a caller-supplied policy
    pub fn with_policy(policy: SamplingPolicy) -> Self {
        Self { policy }
    }
}

fn tablesample(qualified: &str, kind: &str, percentage: f64, rows: u64) -> String {
    format!(
        "SELECT * FROM {} TABLESAMPLE {} ({}) LIMIT {}",
        qualified,
        kind,
        format_percentage(percentage),
        rows
    )
}

#[async_trait]
impl TableSampler for PostgresSampler {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSQL
    }

    fn policy(&self) -> &SamplingPolicy {
        &self.policy
    }

    async fn sample_table(
        &self,
        adapter: &dyn QueryAdapter,
        table: &TableMetadata,
        sample_size: u64,
    ) -> Result<TableSample> {
        run_sampling(self, adapter, table, sample_size).await
    }
}

#[async_trait]
impl SamplingStrategy for PostgresSampler {
    fn view_filter(&self, qualified: &str, cap: u64) -> SampleQuery {
        SampleQuery::new(
            format!(
                "SELECT * FROM {} WHERE RANDOM() < {} LIMIT {}",
                qualified,
                format_decimal(self.policy.view_filter_probability, 6),
                cap
            ),
            SamplingMethod::ViewRandomFilter,
            cap,
        )
    }

    fn bounded(&self, qualified: &str, rows: u64, method: SamplingMethod) -> SampleQuery {
        SampleQuery::new(
            format!("SELECT * FROM {} LIMIT {}", qualified, rows),
            method,
            rows,
        )
    }

    fn last_resort(&self, qualified: &str, rows: u64) -> SampleQuery {
        self.bounded(qualified, rows, SamplingMethod::SimpleLimit)
    }

    async fn primary(
        &self,
        adapter: &dyn QueryAdapter,
        table: &TableMetadata,
        qualified: &str,
        sample_size: u64,
    ) -> std::result::Result<Attempt, QueryError> {
        let desired = (sample_size as f64 * OVERSAMPLE_FACTOR).ceil() as u64;
        let percentage = calculate_sample_percentage(desired, table.row_count);

        let first = if table.row_count < self.policy.system_sample_row_threshold {
            SampleQuery::new(
                tablesample(qualified, "BERNOULLI", percentage, sample_size),
                SamplingMethod::TablesampleBernoulli,
                sample_size,
            )
        } else {
            SampleQuery::new(
                tablesample(qualified, "SYSTEM", percentage, sample_size),
                SamplingMethod::TablesampleSystem,
                sample_size,
            )
        };
        let attempt = run_attempt(adapter, &first).await?;

        let retry = SampleQuery::new(
            tablesample(qualified, "BERNOULLI", (percentage * 2.0).min(100.0), sample_size),
            SamplingMethod::TablesampleBernoulliRetry,
            sample_size,
        );
        Ok(retry_if_under_yield(
            adapter,
            attempt,
            sample_size,
            self.policy.retry_yield_ratio,
            retry,
        )
        .await)
    }
}
