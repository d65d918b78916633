//! MySQL table sampler.
//!
//! MySQL has no `TABLESAMPLE`. Tables up to the shuffle ceiling are sampled
//! with `ORDER BY RAND()`. Larger tables first thin the scan with
//! `RAND() <= rate` (capped at twice the request) and only shuffle that
//! subset, falling back to a full shuffle when the thinning under-yields.

use super::sizing::calculate_sample_percentage;
use super::{
    Attempt, SampleQuery, SamplingStrategy, TableSampler, format_decimal, retry_if_under_yield,
    run_attempt, run_sampling,
};
use crate::adapters::{QueryAdapter, QueryError};
use crate::config::SamplingPolicy;
use crate::error::Result;
use crate::models::{Dialect, SamplingMethod, TableMetadata, TableSample};
use async_trait::async_trait;

/// Sampler emitting MySQL SQL
#[derive(Debug, Clone, Default)]
pub struct MySqlSampler {
    policy: SamplingPolicy,
}

impl MySqlSampler {
    /// Creates a sampler with the default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sampler with a caller-supplied policy
    pub fn with_policy(policy: SamplingPolicy) -> Self {
        Self { policy }
    }
}

fn random_order(qualified: &str, rows: u64, method: SamplingMethod) -> SampleQuery {
    SampleQuery::new(
        format!("SELECT * FROM {} ORDER BY RAND() LIMIT {}", qualified, rows),
        method,
        rows,
    )
}

#[async_trait]
impl TableSampler for MySqlSampler {
    fn dialect(&self) -> Dialect {
        Dialect::MySQL
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
impl SamplingStrategy for MySqlSampler {
    fn view_filter(&self, qualified: &str, cap: u64) -> SampleQuery {
        SampleQuery::new(
            format!(
                "SELECT * FROM {} WHERE RAND() < {} LIMIT {}",
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
        self.bounded(qualified, rows, SamplingMethod::LimitFallback)
    }

    async fn primary(
        &self,
        adapter: &dyn QueryAdapter,
        table: &TableMetadata,
        qualified: &str,
        sample_size: u64,
    ) -> std::result::Result<Attempt, QueryError> {
        if table.row_count <= self.policy.random_order_row_limit {
            let query = random_order(qualified, sample_size, SamplingMethod::RandomOrder);
            return run_attempt(adapter, &query).await;
        }

        let inner_limit = sample_size.saturating_mul(2);
        let rate = calculate_sample_percentage(inner_limit, table.row_count) / 100.0;
        let optimized = SampleQuery::new(
            format!(
                "SELECT * FROM (SELECT * FROM {} WHERE RAND() <= {} LIMIT {}) AS sampled ORDER BY RAND() LIMIT {}",
                qualified,
                format_decimal(rate, 6),
                inner_limit,
                sample_size
            ),
            SamplingMethod::RandomFilterOptimized,
            sample_size,
        );
        let attempt = run_attempt(adapter, &optimized).await?;

        Ok(retry_if_under_yield(
            adapter,
            attempt,
            sample_size,
            self.policy.retry_yield_ratio,
            random_order(qualified, sample_size, SamplingMethod::RandomOrderFallback),
        )
        .await)
    }
}
