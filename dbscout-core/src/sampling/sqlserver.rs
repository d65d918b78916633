//! SQL Server table sampler.
//!
//! SQL Server bounds rows with `TOP (n)` rather than `LIMIT`. Its
//! `TABLESAMPLE` is page-based and often under-delivers on small or
//! fragmented tables, so an under-yield is retried with `ORDER BY NEWID()`.

use super::sizing::calculate_sample_percentage;
use super::{
    Attempt, SampleQuery, SamplingStrategy, TableSampler, format_percentage,
    retry_if_under_yield, run_attempt, run_sampling,
};
use crate::adapters::{QueryAdapter, QueryError};
use crate::config::SamplingPolicy;
use crate::error::Result;
use crate::models::{Dialect, SamplingMethod, TableMetadata, TableSample};
use async_trait::async_trait;

/// Sampler emitting T-SQL
#[derive(Debug, Clone, Default)]
pub struct SqlServerSampler {
    policy: SamplingPolicy,
}

impl SqlServerSampler {
    /// Creates a sampler with the default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sampler with a caller-supplied policy
    pub fn with_policy(policy: SamplingPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl TableSampler for SqlServerSampler {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
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
impl SamplingStrategy for SqlServerSampler {
    fn view_filter(&self, qualified: &str, cap: u64) -> SampleQuery {
        SampleQuery::new(
            format!(
                "SELECT TOP ({}) * FROM {} WHERE ABS(CHECKSUM(NEWID())) % {} = 0",
                cap,
                qualified,
                self.policy.view_filter_modulus()
            ),
            SamplingMethod::ViewRandomFilter,
            cap,
        )
    }

    fn bounded(&self, qualified: &str, rows: u64, method: SamplingMethod) -> SampleQuery {
        SampleQuery::new(
            format!("SELECT TOP ({}) * FROM {}", rows, qualified),
            method,
            rows,
        )
    }

    fn last_resort(&self, qualified: &str, rows: u64) -> SampleQuery {
        self.bounded(qualified, rows, SamplingMethod::SimpleTop)
    }

    async fn primary(
        &self,
        adapter: &dyn QueryAdapter,
        table: &TableMetadata,
        qualified: &str,
        sample_size: u64,
    ) -> std::result::Result<Attempt, QueryError> {
        let percentage = calculate_sample_percentage(sample_size, table.row_count);
        let first = SampleQuery::new(
            format!(
                "SELECT TOP ({}) * FROM {} TABLESAMPLE ({} PERCENT)",
                sample_size,
                qualified,
                format_percentage(percentage)
            ),
            SamplingMethod::TablesampleSystem,
            sample_size,
        );
        let attempt = run_attempt(adapter, &first).await?;

        let retry = SampleQuery::new(
            format!("SELECT TOP ({}) * FROM {} ORDER BY NEWID()", sample_size, qualified),
            SamplingMethod::NewidRandom,
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
