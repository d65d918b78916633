//! Redshift table sampler.
//!
//! Redshift has no `TABLESAMPLE`, so large tables are shuffled with
//! `ORDER BY RANDOM()`.

use super::{
    Attempt, SampleQuery, SamplingStrategy, TableSampler, format_decimal, run_attempt,
    run_sampling,
};
use crate::adapters::{QueryAdapter, QueryError};
use crate::config::SamplingPolicy;
use crate::error::Result;
use crate::models::{Dialect, SamplingMethod, TableMetadata, TableSample};
use async_trait::async_trait;

/// Sampler emitting Redshift SQL
#[derive(Debug, Clone, Default)]
pub struct RedshiftSampler {
    policy: SamplingPolicy,
}

impl RedshiftSampler {
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
impl TableSampler for RedshiftSampler {
    fn dialect(&self) -> Dialect {
        Dialect::Redshift
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
impl SamplingStrategy for RedshiftSampler {
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
        _table: &TableMetadata,
        qualified: &str,
        sample_size: u64,
    ) -> std::result::Result<Attempt, QueryError> {
        let query = SampleQuery::new(
            format!("SELECT * FROM {} ORDER BY RANDOM() LIMIT {}", qualified, sample_size),
            SamplingMethod::RandomOrder,
            sample_size,
        );
        run_attempt(adapter, &query).await
    }
}
