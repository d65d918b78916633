//! Snowflake table sampler.
//!
//! Views are filtered with `MOD(HASH(*), m) = 0`, which is deterministic per
//! row and cheaper than `RANDOM()`. Base tables use `TABLESAMPLE BERNOULLI`
//! or `SYSTEM` (block-level, for very large tables) with no retry; the last
//! resort is a full `ORDER BY RANDOM()`.

use super::sizing::calculate_sample_percentage;
use super::{
    Attempt, SampleQuery, SamplingStrategy, TableSampler, format_percentage, run_attempt,
    run_sampling,
};
use crate::adapters::{QueryAdapter, QueryError};
use crate::config::SamplingPolicy;
use crate::error::Result;
use crate::models::{Dialect, SamplingMethod, TableMetadata, TableSample};
use async_trait::async_trait;

/// Sampler emitting Snowflake SQL
#[derive(Debug, Clone, Default)]
pub struct SnowflakeSampler {
    policy: SamplingPolicy,
}

impl SnowflakeSampler {
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
impl TableSampler for SnowflakeSampler {
    fn dialect(&self) -> Dialect {
        Dialect::Snowflake
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
impl SamplingStrategy for SnowflakeSampler {
    fn view_filter(&self, qualified: &str, cap: u64) -> SampleQuery {
        SampleQuery::new(
            format!(
                "SELECT * FROM {} WHERE MOD(HASH(*), {}) = 0 LIMIT {}",
                qualified,
                self.policy.view_filter_modulus(),
                cap
            ),
            SamplingMethod::ViewHashSample,
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
        SampleQuery::new(
            format!("SELECT * FROM {} ORDER BY RANDOM() LIMIT {}", qualified, rows),
            SamplingMethod::RandomLimit,
            rows,
        )
    }

    async fn primary(
        &self,
        adapter: &dyn QueryAdapter,
        table: &TableMetadata,
        qualified: &str,
        sample_size: u64,
    ) -> std::result::Result<Attempt, QueryError> {
        let percentage = format_percentage(calculate_sample_percentage(sample_size, table.row_count));
        let (kind, method) = if table.row_count < self.policy.system_sample_row_threshold {
            ("BERNOULLI", SamplingMethod::TablesampleBernoulli)
        } else {
            ("SYSTEM", SamplingMethod::TablesampleSystem)
        };

        let query = SampleQuery::new(
            format!(
                "SELECT * FROM {} TABLESAMPLE {} ({}) LIMIT {}",
                qualified, kind, percentage, sample_size
            ),
            method,
            sample_size,
        );
        run_attempt(adapter, &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;
    use crate::error::ScoutError;
    use crate::models::TableType;

    #[tokio::test]
    async fn test_view_hash_sample_accepted() {
        let view = TableMetadata::new("ANALYTICS", "PUBLIC", "EVENTS_V", TableType::View)
            .with_row_count(3_000_000);
        let adapter = MockAdapter::new().with_row_count(60_000);
        let sample = SnowflakeSampler::new()
            .sample_table(&adapter, &view, 100_000)
            .await
            .unwrap();

        assert_eq!(sample.sampling_method, SamplingMethod::ViewHashSample);
        assert_eq!(
            adapter.queries()[0].sql,
            "SELECT * FROM \"ANALYTICS\".\"PUBLIC\".\"EVENTS_V\" WHERE MOD(HASH(*), 10) = 0 LIMIT 100000"
        );
    }

    #[tokio::test]
    async fn test_large_table_uses_system_without_retry() {
        let table = TableMetadata::new("DB", "S", "T", TableType::Table).with_row_count(50_000_000);
        let adapter = MockAdapter::new().with_row_count(10);
        let sample = SnowflakeSampler::new()
            .sample_table(&adapter, &table, 500_000)
            .await
            .unwrap();

        assert_eq!(sample.sampling_method, SamplingMethod::TablesampleSystem);
        assert_eq!(adapter.query_count(), 1);
        assert!(adapter.queries()[0].sql.contains("TABLESAMPLE SYSTEM (1) LIMIT 500000"));
    }

    #[tokio::test]
    async fn test_last_resort_orders_randomly() {
        let table = TableMetadata::new("DB", "S", "T", TableType::Table).with_row_count(2_000);
        let adapter = MockAdapter::new()
            .with_error("SAMPLE clause not supported")
            .with_row_count(1_000);
        let sample = SnowflakeSampler::new()
            .sample_table(&adapter, &table, 1_000)
            .await
            .unwrap();

        assert_eq!(sample.sampling_method, SamplingMethod::RandomLimit);
        assert!(adapter.last_query().unwrap().sql.ends_with("ORDER BY RANDOM() LIMIT 1000"));
    }

    #[tokio::test]
    async fn test_both_failures_are_reported() {
        let table = TableMetadata::new("DB", "S", "T", TableType::Table).with_row_count(2_000);
        let adapter = MockAdapter::new()
            .with_error("sample failed")
            .with_error("warehouse suspended");
        let err = SnowflakeSampler::new()
            .sample_table(&adapter, &table, 1_000)
            .await
            .unwrap_err();

        match err {
            ScoutError::Sampling {
                table,
                source,
                fallback_error,
                ..
            } => {
                assert_eq!(table, "\"DB\".\"S\".\"T\"");
                assert_eq!(source.message(), "sample failed");
                assert_eq!(fallback_error.as_deref(), Some("warehouse suspended"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
