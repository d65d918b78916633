//! Table samplers, one per dialect.
//!
//! Every sampler walks the same decision tree; only the SQL primitives
//! differ:
//!
//! 1. Views: a cheap probabilistic filter capped at `view_row_cap`, accepted
//!    when it returns at least `view_acceptance_ratio` of the cap, otherwise
//!    a plain bounded read (`VIEW_LIMIT`). Filter failures are never surfaced.
//! 2. Base tables no larger than the request: a bounded full read
//!    (`FULL_TABLE`).
//! 3. Larger base tables: the dialect's native primitive, with an optional
//!    under-yield retry.
//! 4. When the primary query fails outright: one last-resort query. Only
//!    when that fails too does the caller see an error.
//!
//! Each step is an explicit `Result`-returning attempt; the chaining logic
//! lives in [`run_sampling`] rather than in exception handling.
//!
//! # Module Structure
//! - `sizing`: sample-size tiers and `TABLESAMPLE` percentages
//! - one module per dialect with its SQL builders

use crate::adapters::{QueryAdapter, QueryError, QueryResult};
use crate::coercion::get_qualified_table_name;
use crate::config::SamplingPolicy;
use crate::error::{Result, ScoutError};
use crate::models::{ColumnSchema, Dialect, SamplingMethod, TableMetadata, TableSample};
use async_trait::async_trait;

pub mod bigquery;
pub mod mysql;
pub mod postgres;
pub mod redshift;
pub mod sizing;
pub mod snowflake;
pub mod sqlserver;

pub use bigquery::BigQuerySampler;
pub use mysql::MySqlSampler;
pub use postgres::PostgresSampler;
pub use redshift::RedshiftSampler;
pub use snowflake::SnowflakeSampler;
pub use sqlserver::SqlServerSampler;

/// Draws one bounded sample from a table or view.
///
/// # Object Safety
/// This trait is object-safe; the factory hands out `Box<dyn TableSampler>`.
#[async_trait]
pub trait TableSampler: Send + Sync {
    /// The dialect whose SQL this sampler emits
    fn dialect(&self) -> Dialect;

    /// Thresholds this sampler branches on
    fn policy(&self) -> &SamplingPolicy;

    /// Samples `table`, returning at most `sample_size` rows.
    ///
    /// Issues between one and three queries through `adapter`.
    ///
    /// # Errors
    /// - [`ScoutError::Configuration`] when `sample_size` is 0
    /// - [`ScoutError::Sampling`] when every strategy in the chain failed
    async fn sample_table(
        &self,
        adapter: &dyn QueryAdapter,
        table: &TableMetadata,
        sample_size: u64,
    ) -> Result<TableSample>;
}

/// One generated sampling statement and the tag it earns when it is used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleQuery {
    /// Complete sampling statement
    pub sql: String,
    /// Tag recorded when this query produces the sample
    pub method: SamplingMethod,
    /// Row hint passed to the adapter; equals the statement's own limit
    pub max_rows: u64,
}

impl SampleQuery {
    /// Creates a sample query
    pub fn new(sql: impl Into<String>, method: SamplingMethod, max_rows: u64) -> Self {
        Self {
            sql: sql.into(),
            method,
            max_rows,
        }
    }
}

/// A successful attempt: the rows plus the strategy that produced them
#[derive(Debug)]
pub(crate) struct Attempt {
    pub(crate) result: QueryResult,
    pub(crate) method: SamplingMethod,
}

/// Per-dialect SQL builders plugged into [`run_sampling`]
#[async_trait]
pub(crate) trait SamplingStrategy: TableSampler {
    /// Cheap probabilistic filter for views, bounded by `cap`
    fn view_filter(&self, qualified: &str, cap: u64) -> SampleQuery;

    /// Plain bounded read (`LIMIT` or `TOP`)
    fn bounded(&self, qualified: &str, rows: u64, method: SamplingMethod) -> SampleQuery;

    /// Deterministic query run when the primary strategy fails outright
    fn last_resort(&self, qualified: &str, rows: u64) -> SampleQuery;

    /// The dialect's native strategy for base tables larger than the request,
    /// including any under-yield retry.
    async fn primary(
        &self,
        adapter: &dyn QueryAdapter,
        table: &TableMetadata,
        qualified: &str,
        sample_size: u64,
    ) -> std::result::Result<Attempt, QueryError>;
}

/// Runs the shared decision tree for one table.
pub(crate) async fn run_sampling<S>(
    sampler: &S,
    adapter: &dyn QueryAdapter,
    table: &TableMetadata,
    sample_size: u64,
) -> Result<TableSample>
where
    S: SamplingStrategy + ?Sized,
{
    let dialect = sampler.dialect();
    if sample_size == 0 {
        return Err(ScoutError::configuration(format!(
            "sample_size must be greater than 0 (table {})",
            table.table_id()
        )));
    }

    let qualified =
        get_qualified_table_name(&table.database, &table.schema, &table.name, dialect);

    if table.is_view() {
        return sample_view(sampler, adapter, table, &qualified, sample_size).await;
    }

    if table.row_count <= sample_size {
        let query = sampler.bounded(&qualified, sample_size, SamplingMethod::FullTable);
        return match run_attempt(adapter, &query).await {
            Ok(attempt) => Ok(finish(table, attempt)),
            Err(error) => Err(sampling_failed(qualified, dialect, error, None)),
        };
    }

    let primary_error = match sampler.primary(adapter, table, &qualified, sample_size).await {
        Ok(attempt) => return Ok(finish(table, attempt)),
        Err(error) => error,
    };

    let fallback = sampler.last_resort(&qualified, sample_size);
    tracing::warn!(
        "Sampling {} on {} failed ({}), falling back to {}",
        qualified,
        dialect,
        primary_error,
        fallback.method
    );

    match run_attempt(adapter, &fallback).await {
        Ok(attempt) => Ok(finish(table, attempt)),
        Err(fallback_error) => Err(sampling_failed(
            qualified,
            dialect,
            primary_error,
            Some(fallback_error),
        )),
    }
}

async fn sample_view<S>(
    sampler: &S,
    adapter: &dyn QueryAdapter,
    table: &TableMetadata,
    qualified: &str,
    sample_size: u64,
) -> Result<TableSample>
where
    S: SamplingStrategy + ?Sized,
{
    let policy = sampler.policy();
    let cap = sample_size.min(policy.view_row_cap);
    let filter = sampler.view_filter(qualified, cap);

    let partial = match run_attempt(adapter, &filter).await {
        Ok(attempt) if meets_yield(attempt.result.row_count(), cap, policy.view_acceptance_ratio) => {
            return Ok(finish(table, attempt));
        }
        Ok(attempt) => {
            tracing::debug!(
                "View filter on {} returned {} of {} rows, falling back to {}",
                qualified,
                attempt.result.row_count(),
                cap,
                SamplingMethod::ViewLimit
            );
            Some(attempt)
        }
        Err(error) => {
            tracing::debug!(
                "View filter on {} failed ({}), falling back to {}",
                qualified,
                error,
                SamplingMethod::ViewLimit
            );
            None
        }
    };

    let limit = sampler.bounded(qualified, cap, SamplingMethod::ViewLimit);
    match run_attempt(adapter, &limit).await {
        Ok(attempt) => Ok(finish(table, attempt)),
        Err(error) => match partial {
            Some(attempt) => {
                tracing::debug!(
                    "{} on {} failed ({}), keeping the filtered rows",
                    SamplingMethod::ViewLimit,
                    qualified,
                    error
                );
                Ok(finish(table, attempt))
            }
            None => Err(sampling_failed(
                qualified.to_string(),
                sampler.dialect(),
                error,
                None,
            )),
        },
    }
}

/// Executes one sampling statement.
pub(crate) async fn run_attempt(
    adapter: &dyn QueryAdapter,
    query: &SampleQuery,
) -> std::result::Result<Attempt, QueryError> {
    tracing::debug!("Sampling with {}: {}", query.method, query.sql);
    let result = adapter.query(&query.sql, &[], Some(query.max_rows)).await?;
    Ok(Attempt {
        result,
        method: query.method,
    })
}

/// Runs `retry` when `first` returned fewer than `ratio` of `target` rows.
///
/// A successful retry replaces the first result even if it is smaller; a
/// failing retry keeps the first result.
pub(crate) async fn retry_if_under_yield(
    adapter: &dyn QueryAdapter,
    first: Attempt,
    target: u64,
    ratio: f64,
    retry: SampleQuery,
) -> Attempt {
    if meets_yield(first.result.row_count(), target, ratio) {
        return first;
    }

    tracing::debug!(
        "{} returned {} of {} requested rows, retrying with {}",
        first.method,
        first.result.row_count(),
        target,
        retry.method
    );

    match run_attempt(adapter, &retry).await {
        Ok(second) => second,
        Err(error) => {
            tracing::debug!(
                "Retry with {} failed ({}), keeping {} result",
                retry.method,
                error,
                first.method
            );
            first
        }
    }
}

/// True when `actual` rows reach `ratio` of `target`
pub(crate) fn meets_yield(actual: usize, target: u64, ratio: f64) -> bool {
    actual as f64 >= target as f64 * ratio
}

/// Renders a number with at most `places` decimals, trailing zeros removed
pub(crate) fn format_decimal(value: f64, places: usize) -> String {
    let rendered = format!("{:.*}", places, value);
    if rendered.contains('.') {
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        rendered
    }
}

/// Renders a `TABLESAMPLE` percentage
pub(crate) fn format_percentage(percentage: f64) -> String {
    format_decimal(percentage, 4)
}

fn finish(table: &TableMetadata, attempt: Attempt) -> TableSample {
    let Attempt { result, method } = attempt;
    let column_schemas = result.fields.iter().map(ColumnSchema::from).collect();
    let sample_size = result.rows.len() as u64;

    tracing::info!(
        "Sampled {} rows from {} using {}",
        sample_size,
        table.table_id(),
        method
    );

    TableSample {
        table_id: table.table_id(),
        row_count: table.row_count,
        sample_size,
        sample_data: result.rows,
        column_schemas: Some(column_schemas),
        sampled_at: chrono::Utc::now(),
        sampling_method: method,
    }
}

fn sampling_failed(
    qualified: String,
    dialect: Dialect,
    source: QueryError,
    fallback_error: Option<QueryError>,
) -> ScoutError {
    tracing::error!(
        "Failed to sample {} on {}: {}",
        qualified,
        dialect,
        source
    );
    ScoutError::Sampling {
        table: qualified,
        dialect,
        source,
        fallback_error: fallback_error.map(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;
    use crate::models::TableType;

    #[test]
    fn test_meets_yield() {
        assert!(meets_yield(95_000, 100_000, 0.9));
        assert!(meets_yield(90_000, 100_000, 0.9));
        assert!(!meets_yield(89_999, 100_000, 0.9));
        assert!(meets_yield(250_000, 500_000, 0.5));
        assert!(!meets_yield(0, 1, 0.5));
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(2.4), "2.4");
        assert_eq!(format_percentage(100.0), "100");
        assert_eq!(format_percentage(0.01), "0.01");
        assert_eq!(format_percentage(1.0 / 3.0), "0.3333");
        assert_eq!(format_decimal(0.0001, 6), "0.0001");
        assert_eq!(format_decimal(0.1, 6), "0.1");
    }

    #[tokio::test]
    async fn test_zero_sample_size_is_rejected_before_querying() {
        let adapter = MockAdapter::new();
        let table = TableMetadata::new("db", "public", "orders", TableType::Table);
        let sampler = PostgresSampler::new();

        let err = sampler.sample_table(&adapter, &table, 0).await.unwrap_err();
        assert!(matches!(err, ScoutError::Configuration { .. }));
        assert_eq!(adapter.query_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_failure_keeps_first_result() {
        let adapter = MockAdapter::new().with_error("timeout");
        let first = Attempt {
            result: QueryResult::new(vec![crate::adapters::Row::new()], Vec::new()),
            method: SamplingMethod::TablesampleBernoulli,
        };
        let retry = SampleQuery::new("SELECT 2", SamplingMethod::TablesampleBernoulliRetry, 10);

        let kept = retry_if_under_yield(&adapter, first, 10, 0.9, retry).await;
        assert_eq!(kept.method, SamplingMethod::TablesampleBernoulli);
        assert_eq!(kept.result.row_count(), 1);
        assert_eq!(adapter.query_count(), 1);
    }
}
