//! Dialect dispatch and the top-level entry points.
//!
//! The `match` statements below are exhaustive over [`Dialect`], so a new
//! dialect cannot be added without also adding its fetcher and sampler.
//! Unknown dialect strings are rejected earlier, when parsing a [`Dialect`].

use crate::adapters::QueryAdapter;
use crate::config::SamplingPolicy;
use crate::error::Result;
use crate::models::{Dialect, IntrospectionFilters, StructuralMetadata, TableMetadata, TableSample};
use crate::sampling::sizing::get_dynamic_sample_size;
use crate::sampling::{
    BigQuerySampler, MySqlSampler, PostgresSampler, RedshiftSampler, SnowflakeSampler,
    SqlServerSampler, TableSampler,
};
use crate::structural::{
    BigQueryFetcher, MySqlFetcher, PostgresFetcher, RedshiftFetcher, SnowflakeFetcher,
    SqlServerFetcher, StructuralMetadataFetcher,
};
use futures::stream::{self, StreamExt};

/// Creates the structural metadata fetcher for `dialect`
pub fn create_structural_metadata_fetcher(dialect: Dialect) -> Box<dyn StructuralMetadataFetcher> {
    match dialect {
        Dialect::Snowflake => Box::new(SnowflakeFetcher::new()),
        Dialect::PostgreSQL => Box::new(PostgresFetcher::new()),
        Dialect::MySQL => Box::new(MySqlFetcher::new()),
        Dialect::BigQuery => Box::new(BigQueryFetcher::new()),
        Dialect::Redshift => Box::new(RedshiftFetcher::new()),
        Dialect::SqlServer => Box::new(SqlServerFetcher::new()),
    }
}

/// Creates the table sampler for `dialect` with the default policy
pub fn create_table_sampler(dialect: Dialect) -> Box<dyn TableSampler> {
    create_table_sampler_with_policy(dialect, SamplingPolicy::default())
}

/// Creates the table sampler for `dialect` with a caller-supplied policy
pub fn create_table_sampler_with_policy(
    dialect: Dialect,
    policy: SamplingPolicy,
) -> Box<dyn TableSampler> {
    match dialect {
        Dialect::Snowflake => Box::new(SnowflakeSampler::with_policy(policy)),
        Dialect::PostgreSQL => Box::new(PostgresSampler::with_policy(policy)),
        Dialect::MySQL => Box::new(MySqlSampler::with_policy(policy)),
        Dialect::BigQuery => Box::new(BigQuerySampler::with_policy(policy)),
        Dialect::Redshift => Box::new(RedshiftSampler::with_policy(policy)),
        Dialect::SqlServer => Box::new(SqlServerSampler::with_policy(policy)),
    }
}

/// Resolves the fetcher for `dialect` and runs it.
///
/// # Errors
/// See [`StructuralMetadataFetcher::get_structural_metadata`].
pub async fn get_structural_metadata(
    adapter: &dyn QueryAdapter,
    dialect: Dialect,
    filters: Option<&IntrospectionFilters>,
) -> Result<StructuralMetadata> {
    create_structural_metadata_fetcher(dialect)
        .get_structural_metadata(adapter, filters)
        .await
}

/// Resolves the sampler for `dialect` and samples one table.
///
/// # Errors
/// See [`TableSampler::sample_table`].
pub async fn sample_table(
    adapter: &dyn QueryAdapter,
    dialect: Dialect,
    table: &TableMetadata,
    sample_size: u64,
) -> Result<TableSample> {
    create_table_sampler(dialect)
        .sample_table(adapter, table, sample_size)
        .await
}

/// Like [`sample_table`], with a caller-supplied policy.
///
/// # Errors
/// Returns [`crate::ScoutError::Configuration`] for an invalid policy, and
/// otherwise see [`TableSampler::sample_table`].
pub async fn sample_table_with_policy(
    adapter: &dyn QueryAdapter,
    dialect: Dialect,
    table: &TableMetadata,
    sample_size: u64,
    policy: SamplingPolicy,
) -> Result<TableSample> {
    policy.validate()?;
    create_table_sampler_with_policy(dialect, policy)
        .sample_table(adapter, table, sample_size)
        .await
}

/// A table that could not be sampled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFailure {
    /// Composite `database.schema.table` identifier
    pub table_id: String,
    /// Rendered error
    pub message: String,
}

/// Outcome of [`sample_tables`]
#[derive(Debug, Clone, Default)]
pub struct SampleBatch {
    /// Successful samples, in input order
    pub samples: Vec<TableSample>,
    /// Tables whose whole sampling chain failed, in input order
    pub failures: Vec<SampleFailure>,
}

impl SampleBatch {
    /// True when every table was sampled
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Samples every table with bounded concurrency.
///
/// Each table is sized with [`get_dynamic_sample_size`]. Up to
/// `policy.max_concurrent_samples` tables are sampled at once through the
/// same adapter. A table that fails is logged and recorded in
/// [`SampleBatch::failures`]; the others are still returned.
///
/// # Errors
/// Returns [`crate::ScoutError::Configuration`] for an invalid policy. Sampling
/// failures never fail the batch.
pub async fn sample_tables(
    adapter: &dyn QueryAdapter,
    dialect: Dialect,
    tables: &[TableMetadata],
    policy: SamplingPolicy,
) -> Result<SampleBatch> {
    policy.validate()?;
    let concurrency = policy.max_concurrent_samples;
    let sampler = create_table_sampler_with_policy(dialect, policy);

    tracing::debug!(
        "Sampling {} tables on {} with concurrency {}",
        tables.len(),
        dialect,
        concurrency
    );

    let sampler = sampler.as_ref();
    let mut outcomes: Vec<(usize, String, Result<TableSample>)> =
        stream::iter(tables.iter().enumerate())
            .map(|(index, table)| async move {
                let sample_size = get_dynamic_sample_size(table.row_count);
                let outcome = sampler.sample_table(adapter, table, sample_size).await;
                (index, table.table_id(), outcome)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;
    outcomes.sort_by_key(|(index, _, _)| *index);

    let mut batch = SampleBatch::default();
    for (_, table_id, outcome) in outcomes {
        match outcome {
            Ok(sample) => batch.samples.push(sample),
            Err(error) => {
                tracing::warn!("Skipping table {}: {}", table_id, error);
                batch.failures.push(SampleFailure {
                    table_id,
                    message: error.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Sampled {} of {} tables on {}",
        batch.samples.len(),
        tables.len(),
        dialect
    );
    Ok(batch)
}
