//! Cross-dialect catalog introspection and adaptive table sampling.
//!
//! Given a [`QueryAdapter`] for a live database, this crate discovers
//! structural metadata (tables, views, row counts, sizes) and draws bounded
//! samples from arbitrarily large tables using whatever probabilistic
//! primitive each dialect offers, degrading through fixed fallback chains
//! when a primitive is unsupported or under-yields.
//!
//! # Supported Dialects
//! Snowflake, PostgreSQL, MySQL, BigQuery, Redshift and SQL Server.
//!
//! # Guarantees
//! - Only read-only catalog and sample queries are issued
//! - Filter values are always bound as parameters, never interpolated
//! - No state is shared or cached between calls
//! - Every sample records the strategy that actually produced it
//!
//! # Architecture
//! - Factory pattern maps a [`Dialect`] to its fetcher/sampler pair
//! - Strategy objects per dialect behind object-safe traits
//! - Transports stay outside the engine behind [`QueryAdapter`]

pub mod adapters;
pub mod coercion;
pub mod config;
pub mod error;
pub mod factory;
pub mod logging;
pub mod models;
pub mod sampling;
pub mod structural;
pub mod validation;

// Re-export commonly used types
pub use adapters::{FieldInfo, QueryAdapter, QueryError, QueryParam, QueryResult, Row};
pub use config::{PoolConfig, SamplingPolicy};
pub use error::{Result, ScoutError};
pub use factory::{
    SampleBatch, SampleFailure, create_structural_metadata_fetcher, create_table_sampler,
    create_table_sampler_with_policy, get_structural_metadata, sample_table,
    sample_table_with_policy, sample_tables,
};
pub use models::{
    ColumnSchema, Dialect, IntrospectionFilters, SamplingMethod, StructuralMetadata,
    TableMetadata, TableSample, TableType,
};
pub use sampling::TableSampler;
pub use sampling::sizing::{calculate_sample_percentage, get_dynamic_sample_size};
pub use structural::StructuralMetadataFetcher;
pub use validation::validate_filters;
