//! Structural metadata fetchers, one per dialect.
//!
//! Each fetcher issues one catalog query against the dialect's native
//! introspection source, aliasing every column to a shared vocabulary
//! (`database_name`, `schema_name`, `table_name`, `table_type`, `row_count`,
//! `size_bytes`, ...), so row normalization is common code. Filters are
//! always bound as parameters; system schemas are always excluded.
//!
//! Snowflake first lists the accessible databases when no `databases`
//! filter is given. Fetches are all-or-nothing: a failing catalog query yields
//! [`ScoutError::StructuralFetch`] and no partial table list.

use crate::adapters::{QueryAdapter, QueryParam, Row};
use crate::coercion::{row_count, row_date, row_optional_count, row_string, row_value};
use crate::error::{Result, ScoutError};
use crate::models::{
    Dialect, IntrospectionFilters, StructuralMetadata, TableMetadata, TableType,
};
use crate::validation::validate_filters;
use async_trait::async_trait;

pub mod bigquery;
pub mod mysql;
pub mod postgres;
pub mod redshift;
pub mod snowflake;
pub mod sqlserver;

pub use bigquery::BigQueryFetcher;
pub use mysql::MySqlFetcher;
pub use postgres::PostgresFetcher;
pub use redshift::RedshiftFetcher;
pub use snowflake::SnowflakeFetcher;
pub use sqlserver::SqlServerFetcher;

/// Lists the tables and views of one data source.
///
/// # Object Safety
/// This trait is object-safe; the factory hands out
/// `Box<dyn StructuralMetadataFetcher>`.
#[async_trait]
pub trait StructuralMetadataFetcher: Send + Sync {
    /// The dialect whose catalog this fetcher reads
    fn dialect(&self) -> Dialect;

    /// Fetches structural metadata, optionally restricted by `filters`.
    ///
    /// # Errors
    /// - [`ScoutError::InvalidFilter`] for an empty filter list (no query issued)
    /// - [`ScoutError::StructuralFetch`] when the catalog query fails
    async fn get_structural_metadata(
        &self,
        adapter: &dyn QueryAdapter,
        filters: Option<&IntrospectionFilters>,
    ) -> Result<StructuralMetadata>;
}

/// A catalog statement with its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    /// Catalog statement with placeholders
    pub sql: String,
    /// Filter values, in placeholder order
    pub params: Vec<QueryParam>,
}

/// Per-dialect query builder and row mapper plugged into [`run_fetch`]
pub(crate) trait CatalogSource: StructuralMetadataFetcher {
    /// Builds the catalog query for already-validated filters
    fn catalog_query(&self, filters: &IntrospectionFilters) -> CatalogQuery;

    /// Maps one catalog row; rows without a table name are skipped
    fn table_from_row(&self, row: &Row) -> Option<TableMetadata>;
}

/// Validates, queries and normalizes for one dialect.
pub(crate) async fn run_fetch<S>(
    source: &S,
    adapter: &dyn QueryAdapter,
    filters: Option<&IntrospectionFilters>,
) -> Result<StructuralMetadata>
where
    S: CatalogSource + ?Sized,
{
    let effective = filters.cloned().unwrap_or_default();
    validate_filters(&effective)?;

    let query = source.catalog_query(&effective);
    execute_catalog_query(source, adapter, &query, filters).await
}

/// Runs a built catalog query and normalizes its rows.
///
/// `filters` are the caller's filters, echoed back in the result.
pub(crate) async fn execute_catalog_query<S>(
    source: &S,
    adapter: &dyn QueryAdapter,
    query: &CatalogQuery,
    filters: Option<&IntrospectionFilters>,
) -> Result<StructuralMetadata>
where
    S: CatalogSource + ?Sized,
{
    let dialect = source.dialect();
    tracing::debug!(
        "Fetching {} catalog with {} parameters: {}",
        dialect,
        query.params.len(),
        query.sql
    );

    let result = adapter
        .query(&query.sql, &query.params, None)
        .await
        .map_err(|error| {
            tracing::error!("Failed to fetch structural metadata from {}: {}", dialect, error);
            ScoutError::StructuralFetch {
                dialect,
                source: error,
            }
        })?;

    let tables: Vec<TableMetadata> = result
        .rows
        .iter()
        .filter_map(|row| source.table_from_row(row))
        .collect();

    let metadata = StructuralMetadata::new(dialect, tables, filters.cloned());
    tracing::info!(
        "Fetched {} tables ({} views) from {}",
        metadata.tables.len(),
        metadata.view_count(),
        dialect
    );
    Ok(metadata)
}

/// Maps the shared column vocabulary onto a [`TableMetadata`].
///
/// Dialect fetchers add clustering keys and extras on top.
pub(crate) fn table_from_common_columns(row: &Row) -> Option<TableMetadata> {
    let name = row_string(row, "table_name")?;
    let schema = row_string(row, "schema_name").unwrap_or_default();
    let database = row_string(row, "database_name").unwrap_or_default();
    let table_type = row_string(row, "table_type")
        .map(|raw| TableType::from_catalog(&raw))
        .unwrap_or(TableType::Table);

    let mut table = TableMetadata::new(database, schema, name, table_type)
        .with_row_count(row_count(row, "row_count"));
    table.size_bytes = row_optional_count(row, "size_bytes");
    table.comment = row_string(row, "comment");
    table.created = row_date(row, "created");
    table.last_modified = row_date(row, "last_modified");
    Some(table)
}

/// Copies the non-null values of `columns` into an extras bag
pub(crate) fn extras(row: &Row, columns: &[&str]) -> Option<serde_json::Map<String, serde_json::Value>> {
    let bag: serde_json::Map<String, serde_json::Value> = columns
        .iter()
        .filter_map(|column| {
            row_value(row, column)
                .filter(|value| !value.is_null())
                .map(|value| ((*column).to_string(), value.clone()))
        })
        .collect();
    (!bag.is_empty()).then_some(bag)
}

/// Placeholder syntax for bound filter values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placeholder {
    /// `column = ANY($n)` with one text-array parameter
    PostgresArray,
    /// `column IN ($1, $2, ...)`
    Dollar,
    /// `column IN (?, ?, ...)`
    Question,
    /// `column IN (@P1, @P2, ...)`
    AtP,
}

/// Column expressions the four filter lists apply to
#[derive(Debug, Clone, Copy)]
pub(crate) struct FilterColumns {
    pub(crate) database: &'static str,
    pub(crate) schema: &'static str,
    pub(crate) table: &'static str,
}

/// Accumulates `WHERE` predicates and their parameters in order
#[derive(Debug)]
pub(crate) struct PredicateBuilder {
    style: Placeholder,
    clauses: Vec<String>,
    params: Vec<QueryParam>,
}

impl PredicateBuilder {
    pub(crate) fn new(style: Placeholder) -> Self {
        Self {
            style,
            clauses: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Adds a constant predicate (never built from caller input)
    pub(crate) fn constant(&mut self, clause: impl Into<String>) -> &mut Self {
        self.clauses.push(clause.into());
        self
    }

    /// `column` must be one of `values`
    pub(crate) fn include(&mut self, column: &str, values: &[String]) -> &mut Self {
        if values.is_empty() {
            self.clauses.push("1 = 0".to_string());
            return self;
        }
        let style = self.style;
        let clause = match style {
            Placeholder::PostgresArray => format!("{} = ANY({})", column, self.bind_array(values)),
            _ => format!("{} IN ({})", column, self.bind_scalars(values)),
        };
        self.clauses.push(clause);
        self
    }

    /// `column` must not be any of `values`; an empty list excludes nothing
    pub(crate) fn exclude(&mut self, column: &str, values: &[String]) -> &mut Self {
        if values.is_empty() {
            return self;
        }
        let style = self.style;
        let clause = match style {
            Placeholder::PostgresArray => format!("{} <> ALL({})", column, self.bind_array(values)),
            _ => format!("{} NOT IN ({})", column, self.bind_scalars(values)),
        };
        self.clauses.push(clause);
        self
    }

    /// Applies all four filter lists
    pub(crate) fn apply_filters(
        &mut self,
        filters: &IntrospectionFilters,
        columns: FilterColumns,
    ) -> &mut Self {
        if let Some(databases) = &filters.databases {
            self.include(columns.database, databases);
        }
        if let Some(schemas) = &filters.schemas {
            self.include(columns.schema, schemas);
        }
        if let Some(tables) = &filters.tables {
            self.include(columns.table, tables);
        }
        if let Some(excluded) = &filters.exclude_tables {
            self.exclude(columns.table, excluded);
        }
        self
    }

    /// `WHERE a AND b ...`, or an empty string when nothing was added
    pub(crate) fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join("\n  AND "))
        }
    }

    pub(crate) fn into_params(self) -> Vec<QueryParam> {
        self.params
    }

    fn next_placeholder(&self) -> String {
        let position = self.params.len() + 1;
        match self.style {
            Placeholder::PostgresArray | Placeholder::Dollar => format!("${}", position),
            Placeholder::Question => "?".to_string(),
            Placeholder::AtP => format!("@P{}", position),
        }
    }

    fn bind_array(&mut self, values: &[String]) -> String {
        let placeholder = self.next_placeholder();
        self.params.push(QueryParam::TextArray(values.to_vec()));
        placeholder
    }

    fn bind_scalars(&mut self, values: &[String]) -> String {
        values
            .iter()
            .map(|value| {
                let placeholder = self.next_placeholder();
                self.params.push(QueryParam::Text(value.clone()));
                placeholder
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Constant `NOT IN` list of system schemas
pub(crate) fn not_in_literals(column: &str, values: &[&str]) -> String {
    let list = values
        .iter()
        .map(|value| format!("'{}'", value))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} NOT IN ({})", column, list)
}
