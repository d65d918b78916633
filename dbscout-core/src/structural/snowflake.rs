//! Snowflake structural metadata.
//!
//! `INFORMATION_SCHEMA` is scoped to one database, so each database's
//! `INFORMATION_SCHEMA.TABLES` is unioned. Without a `databases` filter the
//! databases come from `SHOW DATABASES` first. Database names become quoted
//! identifiers (they cannot be bound), while every other filter value is
//! bound as a parameter.

use super::{
    CatalogQuery, CatalogSource, FilterColumns, Placeholder, PredicateBuilder,
    StructuralMetadataFetcher, execute_catalog_query, not_in_literals, table_from_common_columns,
};
use crate::adapters::{QueryAdapter, Row};
use crate::coercion::{quote_identifier, row_bool, row_string, row_value};
use crate::error::{Result, ScoutError};
use crate::models::{Dialect, IntrospectionFilters, StructuralMetadata, TableMetadata};
use crate::validation::validate_filters;
use async_trait::async_trait;

const SYSTEM_SCHEMAS: &[&str] = &["INFORMATION_SCHEMA"];

const SHOW_DATABASES: &str = "SHOW DATABASES";

const TABLE_COLUMNS: &str = "TABLE_CATALOG AS database_name,
         TABLE_SCHEMA AS schema_name,
         TABLE_NAME AS table_name,
         TABLE_TYPE AS table_type,
         ROW_COUNT AS row_count,
         BYTES AS size_bytes,
         COMMENT AS comment,
         CREATED AS created,
         LAST_ALTERED AS last_modified,
         CLUSTERING_KEY AS clustering_key,
         IS_TRANSIENT AS is_transient";

/// Reads `INFORMATION_SCHEMA.TABLES` of one or more databases
#[derive(Debug, Clone, Default)]
pub struct SnowflakeFetcher;

impl SnowflakeFetcher {
    /// Creates the fetcher
    pub fn new() -> Self {
        Self
    }
}

/// Parses a Snowflake clustering key such as `LINEAR(region, to_date(ts))`.
///
/// Commas nested inside expressions do not split keys; surrounding quotes
/// are removed from plain identifiers.
pub fn parse_clustering_key(raw: &str) -> Option<Vec<String>> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("LINEAR(")
        .or_else(|| trimmed.strip_prefix("linear("))
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(trimmed);

    let mut keys = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in inner.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => keys.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    keys.push(current);

    let keys: Vec<String> = keys
        .into_iter()
        .map(|key| {
            let key = key.trim();
            key.strip_prefix('"')
                .and_then(|k| k.strip_suffix('"'))
                .unwrap_or(key)
                .to_string()
        })
        .filter(|key| !key.is_empty())
        .collect();

    (!keys.is_empty()).then_some(keys)
}

#[async_trait]
impl StructuralMetadataFetcher for SnowflakeFetcher {
    fn dialect(&self) -> Dialect {
        Dialect::Snowflake
    }

    async fn get_structural_metadata(
        &self,
        adapter: &dyn QueryAdapter,
        filters: Option<&IntrospectionFilters>,
    ) -> Result<StructuralMetadata> {
        let effective = filters.cloned().unwrap_or_default();
        validate_filters(&effective)?;

        let databases = match &effective.databases {
            Some(databases) => databases.clone(),
            None => list_databases(adapter).await?,
        };
        if databases.is_empty() {
            tracing::info!("No accessible Snowflake databases, nothing to fetch");
            return Ok(StructuralMetadata::new(
                Dialect::Snowflake,
                Vec::new(),
                filters.cloned(),
            ));
        }

        let resolved = IntrospectionFilters {
            databases: Some(databases),
            ..effective
        };
        let query = self.catalog_query(&resolved);
        execute_catalog_query(self, adapter, &query, filters).await
    }
}

/// Names of every database the session can access
async fn list_databases(adapter: &dyn QueryAdapter) -> Result<Vec<String>> {
    let result = adapter
        .query(SHOW_DATABASES, &[], None)
        .await
        .map_err(|error| {
            tracing::error!("Failed to list Snowflake databases: {}", error);
            ScoutError::StructuralFetch {
                dialect: Dialect::Snowflake,
                source: error,
            }
        })?;

    let databases: Vec<String> = result
        .rows
        .iter()
        .filter_map(|row| row_string(row, "name"))
        .collect();
    tracing::debug!("Found {} Snowflake databases", databases.len());
    Ok(databases)
}

impl CatalogSource for SnowflakeFetcher {
    /// `filters.databases` holds the resolved, non-empty database list
    fn catalog_query(&self, filters: &IntrospectionFilters) -> CatalogQuery {
        let sources = filters
            .databases
            .iter()
            .flatten()
            .map(|database| {
                format!(
                    "  SELECT {}\n  FROM {}.INFORMATION_SCHEMA.TABLES",
                    TABLE_COLUMNS,
                    quote_identifier(database, Dialect::Snowflake)
                )
            })
            .collect::<Vec<_>>()
            .join("\n  UNION ALL\n");

        // The databases filter already chose the sources above
        let scoped = IntrospectionFilters {
            databases: None,
            ..filters.clone()
        };
        let mut predicates = PredicateBuilder::new(Placeholder::Question);
        predicates
            .constant(not_in_literals("schema_name", SYSTEM_SCHEMAS))
            .apply_filters(
                &scoped,
                FilterColumns {
                    database: "database_name",
                    schema: "schema_name",
                    table: "table_name",
                },
            );

        CatalogQuery {
            sql: format!(
                "SELECT * FROM (\n{}\n) AS catalog\n{}\nORDER BY database_name, schema_name, table_name",
                sources,
                predicates.where_clause()
            ),
            params: predicates.into_params(),
        }
    }

    fn table_from_row(&self, row: &Row) -> Option<TableMetadata> {
        let mut table = table_from_common_columns(row)?;
        table.clustering_keys =
            row_string(row, "clustering_key").and_then(|raw| parse_clustering_key(&raw));
        if row_value(row, "is_transient").is_some_and(|v| !v.is_null()) {
            let mut extras = serde_json::Map::new();
            extras.insert(
                "is_transient".to_string(),
                serde_json::Value::Bool(row_bool(row, "is_transient")),
            );
            table.metadata = Some(extras);
        }
        Some(table)
    }
}
