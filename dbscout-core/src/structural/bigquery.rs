//! BigQuery structural metadata.
//!
//! Tables and storage figures are read from region-qualified
//! `INFORMATION_SCHEMA` views, which span every dataset of the project in
//! that region. Clustering columns are aggregated from
//! `INFORMATION_SCHEMA.COLUMNS` in ordinal order.

use super::{
    CatalogQuery, CatalogSource, FilterColumns, Placeholder, PredicateBuilder,
    StructuralMetadataFetcher, extras, not_in_literals, run_fetch, table_from_common_columns,
};
use crate::adapters::{QueryAdapter, Row};
use crate::coercion::{quote_identifier, row_string};
use crate::error::Result;
use crate::models::{Dialect, IntrospectionFilters, StructuralMetadata, TableMetadata};
use async_trait::async_trait;

const SYSTEM_SCHEMAS: &[&str] = &["INFORMATION_SCHEMA"];

const DEFAULT_REGION: &str = "us";

const EXTRA_COLUMNS: &[&str] = &["total_physical_bytes"];

/// Reads `INFORMATION_SCHEMA.TABLES` and `TABLE_STORAGE_BY_ORGANIZATION`
#[derive(Debug, Clone)]
pub struct BigQueryFetcher {
    region: String,
}

impl Default for BigQueryFetcher {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
        }
    }
}

impl BigQueryFetcher {
    /// Creates a fetcher for the `us` multi-region
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to read another region (e.g. `eu`, `europe-west2`)
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// The configured region
    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl StructuralMetadataFetcher for BigQueryFetcher {
    fn dialect(&self) -> Dialect {
        Dialect::BigQuery
    }

    async fn get_structural_metadata(
        &self,
        adapter: &dyn QueryAdapter,
        filters: Option<&IntrospectionFilters>,
    ) -> Result<StructuralMetadata> {
        run_fetch(self, adapter, filters).await
    }
}

impl CatalogSource for BigQueryFetcher {
    fn catalog_query(&self, filters: &IntrospectionFilters) -> CatalogQuery {
        let region = quote_identifier(&format!("region-{}", self.region), Dialect::BigQuery);

        let mut predicates = PredicateBuilder::new(Placeholder::Question);
        predicates
            .constant(not_in_literals("t.table_schema", SYSTEM_SCHEMAS))
            .apply_filters(
                filters,
                FilterColumns {
                    database: "t.table_catalog",
                    schema: "t.table_schema",
                    table: "t.table_name",
                },
            );

        let sql = format!(
            r#"WITH clustering AS (
  SELECT table_catalog, table_schema, table_name,
         STRING_AGG(column_name, ',' ORDER BY clustering_ordinal_position) AS clustering_columns
  FROM {region}.INFORMATION_SCHEMA.COLUMNS
  WHERE clustering_ordinal_position IS NOT NULL
  GROUP BY table_catalog, table_schema, table_name
)
SELECT t.table_catalog AS database_name,
       t.table_schema AS schema_name,
       t.table_name AS table_name,
       t.table_type AS table_type,
       s.total_rows AS row_count,
       s.total_logical_bytes AS size_bytes,
       s.total_physical_bytes AS total_physical_bytes,
       t.creation_time AS created,
       s.storage_last_modified_time AS last_modified,
       c.clustering_columns AS clustering_columns
FROM {region}.INFORMATION_SCHEMA.TABLES t
LEFT JOIN {region}.INFORMATION_SCHEMA.TABLE_STORAGE_BY_ORGANIZATION s
  ON s.project_id = t.table_catalog
  AND s.table_schema = t.table_schema
  AND s.table_name = t.table_name
LEFT JOIN clustering c
  ON c.table_catalog = t.table_catalog
  AND c.table_schema = t.table_schema
  AND c.table_name = t.table_name
{where_clause}
ORDER BY t.table_schema, t.table_name"#,
            region = region,
            where_clause = predicates.where_clause()
        );

        CatalogQuery {
            sql,
            params: predicates.into_params(),
        }
    }

    fn table_from_row(&self, row: &Row) -> Option<TableMetadata> {
        let mut table = table_from_common_columns(row)?;
        table.clustering_keys = row_string(row, "clustering_columns").map(|columns| {
            columns
                .split(',')
                .map(|column| column.trim().to_string())
                .filter(|column| !column.is_empty())
                .collect()
        });
        table.metadata = extras(row, EXTRA_COLUMNS);
        Some(table)
    }
}
