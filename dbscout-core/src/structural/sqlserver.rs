//! SQL Server structural metadata.
//!
//! Tables come from `sys.tables` and views from `sys.views`. Row counts are
//! summed over the heap or clustered index partitions; sizes are allocated
//! pages times 8 KB. A view with a clustered index (an indexed view) stores
//! its rows and is reported as a materialized view.

use super::{
    CatalogQuery, CatalogSource, FilterColumns, Placeholder, PredicateBuilder,
    StructuralMetadataFetcher, not_in_literals, run_fetch, table_from_common_columns,
};
use crate::adapters::{QueryAdapter, Row};
use crate::coercion::row_bool;
use crate::error::Result;
use crate::models::{Dialect, IntrospectionFilters, StructuralMetadata, TableMetadata};
use async_trait::async_trait;

const SYSTEM_SCHEMAS: &[&str] = &["sys", "INFORMATION_SCHEMA", "guest"];

const CATALOG_SQL: &str = r#"SELECT * FROM (
  SELECT DB_NAME() AS database_name,
         s.name AS schema_name,
         t.name AS table_name,
         CASE WHEN t.is_external = 1 THEN 'EXTERNAL TABLE' ELSE 'BASE TABLE' END AS table_type,
         p.row_count AS row_count,
         a.size_bytes AS size_bytes,
         CAST(ep.value AS NVARCHAR(4000)) AS comment,
         t.create_date AS created,
         t.modify_date AS last_modified,
         t.is_external AS is_external
  FROM sys.tables t
  JOIN sys.schemas s ON s.schema_id = t.schema_id
  OUTER APPLY (
    SELECT SUM(ps.rows) AS row_count
    FROM sys.partitions ps
    WHERE ps.object_id = t.object_id AND ps.index_id IN (0, 1)
  ) p
  OUTER APPLY (
    SELECT SUM(au.total_pages) * 8 * 1024 AS size_bytes
    FROM sys.partitions ps
    JOIN sys.allocation_units au ON au.container_id = ps.partition_id
    WHERE ps.object_id = t.object_id
  ) a
  LEFT JOIN sys.extended_properties ep
    ON ep.major_id = t.object_id AND ep.minor_id = 0 AND ep.class = 1 AND ep.name = 'MS_Description'
  UNION ALL
  SELECT DB_NAME(),
         s.name,
         v.name,
         CASE WHEN EXISTS (
           SELECT 1 FROM sys.indexes i WHERE i.object_id = v.object_id AND i.index_id = 1
         ) THEN 'MATERIALIZED VIEW' ELSE 'VIEW' END,
         COALESCE(p.row_count, 0),
         a.size_bytes,
         CAST(ep.value AS NVARCHAR(4000)),
         v.create_date,
         v.modify_date,
         CAST(0 AS BIT)
  FROM sys.views v
  JOIN sys.schemas s ON s.schema_id = v.schema_id
  OUTER APPLY (
    SELECT SUM(ps.rows) AS row_count
    FROM sys.partitions ps
    WHERE ps.object_id = v.object_id AND ps.index_id = 1
  ) p
  OUTER APPLY (
    SELECT SUM(au.total_pages) * 8 * 1024 AS size_bytes
    FROM sys.partitions ps
    JOIN sys.allocation_units au ON au.container_id = ps.partition_id
    WHERE ps.object_id = v.object_id
  ) a
  LEFT JOIN sys.extended_properties ep
    ON ep.major_id = v.object_id AND ep.minor_id = 0 AND ep.class = 1 AND ep.name = 'MS_Description'
) AS catalog"#;

/// Reads `sys.tables`, `sys.views`, `sys.partitions` and `sys.allocation_units`
#[derive(Debug, Clone, Default)]
pub struct SqlServerFetcher;

impl SqlServerFetcher {
    /// Creates the fetcher
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StructuralMetadataFetcher for SqlServerFetcher {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    async fn get_structural_metadata(
        &self,
        adapter: &dyn QueryAdapter,
        filters: Option<&IntrospectionFilters>,
    ) -> Result<StructuralMetadata> {
        run_fetch(self, adapter, filters).await
    }
}

impl CatalogSource for SqlServerFetcher {
    fn catalog_query(&self, filters: &IntrospectionFilters) -> CatalogQuery {
        let mut predicates = PredicateBuilder::new(Placeholder::AtP);
        predicates
            .constant(not_in_literals("schema_name", SYSTEM_SCHEMAS))
            .apply_filters(
                filters,
                FilterColumns {
                    database: "database_name",
                    schema: "schema_name",
                    table: "table_name",
                },
            );

        CatalogQuery {
            sql: format!(
                "{}\n{}\nORDER BY schema_name, table_name",
                CATALOG_SQL,
                predicates.where_clause()
            ),
            params: predicates.into_params(),
        }
    }

    fn table_from_row(&self, row: &Row) -> Option<TableMetadata> {
        let mut table = table_from_common_columns(row)?;
        if row_bool(row, "is_external") {
            let mut extras = serde_json::Map::new();
            extras.insert("is_external".to_string(), serde_json::Value::Bool(true));
            table.metadata = Some(extras);
        }
        Some(table)
    }
}
