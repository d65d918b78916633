//! MySQL structural metadata.
//!
//! In MySQL a schema *is* a database, so both the `databases` and `schemas`
//! filters constrain `TABLE_SCHEMA`. `TABLE_ROWS` is an InnoDB estimate and
//! is NULL for views.

use super::{
    CatalogQuery, CatalogSource, FilterColumns, Placeholder, PredicateBuilder,
    StructuralMetadataFetcher, extras, not_in_literals, run_fetch, table_from_common_columns,
};
use crate::adapters::{QueryAdapter, Row};
use crate::error::Result;
use crate::models::{Dialect, IntrospectionFilters, StructuralMetadata, TableMetadata};
use async_trait::async_trait;

const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "mysql", "performance_schema", "sys"];

// Names are cast to CHAR because MySQL 8 reports some information_schema
// columns with binary collations.
const CATALOG_SQL: &str = r#"SELECT CAST(t.TABLE_SCHEMA AS CHAR) AS database_name,
       CAST(t.TABLE_SCHEMA AS CHAR) AS schema_name,
       CAST(t.TABLE_NAME AS CHAR) AS table_name,
       CAST(t.TABLE_TYPE AS CHAR) AS table_type,
       t.TABLE_ROWS AS row_count,
       t.DATA_LENGTH + t.INDEX_LENGTH AS size_bytes,
       CAST(t.TABLE_COMMENT AS CHAR) AS comment,
       t.CREATE_TIME AS created,
       t.UPDATE_TIME AS last_modified,
       CAST(t.ENGINE AS CHAR) AS engine,
       t.AUTO_INCREMENT AS auto_increment
FROM information_schema.TABLES t"#;

const EXTRA_COLUMNS: &[&str] = &["engine", "auto_increment"];

/// Reads `information_schema.TABLES`
#[derive(Debug, Clone, Default)]
pub struct MySqlFetcher;

impl MySqlFetcher {
    /// Creates the fetcher
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StructuralMetadataFetcher for MySqlFetcher {
    fn dialect(&self) -> Dialect {
        Dialect::MySQL
    }

    async fn get_structural_metadata(
        &self,
        adapter: &dyn QueryAdapter,
        filters: Option<&IntrospectionFilters>,
    ) -> Result<StructuralMetadata> {
        run_fetch(self, adapter, filters).await
    }
}

impl CatalogSource for MySqlFetcher {
    fn catalog_query(&self, filters: &IntrospectionFilters) -> CatalogQuery {
        let mut predicates = PredicateBuilder::new(Placeholder::Question);
        predicates
            .constant(not_in_literals("t.TABLE_SCHEMA", SYSTEM_SCHEMAS))
            .apply_filters(
                filters,
                FilterColumns {
                    database: "t.TABLE_SCHEMA",
                    schema: "t.TABLE_SCHEMA",
                    table: "t.TABLE_NAME",
                },
            );

        CatalogQuery {
            sql: format!(
                "{}\n{}\nORDER BY t.TABLE_SCHEMA, t.TABLE_NAME",
                CATALOG_SQL,
                predicates.where_clause()
            ),
            params: predicates.into_params(),
        }
    }

    fn table_from_row(&self, row: &Row) -> Option<TableMetadata> {
        let mut table = table_from_common_columns(row)?;
        // MySQL fills TABLE_COMMENT with the literal "VIEW" for views
        if table.is_view() && table.comment.as_deref() == Some("VIEW") {
            table.comment = None;
        }
        table.metadata = extras(row, EXTRA_COLUMNS);
        Some(table)
    }
}
