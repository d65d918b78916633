//! Redshift structural metadata.
//!
//! `SVV_TABLE_INFO` only lists tables that hold data, and never views, so
//! views come from `pg_views`. `size` is reported in 1 MB blocks.

use super::{
    CatalogQuery, CatalogSource, FilterColumns, Placeholder, PredicateBuilder,
    StructuralMetadataFetcher, extras, not_in_literals, run_fetch, table_from_common_columns,
};
use crate::adapters::{QueryAdapter, Row};
use crate::coercion::row_string;
use crate::error::Result;
use crate::models::{Dialect, IntrospectionFilters, StructuralMetadata, TableMetadata};
use async_trait::async_trait;

const SYSTEM_SCHEMAS: &[&str] = &["pg_catalog", "information_schema", "pg_internal"];

const CATALOG_SQL: &str = r#"SELECT * FROM (
  SELECT i."database"::varchar AS database_name,
         i."schema"::varchar AS schema_name,
         i."table"::varchar AS table_name,
         'BASE TABLE'::varchar AS table_type,
         i.tbl_rows::bigint AS row_count,
         i.size::bigint * 1048576 AS size_bytes,
         i.sortkey1::varchar AS sortkey1,
         i.diststyle::varchar AS diststyle,
         i.unsorted AS unsorted,
         i.stats_off AS stats_off
  FROM svv_table_info i
  UNION ALL
  SELECT current_database()::varchar,
         v.schemaname::varchar,
         v.viewname::varchar,
         'VIEW'::varchar,
         0::bigint,
         NULL::bigint,
         NULL::varchar,
         NULL::varchar,
         NULL,
         NULL
  FROM pg_views v
) AS catalog"#;

const EXTRA_COLUMNS: &[&str] = &["diststyle", "unsorted", "stats_off"];

/// Reads `SVV_TABLE_INFO` and `pg_views`
#[derive(Debug, Clone, Default)]
pub struct RedshiftFetcher;

impl RedshiftFetcher {
    /// Creates the fetcher
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StructuralMetadataFetcher for RedshiftFetcher {
    fn dialect(&self) -> Dialect {
        Dialect::Redshift
    }

    async fn get_structural_metadata(
        &self,
        adapter: &dyn QueryAdapter,
        filters: Option<&IntrospectionFilters>,
    ) -> Result<StructuralMetadata> {
        run_fetch(self, adapter, filters).await
    }
}

impl CatalogSource for RedshiftFetcher {
    fn catalog_query(&self, filters: &IntrospectionFilters) -> CatalogQuery {
        let mut predicates = PredicateBuilder::new(Placeholder::Dollar);
        predicates
            .constant(not_in_literals("schema_name", SYSTEM_SCHEMAS))
            .constant("schema_name NOT LIKE 'pg_temp%'")
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
        // Only the leading sort key column is exposed by SVV_TABLE_INFO
        table.clustering_keys = row_string(row, "sortkey1")
            .filter(|key| !key.starts_with("INTERLEAVED"))
            .map(|key| vec![key]);
        table.metadata = extras(row, EXTRA_COLUMNS);
        Some(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockAdapter, QueryParam};
    use crate::models::TableType;
    use serde_json::json;

    #[tokio::test]
    async fn test_expanded_dollar_parameters() {
        let adapter = MockAdapter::new();
        let filters = IntrospectionFilters::new()
            .with_schemas(["public", "staging"])
            .excluding_tables(["audit_log"]);
        RedshiftFetcher::new()
            .get_structural_metadata(&adapter, Some(&filters))
            .await
            .unwrap();

        let query = adapter.last_query().unwrap();
        assert!(query.sql.contains("FROM svv_table_info i"));
        assert!(query.sql.contains("FROM pg_views v"));
        assert!(query.sql.contains("schema_name IN ($1, $2)"));
        assert!(query.sql.contains("table_name NOT IN ($3)"));
        assert_eq!(
            query.params,
            vec![
                QueryParam::from("public"),
                QueryParam::from("staging"),
                QueryParam::from("audit_log"),
            ]
        );
    }

    #[tokio::test]
    async fn test_sort_key_and_extras() {
        let rows = vec![
            json!({
                "database_name": "dev",
                "schema_name": "public",
                "table_name": "clicks",
                "table_type": "BASE TABLE",
                "row_count": "80000000",
                "size_bytes": 2097152,
                "sortkey1": "event_time",
                "diststyle": "KEY(user_id)",
                "unsorted": 3.5,
                "stats_off": 0.0
            }),
            json!({
                "database_name": "dev",
                "schema_name": "public",
                "table_name": "v_clicks",
                "table_type": "VIEW",
                "row_count": 0,
                "size_bytes": null,
                "sortkey1": null
            }),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();

        let adapter = MockAdapter::new().with_rows(rows);
        let metadata = RedshiftFetcher::new()
            .get_structural_metadata(&adapter, None)
            .await
            .unwrap();

        let clicks = &metadata.tables[0];
        assert_eq!(clicks.row_count, 80_000_000);
        assert_eq!(clicks.size_bytes, Some(2_097_152));
        assert_eq!(clicks.clustering_keys, Some(vec!["event_time".to_string()]));
        assert_eq!(clicks.metadata.as_ref().unwrap()["diststyle"], "KEY(user_id)");

        let view = &metadata.tables[1];
        assert_eq!(view.table_type, TableType::View);
        assert!(view.clustering_keys.is_none());
        assert!(view.metadata.is_none());
    }
}
