//! PostgreSQL structural metadata.
//!
//! `information_schema.tables` does not list materialized views, so the
//! catalog query unions it with `pg_matviews`. Row estimates prefer the live
//! tuple counter from `pg_stat_user_tables` and fall back to
//! `pg_class.reltuples`.

use super::{
    CatalogQuery, CatalogSource, FilterColumns, Placeholder, PredicateBuilder,
    StructuralMetadataFetcher, extras, not_in_literals, run_fetch, table_from_common_columns,
};
use crate::adapters::{QueryAdapter, Row};
use crate::error::Result;
use crate::models::{Dialect, IntrospectionFilters, StructuralMetadata, TableMetadata};
use async_trait::async_trait;

const SYSTEM_SCHEMAS: &[&str] = &["pg_catalog", "information_schema"];

const CATALOG_SQL: &str = r#"SELECT * FROM (
  SELECT t.table_catalog::text AS database_name,
         t.table_schema::text AS schema_name,
         t.table_name::text AS table_name,
         t.table_type::text AS table_type,
         GREATEST(COALESCE(s.n_live_tup, c.reltuples::bigint, 0), 0) AS row_count,
         pg_total_relation_size(c.oid) AS size_bytes,
         obj_description(c.oid, 'pg_class') AS comment,
         s.last_vacuum,
         s.last_autovacuum,
         s.last_analyze,
         s.last_autoanalyze
  FROM information_schema.tables t
  LEFT JOIN pg_namespace n ON n.nspname = t.table_schema
  LEFT JOIN pg_class c ON c.relnamespace = n.oid AND c.relname = t.table_name
  LEFT JOIN pg_stat_user_tables s ON s.relid = c.oid
  UNION ALL
  SELECT current_database()::text,
         m.schemaname::text,
         m.matviewname::text,
         'MATERIALIZED VIEW',
         GREATEST(c.reltuples::bigint, 0),
         pg_total_relation_size(c.oid),
         obj_description(c.oid, 'pg_class'),
         NULL, NULL, NULL, NULL
  FROM pg_matviews m
  JOIN pg_namespace n ON n.nspname = m.schemaname
  JOIN pg_class c ON c.relnamespace = n.oid AND c.relname = m.matviewname
) AS catalog"#;

const EXTRA_COLUMNS: &[&str] = &[
    "last_vacuum",
    "last_autovacuum",
    "last_analyze",
    "last_autoanalyze",
];

/// Reads `information_schema`, `pg_class`, `pg_stat_user_tables` and `pg_matviews`
#[derive(Debug, Clone, Default)]
pub struct PostgresFetcher;

impl PostgresFetcher {
    /// Creates the fetcher
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StructuralMetadataFetcher for PostgresFetcher {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSQL
    }

    async fn get_structural_metadata(
        &self,
        adapter: &dyn QueryAdapter,
        filters: Option<&IntrospectionFilters>,
    ) -> Result<StructuralMetadata> {
        run_fetch(self, adapter, filters).await
    }
}

impl CatalogSource for PostgresFetcher {
    fn catalog_query(&self, filters: &IntrospectionFilters) -> CatalogQuery {
        let mut predicates = PredicateBuilder::new(Placeholder::PostgresArray);
        predicates
            .constant(not_in_literals("schema_name", SYSTEM_SCHEMAS))
            .constant("schema_name NOT LIKE 'pg_toast%'")
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
        table.metadata = extras(row, EXTRA_COLUMNS);
        Some(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockAdapter, QueryParam};
    use crate::error::ScoutError;
    use crate::models::TableType;
    use serde_json::json;

    #[tokio::test]
    async fn test_rows_are_normalized() {
        let rows = vec![
            json!({
                "database_name": "shop",
                "schema_name": "public",
                "table_name": "orders",
                "table_type": "BASE TABLE",
                "row_count": "5000000",
                "size_bytes": 734003200,
                "comment": "customer orders",
                "last_vacuum": null,
                "last_autovacuum": "2024-05-01T00:00:00Z",
                "last_analyze": null,
                "last_autoanalyze": null
            }),
            json!({
                "database_name": "shop",
                "schema_name": "public",
                "table_name": "daily_totals",
                "table_type": "MATERIALIZED VIEW",
                "row_count": 365,
                "size_bytes": null,
            }),
            json!({
                "database_name": "shop",
                "schema_name": "remote",
                "table_name": "ledger",
                "table_type": "FOREIGN",
                "row_count": -1,
            }),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();

        let adapter = MockAdapter::new().with_rows(rows);
        let metadata = PostgresFetcher::new()
            .get_structural_metadata(&adapter, None)
            .await
            .unwrap();

        assert_eq!(metadata.data_source_type, Dialect::PostgreSQL);
        assert_eq!(metadata.tables.len(), 3);

        let orders = &metadata.tables[0];
        assert_eq!(orders.row_count, 5_000_000);
        assert_eq!(orders.size_bytes, Some(734_003_200));
        assert_eq!(orders.comment.as_deref(), Some("customer orders"));
        let extras = orders.metadata.as_ref().unwrap();
        assert_eq!(extras.len(), 1);
        assert!(extras.contains_key("last_autovacuum"));

        assert_eq!(metadata.tables[1].table_type, TableType::MaterializedView);
        assert_eq!(metadata.tables[1].size_bytes, None);
        assert_eq!(metadata.tables[2].table_type, TableType::ExternalTable);
        assert_eq!(metadata.tables[2].row_count, 0);
    }

    #[tokio::test]
    async fn test_filters_bind_text_arrays() {
        let adapter = MockAdapter::new();
        let filters = IntrospectionFilters::new()
            .with_schemas(["public"])
            .with_tables(["orders", "users"]);
        PostgresFetcher::new()
            .get_structural_metadata(&adapter, Some(&filters))
            .await
            .unwrap();

        let query = adapter.last_query().unwrap();
        assert!(query.sql.contains("schema_name NOT IN ('pg_catalog', 'information_schema')"));
        assert!(query.sql.contains("schema_name = ANY($1)"));
        assert!(query.sql.contains("table_name = ANY($2)"));
        assert!(!query.sql.contains("'orders'"));
        assert_eq!(
            query.params,
            vec![
                QueryParam::TextArray(vec!["public".into()]),
                QueryParam::TextArray(vec!["orders".into(), "users".into()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_query_failure_is_wrapped() {
        let adapter = MockAdapter::new().with_error("permission denied for schema pg_catalog");
        let err = PostgresFetcher::new()
            .get_structural_metadata(&adapter, None)
            .await
            .unwrap_err();

        match err {
            ScoutError::StructuralFetch { dialect, source } => {
                assert_eq!(dialect, Dialect::PostgreSQL);
                assert_eq!(source.message(), "permission denied for schema pg_catalog");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
