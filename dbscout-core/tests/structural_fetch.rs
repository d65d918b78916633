//! Structural fetches through the factory: filter validation, parameter
//! binding and row normalization.

use dbscout_core::adapters::MockAdapter;
use dbscout_core::{
    Dialect, IntrospectionFilters, QueryParam, ScoutError, TableType,
    create_structural_metadata_fetcher, create_table_sampler, get_structural_metadata,
};
use serde_json::json;

#[test]
fn test_factory_dispatch_for_every_dialect() {
    for dialect in Dialect::ALL {
        let fetcher = create_structural_metadata_fetcher(dialect);
        let sampler = create_table_sampler(dialect);
        assert_eq!(fetcher.dialect(), dialect);
        assert_eq!(sampler.dialect(), dialect);
    }
}

#[test]
fn test_unknown_dialect_is_rejected_when_parsed() {
    let err = "oracle".parse::<Dialect>().unwrap_err();
    assert!(matches!(err, ScoutError::UnsupportedDialect { .. }));
    assert_eq!(err.to_string(), "Unsupported dialect: oracle");
}

#[tokio::test]
async fn test_empty_filter_list_issues_no_query() {
    for dialect in Dialect::ALL {
        let adapter = MockAdapter::new();
        let filters = IntrospectionFilters::new().with_schemas(Vec::<String>::new());

        let err = get_structural_metadata(&adapter, dialect, Some(&filters))
            .await
            .unwrap_err();

        match err {
            ScoutError::InvalidFilter { field, message } => {
                assert_eq!(field, "schemas");
                assert_eq!(
                    message,
                    "Schema filter array is empty. Provide at least one schema name or remove the filter."
                );
            }
            other => panic!("unexpected error for {dialect}: {other:?}"),
        }
        assert_eq!(adapter.query_count(), 0, "{dialect} issued a query");
    }
}

#[tokio::test]
async fn test_mysql_schema_filter_is_bound() {
    let adapter = MockAdapter::new();
    let filters = IntrospectionFilters::new().with_schemas(["analytics"]);

    let metadata = get_structural_metadata(&adapter, Dialect::MySQL, Some(&filters))
        .await
        .unwrap();

    let query = adapter.last_query().unwrap();
    assert!(query.sql.contains("t.TABLE_SCHEMA IN (?)"));
    assert!(!query.sql.contains("'analytics'"));
    assert_eq!(query.params, vec![QueryParam::from("analytics")]);
    assert_eq!(query.max_rows, None);
    assert_eq!(metadata.filters, Some(filters));
    assert!(metadata.tables.is_empty());
}

#[tokio::test]
async fn test_filter_values_never_reach_sql_text() {
    let hostile = "x'); DROP TABLE users; --";
    for dialect in Dialect::ALL {
        let adapter = match dialect {
            // Database list for the unfiltered Snowflake catalog
            Dialect::Snowflake => MockAdapter::new().with_rows(
                [json!({"name": "ANALYTICS"})]
                    .into_iter()
                    .filter_map(|v| v.as_object().cloned())
                    .collect(),
            ),
            _ => MockAdapter::new(),
        };
        let filters = IntrospectionFilters::new()
            .with_tables([hostile])
            .excluding_tables([hostile]);

        get_structural_metadata(&adapter, dialect, Some(&filters))
            .await
            .unwrap();

        let query = adapter.last_query().unwrap();
        assert!(!query.sql.contains("DROP TABLE"), "{dialect} inlined a filter value");
        assert!(!query.params.is_empty());
    }
}

#[tokio::test]
async fn test_postgres_rows_are_normalized() {
    let rows = vec![
        json!({
            "database_name": "shop",
            "schema_name": "public",
            "table_name": "orders",
            "table_type": "BASE TABLE",
            "row_count": "5000000",
            "size_bytes": 734003200i64,
            "comment": null,
            "created": null,
            "last_modified": null
        }),
        json!({
            "database_name": "shop",
            "schema_name": "public",
            "table_name": "v_orders",
            "table_type": "VIEW",
            "row_count": null,
            "size_bytes": null
        }),
        json!({"schema_name": "public"}),
    ]
    .into_iter()
    .filter_map(|v| v.as_object().cloned())
    .collect();

    let adapter = MockAdapter::new().with_rows(rows);
    let metadata = get_structural_metadata(&adapter, Dialect::PostgreSQL, None)
        .await
        .unwrap();

    assert_eq!(metadata.data_source_type, Dialect::PostgreSQL);
    assert!(metadata.data_source_id.is_empty());
    assert_eq!(metadata.filters, None);
    assert_eq!(metadata.tables.len(), 2);
    assert_eq!(metadata.tables[0].row_count, 5_000_000);
    assert_eq!(metadata.tables[0].size_bytes, Some(734_003_200));
    assert_eq!(metadata.tables[1].table_type, TableType::View);
    assert_eq!(metadata.tables[1].row_count, 0);
}

#[tokio::test]
async fn test_catalog_failure_is_wrapped() {
    let adapter = MockAdapter::new().with_error("permission denied for view svv_table_info");

    let err = get_structural_metadata(&adapter, Dialect::Redshift, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScoutError::StructuralFetch {
            dialect: Dialect::Redshift,
            ..
        }
    ));
    assert_eq!(
        err.to_string(),
        "Failed to fetch structural metadata from Redshift: permission denied for view svv_table_info"
    );
}
