//! MySQL query adapter tests against a real server.
//!
//! This test suite covers:
//! - Column metadata for results without rows
//! - Nullability reported from the table definition
//! - Column schemas on an empty table sample

#![cfg(feature = "mysql")]

use dbscout_core::adapters::mysql::MySqlQueryAdapter;
use dbscout_core::{
    Dialect, PoolConfig, QueryAdapter, QueryParam, TableMetadata, TableType, sample_table,
};
use sqlx::MySqlPool;
use std::time::Duration;
use testcontainers_modules::{mysql::Mysql, testcontainers::runners::AsyncRunner};

/// Waits until the server accepts queries
async fn wait_for_mysql_ready(database_url: &str, max_attempts: u32) -> bool {
    for attempt in 1..=max_attempts {
        if let Ok(pool) = MySqlPool::connect(database_url).await {
            let ready = sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok();
            pool.close().await;
            if ready {
                return true;
            }
        }
        if attempt < max_attempts {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
    false
}

#[tokio::test]
async fn test_empty_result_reports_columns() {
    let Ok(mysql) = Mysql::default().start().await else {
        eprintln!("Docker is not available, skipping");
        return;
    };
    let port = mysql.get_host_port_ipv4(3306).await.unwrap();
    let database_url = format!("mysql://root@localhost:{}/test", port);
    assert!(wait_for_mysql_ready(&database_url, 30).await);

    let pool = MySqlPool::connect(&database_url).await.unwrap();
    sqlx::query("CREATE TABLE sales (id INTEGER PRIMARY KEY, region TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let config = PoolConfig::new().with_read_only(true);
    let adapter = MySqlQueryAdapter::connect(&database_url, &config)
        .await
        .unwrap();

    let result = adapter
        .query(
            "SELECT * FROM sales WHERE region = ?",
            &[QueryParam::from("emea")],
            Some(10),
        )
        .await
        .unwrap();
    assert_eq!(result.row_count(), 0);
    let names: Vec<&str> = result.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "region"]);
    assert_eq!(result.fields[0].data_type, "INT");
    assert_eq!(result.fields[0].nullable, Some(false));

    let sales = TableMetadata::new("test", "test", "sales", TableType::Table);
    let sample = sample_table(&adapter, Dialect::MySQL, &sales, 10)
        .await
        .unwrap();
    assert_eq!(sample.sample_size, 0);
    assert_eq!(sample.column_schemas.map(|c| c.len()), Some(2));

    adapter.close().await;
}
