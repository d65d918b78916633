//! Query adapter boundary.
//!
//! The engine never owns a connection. Every catalog and sample query goes
//! through a [`QueryAdapter`], which callers implement for their transport
//! (or take from the feature-gated sqlx adapters in this module).
//!
//! # Module Structure
//! - `mock`: scripted, recording adapter for tests
//! - `postgres`: sqlx-backed PostgreSQL adapter (feature `postgresql`)
//! - `mysql`: sqlx-backed MySQL adapter (feature `mysql`)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod mock;

#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

pub use mock::{MockAdapter, RecordedQuery};

/// One result row keyed by column name.
///
/// Driver values arrive as JSON values: strings, numbers (including 64-bit
/// integers), booleans and null.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Bound parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    Timestamp(DateTime<Utc>),
    Bytes(Vec<u8>),
    /// Homogeneous arrays, for `= ANY($1)` style filters where supported
    TextArray(Vec<String>),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    BoolArray(Vec<bool>),
}

impl QueryParam {
    /// True for the array variants
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            QueryParam::TextArray(_)
                | QueryParam::IntArray(_)
                | QueryParam::FloatArray(_)
                | QueryParam::BoolArray(_)
        )
    }
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        QueryParam::Text(value.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        QueryParam::Text(value)
    }
}

/// Driver field metadata for one result column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: Option<bool>,
    pub length: Option<u64>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl FieldInfo {
    /// Creates field metadata with only a name and type
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            ..Default::default()
        }
    }
}

/// Rows plus field metadata returned by one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub fields: Vec<FieldInfo>,
}

impl QueryResult {
    /// Creates a result from rows and fields
    pub fn new(rows: Vec<Row>, fields: Vec<FieldInfo>) -> Self {
        Self { rows, fields }
    }

    /// Number of rows returned
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Failure reported by a query adapter.
///
/// Keeps the driver's message and, when available, the driver error itself.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl QueryError {
    /// Creates an error from a message alone
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a driver error, keeping its message
    pub fn from_source<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    /// The driver's error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Executes SQL on behalf of the engine.
///
/// # Object Safety
/// This trait is object-safe; the engine only ever sees `&dyn QueryAdapter`.
///
/// Cancellation and timeouts belong to the implementation. The engine issues
/// at most three queries per call and never retries on its own.
#[async_trait]
pub trait QueryAdapter: Send + Sync {
    /// Runs `sql` with positional `params`.
    ///
    /// `max_rows` is a hint: implementations may stop reading after that many
    /// rows, but must never return more rows than the SQL itself produces.
    ///
    /// # Errors
    /// Returns a [`QueryError`] when the statement fails to execute.
    async fn query(
        &self,
        sql: &str,
        params: &[QueryParam],
        max_rows: Option<u64>,
    ) -> Result<QueryResult, QueryError>;
}

#[async_trait]
impl<T: QueryAdapter + ?Sized> QueryAdapter for std::sync::Arc<T> {
    async fn query(
        &self,
        sql: &str,
        params: &[QueryParam],
        max_rows: Option<u64>,
    ) -> Result<QueryResult, QueryError> {
        (**self).query(sql, params, max_rows).await
    }
}

/// Number of rows a driver stream should read for a `max_rows` hint
#[cfg(any(feature = "postgresql", feature = "mysql"))]
pub(crate) fn row_limit(max_rows: Option<u64>) -> usize {
    max_rows.map_or(usize::MAX, |rows| usize::try_from(rows).unwrap_or(usize::MAX))
}

/// Binary column values are rendered as base64 strings
#[cfg(any(feature = "postgresql", feature = "mysql"))]
pub(crate) fn encode_bytes(bytes: &[u8]) -> serde_json::Value {
    use base64::Engine;
    serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[cfg(any(feature = "postgresql", feature = "mysql"))]
    #[test]
    fn test_driver_helpers() {
        assert_eq!(row_limit(Some(25)), 25);
        assert_eq!(row_limit(None), usize::MAX);
        assert_eq!(encode_bytes(b"dbscout"), serde_json::json!("ZGJzY291dA=="));
    }

    #[test]
    fn test_query_error_keeps_source() {
        let io = std::io::Error::other("socket closed");
        let error = QueryError::from_source(io);
        assert_eq!(error.message(), "socket closed");
        assert!(error.source().is_some());

        let plain = QueryError::new("syntax error");
        assert_eq!(plain.to_string(), "syntax error");
        assert!(plain.source().is_none());
    }

    #[test]
    fn test_array_params() {
        assert!(QueryParam::TextArray(vec!["a".into()]).is_array());
        assert!(!QueryParam::from("a").is_array());
        assert!(!QueryParam::Null.is_array());
    }

    #[test]
    fn test_field_info_to_column_schema() {
        let mut field = FieldInfo::new("amount", "numeric");
        field.precision = Some(10);
        field.scale = Some(2);
        let column = crate::models::ColumnSchema::from(&field);
        assert_eq!(column.name, "amount");
        assert_eq!(column.data_type, "numeric");
        assert_eq!(column.precision, Some(10));
        assert_eq!(column.scale, Some(2));
        assert_eq!(column.nullable, None);
    }
}
