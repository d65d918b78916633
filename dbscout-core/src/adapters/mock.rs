//! Mock query adapter for testing.
//!
//! Replays a queue of scripted responses (one per query, in order) and
//! records every statement it receives, so tests can assert both on the
//! strategy the engine picked and on the SQL it generated.

use super::{FieldInfo, QueryAdapter, QueryError, QueryParam, QueryResult, Row};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
enum MockResponse {
    Result(QueryResult),
    Error(String),
}

/// A query the mock received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
    pub max_rows: Option<u64>,
}

/// Scripted adapter: each call pops the next response.
///
/// When the script runs out, queries succeed with an empty result.
#[derive(Debug, Default)]
pub struct MockAdapter {
    responses: Mutex<VecDeque<MockResponse>>,
    recorded: Mutex<Vec<RecordedQuery>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockAdapter {
    /// Creates an adapter with an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an explicit result
    pub fn with_result(self, result: QueryResult) -> Self {
        lock(&self.responses).push_back(MockResponse::Result(result));
        self
    }

    /// Queue a result holding the given rows; fields are taken from the
    /// first row's keys.
    pub fn with_rows(self, rows: Vec<Row>) -> Self {
        let fields = rows
            .first()
            .map(|row| {
                row.iter()
                    .map(|(name, value)| FieldInfo::new(name.clone(), json_type_name(value)))
                    .collect()
            })
            .unwrap_or_default();
        self.with_result(QueryResult::new(rows, fields))
    }

    /// Queue a result of `count` synthetic rows (`{"id": n}`)
    pub fn with_row_count(self, count: usize) -> Self {
        let rows = (0..count)
            .map(|n| {
                let mut row = Row::new();
                row.insert("id".to_string(), serde_json::Value::from(n));
                row
            })
            .collect();
        let mut id = FieldInfo::new("id", "integer");
        id.nullable = Some(false);
        self.with_result(QueryResult::new(rows, vec![id]))
    }

    /// Queue a failing response
    pub fn with_error(self, message: impl Into<String>) -> Self {
        lock(&self.responses).push_back(MockResponse::Error(message.into()));
        self
    }

    /// Every query received so far, in order
    pub fn queries(&self) -> Vec<RecordedQuery> {
        lock(&self.recorded).clone()
    }

    /// Number of queries received so far
    pub fn query_count(&self) -> usize {
        lock(&self.recorded).len()
    }

    /// The most recent query, if any
    pub fn last_query(&self) -> Option<RecordedQuery> {
        lock(&self.recorded).last().cloned()
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_f64() => "double",
        serde_json::Value::Number(_) => "integer",
        serde_json::Value::String(_) => "text",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "json",
    }
}

#[async_trait]
impl QueryAdapter for MockAdapter {
    async fn query(
        &self,
        sql: &str,
        params: &[QueryParam],
        max_rows: Option<u64>,
    ) -> Result<QueryResult, QueryError> {
        lock(&self.recorded).push(RecordedQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
            max_rows,
        });

        let next = lock(&self.responses).pop_front();
        match next {
            Some(MockResponse::Result(result)) => Ok(result),
            Some(MockResponse::Error(message)) => Err(QueryError::new(message)),
            None => Ok(QueryResult::default()),
        }
    }
}
