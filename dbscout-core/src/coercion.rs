//! Coercion of heterogeneous driver values into canonical types.
//!
//! Drivers disagree on how catalog values come back: row counts may be
//! numbers, 64-bit integers or numeric strings; timestamps may be RFC 3339,
//! naive text or epoch milliseconds. Every function here is total: input it
//! cannot interpret yields `None` (or `false`), never an error.

use crate::adapters::Row;
use crate::models::Dialect;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Values accepted as `true` by [`parse_boolean`] (compared case-insensitively)
const TRUTHY_STRINGS: &[&str] = &["true", "yes", "1", "t", "y"];

/// Timestamp layouts seen in catalog views, tried in order
const OFFSET_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
];

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Coerces a driver value to a finite `f64`.
///
/// Accepts JSON numbers (including 64-bit integers) and numeric strings.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Coerces a driver value to a non-negative integer count.
///
/// Negative estimates (PostgreSQL reports `reltuples = -1` for tables that
/// were never analyzed) clamp to 0. Integer strings are parsed exactly so
/// counts above 2^53 keep their precision.
pub fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(u)
            } else if n.as_i64().is_some() {
                Some(0)
            } else {
                n.as_f64().filter(|f| f.is_finite()).map(float_to_count)
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<u64>()
                .ok()
                .or_else(|| parse_number(value).map(float_to_count))
                .or_else(|| trimmed.parse::<i64>().ok().map(|_| 0))
        }
        _ => None,
    }
}

fn float_to_count(f: f64) -> u64 {
    // `as` saturates for out-of-range floats
    f.max(0.0).round() as u64
}

/// Coerces a driver value to a boolean.
///
/// Strings match `true/yes/1/t/y` case-insensitively; numbers are true when
/// non-zero; anything else is false.
pub fn parse_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let lower = s.trim().to_ascii_lowercase();
            TRUTHY_STRINGS.contains(&lower.as_str())
        }
        _ => false,
    }
}

/// Coerces a driver value to a UTC timestamp.
///
/// Numbers are interpreted as epoch milliseconds. Naive timestamps and bare
/// dates are taken to be UTC.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::String(s) => parse_date_str(s.trim()),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in OFFSET_TIMESTAMP_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(s, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(s, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Coerces a driver value to a string; `None` only for null.
pub fn get_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Looks up a column in a row, falling back to a case-insensitive match.
///
/// Snowflake, MySQL and SQL Server return catalog columns upper-cased.
pub fn row_value<'a>(row: &'a Row, column: &str) -> Option<&'a Value> {
    row.get(column).or_else(|| {
        row.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    })
}

/// Non-null string column, empty strings treated as absent
pub(crate) fn row_string(row: &Row, column: &str) -> Option<String> {
    row_value(row, column)
        .and_then(get_string)
        .filter(|s| !s.is_empty())
}

/// Count column, defaulting to 0
pub(crate) fn row_count(row: &Row, column: &str) -> u64 {
    row_value(row, column).and_then(parse_count).unwrap_or(0)
}

pub(crate) fn row_optional_count(row: &Row, column: &str) -> Option<u64> {
    row_value(row, column).and_then(parse_count)
}

pub(crate) fn row_date(row: &Row, column: &str) -> Option<DateTime<Utc>> {
    row_value(row, column).and_then(parse_date)
}

pub(crate) fn row_bool(row: &Row, column: &str) -> bool {
    row_value(row, column).is_some_and(parse_boolean)
}

/// Quotes one identifier for the dialect, escaping embedded quote characters
pub fn quote_identifier(identifier: &str, dialect: Dialect) -> String {
    match dialect {
        Dialect::MySQL => format!("`{}`", identifier.replace('`', "``")),
        Dialect::BigQuery => format!("`{}`", escape_bigquery(identifier)),
        Dialect::Snowflake | Dialect::PostgreSQL | Dialect::Redshift | Dialect::SqlServer => {
            format!("\"{}\"", identifier.replace('"', "\"\""))
        }
    }
}

fn escape_bigquery(identifier: &str) -> String {
    identifier.replace('\\', "\\\\").replace('`', "\\`")
}

/// Builds the dialect-correct table reference.
///
/// - Snowflake, SQL Server: `"database"."schema"."table"`
/// - PostgreSQL, Redshift: `"schema"."table"` (database is the connection's)
/// - MySQL: `` `database`.`table` `` (schema and database are the same thing)
/// - BigQuery: `` `project.dataset.table` ``
///
/// # Example
///
/// ```rust
/// use dbscout_core::coercion::get_qualified_table_name;
/// use dbscout_core::models::Dialect;
///
/// assert_eq!(
///     get_qualified_table_name("db", "sch", "tbl", Dialect::MySQL),
///     "`db`.`tbl`"
/// );
/// ```
pub fn get_qualified_table_name(
    database: &str,
    schema: &str,
    table: &str,
    dialect: Dialect,
) -> String {
    match dialect {
        Dialect::Snowflake | Dialect::SqlServer => format!(
            "{}.{}.{}",
            quote_identifier(database, dialect),
            quote_identifier(schema, dialect),
            quote_identifier(table, dialect)
        ),
        Dialect::PostgreSQL | Dialect::Redshift => format!(
            "{}.{}",
            quote_identifier(schema, dialect),
            quote_identifier(table, dialect)
        ),
        Dialect::MySQL => format!(
            "{}.{}",
            quote_identifier(database, dialect),
            quote_identifier(table, dialect)
        ),
        Dialect::BigQuery => format!(
            "`{}.{}.{}`",
            escape_bigquery(database),
            escape_bigquery(schema),
            escape_bigquery(table)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(&json!(123u64)), Some(123.0));
        assert_eq!(parse_number(&json!(-7)), Some(-7.0));
        assert_eq!(parse_number(&json!(1.5)), Some(1.5));
        assert_eq!(parse_number(&json!(" 42.25 ")), Some(42.25));
        assert_eq!(parse_number(&json!("abc")), None);
        assert_eq!(parse_number(&json!("")), None);
        assert_eq!(parse_number(&json!("NaN")), None);
        assert_eq!(parse_number(&json!(null)), None);
        assert_eq!(parse_number(&json!(true)), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(&json!(5_000_000)), Some(5_000_000));
        assert_eq!(parse_count(&json!(u64::MAX)), Some(u64::MAX));
        assert_eq!(parse_count(&json!("9007199254740993")), Some(9_007_199_254_740_993));
        assert_eq!(parse_count(&json!(-1)), Some(0));
        assert_eq!(parse_count(&json!("-1")), Some(0));
        assert_eq!(parse_count(&json!(1234.6)), Some(1235));
        assert_eq!(parse_count(&json!("1.2e3")), Some(1200));
        assert_eq!(parse_count(&json!("many")), None);
        assert_eq!(parse_count(&json!(null)), None);
    }

    #[test]
    fn test_parse_boolean() {
        assert!(parse_boolean(&json!("Y")));
        assert!(parse_boolean(&json!("yes")));
        assert!(parse_boolean(&json!("TRUE")));
        assert!(parse_boolean(&json!("t")));
        assert!(parse_boolean(&json!("1")));
        assert!(parse_boolean(&json!(true)));
        assert!(parse_boolean(&json!(1)));
        assert!(!parse_boolean(&json!("no")));
        assert!(!parse_boolean(&json!("N")));
        assert!(!parse_boolean(&json!(0)));
        assert!(!parse_boolean(&json!(null)));
        assert!(!parse_boolean(&json!({"a": 1})));
    }

    #[test]
    fn test_parse_date_formats() {
        let rfc = parse_date(&json!("2024-03-05T10:20:30Z")).unwrap();
        assert_eq!((rfc.year(), rfc.month(), rfc.day()), (2024, 3, 5));

        let snowflake = parse_date(&json!("2024-03-05 10:20:30.123 -0800")).unwrap();
        assert_eq!(snowflake.hour(), 18);

        let postgres = parse_date(&json!("2024-03-05 10:20:30.5+00")).unwrap();
        assert_eq!(postgres.minute(), 20);

        let naive = parse_date(&json!("2024-03-05 10:20:30")).unwrap();
        assert_eq!(naive.second(), 30);

        let date_only = parse_date(&json!("2024-03-05")).unwrap();
        assert_eq!(date_only.hour(), 0);

        let millis = parse_date(&json!(1_700_000_000_000i64)).unwrap();
        assert_eq!(millis.year(), 2023);

        assert!(parse_date(&json!("not a date")).is_none());
        assert!(parse_date(&json!("")).is_none());
        assert!(parse_date(&json!(null)).is_none());
    }

    #[test]
    fn test_get_string() {
        assert_eq!(get_string(&json!("orders")), Some("orders".to_string()));
        assert_eq!(get_string(&json!(12)), Some("12".to_string()));
        assert_eq!(get_string(&json!(false)), Some("false".to_string()));
        assert_eq!(get_string(&json!(null)), None);
    }

    #[test]
    fn test_row_value_is_case_insensitive() {
        let row = json!({"TABLE_NAME": "orders", "row_count": 3})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(row_value(&row, "table_name"), Some(&json!("orders")));
        assert_eq!(row_value(&row, "ROW_COUNT"), Some(&json!(3)));
        assert_eq!(row_value(&row, "missing"), None);
        assert_eq!(row_count(&row, "missing"), 0);
        assert_eq!(row_string(&row, "table_name").as_deref(), Some("orders"));
    }

    #[test]
    fn test_qualified_table_names() {
        assert_eq!(
            get_qualified_table_name("db", "sch", "tbl", Dialect::MySQL),
            "`db`.`tbl`"
        );
        assert_eq!(
            get_qualified_table_name("db", "sch", "tbl", Dialect::PostgreSQL),
            "\"sch\".\"tbl\""
        );
        assert_eq!(
            get_qualified_table_name("db", "sch", "tbl", Dialect::Redshift),
            "\"sch\".\"tbl\""
        );
        assert_eq!(
            get_qualified_table_name("db", "sch", "tbl", Dialect::Snowflake),
            "\"db\".\"sch\".\"tbl\""
        );
        assert_eq!(
            get_qualified_table_name("db", "sch", "tbl", Dialect::SqlServer),
            "\"db\".\"sch\".\"tbl\""
        );
        assert_eq!(
            get_qualified_table_name("proj", "ds", "tbl", Dialect::BigQuery),
            "`proj.ds.tbl`"
        );
    }

    #[test]
    fn test_identifier_escaping() {
        assert_eq!(
            get_qualified_table_name("db", "public", "we\"ird", Dialect::PostgreSQL),
            "\"public\".\"we\"\"ird\""
        );
        assert_eq!(
            get_qualified_table_name("d`b", "x", "t", Dialect::MySQL),
            "`d``b`.`t`"
        );
        assert_eq!(
            get_qualified_table_name("p", "d", "t`x", Dialect::BigQuery),
            "`p.d.t\\`x`"
        );
    }
}
