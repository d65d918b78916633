//! Filter validation.
//!
//! A present-but-empty filter list is ambiguous: the caller may mean "no
//! filter" or "match nothing". Both readings are dangerous (a silent
//! full-catalog scan or a silently empty result), so empty lists are rejected
//! before any query is issued.

use crate::error::{Result, ScoutError};
use crate::models::IntrospectionFilters;

/// Validates introspection filters.
///
/// `databases`, `schemas` and `tables` must each be absent or non-empty.
/// An empty `exclude_tables` is accepted: excluding nothing is unambiguous.
///
/// # Errors
/// Returns [`ScoutError::InvalidFilter`] naming the first offending field.
///
/// # Example
/// ```rust
/// use dbscout_core::models::IntrospectionFilters;
/// use dbscout_core::validation::validate_filters;
///
/// assert!(validate_filters(&IntrospectionFilters::new()).is_ok());
/// assert!(validate_filters(&IntrospectionFilters::new().with_tables(["orders"])).is_ok());
/// assert!(validate_filters(&IntrospectionFilters::new().with_tables(Vec::<String>::new())).is_err());
/// ```
pub fn validate_filters(filters: &IntrospectionFilters) -> Result<()> {
    check_non_empty("databases", "database", filters.databases.as_deref())?;
    check_non_empty("schemas", "schema", filters.schemas.as_deref())?;
    check_non_empty("tables", "table", filters.tables.as_deref())?;
    Ok(())
}

fn check_non_empty(field: &'static str, noun: &str, values: Option<&[String]>) -> Result<()> {
    match values {
        Some([]) => {
            tracing::debug!("Rejecting empty '{}' filter", field);
            Err(ScoutError::invalid_filter(
                field,
                format!(
                    "{} filter array is empty. Provide at least one {} name or remove the filter.",
                    capitalize(noun),
                    noun
                ),
            ))
        }
        _ => Ok(()),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_filters_are_valid() {
        assert!(validate_filters(&IntrospectionFilters::default()).is_ok());
    }

    #[test]
    fn test_non_empty_filters_are_valid() {
        let filters = IntrospectionFilters::new()
            .with_databases(["analytics"])
            .with_schemas(["public"])
            .with_tables(["x"]);
        assert!(validate_filters(&filters).is_ok());
    }

    #[test]
    fn test_empty_tables_rejected() {
        let filters = IntrospectionFilters::new().with_tables(Vec::<String>::new());
        let err = validate_filters(&filters).unwrap_err();
        match err {
            ScoutError::InvalidFilter { field, message } => {
                assert_eq!(field, "tables");
                assert!(message.starts_with("Table filter array is empty"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_each_inclusion_field_is_checked() {
        let empty: Vec<String> = Vec::new();
        let cases = [
            (IntrospectionFilters::new().with_databases(empty.clone()), "databases"),
            (IntrospectionFilters::new().with_schemas(empty.clone()), "schemas"),
            (IntrospectionFilters::new().with_tables(empty.clone()), "tables"),
        ];
        for (filters, expected) in cases {
            match validate_filters(&filters) {
                Err(ScoutError::InvalidFilter { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected InvalidFilter for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_exclusion_list_is_allowed() {
        let filters = IntrospectionFilters::new().excluding_tables(Vec::<String>::new());
        assert!(validate_filters(&filters).is_ok());
    }
}
