//! Core data models for structural metadata and table samples.
//!
//! Every value here is produced fresh per call and never mutated after
//! construction. All models are serializable so the consuming service can
//! persist or forward them unchanged.

use crate::adapters::{FieldInfo, Row};
use crate::error::ScoutError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Snowflake,
    #[serde(rename = "postgresql")]
    PostgreSQL,
    #[serde(rename = "mysql")]
    MySQL,
    #[serde(rename = "bigquery")]
    BigQuery,
    Redshift,
    #[serde(rename = "sqlserver")]
    SqlServer,
}

impl Dialect {
    /// Every supported dialect
    pub const ALL: [Dialect; 6] = [
        Dialect::Snowflake,
        Dialect::PostgreSQL,
        Dialect::MySQL,
        Dialect::BigQuery,
        Dialect::Redshift,
        Dialect::SqlServer,
    ];

    /// Canonical lowercase identifier (matches the serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Snowflake => "snowflake",
            Dialect::PostgreSQL => "postgresql",
            Dialect::MySQL => "mysql",
            Dialect::BigQuery => "bigquery",
            Dialect::Redshift => "redshift",
            Dialect::SqlServer => "sqlserver",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Snowflake => write!(f, "Snowflake"),
            Dialect::PostgreSQL => write!(f, "PostgreSQL"),
            Dialect::MySQL => write!(f, "MySQL"),
            Dialect::BigQuery => write!(f, "BigQuery"),
            Dialect::Redshift => write!(f, "Redshift"),
            Dialect::SqlServer => write!(f, "SQL Server"),
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snowflake" => Ok(Dialect::Snowflake),
            "postgresql" | "postgres" => Ok(Dialect::PostgreSQL),
            "mysql" => Ok(Dialect::MySQL),
            "bigquery" => Ok(Dialect::BigQuery),
            "redshift" => Ok(Dialect::Redshift),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            _ => Err(ScoutError::unsupported_dialect(s)),
        }
    }
}

/// Canonical table type across dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableType {
    Table,
    View,
    MaterializedView,
    ExternalTable,
    TemporaryTable,
}

impl TableType {
    /// Maps a dialect's raw table-type string onto the canonical enum.
    ///
    /// Unknown strings (BigQuery `SNAPSHOT`, Snowflake `DYNAMIC TABLE`,
    /// SQL Server `USER_TABLE`, ...) are treated as plain tables.
    pub fn from_catalog(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "VIEW" | "SYSTEM VIEW" => TableType::View,
            "MATERIALIZED VIEW" | "MATERIALIZED_VIEW" => TableType::MaterializedView,
            "EXTERNAL TABLE" | "EXTERNAL" | "FOREIGN TABLE" | "FOREIGN" => {
                TableType::ExternalTable
            }
            "TEMPORARY TABLE" | "TEMPORARY" | "LOCAL TEMPORARY" | "GLOBAL TEMPORARY" => {
                TableType::TemporaryTable
            }
            _ => TableType::Table,
        }
    }
}

/// Catalog-level facts about one table or view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub schema: String,
    pub database: String,
    /// Estimated row count; 0 when the catalog does not know
    pub row_count: u64,
    pub size_bytes: Option<u64>,
    #[serde(rename = "type")]
    pub table_type: TableType,
    pub comment: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub clustering_keys: Option<Vec<String>>,
    /// Dialect-specific extras (engine, vacuum timestamps, transience, ...)
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl TableMetadata {
    /// Creates table metadata with no optional facts filled in
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
        table_type: TableType,
    ) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            database: database.into(),
            row_count: 0,
            size_bytes: None,
            table_type,
            comment: None,
            created: None,
            last_modified: None,
            clustering_keys: None,
            metadata: None,
        }
    }

    /// Builder method to set the estimated row count
    pub fn with_row_count(mut self, row_count: u64) -> Self {
        self.row_count = row_count;
        self
    }

    /// Composite `database.schema.table` identifier
    pub fn table_id(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.name)
    }

    /// True for plain (non-materialized) views
    pub fn is_view(&self) -> bool {
        self.table_type == TableType::View
    }
}

/// Filters applied to a structural fetch.
///
/// A present list must be non-empty; see [`crate::validation::validate_filters`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionFilters {
    pub databases: Option<Vec<String>>,
    pub schemas: Option<Vec<String>>,
    pub tables: Option<Vec<String>>,
    pub exclude_tables: Option<Vec<String>>,
}

impl IntrospectionFilters {
    /// Creates an empty filter set (no restriction)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to restrict to the given databases
    pub fn with_databases<I, S>(mut self, databases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.databases = Some(databases.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method to restrict to the given schemas
    pub fn with_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemas = Some(schemas.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method to restrict to the given table names
    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = Some(tables.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method to exclude the given table names
    pub fn excluding_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_tables = Some(tables.into_iter().map(Into::into).collect());
        self
    }
}

/// Aggregate result of one structural fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralMetadata {
    /// Set by the caller; always empty at this layer
    pub data_source_id: String,
    pub data_source_type: Dialect,
    pub tables: Vec<TableMetadata>,
    pub introspected_at: DateTime<Utc>,
    /// Echo of the request filters
    pub filters: Option<IntrospectionFilters>,
}

impl StructuralMetadata {
    /// Creates a result stamped with the current time
    pub fn new(
        dialect: Dialect,
        tables: Vec<TableMetadata>,
        filters: Option<IntrospectionFilters>,
    ) -> Self {
        Self {
            data_source_id: String::new(),
            data_source_type: dialect,
            tables,
            introspected_at: Utc::now(),
            filters,
        }
    }

    /// Number of views (plain and materialized) in the result
    pub fn view_count(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| matches!(t.table_type, TableType::View | TableType::MaterializedView))
            .count()
    }
}

/// Column metadata reported by the driver for a sample query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: Option<bool>,
    pub length: Option<u64>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl From<&FieldInfo> for ColumnSchema {
    fn from(field: &FieldInfo) -> Self {
        Self {
            name: field.name.clone(),
            data_type: field.data_type.clone(),
            nullable: field.nullable,
            length: field.length,
            precision: field.precision,
            scale: field.scale,
        }
    }
}

/// The strategy that actually produced a [`TableSample`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SamplingMethod {
    /// Whole small table, bounded by the requested size
    FullTable,
    TablesampleBernoulli,
    TablesampleBernoulliRetry,
    TablesampleSystem,
    /// SQL Server `ORDER BY NEWID()` after an under-yielding TABLESAMPLE
    NewidRandom,
    RandomOrder,
    RandomFilterOptimized,
    RandomOrderFallback,
    ViewRandomFilter,
    ViewHashSample,
    ViewLimit,
    RandomLimit,
    SimpleLimit,
    SimpleTop,
    LimitFallback,
}

impl SamplingMethod {
    /// Stable tag recorded on the sample
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingMethod::FullTable => "FULL_TABLE",
            SamplingMethod::TablesampleBernoulli => "TABLESAMPLE_BERNOULLI",
            SamplingMethod::TablesampleBernoulliRetry => "TABLESAMPLE_BERNOULLI_RETRY",
            SamplingMethod::TablesampleSystem => "TABLESAMPLE_SYSTEM",
            SamplingMethod::NewidRandom => "NEWID_RANDOM",
            SamplingMethod::RandomOrder => "RANDOM_ORDER",
            SamplingMethod::RandomFilterOptimized => "RANDOM_FILTER_OPTIMIZED",
            SamplingMethod::RandomOrderFallback => "RANDOM_ORDER_FALLBACK",
            SamplingMethod::ViewRandomFilter => "VIEW_RANDOM_FILTER",
            SamplingMethod::ViewHashSample => "VIEW_HASH_SAMPLE",
            SamplingMethod::ViewLimit => "VIEW_LIMIT",
            SamplingMethod::RandomLimit => "RANDOM_LIMIT",
            SamplingMethod::SimpleLimit => "SIMPLE_LIMIT",
            SamplingMethod::SimpleTop => "SIMPLE_TOP",
            SamplingMethod::LimitFallback => "LIMIT_FALLBACK",
        }
    }
}

impl std::fmt::Display for SamplingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rows drawn from one table or view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSample {
    /// Composite `database.schema.table` identifier
    pub table_id: String,
    /// The table's known total (catalog estimate)
    pub row_count: u64,
    /// Rows actually returned, never the requested count
    pub sample_size: u64,
    pub sample_data: Vec<Row>,
    pub column_schemas: Option<Vec<ColumnSchema>>,
    pub sampled_at: DateTime<Utc>,
    pub sampling_method: SamplingMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("postgres".parse::<Dialect>().unwrap(), Dialect::PostgreSQL);
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::PostgreSQL);
        assert_eq!("mssql".parse::<Dialect>().unwrap(), Dialect::SqlServer);
        assert_eq!(" BigQuery ".parse::<Dialect>().unwrap(), Dialect::BigQuery);

        let err = "oracle".parse::<Dialect>().unwrap_err();
        assert!(matches!(err, ScoutError::UnsupportedDialect { ref dialect } if dialect == "oracle"));
    }

    #[test]
    fn test_dialect_ids_roundtrip_through_serde() {
        for dialect in Dialect::ALL {
            let json = serde_json::to_string(&dialect).unwrap();
            assert_eq!(json, format!("\"{}\"", dialect.as_str()));
            assert_eq!(dialect.as_str().parse::<Dialect>().unwrap(), dialect);
        }
    }

    #[test]
    fn test_dialect_display() {
        assert_eq!(Dialect::PostgreSQL.to_string(), "PostgreSQL");
        assert_eq!(Dialect::SqlServer.to_string(), "SQL Server");
    }

    #[test]
    fn test_table_type_mapping() {
        assert_eq!(TableType::from_catalog("VIEW"), TableType::View);
        assert_eq!(TableType::from_catalog("materialized view"), TableType::MaterializedView);
        assert_eq!(TableType::from_catalog("EXTERNAL TABLE"), TableType::ExternalTable);
        assert_eq!(TableType::from_catalog("FOREIGN TABLE"), TableType::ExternalTable);
        assert_eq!(TableType::from_catalog("TEMPORARY TABLE"), TableType::TemporaryTable);
        assert_eq!(TableType::from_catalog("LOCAL TEMPORARY"), TableType::TemporaryTable);
        assert_eq!(TableType::from_catalog("BASE TABLE"), TableType::Table);
        assert_eq!(TableType::from_catalog("SNAPSHOT"), TableType::Table);
        assert_eq!(TableType::from_catalog(""), TableType::Table);
    }

    #[test]
    fn test_sampling_method_tags_match_serde() {
        let methods = [
            SamplingMethod::FullTable,
            SamplingMethod::TablesampleBernoulliRetry,
            SamplingMethod::NewidRandom,
            SamplingMethod::ViewHashSample,
            SamplingMethod::RandomOrderFallback,
        ];
        for method in methods {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
        }
    }

    #[test]
    fn test_table_metadata_serializes_type_field() {
        let table = TableMetadata::new("db", "public", "users", TableType::MaterializedView)
            .with_row_count(42);
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["type"], "MATERIALIZED_VIEW");
        assert_eq!(json["row_count"], 42);
        assert_eq!(table.table_id(), "db.public.users");
        assert!(!table.is_view());
    }

    #[test]
    fn test_structural_metadata_defaults() {
        let tables = vec![
            TableMetadata::new("db", "s", "a", TableType::Table),
            TableMetadata::new("db", "s", "b", TableType::View),
        ];
        let metadata = StructuralMetadata::new(Dialect::MySQL, tables, None);
        assert!(metadata.data_source_id.is_empty());
        assert_eq!(metadata.data_source_type, Dialect::MySQL);
        assert_eq!(metadata.view_count(), 1);
    }
}
