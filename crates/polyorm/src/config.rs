//! Passive configuration read by grammars and method callers.

use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::value::Value;
use heck::{ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use serde::Deserialize;

/// Naming convention applied when member names become column or table names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nomenclature {
    #[default]
    AsIs,
    SnakeCase,
    UpperCamelCase,
    LowerCamelCase,
    ShoutySnakeCase,
}

impl Nomenclature {
    pub fn apply(self, name: &str) -> String {
        match self {
            Nomenclature::AsIs => name.to_string(),
            Nomenclature::SnakeCase => name.to_snake_case(),
            Nomenclature::UpperCamelCase => name.to_upper_camel_case(),
            Nomenclature::LowerCamelCase => name.to_lower_camel_case(),
            Nomenclature::ShoutySnakeCase => name.to_shouty_snake_case(),
        }
    }
}

/// Statement-generation options.
///
/// ```ignore
/// let config = QueryConfig::from_toml_str(r#"
///     dialect = "sql_server"
///     use_old_pagination = true
/// "#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryConfig {
    pub dialect: Dialect,
    /// Inline strings as escaped literals instead of binding them.
    #[serde(default)]
    pub escape_strings: bool,
    /// Refuse UPDATE/DELETE without a WHERE clause.
    #[serde(default)]
    pub only_safe_modifications: bool,
    #[serde(default)]
    pub nomenclature: Nomenclature,
    /// `strftime` format used to bind date/time values as text.
    #[serde(default)]
    pub date_format: Option<String>,
    /// SqlServer: paginate with `ROW_NUMBER()` instead of `OFFSET ... FETCH`.
    #[serde(default)]
    pub use_old_pagination: bool,
    /// Resolve foreign objects when reading entities.
    #[serde(default)]
    pub load_foreign: bool,
    /// Override the dialect's row ceiling for bulk inserts.
    #[serde(default)]
    pub bulk_batch_rows: Option<usize>,
}

impl QueryConfig {
    pub fn new(dialect: Dialect) -> Self {
        let date_format = match dialect {
            Dialect::Sqlite => Some("%Y-%m-%d %H:%M:%S".to_string()),
            _ => None,
        };
        Self {
            dialect,
            escape_strings: false,
            only_safe_modifications: false,
            nomenclature: Nomenclature::AsIs,
            date_format,
            use_old_pagination: false,
            load_foreign: false,
            bulk_batch_rows: None,
        }
    }

    pub fn sql_server() -> Self {
        Self::new(Dialect::SqlServer)
    }

    pub fn mysql() -> Self {
        Self::new(Dialect::Mysql)
    }

    pub fn sqlite() -> Self {
        Self::new(Dialect::Sqlite)
    }

    pub fn firebird() -> Self {
        Self::new(Dialect::Firebird)
    }

    /// Parse a config from TOML.
    pub fn from_toml_str(raw: &str) -> OrmResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn with_old_pagination(mut self, enabled: bool) -> Self {
        self.use_old_pagination = enabled;
        self
    }

    pub fn with_escape_strings(mut self, enabled: bool) -> Self {
        self.escape_strings = enabled;
        self
    }

    pub fn with_safe_modifications(mut self, enabled: bool) -> Self {
        self.only_safe_modifications = enabled;
        self
    }

    pub fn with_nomenclature(mut self, nomenclature: Nomenclature) -> Self {
        self.nomenclature = nomenclature;
        self
    }

    pub fn with_date_format(mut self, format: Option<String>) -> Self {
        self.date_format = format;
        self
    }

    pub fn with_load_foreign(mut self, enabled: bool) -> Self {
        self.load_foreign = enabled;
        self
    }

    pub fn with_bulk_batch_rows(mut self, rows: usize) -> Self {
        self.bulk_batch_rows = Some(rows.max(1));
        self
    }

    /// Apply the nomenclature to a member name.
    pub fn apply_nomenclature(&self, name: &str) -> String {
        self.nomenclature.apply(name)
    }

    /// Row ceiling for one bulk insert statement.
    pub fn bulk_rows(&self) -> usize {
        self.bulk_batch_rows
            .unwrap_or_else(|| self.dialect.max_bulk_rows())
    }

    /// Rewrite a parameter before binding (date formatting for engines without native dates).
    pub fn intercept(&self, value: Value) -> Value {
        let Some(format) = self.date_format.as_deref() else {
            return value;
        };
        match value {
            Value::DateTime(dt) => Value::Text(dt.format(format).to_string()),
            Value::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => Value::Text(t.format("%H:%M:%S").to_string()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn toml_round_trip_with_defaults() {
        let config = QueryConfig::from_toml_str(
            r#"
            dialect = "sql_server"
            use_old_pagination = true
            nomenclature = "snake_case"
            "#,
        )
        .unwrap();
        assert_eq!(config.dialect, Dialect::SqlServer);
        assert!(config.use_old_pagination);
        assert!(!config.escape_strings);
        assert_eq!(config.apply_nomenclature("CreatedAt"), "created_at");
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = QueryConfig::from_toml_str("dialect = 3").unwrap_err();
        assert!(matches!(err, crate::OrmError::Config(_)));
    }

    #[test]
    fn sqlite_formats_dates_by_default() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let config = QueryConfig::sqlite();
        assert_eq!(
            config.intercept(Value::DateTime(dt)),
            Value::Text("2024-01-02 03:04:05".into())
        );
        let config = QueryConfig::mysql();
        assert_eq!(config.intercept(Value::DateTime(dt)), Value::DateTime(dt));
    }

    #[test]
    fn firebird_shouty_names() {
        let config = QueryConfig::firebird().with_nomenclature(Nomenclature::ShoutySnakeCase);
        assert_eq!(config.apply_nomenclature("customerId"), "CUSTOMER_ID");
    }
}
