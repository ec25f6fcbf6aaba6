//! Error types for polyorm

use thiserror::Error;

/// Result type alias for polyorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for SQL generation, mapping and execution.
#[derive(Debug, Error)]
pub enum OrmError {
    /// The requested statement shape is not available for the active dialect.
    #[error("{feature} is not supported by {dialect}")]
    NotSupported {
        feature: String,
        dialect: &'static str,
    },

    /// A member in an expression chain has no registered translator.
    #[error("type {type_name} not mapped with member {member}")]
    NotMapped { type_name: String, member: String },

    /// Malformed input (empty column lists, invalid names, missing keys, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// No constructor or default activator fits the available columns.
    #[error("No suitable constructor found for {type_name} (columns: {columns})")]
    NoSuitableConstructor { type_name: String, columns: String },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Error raised by the command execution collaborator
    #[error("Execution error: {0}")]
    Execution(String),

    /// Configuration parse error
    #[error("Config error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create an unsupported-operation error for a dialect.
    pub fn not_supported(feature: impl Into<String>, dialect: &'static str) -> Self {
        Self::NotSupported {
            feature: feature.into(),
            dialect,
        }
    }

    /// Create a mapping error for a member with no translator.
    pub fn not_mapped(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self::NotMapped {
            type_name: type_name.into(),
            member: member.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Check if this is an unsupported-operation error
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported { .. })
    }

    /// Check if this is a mapping error
    pub fn is_not_mapped(&self) -> bool {
        matches!(self, Self::NotMapped { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<toml::de::Error> for OrmError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_supported_message_names_feature_and_dialect() {
        let err = OrmError::not_supported("ORDER BY on DELETE", "SQLite");
        assert!(err.is_not_supported());
        assert_eq!(err.to_string(), "ORDER BY on DELETE is not supported by SQLite");
    }

    #[test]
    fn not_mapped_message() {
        let err = OrmError::not_mapped("String", "pad_left");
        assert!(err.is_not_mapped());
        assert_eq!(err.to_string(), "type String not mapped with member pad_left");
    }
}
