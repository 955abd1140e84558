//! Application-wide error types.

use price_extractor::ExtractError;
use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseSqlx(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("A product with URL '{url}' is already tracked")]
    DuplicateUrl { url: String },

    #[error("Invalid cadence expression '{expression}': {reason}")]
    InvalidCadence { expression: String, reason: String },

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn not_found(entity_type: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn duplicate_url(url: impl Into<String>) -> Self {
        Self::DuplicateUrl { url: url.into() }
    }

    pub fn invalid_cadence(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCadence {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("Product", 7);
        assert_eq!(err.to_string(), "Entity not found: Product with id 7");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_extract_error_conversion() {
        let err: Error = ExtractError::NotFound.into();
        assert!(matches!(err, Error::Extraction(ExtractError::NotFound)));
        assert!(!err.is_not_found());
    }
}
