use scylla::cql_to_rust::FromRowError;
use scylla::transport::errors::{NewSessionError, QueryError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<QueryError> for RosterError {
    fn from(err: QueryError) -> Self {
        RosterError::QueryError(err.to_string())
    }
}

impl From<NewSessionError> for RosterError {
    fn from(err: NewSessionError) -> Self {
        RosterError::ConnectionError(err.to_string())
    }
}

impl From<FromRowError> for RosterError {
    fn from(err: FromRowError) -> Self {
        RosterError::DecodeError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_failure_class() {
        let err = RosterError::DecodeError("column 1 is not an int".to_string());
        assert_eq!(err.to_string(), "Decode error: column 1 is not an int");

        let err = RosterError::ValidationError("page size must be positive".to_string());
        assert!(err.to_string().starts_with("Validation error"));
    }

    #[test]
    fn test_from_row_error_is_a_decode_error() {
        let err: RosterError = FromRowError::WrongRowSize {
            expected: 2,
            actual: 1,
        }
        .into();
        assert!(matches!(err, RosterError::DecodeError(_)));
    }
}
