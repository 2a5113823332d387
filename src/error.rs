//! Error types for lrometa
//!
//! Centralized error handling using thiserror. Findings about the API being
//! analyzed are never errors: they are reported as
//! [`Diagnostic`](crate::diagnostics::Diagnostic)s. These variants cover
//! failures to build the graph in the first place.

use thiserror::Error;

/// All error types that can occur in lrometa
#[derive(Debug, Error)]
pub enum LrometaError {
    /// A type reference names nothing declared in the document
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// An operation reference names nothing declared in the document
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Two declarations share a name
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// Structurally invalid API description
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for lrometa operations
pub type Result<T> = std::result::Result<T, LrometaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_error() {
        let err = LrometaError::UnknownType("Widget".to_string());
        assert_eq!(err.to_string(), "Unknown type: Widget");
    }

    #[test]
    fn test_unknown_operation_error() {
        let err = LrometaError::UnknownOperation("getStatus".to_string());
        assert_eq!(err.to_string(), "Unknown operation: getStatus");
    }

    #[test]
    fn test_duplicate_name_error() {
        let err = LrometaError::DuplicateName("Widget".to_string());
        assert_eq!(err.to_string(), "Duplicate name: Widget");
    }

    #[test]
    fn test_invalid_document_error() {
        let err = LrometaError::InvalidDocument("union has no variants".to_string());
        assert_eq!(err.to_string(), "Invalid document: union has no variants");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LrometaError = io_err.into();
        assert!(matches!(err, LrometaError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: LrometaError = json_err.into();
        assert!(matches!(err, LrometaError::Json(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("a: [").unwrap_err();
        let err: LrometaError = yaml_err.into();
        assert!(matches!(err, LrometaError::Yaml(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(LrometaError::UnknownType("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
