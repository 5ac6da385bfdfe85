use thiserror::Error;

/// Top-level error type for the Marshal system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for
/// MarshalError` so that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MarshalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for MarshalError {
    fn from(err: toml::de::Error) -> Self {
        MarshalError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MarshalError {
    fn from(err: toml::ser::Error) -> Self {
        MarshalError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MarshalError {
    fn from(err: serde_json::Error) -> Self {
        MarshalError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Marshal operations.
pub type Result<T> = std::result::Result<T, MarshalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MarshalError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");

        let err = MarshalError::Agent("connection refused".to_string());
        assert_eq!(err.to_string(), "Agent error: connection refused");

        let err = MarshalError::Ledger("lock poisoned".to_string());
        assert_eq!(err.to_string(), "Ledger error: lock poisoned");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MarshalError = io_err.into();
        assert!(matches!(err, MarshalError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let bad_toml = "invalid = [[[";
        let parsed: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        let err: MarshalError = parsed.unwrap_err().into();
        assert!(matches!(err, MarshalError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let parsed: std::result::Result<serde_json::Value, _> =
            serde_json::from_str("{ not json }");
        let err: MarshalError = parsed.unwrap_err().into();
        assert!(matches!(err, MarshalError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let _value = io_result?;
            Ok("success".to_string())
        }

        assert_eq!(inner().unwrap(), "success");
    }
}
