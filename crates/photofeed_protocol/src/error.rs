//! Error types for protocol decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while decoding API payloads.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The body was not valid JSON for the expected record.
    #[error("invalid json at line {line}, column {column}: {message}")]
    Json {
        /// Error message from the JSON parser.
        message: String,
        /// Line of the offending token.
        line: usize,
        /// Column of the offending token.
        column: usize,
    },

    /// A record decoded but lacks a field the client depends on.
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_keeps_position() {
        let err: ProtocolError = serde_json::from_str::<Vec<u32>>("[1, oops]")
            .unwrap_err()
            .into();
        match err {
            ProtocolError::Json { line, column, .. } => {
                assert_eq!(line, 1);
                assert!(column > 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_field_display() {
        let err = ProtocolError::MissingField("profile_image.small");
        assert_eq!(err.to_string(), "missing field: profile_image.small");
    }
}
