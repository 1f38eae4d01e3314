//! Failure signal for rejected Conduit calls

use thiserror::Error;

/// A failed Conduit API call.
///
/// Carries the server's human-readable message and a numeric error code.
/// The code is always present; zero means the server did not supply one.
/// Constructed at the failure site and propagated to the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConduitError {
    /// Human-readable failure message from the server.
    pub message: String,

    /// Numeric error code, zero when unknown/unspecified.
    pub code: i32,
}

impl ConduitError {
    /// Failure with a message only; code defaults to zero.
    pub fn new(message: impl Into<String>) -> Self {
        ConduitError {
            message: message.into(),
            code: 0,
        }
    }

    /// Failure with an explicit numeric code.
    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        ConduitError {
            message: message.into(),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults_code_to_zero() {
        let err = ConduitError::new("call failed");
        assert_eq!(err.message, "call failed");
        assert_eq!(err.code, 0);
    }

    #[test]
    fn test_with_code_keeps_both_fields() {
        let err = ConduitError::with_code("rate limited", 429);
        assert_eq!(err.message, "rate limited");
        assert_eq!(err.code, 429);
    }

    #[test]
    fn test_display_is_the_message() {
        let err = ConduitError::with_code("invalid token", 7);
        assert_eq!(err.to_string(), "invalid token");
    }

    #[test]
    fn test_is_std_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&ConduitError::new("x"));
    }
}
