//! API error types and HTTP status mapping.
//!
//! Concrete clients convert whatever their transport reports into
//! [`ApiError`]; the reconciler only ever distinguishes not-found from
//! everything else.

use thiserror::Error;

/// Error type for remote API operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The addressed object does not exist.
    #[error("{resource} not found: {uid}")]
    NotFound { resource: String, uid: String },

    /// The service rejected the request as malformed.
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// The request conflicts with the current object state.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// The service is temporarily unable to answer.
    #[error("Service unavailable: {message}")]
    Unavailable { message: String },

    /// Any other non-success HTTP status.
    #[error("Remote API returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// Client-side failure (serialization, transport setup).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// Maps an HTTP status code and body message to an error.
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            400 | 422 => ApiError::InvalidParameter { message },
            404 => ApiError::NotFound {
                resource: "object".to_string(),
                uid: message,
            },
            409 => ApiError::Conflict { message },
            429 | 502 | 503 | 504 => ApiError::Unavailable { message },
            _ => ApiError::Status { code, message },
        }
    }

    pub fn not_found(resource: impl Into<String>, uid: impl Into<String>) -> Self {
        ApiError::NotFound {
            resource: resource.into(),
            uid: uid.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        ApiError::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        ApiError::Unavailable {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the addressed object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// Result type for remote API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert!(ApiError::from_status(404, "c-1").is_not_found());
        assert!(matches!(
            ApiError::from_status(400, "bad vlan"),
            ApiError::InvalidParameter { .. }
        ));
        assert!(matches!(
            ApiError::from_status(409, "locked"),
            ApiError::Conflict { .. }
        ));
        assert!(matches!(
            ApiError::from_status(500, "boom"),
            ApiError::Status { code: 500, .. }
        ));
    }

    #[test]
    fn test_throttling_is_unavailable() {
        assert!(matches!(
            ApiError::from_status(503, "maintenance"),
            ApiError::Unavailable { .. }
        ));
        assert!(matches!(
            ApiError::from_status(429, "slow down"),
            ApiError::Unavailable { .. }
        ));
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::not_found("circuit", "c-1");
        assert_eq!(err.to_string(), "circuit not found: c-1");
    }
}
