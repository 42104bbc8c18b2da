//! Error types for the Postmark client.

use crate::transport::TransportError;

/// Errors returned by [`ApiClient`](crate::ApiClient) and the resource types.
///
/// Variants are split into transient failures, which the client retries
/// according to its [`RetryPolicy`](crate::RetryPolicy), and permanent ones,
/// which are returned on the first occurrence. See [`Error::is_transient`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never completed (connect, DNS, timeout), or could not
    /// be built.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server rejected the API token (HTTP 401 or 403).
    #[error("authentication failed (HTTP {status}): {message}")]
    Authentication { status: u16, message: String },

    /// The requested resource does not exist (HTTP 404).
    #[error("resource not found: {message}")]
    NotFound { message: String },

    /// The service refused the request as invalid (HTTP 422).
    #[error("invalid request (error code {error_code}): {message}")]
    InvalidRequest { error_code: i64, message: String },

    /// Too many requests (HTTP 429).
    #[error("rate limited: {message}")]
    RateLimited { message: String },

    /// The service failed to handle the request (HTTP 5xx).
    #[error("service error (HTTP {status}): {message}")]
    Service { status: u16, message: String },

    /// Any other non-2xx status.
    #[error("unexpected HTTP status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// The response body, or a value inside it, could not be decoded.
    #[error("failed to decode response: {0}")]
    Deserialization(String),

    /// The request payload could not be encoded.
    #[error("failed to encode request: {0}")]
    Serialization(String),

    /// Missing or malformed client configuration.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether the failure may go away on its own and is worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(err) => err.is_transient(),
            Error::RateLimited { .. } | Error::Service { .. } => true,
            _ => false,
        }
    }

    /// Whether this is a transport timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(err) if err.is_timeout())
    }

    /// HTTP status behind this error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Authentication { status, .. }
            | Error::Service { status, .. }
            | Error::UnexpectedStatus { status, .. } => Some(*status),
            Error::NotFound { .. } => Some(404),
            Error::InvalidRequest { .. } => Some(422),
            Error::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classes() {
        assert!(Error::Transport(TransportError::connect("refused")).is_transient());
        assert!(
            Error::Service {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            Error::RateLimited {
                message: String::new()
            }
            .is_transient()
        );
    }

    #[test]
    fn permanent_classes() {
        let permanent = [
            Error::Authentication {
                status: 401,
                message: String::new(),
            },
            Error::NotFound {
                message: String::new(),
            },
            Error::InvalidRequest {
                error_code: 300,
                message: String::new(),
            },
            Error::UnexpectedStatus {
                status: 409,
                message: String::new(),
            },
            Error::Transport(TransportError::request("invalid header value")),
            Error::Deserialization("bad".into()),
            Error::Configuration("bad".into()),
        ];
        for err in permanent {
            assert!(!err.is_transient(), "{err} should be permanent");
        }
    }

    #[test]
    fn timeout_is_detected() {
        assert!(Error::from(TransportError::timeout("slow")).is_timeout());
        assert!(!Error::from(TransportError::connect("refused")).is_timeout());
    }

    #[test]
    fn status_is_exposed() {
        let err = Error::InvalidRequest {
            error_code: 406,
            message: "inactive recipient".into(),
        };
        assert_eq!(err.status(), Some(422));
        assert_eq!(
            err.to_string(),
            "invalid request (error code 406): inactive recipient"
        );
        assert_eq!(Error::Deserialization("x".into()).status(), None);
    }
}
