// Error handling module
// Defines the error taxonomy surfaced by the client

use thiserror::Error;

/// Errors surfaced by the Kronos client
#[derive(Error, Debug)]
pub enum KronosError {
    /// A token payload was missing a field or carried a malformed one
    #[error("Validation error: {0}")]
    Validation(String),

    /// Required client state was not set before an authenticated call
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Login or refresh endpoint answered with a non-success status
    #[error("Server error: {}", format_server_error(.status, .error, .description))]
    Server {
        status: u16,
        error: Option<String>,
        description: Option<String>,
    },

    /// The server rejected an access token that was sent with a request
    #[error("Access token was rejected by the server")]
    TokenRevoked,

    /// A resource endpoint answered with a non-success status
    #[error("Kronos API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Network or transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed structured text
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Token storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl KronosError {
    /// Build a server error from a status code and a (possibly non-JSON) response body
    pub fn from_server_response(status: u16, body: &[u8]) -> Self {
        let parsed = serde_json::from_slice::<serde_json::Value>(body).ok();
        let field = |name: &str| {
            parsed
                .as_ref()
                .and_then(|v| v.get(name))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        KronosError::Server {
            status,
            error: field("error"),
            description: field("error_description"),
        }
    }
}

impl From<rusqlite::Error> for KronosError {
    fn from(err: rusqlite::Error) -> Self {
        KronosError::Storage(err.to_string())
    }
}

/// `[status] error (description)`, degrading to `[status] error` when the server
/// supplied no details
fn format_server_error(
    status: &u16,
    error: &Option<String>,
    description: &Option<String>,
) -> String {
    match (error, description) {
        (Some(error), Some(description)) => format!("[{}] {} ({})", status, error, description),
        (Some(error), None) => format!("[{}] {}", status, error),
        _ => format!("[{}] error", status),
    }
}

/// Transport-level failure, categorized for diagnostics
#[derive(Error, Debug, Clone, PartialEq)]
#[error("HTTP request failed: {message} (kind: {kind})")]
pub struct TransportError {
    pub kind: &'static str,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Categorize a reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connection_failed"
        } else if e.is_request() {
            "request_error"
        } else if e.is_body() {
            "body_error"
        } else if e.is_decode() {
            "decode_error"
        } else {
            "unknown"
        };

        Self::new(kind, e.to_string())
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, KronosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = KronosError::Validation("missing key \"token\"".to_string());
        assert_eq!(err.to_string(), "Validation error: missing key \"token\"");

        let err = KronosError::Configuration("subject not set".to_string());
        assert_eq!(err.to_string(), "Configuration error: subject not set");

        let err = KronosError::Api {
            status: 404,
            message: "Not found".to_string(),
        };
        assert_eq!(err.to_string(), "Kronos API error: 404 - Not found");
    }

    #[test]
    fn test_server_error_with_details() {
        let err = KronosError::from_server_response(
            400,
            br#"{"error":"invalid_grant","error_description":"bad password"}"#,
        );
        assert_eq!(
            err.to_string(),
            "Server error: [400] invalid_grant (bad password)"
        );
    }

    #[test]
    fn test_server_error_without_description() {
        let err = KronosError::from_server_response(403, br#"{"error":"forbidden"}"#);
        assert_eq!(err.to_string(), "Server error: [403] forbidden");
    }

    #[test]
    fn test_server_error_non_json_body() {
        let err = KronosError::from_server_response(502, b"<html>Bad Gateway</html>");
        match &err {
            KronosError::Server {
                status,
                error,
                description,
            } => {
                assert_eq!(*status, 502);
                assert!(error.is_none());
                assert!(description.is_none());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.to_string(), "Server error: [502] error");
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let err: KronosError = TransportError::new("timeout", "deadline elapsed").into();
        assert_eq!(
            err.to_string(),
            "HTTP request failed: deadline elapsed (kind: timeout)"
        );
    }
}
