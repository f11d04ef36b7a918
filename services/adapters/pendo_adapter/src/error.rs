//! Error types for the Pendo adapter

use std::time::Duration;
use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, PendoError>;

#[derive(Debug, Error)]
pub enum PendoError {
    /// Non-success response from the API
    #[error("Pendo API error ({status}): {message}")]
    Http {
        status: u16,
        message: String,
    },

    /// 401 or 403, the integration key is wrong or lacks access
    #[error("Pendo rejected the integration key ({status}): {message}")]
    Unauthorized {
        status: u16,
        message: String,
    },

    /// 429 from the API
    #[error("Rate limited by Pendo")]
    RateLimited {
        /// Parsed `Retry-After` header
        retry_after: Option<Duration>,
    },

    /// Connection, TLS or timeout failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("Failed to decode {context}: {message}")]
    Decode {
        context: String,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl PendoError {
    /// Check if error is recoverable (worth retrying)
    pub fn is_recoverable(&self) -> bool {
        match self {
            PendoError::Transport(_) | PendoError::RateLimited { .. } => true,
            PendoError::Http { status, .. } => *status >= 500,
            PendoError::Unauthorized { .. }
            | PendoError::Decode { .. }
            | PendoError::Configuration(_) => false,
        }
    }

    /// Check if error is permanent (should not retry)
    pub fn is_permanent(&self) -> bool {
        !self.is_recoverable()
    }

    /// HTTP status, when the failure came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            PendoError::Http { status, .. } | PendoError::Unauthorized { status, .. } => {
                Some(*status)
            }
            PendoError::RateLimited { .. } => Some(429),
            PendoError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub(crate) fn decode(context: impl Into<String>, message: impl ToString) -> Self {
        PendoError::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Build the error for a non-success response body
    ///
    /// The message comes from the JSON `message` field when present,
    /// otherwise `HTTP <status>: <first 200 characters of the body>`.
    pub fn from_response(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        if status == 429 {
            return PendoError::RateLimited { retry_after };
        }

        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| {
                let snippet: String = body.chars().take(200).collect();
                format!("HTTP {}: {}", status, snippet)
            });

        match status {
            401 | 403 => PendoError::Unauthorized { status, message },
            _ => PendoError::Http { status, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_json_body() {
        let err = PendoError::from_response(400, r#"{"message":"bad pipeline"}"#, None);
        assert!(matches!(err, PendoError::Http { status: 400, ref message } if message == "bad pipeline"));
        assert!(err.is_permanent());
    }

    #[test]
    fn test_message_from_text_body_is_truncated() {
        let body = "x".repeat(500);
        match PendoError::from_response(502, &body, None) {
            PendoError::Http { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message.len(), "HTTP 502: ".len() + 200);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_recoverability() {
        assert!(PendoError::from_response(503, "", None).is_recoverable());
        assert!(PendoError::from_response(429, "", None).is_recoverable());
        assert!(PendoError::from_response(401, "{}", None).is_permanent());
        assert!(PendoError::from_response(404, "nope", None).is_permanent());
        assert!(PendoError::decode("guides", "expected array").is_permanent());
    }

    #[test]
    fn test_unauthorized_classification() {
        let err = PendoError::from_response(403, r#"{"message":"forbidden"}"#, None);
        assert!(matches!(err, PendoError::Unauthorized { status: 403, .. }));
        assert_eq!(err.status(), Some(403));
    }
}
