//! Error types for the Groq client.

use thiserror::Error;

/// Result type for Groq client operations.
pub type Result<T> = std::result::Result<T, GroqError>;

/// Groq client errors.
///
/// Callers decide retry policy, so the variants keep enough structure to
/// tell timeouts, rate limits, and auth failures apart without string
/// matching.
#[derive(Debug, Error)]
pub enum GroqError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {message}")]
    Network { message: String, timed_out: bool },

    /// API error (non-2xx response)
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, unexpected response shape)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl GroqError {
    /// True when the request hit the configured timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network { timed_out: true, .. })
    }

    /// True for HTTP 429 responses.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Api { status: 429, .. })
    }

    /// True for HTTP 401/403 responses.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }

    /// Transient failures are worth retrying: network errors, timeouts,
    /// rate limiting, and server-side 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Config(_) | Self::Parse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_detection() {
        let err = GroqError::Network {
            message: "deadline exceeded".into(),
            timed_out: true,
        };
        assert!(err.is_timeout());
        assert!(err.is_transient());

        let err = GroqError::Network {
            message: "connection refused".into(),
            timed_out: false,
        };
        assert!(!err.is_timeout());
        assert!(err.is_transient());
    }

    #[test]
    fn test_api_status_classification() {
        let rate_limited = GroqError::Api {
            status: 429,
            message: "slow down".into(),
        };
        assert!(rate_limited.is_rate_limited());
        assert!(rate_limited.is_transient());

        let unauthorized = GroqError::Api {
            status: 401,
            message: "bad key".into(),
        };
        assert!(unauthorized.is_auth_failure());
        assert!(!unauthorized.is_transient());

        let server_error = GroqError::Api {
            status: 503,
            message: "overloaded".into(),
        };
        assert!(server_error.is_transient());

        let bad_request = GroqError::Api {
            status: 400,
            message: "invalid model".into(),
        };
        assert!(!bad_request.is_transient());
    }

    #[test]
    fn test_permanent_errors_are_not_transient() {
        assert!(!GroqError::Config("no key".into()).is_transient());
        assert!(!GroqError::Parse("bad json".into()).is_transient());
    }
}
