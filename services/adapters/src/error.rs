//! Error types for the feed connector and REST client

use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Main error type for adapter operations
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Transport could not be established
    #[error("Connection to {url} failed: {reason}")]
    ConnectionFailed {
        /// Endpoint that refused or failed
        url: String,
        /// Reason for the failure
        reason: String,
    },

    /// Connect or subscribe did not complete in time
    #[error("Connection timeout after {timeout_ms}ms during {stage}")]
    ConnectionTimeout {
        /// Which step timed out (`connect`, `subscribe`)
        stage: &'static str,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Peer closed the stream
    #[error("Connection closed: {reason:?}")]
    ConnectionClosed {
        /// Close frame reason if one was sent
        reason: Option<String>,
    },

    /// Operation needs a live connection
    #[error("Not connected")]
    NotConnected,

    /// Venue answered the subscription with an error event
    #[error("Subscription rejected ({code}): {message}")]
    SubscriptionRejected {
        /// Venue error code
        code: String,
        /// Venue error message
        message: String,
    },

    /// Control frame that does not fit the protocol state
    #[error("Unexpected frame: {0}")]
    UnexpectedFrame(String),

    /// Structurally invalid data frame or REST payload
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// JSON parsing error from a frame or response
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Required field missing from venue message
    #[error("Missing required field: {field}")]
    MissingField {
        /// The field that was missing
        field: String,
    },

    /// Invalid numeric value in venue data
    #[error("Invalid numeric value: {value}")]
    InvalidNumeric {
        /// The value that couldn't be parsed
        value: String,
    },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// REST envelope carried a non-zero code
    #[error("Venue API error ({code}): {message}")]
    Api {
        /// Venue error code
        code: String,
        /// Venue error message
        message: String,
    },

    /// Missing or unusable API credentials
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed {
        /// What was wrong with the credentials
        reason: String,
    },

    /// Venue throttled the request
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Configuration error in adapter settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Reconnect budget spent; the feed is unavailable until restart
    #[error("Maximum reconnection attempts ({max_attempts}) exceeded, feed unavailable")]
    MaxReconnectAttemptsExceeded {
        /// Maximum attempts that were tried
        max_attempts: u32,
    },

    /// Collaborator failure that fits no other variant
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// Check if this error is recoverable through retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AdapterError::ConnectionFailed { .. }
                | AdapterError::ConnectionTimeout { .. }
                | AdapterError::ConnectionClosed { .. }
                | AdapterError::NotConnected
                | AdapterError::SubscriptionRejected { .. }
                | AdapterError::UnexpectedFrame(_)
                | AdapterError::WebSocket(_)
                | AdapterError::Http(_)
                | AdapterError::RateLimitExceeded(_)
        )
    }

    /// Check if this error indicates a permanent failure
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            AdapterError::AuthenticationFailed { .. }
                | AdapterError::Configuration(_)
                | AdapterError::MaxReconnectAttemptsExceeded { .. }
        )
    }

    /// Feed cannot recover without an operator restart
    pub fn is_feed_unavailable(&self) -> bool {
        matches!(self, AdapterError::MaxReconnectAttemptsExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let timeout = AdapterError::ConnectionTimeout {
            stage: "connect",
            timeout_ms: 30_000,
        };
        assert!(timeout.is_recoverable());
        assert!(!timeout.is_permanent());

        let exhausted = AdapterError::MaxReconnectAttemptsExceeded { max_attempts: 10 };
        assert!(exhausted.is_permanent());
        assert!(exhausted.is_feed_unavailable());
        assert!(!exhausted.is_recoverable());

        let protocol = AdapterError::UnexpectedFrame("venue error 60018: Invalid sign".into());
        assert!(protocol.is_recoverable());
        assert!(!protocol.is_permanent());

        let malformed = AdapterError::InvalidMessage("row too short".into());
        assert!(!malformed.is_recoverable());
        assert!(!malformed.is_permanent());
    }
}
