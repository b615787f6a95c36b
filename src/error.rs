//! Error types for Tickerboard.

use thiserror::Error;

/// The main error type for Tickerboard.
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors (config files, console streams, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Payload text that is not valid JSON
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A payload value does not fit the record field it targets
    #[error("Invalid value for field '{field}': {source}")]
    Field {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    /// Payload is valid JSON but cannot be merged into a record
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A state listener failed while handling a write
    #[error("Listener error: {0}")]
    Listener(String),

    /// Nested writes from listeners went deeper than the store allows
    #[error("Dispatch depth {depth} exceeded while writing {key}")]
    DispatchDepth { key: String, depth: usize },

    /// Channel communication errors
    #[error("Channel error: {0}")]
    Channel(String),

    /// Quote stream protocol errors
    #[error("Feed error: {0}")]
    Feed(String),

    /// Order construction or placement errors
    #[error("Order error: {0}")]
    Order(String),

    /// Invalid input or state
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Alias for Result with our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new invalid payload error.
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    /// Create a new listener error.
    pub fn listener(msg: impl Into<String>) -> Self {
        Self::Listener(msg.into())
    }

    /// Create a new channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    /// Create a new feed error.
    pub fn feed(msg: impl Into<String>) -> Self {
        Self::Feed(msg.into())
    }

    /// Create a new order error.
    pub fn order(msg: impl Into<String>) -> Self {
        Self::Order(msg.into())
    }

    /// Create a new invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Check if this error is recoverable (user can retry).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Channel(_) | Self::Feed(_) | Self::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::feed("socket closed").is_recoverable());
        assert!(Error::invalid_input("bad symbol").is_recoverable());
        assert!(!Error::listener("boom").is_recoverable());
        assert!(!Error::config("missing").is_recoverable());
    }

    #[test]
    fn test_dispatch_depth_message() {
        let err = Error::DispatchDepth {
            key: "SelectedStock".to_string(),
            depth: 32,
        };
        assert_eq!(
            err.to_string(),
            "Dispatch depth 32 exceeded while writing SelectedStock"
        );
    }
}
