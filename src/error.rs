//! Error types for the guest IdP flow driver
//!
//! Every failure aborts the run; nothing here is retried. Variants follow the
//! stages of the flow so a failed run tells the developer where it stopped.

use thiserror::Error;

/// Main error type for flow driver operations
#[derive(Error, Debug)]
pub enum FlowError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Discovery document could be loaded neither from cache nor network
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// A step received an HTTP status it does not accept
    #[error("Unexpected status during {step}: expected {expected}, got {actual}")]
    UnexpectedStatus {
        /// Flow step that issued the request
        step: String,
        /// Human-readable description of the accepted status
        expected: String,
        /// Status code actually received
        actual: u16,
    },

    /// A header, query parameter or body field the flow depends on is absent
    #[error("Missing field: {0}")]
    MissingField(String),

    /// The authorization server redirected back with an OAuth error
    #[error("Authorization error: {error}{}", describe(.description))]
    Authorization {
        /// The `error` query parameter
        error: String,
        /// The optional `error_description` query parameter
        description: Option<String>,
    },

    /// The `state` echoed in the callback differs from the one sent
    #[error("State mismatch in authorization callback")]
    StateMismatch,

    /// Token endpoint rejected the exchange or returned an unusable body
    #[error("Token exchange error: {0}")]
    TokenExchange(String),

    /// Token header or payload could not be decoded
    #[error("Token decode error: {0}")]
    Decode(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

fn describe(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default()
}

/// Result type alias for flow driver operations
///
/// Uses `anyhow::Error` so context can be attached while the underlying
/// [`FlowError`] stays reachable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
