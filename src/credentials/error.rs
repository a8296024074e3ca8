//! Error types for credential renewal.

use thiserror::Error;

/// Result type for credential operations.
pub type Result<T> = std::result::Result<T, TokenError>;

/// Errors that can occur while proving identity, talking to the broker,
/// or probing the registry.
#[derive(Error, Debug)]
pub enum TokenError {
    /// The identity proof could not be produced.
    #[error("Identity proof unavailable: {message}")]
    ProofUnavailable { message: String },

    /// The broker refused the proof, does not know the role, or is unreachable.
    #[error("Broker rejected the request: {message}")]
    BrokerRejected { message: String },

    /// The broker answered but its payload carried no usable credential.
    #[error("Unable to obtain a new registry credential")]
    CredentialUnavailable,

    /// Renewal was requested for a role but no strategy is bound.
    #[error("No identity strategy configured for role '{role}'")]
    MissingStrategy { role: String },

    /// The registry validation probe failed.
    #[error("Registry probe failed: {message}")]
    Registry { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// HTTP client construction error.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TokenError {
    /// Create a proof unavailable error.
    pub fn proof_unavailable(message: impl Into<String>) -> Self {
        Self::ProofUnavailable { message: message.into() }
    }

    /// Create a broker rejected error.
    pub fn broker_rejected(message: impl Into<String>) -> Self {
        Self::BrokerRejected { message: message.into() }
    }

    /// Create a missing strategy error.
    pub fn missing_strategy(role: impl Into<String>) -> Self {
        Self::MissingStrategy { role: role.into() }
    }

    /// Create a registry probe error.
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry { message: message.into() }
    }

    /// Create a config error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }
}

impl From<validator::ValidationErrors> for TokenError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::config_error(message)
    }
}
