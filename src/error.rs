//! Error types for the agent launch client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No wallet provider found. Install a browser wallet or set PRIVATE_KEY.")]
    NoProviderFound,

    #[error("User rejected the request")]
    UserRejected,

    #[error("Invalid signature: {0}")]
    SignatureInvalid(String),

    #[error("No active wallet session")]
    NoSession,

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Validation failed: {}", .0.join(" "))]
    Validation(Vec<String>),

    #[error("Agent Limit Reached")]
    AgentLimitReached,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Malformed backend data: {0}")]
    MalformedData(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Realtime feed error: {0}")]
    Feed(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How an error is surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Wallet extension missing, signing rejected, account mismatch
    Provider,
    /// Wizard or trade form input problems
    Validation,
    /// Request failures and falsy-success payloads
    Backend,
    /// Unexpected backend field shapes
    MalformedData,
    /// Local storage, encryption and configuration failures
    Local,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NoProviderFound
            | Error::UserRejected
            | Error::SignatureInvalid(_)
            | Error::NoSession
            | Error::Wallet(_) => ErrorCategory::Provider,
            Error::Validation(_) | Error::AgentLimitReached | Error::InvalidArgument(_) => {
                ErrorCategory::Validation
            }
            Error::Backend(_) | Error::Network(_) | Error::Feed(_) => ErrorCategory::Backend,
            Error::MalformedData(_) | Error::Json(_) => ErrorCategory::MalformedData,
            Error::Encryption(_) | Error::Storage(_) | Error::Config(_) => ErrorCategory::Local,
        }
    }

    /// Provider errors block with a retry prompt; everything else is a transient notice.
    pub fn is_blocking(&self) -> bool {
        self.category() == ErrorCategory::Provider
    }
}

pub type Result<T> = std::result::Result<T, Error>;
