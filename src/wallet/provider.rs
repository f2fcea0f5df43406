//! Wallet provider seam
//!
//! A provider is whatever holds the user's keys: an injected browser wallet,
//! a hardware bridge or the local key signer. The session layer only sees
//! this trait.

use crate::config::NetworkConfig;
use crate::Error;
use async_trait::async_trait;
use thiserror::Error as ThisError;

/// EIP-1193 code for a request the user declined
pub const CODE_USER_REJECTED: i64 = 4001;
/// EIP-1193 code for a chain the provider has not been told about
pub const CODE_UNRECOGNIZED_CHAIN: i64 = 4902;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("User rejected the request")]
    Rejected,

    #[error("Unrecognized chain {0}")]
    UnknownChain(String),

    #[error("Wallet provider unavailable")]
    Unavailable,

    #[error("Provider error {code}: {message}")]
    Other { code: i64, message: String },
}

impl ProviderError {
    /// Map a raw provider error code onto the known cases
    pub fn from_code(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            CODE_USER_REJECTED => ProviderError::Rejected,
            CODE_UNRECOGNIZED_CHAIN => ProviderError::UnknownChain(message),
            _ => ProviderError::Other { code, message },
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            ProviderError::Rejected => Some(CODE_USER_REJECTED),
            ProviderError::UnknownChain(_) => Some(CODE_UNRECOGNIZED_CHAIN),
            ProviderError::Unavailable => None,
            ProviderError::Other { code, .. } => Some(*code),
        }
    }
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected => Error::UserRejected,
            ProviderError::Unavailable => Error::NoProviderFound,
            other => Error::Wallet(other.to_string()),
        }
    }
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts already authorized for this client, without prompting
    async fn accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// Ask the user to authorize accounts
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// EIP-191 personal_sign; returns the 65-byte signature as 0x-hex
    async fn sign_message(&self, address: &str, message: &str) -> Result<String, ProviderError>;

    /// wallet_switchEthereumChain
    async fn switch_chain(&self, chain_id_hex: &str) -> Result<(), ProviderError>;

    /// wallet_addEthereumChain
    async fn add_chain(&self, network: &NetworkConfig) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_known_cases() {
        assert_eq!(ProviderError::from_code(4001, "nope"), ProviderError::Rejected);
        assert!(matches!(
            ProviderError::from_code(4902, "0x2105"),
            ProviderError::UnknownChain(_)
        ));
        assert_eq!(ProviderError::from_code(-32603, "internal").code(), Some(-32603));
    }

    #[test]
    fn rejection_becomes_user_rejected() {
        let err: Error = ProviderError::Rejected.into();
        assert!(matches!(err, Error::UserRejected));
        let err: Error = ProviderError::Unavailable.into();
        assert!(matches!(err, Error::NoProviderFound));
    }
}
