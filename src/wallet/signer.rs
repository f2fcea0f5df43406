//! Local key wallet provider
//!
//! Backs the `WalletProvider` seam with a private key held in alloy's
//! `PrivateKeySigner`. The key is never serialized and never logged; it is
//! only reachable through signing.

use super::provider::{ProviderError, WalletProvider};
use crate::config::{networks::chains, NetworkConfig};
use crate::{Error, Result};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

/// Environment variable holding the hex private key for CLI use
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

pub struct LocalWalletProvider {
    signer: PrivateKeySigner,
    address: Address,
    /// Chains this wallet has been told about, plus the active one
    chains: Mutex<ChainState>,
}

struct ChainState {
    known: HashSet<u64>,
    active: u64,
}

impl LocalWalletProvider {
    /// Create a provider from an environment variable
    pub fn from_env(var_name: &str) -> Result<Self> {
        let key_hex = std::env::var(var_name).map_err(|_| {
            Error::Wallet(format!(
                "Environment variable {} not set. Required for the local wallet.",
                var_name
            ))
        })?;

        Self::from_hex(&key_hex)
    }

    /// Create a provider from a hex-encoded private key
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| Error::Wallet(format!("Invalid private key: {}", e)))?;
        let address = signer.address();

        Ok(Self {
            signer,
            address,
            chains: Mutex::new(ChainState {
                known: HashSet::from([chains::ETHEREUM]),
                active: chains::ETHEREUM,
            }),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Lowercase 0x-hex address
    pub fn address_string(&self) -> String {
        self.address.to_string().to_lowercase()
    }

    pub fn active_chain(&self) -> u64 {
        self.chains.lock().map(|c| c.active).unwrap_or(chains::ETHEREUM)
    }

    fn parse_chain_id(chain_id_hex: &str) -> std::result::Result<u64, ProviderError> {
        let digits = chain_id_hex.strip_prefix("0x").unwrap_or(chain_id_hex);
        u64::from_str_radix(digits, 16).map_err(|_| ProviderError::Other {
            code: -32602,
            message: format!("Invalid chain id {}", chain_id_hex),
        })
    }
}

#[async_trait]
impl WalletProvider for LocalWalletProvider {
    async fn accounts(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(vec![self.address_string()])
    }

    async fn request_accounts(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(vec![self.address_string()])
    }

    async fn sign_message(
        &self,
        address: &str,
        message: &str,
    ) -> std::result::Result<String, ProviderError> {
        if !address.eq_ignore_ascii_case(&self.address_string()) {
            return Err(ProviderError::Other {
                code: 4100,
                message: format!("Account {} is not authorized", address),
            });
        }

        let signature = self
            .signer
            .sign_message_sync(message.as_bytes())
            .map_err(|e| ProviderError::Other {
                code: -32603,
                message: format!("Signing failed: {}", e),
            })?;

        Ok(alloy::hex::encode_prefixed(signature.as_bytes()))
    }

    async fn switch_chain(&self, chain_id_hex: &str) -> std::result::Result<(), ProviderError> {
        let chain_id = Self::parse_chain_id(chain_id_hex)?;
        let mut state = self.chains.lock().map_err(|_| ProviderError::Unavailable)?;
        if !state.known.contains(&chain_id) {
            return Err(ProviderError::UnknownChain(chain_id_hex.to_string()));
        }
        state.active = chain_id;
        tracing::debug!(chain_id, "Local wallet switched chain");
        Ok(())
    }

    async fn add_chain(&self, network: &NetworkConfig) -> std::result::Result<(), ProviderError> {
        let mut state = self.chains.lock().map_err(|_| ProviderError::Unavailable)?;
        state.known.insert(network.chain_id);
        state.active = network.chain_id;
        tracing::debug!(chain_id = network.chain_id, name = %network.name, "Local wallet added chain");
        Ok(())
    }
}

impl std::fmt::Debug for LocalWalletProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWalletProvider")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkTable;
    use crate::wallet::verify::recover_signer;

    // Well-known development key; never holds funds.
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_provider_from_hex() {
        let wallet = LocalWalletProvider::from_hex(TEST_KEY).unwrap();
        assert_eq!(wallet.address_string(), TEST_ADDRESS);
    }

    #[test]
    fn test_debug_redacts_key() {
        let wallet = LocalWalletProvider::from_hex(TEST_KEY).unwrap();
        let debug_str = format!("{:?}", wallet);
        assert!(!debug_str.contains("ac0974bec"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_invalid_key_is_wallet_error() {
        assert!(matches!(
            LocalWalletProvider::from_hex("0xnothex"),
            Err(Error::Wallet(_))
        ));
    }

    #[tokio::test]
    async fn test_signature_recovers_own_address() {
        let wallet = LocalWalletProvider::from_hex(TEST_KEY).unwrap();
        let signature = wallet.sign_message(TEST_ADDRESS, "hello").await.unwrap();
        // 65 bytes as 0x-hex
        assert_eq!(signature.len(), 132);
        let recovered = recover_signer("hello", &signature).unwrap();
        assert_eq!(recovered, TEST_ADDRESS);
    }

    #[tokio::test]
    async fn test_refuses_to_sign_for_other_account() {
        let wallet = LocalWalletProvider::from_hex(TEST_KEY).unwrap();
        let result = wallet
            .sign_message("0x0000000000000000000000000000000000000001", "hello")
            .await;
        assert!(matches!(result, Err(ProviderError::Other { code: 4100, .. })));
    }

    #[tokio::test]
    async fn test_unknown_chain_until_added() {
        let wallet = LocalWalletProvider::from_hex(TEST_KEY).unwrap();
        let table = NetworkTable::default();
        let base = table.get("base").unwrap();

        let err = wallet.switch_chain(&base.chain_id_hex()).await.unwrap_err();
        assert_eq!(err.code(), Some(4902));

        wallet.add_chain(base).await.unwrap();
        assert_eq!(wallet.active_chain(), chains::BASE);
        wallet.switch_chain("0x1").await.unwrap();
        assert_eq!(wallet.active_chain(), chains::ETHEREUM);
    }
}
