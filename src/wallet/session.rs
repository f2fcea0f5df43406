//! Wallet session lifecycle
//!
//! A session pairs the lowercase wallet address with the backend bearer
//! token. Both live in one persisted record, so they are written and cleared
//! together. A session is only handed out while the provider still reports
//! the same account first.

use super::provider::{ProviderError, WalletProvider};
use super::verify::{generate_nonce, verify_signature};
use crate::api::AgentBackend;
use crate::config::NetworkConfig;
use crate::notify::{Notice, Notifier};
use crate::storage::Repository;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The persisted form of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub address: String,
    pub token: String,
    pub connected_at: DateTime<Utc>,
}

pub struct WalletSession {
    address: String,
    token: SecretString,
    connected_at: DateTime<Utc>,
}

impl WalletSession {
    /// Lowercase 0x-hex address
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    fn from_stored(stored: StoredSession) -> Self {
        Self {
            address: stored.address.to_lowercase(),
            token: SecretString::from(stored.token),
            connected_at: stored.connected_at,
        }
    }

    fn to_stored(&self) -> StoredSession {
        StoredSession {
            address: self.address.clone(),
            token: self.token.expose_secret().to_string(),
            connected_at: self.connected_at,
        }
    }
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("address", &self.address)
            .field("token", &"[REDACTED]")
            .field("connected_at", &self.connected_at)
            .finish()
    }
}

/// What an `accountsChanged` event did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    Unchanged,
    Disconnected,
    AccountSwitched { from: String, to: String },
}

pub struct SessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    backend: Arc<dyn AgentBackend>,
    store: Arc<dyn Repository<StoredSession>>,
    notifier: Arc<dyn Notifier>,
    session: Option<WalletSession>,
}

impl SessionManager {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        backend: Arc<dyn AgentBackend>,
        store: Arc<dyn Repository<StoredSession>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            provider,
            backend,
            store,
            notifier,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&WalletSession> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Guard for views that need a wallet
    pub fn require_session(&self) -> Result<&WalletSession> {
        self.session.as_ref().ok_or(Error::NoSession)
    }

    fn provider(&self) -> Result<&Arc<dyn WalletProvider>> {
        self.provider.as_ref().ok_or(Error::NoProviderFound)
    }

    /// Prompt for an account, prove ownership and exchange it for a token
    pub async fn connect(&mut self) -> Result<&WalletSession> {
        match self.try_connect().await {
            Ok(session) => {
                self.store.save(&session.to_stored())?;
                self.notifier.notify(Notice::success(
                    "Wallet Connected",
                    format!("Signed in as {}", session.address),
                ));
                Ok(self.session.insert(session))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Wallet connection failed");
                self.notifier
                    .notify(Notice::error("Wallet Connection Failed", e.to_string()));
                Err(e)
            }
        }
    }

    async fn try_connect(&self) -> Result<WalletSession> {
        let provider = self.provider()?;

        let accounts = provider.request_accounts().await?;
        let address = accounts
            .first()
            .map(|a| a.to_lowercase())
            .ok_or_else(|| Error::Wallet("Provider returned no accounts".to_string()))?;

        let nonce = generate_nonce();
        let signature = provider.sign_message(&address, &nonce).await?;
        verify_signature(&nonce, &signature, &address)?;

        let token = self.backend.issue_token(&address).await?;
        tracing::info!(%address, "Wallet authenticated");

        Ok(WalletSession {
            address,
            token,
            connected_at: Utc::now(),
        })
    }

    /// Resume a persisted session if the provider still reports its account
    ///
    /// Returns `None` when nothing is stored, no provider is present, or the
    /// provider's first account differs (which also clears the record).
    pub async fn restore(&mut self) -> Result<Option<&WalletSession>> {
        let Some(stored) = self.store.load()? else {
            return Ok(None);
        };
        let Some(provider) = self.provider.as_ref() else {
            tracing::debug!("Stored session ignored: no wallet provider");
            return Ok(None);
        };

        let accounts = match provider.accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read authorized accounts");
                return Ok(None);
            }
        };

        match accounts.first() {
            Some(first) if first.eq_ignore_ascii_case(&stored.address) => {
                tracing::info!(address = %stored.address, "Restored wallet session");
                Ok(Some(self.session.insert(WalletSession::from_stored(stored))))
            }
            Some(first) => {
                tracing::info!(
                    stored = %stored.address,
                    current = %first,
                    "Provider account differs from stored session"
                );
                self.store.clear()?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn disconnect(&mut self) -> Result<()> {
        self.store.clear()?;
        if let Some(session) = self.session.take() {
            tracing::info!(address = %session.address, "Wallet disconnected");
        }
        self.notifier.notify(Notice::info(
            "Wallet Disconnected",
            "Your wallet has been disconnected",
        ));
        Ok(())
    }

    /// React to the provider's `accountsChanged` event
    ///
    /// An empty list logs out. A different first account takes over the
    /// current session without a new signature; the token is kept.
    pub fn handle_accounts_changed(&mut self, accounts: &[String]) -> Result<SessionChange> {
        let Some(first) = accounts.first() else {
            if self.session.is_none() {
                self.store.clear()?;
                return Ok(SessionChange::Unchanged);
            }
            self.disconnect()?;
            return Ok(SessionChange::Disconnected);
        };

        let Some(session) = self.session.as_mut() else {
            return Ok(SessionChange::Unchanged);
        };
        if first.eq_ignore_ascii_case(&session.address) {
            return Ok(SessionChange::Unchanged);
        }

        let from = std::mem::replace(&mut session.address, first.to_lowercase());
        let to = session.address.clone();
        self.store.save(&session.to_stored())?;

        tracing::info!(%from, %to, "Wallet account switched");
        self.notifier.notify(Notice::info(
            "Wallet Account Changed",
            format!("Now using {}", to),
        ));
        Ok(SessionChange::AccountSwitched { from, to })
    }

    /// Point the provider at `network`, adding it first if unknown
    pub async fn switch_network(&self, network: &NetworkConfig) -> Result<()> {
        let provider = self.provider()?;
        let chain_id = network.chain_id_hex();

        let result = match provider.switch_chain(&chain_id).await {
            Ok(()) => Ok(()),
            Err(ProviderError::UnknownChain(_)) => {
                tracing::info!(%chain_id, name = %network.name, "Adding chain to wallet");
                provider.add_chain(network).await.map_err(|e| {
                    tracing::warn!(error = %e, %chain_id, "Adding chain failed");
                    Error::Wallet(format!("Failed to add {} network", network.name))
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, %chain_id, "Switching chain failed");
                Err(Error::Wallet(format!(
                    "Failed to switch to {} network",
                    network.name
                )))
            }
        };

        match &result {
            Ok(()) => self.notifier.notify(Notice::success(
                "Network Switched",
                format!("Switched to {}", network.name),
            )),
            Err(e) => self
                .notifier
                .notify(Notice::error("Network Switch Failed", e.to_string())),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkTable;
    use crate::notify::recording::RecordingNotifier;
    use crate::storage::MemoryRepository;
    use crate::testing::{FakeBackend, FakeProvider, TEST_ADDRESS};

    struct Harness {
        manager: SessionManager,
        store: Arc<MemoryRepository<StoredSession>>,
        notifier: Arc<RecordingNotifier>,
        backend: Arc<FakeBackend>,
    }

    fn harness(provider: Option<FakeProvider>) -> Harness {
        let store = Arc::new(MemoryRepository::<StoredSession>::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let backend = Arc::new(FakeBackend::default());
        let manager = SessionManager::new(
            provider.map(|p| Arc::new(p) as Arc<dyn WalletProvider>),
            backend.clone(),
            store.clone(),
            notifier.clone(),
        );
        Harness {
            manager,
            store,
            notifier,
            backend,
        }
    }

    fn stored(address: &str) -> StoredSession {
        StoredSession {
            address: address.to_string(),
            token: "jwt-old".to_string(),
            connected_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn connect_persists_address_and_token_together() {
        let mut h = harness(Some(FakeProvider::new()));

        let session = h.manager.connect().await.unwrap();
        assert_eq!(session.address(), TEST_ADDRESS);
        assert_eq!(session.token().expose_secret(), "jwt-for-0xf39f");

        let saved = h.store.load().unwrap().unwrap();
        assert_eq!(saved.address, TEST_ADDRESS);
        assert_eq!(saved.token, "jwt-for-0xf39f");
        assert_eq!(h.backend.issued_for(), vec![TEST_ADDRESS.to_string()]);
        assert_eq!(h.notifier.titles(), vec!["Wallet Connected"]);
    }

    #[tokio::test]
    async fn connect_without_provider_fails() {
        let mut h = harness(None);
        let err = h.manager.connect().await.unwrap_err();
        assert!(matches!(err, Error::NoProviderFound));
        assert!(err.is_blocking());
        assert!(h.store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_signature_leaves_no_session() {
        let mut h = harness(Some(FakeProvider::new().rejecting_signatures()));
        let err = h.manager.connect().await.unwrap_err();
        assert!(matches!(err, Error::UserRejected));
        assert!(h.manager.session().is_none());
        assert!(h.store.load().unwrap().is_none());
        assert!(h.backend.issued_for().is_empty());
    }

    #[tokio::test]
    async fn signature_from_other_key_is_refused() {
        let provider =
            FakeProvider::new().reporting("0x70997970c51812dc3a010c7d01b50e0d17dc79c8");
        let mut h = harness(Some(provider));

        let err = h.manager.connect().await.unwrap_err();
        assert!(matches!(err, Error::SignatureInvalid(_)));
        assert!(h.backend.issued_for().is_empty());
        assert_eq!(h.notifier.titles(), vec!["Wallet Connection Failed"]);
    }

    #[tokio::test]
    async fn restore_matches_case_insensitively() {
        let mut h = harness(Some(FakeProvider::new()));
        h.store
            .save(&stored("0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266"))
            .unwrap();

        let session = h.manager.restore().await.unwrap().unwrap();
        assert_eq!(session.address(), TEST_ADDRESS);
        assert_eq!(session.token().expose_secret(), "jwt-old");
    }

    #[tokio::test]
    async fn restore_clears_record_on_account_mismatch() {
        let mut h = harness(Some(FakeProvider::new()));
        h.store
            .save(&stored("0x70997970c51812dc3a010c7d01b50e0d17dc79c8"))
            .unwrap();

        assert!(h.manager.restore().await.unwrap().is_none());
        assert!(h.store.load().unwrap().is_none());
        assert!(matches!(h.manager.require_session(), Err(Error::NoSession)));
    }

    #[tokio::test]
    async fn restore_without_provider_keeps_record() {
        let mut h = harness(None);
        h.store.save(&stored(TEST_ADDRESS)).unwrap();

        assert!(h.manager.restore().await.unwrap().is_none());
        assert!(h.store.load().unwrap().is_some());
    }

    #[tokio::test]
    async fn empty_accounts_logs_out() {
        let mut h = harness(Some(FakeProvider::new()));
        h.manager.connect().await.unwrap();

        let change = h.manager.handle_accounts_changed(&[]).unwrap();
        assert_eq!(change, SessionChange::Disconnected);
        assert!(h.manager.session().is_none());
        assert!(h.store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn new_first_account_switches_and_keeps_token() {
        let mut h = harness(Some(FakeProvider::new()));
        h.manager.connect().await.unwrap();

        let other = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string();
        let change = h.manager.handle_accounts_changed(&[other]).unwrap();
        assert_eq!(
            change,
            SessionChange::AccountSwitched {
                from: TEST_ADDRESS.to_string(),
                to: "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".to_string(),
            }
        );

        let saved = h.store.load().unwrap().unwrap();
        assert_eq!(saved.address, "0x70997970c51812dc3a010c7d01b50e0d17dc79c8");
        assert_eq!(saved.token, "jwt-for-0xf39f");
    }

    #[tokio::test]
    async fn same_account_is_unchanged() {
        let mut h = harness(Some(FakeProvider::new()));
        h.manager.connect().await.unwrap();
        let change = h
            .manager
            .handle_accounts_changed(&[TEST_ADDRESS.to_string()])
            .unwrap();
        assert_eq!(change, SessionChange::Unchanged);
    }

    #[tokio::test]
    async fn switch_network_adds_unknown_chain() {
        let provider = Arc::new(FakeProvider::new());
        let store = Arc::new(MemoryRepository::<StoredSession>::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = SessionManager::new(
            Some(provider.clone() as Arc<dyn WalletProvider>),
            Arc::new(FakeBackend::default()),
            store,
            notifier.clone(),
        );
        let table = NetworkTable::default();

        manager.switch_network(table.get("base").unwrap()).await.unwrap();
        assert_eq!(provider.added_chains(), vec![8453]);

        manager.switch_network(table.get("ethereum").unwrap()).await.unwrap();
        assert_eq!(provider.added_chains(), vec![8453]);
        assert_eq!(notifier.titles(), vec!["Network Switched", "Network Switched"]);
    }

    #[tokio::test]
    async fn rejected_switch_names_the_network() {
        let mut h = harness(Some(FakeProvider::new().rejecting_chain_switch()));
        let table = NetworkTable::default();

        let err = h
            .manager
            .switch_network(table.get("polygon").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Wallet error: Failed to switch to Polygon network");
        assert!(!h.manager.is_authenticated());
        h.manager.connect().await.unwrap();
        assert!(h.manager.is_authenticated());
    }
}
