//! Exchange API credentials
//!
//! Kept per exchange in a local slot, plain at rest. They only leave the
//! process RSA-encrypted, see `api::crypto`.

use super::Exchange;
use crate::storage::Repository;
use crate::Result;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct ExchangeCredentials {
    pub api_key: SecretString,
    pub secret: SecretString,
    /// Passphrase, for exchanges that issue one
    pub password: Option<SecretString>,
}

impl ExchangeCredentials {
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>, password: Option<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            secret: SecretString::from(secret.into()),
            password: password.map(SecretString::from),
        }
    }

    /// Plaintext JSON that gets encrypted for the backend
    pub fn wire_json(&self) -> Value {
        json!({
            "apiKey": self.api_key.expose_secret(),
            "secret": self.secret.expose_secret(),
            "password": self.password.as_ref().map(|p| p.expose_secret()).unwrap_or(""),
        })
    }

    fn to_record(&self) -> CredentialRecord {
        CredentialRecord {
            api_key: self.api_key.expose_secret().to_string(),
            secret: self.secret.expose_secret().to_string(),
            password: self.password.as_ref().map(|p| p.expose_secret().to_string()),
        }
    }
}

impl std::fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCredentials")
            .field("api_key", &"[REDACTED]")
            .field("secret", &"[REDACTED]")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Persisted form of one exchange's credentials
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub api_key: String,
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialRecord([REDACTED])")
    }
}

pub type CredentialMap = BTreeMap<String, CredentialRecord>;

/// Per-exchange credential slot
#[derive(Clone)]
pub struct ExchangeCredentialStore {
    repo: Arc<dyn Repository<CredentialMap>>,
}

impl ExchangeCredentialStore {
    pub fn new(repo: Arc<dyn Repository<CredentialMap>>) -> Self {
        Self { repo }
    }

    pub fn get(&self, exchange: Exchange) -> Result<Option<ExchangeCredentials>> {
        let map = self.repo.load()?.unwrap_or_default();
        Ok(map.get(exchange.wire_name()).map(|record| {
            ExchangeCredentials::new(
                record.api_key.clone(),
                record.secret.clone(),
                record.password.clone(),
            )
        }))
    }

    pub fn set(&self, exchange: Exchange, credentials: &ExchangeCredentials) -> Result<()> {
        let mut map = self.repo.load()?.unwrap_or_default();
        map.insert(exchange.wire_name().to_string(), credentials.to_record());
        self.repo.save(&map)?;
        tracing::info!(%exchange, "Stored exchange credentials");
        Ok(())
    }

    pub fn remove(&self, exchange: Exchange) -> Result<bool> {
        let mut map = self.repo.load()?.unwrap_or_default();
        let removed = map.remove(exchange.wire_name()).is_some();
        if removed {
            self.repo.save(&map)?;
        }
        Ok(removed)
    }
}
