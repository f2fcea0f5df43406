//! In-process fakes for the wallet provider and the backend

use crate::api::{AgentAction, AgentBackend, AgentRef, DeployResponse};
use crate::config::NetworkConfig;
use crate::signals::TradingSignal;
use crate::trade::TradeRequest;
use crate::wallet::{LocalWalletProvider, ProviderError, WalletProvider};
use crate::wizard::DeployAgentRequest;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use secrecy::SecretString;
use serde_json::{json, Value};
use sha1::Sha1;
use std::sync::Mutex;

/// First anvil/hardhat development key
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// Wallet provider signing with `TEST_KEY`
pub struct FakeProvider {
    inner: LocalWalletProvider,
    reported: Option<String>,
    reject_signatures: bool,
    reject_switch: bool,
    added: Mutex<Vec<u64>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            inner: LocalWalletProvider::from_hex(TEST_KEY).unwrap(),
            reported: None,
            reject_signatures: false,
            reject_switch: false,
            added: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting_signatures(mut self) -> Self {
        self.reject_signatures = true;
        self
    }

    /// Report `address` as the active account while still signing with the test key
    pub fn reporting(mut self, address: &str) -> Self {
        self.reported = Some(address.to_string());
        self
    }

    pub fn rejecting_chain_switch(mut self) -> Self {
        self.reject_switch = true;
        self
    }

    pub fn added_chains(&self) -> Vec<u64> {
        self.added.lock().unwrap().clone()
    }

    fn account(&self) -> String {
        self.reported
            .clone()
            .unwrap_or_else(|| TEST_ADDRESS.to_string())
    }
}

#[async_trait]
impl WalletProvider for FakeProvider {
    async fn accounts(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(vec![self.account()])
    }

    async fn request_accounts(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(vec![self.account()])
    }

    async fn sign_message(
        &self,
        _address: &str,
        message: &str,
    ) -> std::result::Result<String, ProviderError> {
        if self.reject_signatures {
            return Err(ProviderError::Rejected);
        }
        self.inner.sign_message(TEST_ADDRESS, message).await
    }

    async fn switch_chain(&self, chain_id_hex: &str) -> std::result::Result<(), ProviderError> {
        if self.reject_switch {
            return Err(ProviderError::Rejected);
        }
        self.inner.switch_chain(chain_id_hex).await
    }

    async fn add_chain(&self, network: &NetworkConfig) -> std::result::Result<(), ProviderError> {
        self.added.lock().unwrap().push(network.chain_id);
        self.inner.add_chain(network).await
    }
}

/// Backend with canned replies that records every call
#[derive(Default)]
pub struct FakeBackend {
    signals: Vec<TradingSignal>,
    fail_signals: bool,
    agents: Vec<Value>,
    fail_agents: bool,
    state_ack: Option<Value>,
    trade_ack: Option<Value>,
    deploy_response: Option<DeployResponse>,
    rsa_key: Option<RsaPrivateKey>,
    issued: Mutex<Vec<String>>,
    signal_calls: Mutex<Vec<(AgentRef, u32, u32)>>,
    agent_calls: Mutex<Vec<String>>,
    state_log: Mutex<Vec<(AgentRef, AgentAction, String)>>,
    trade_log: Mutex<Vec<TradeRequest>>,
    deploy_log: Mutex<Vec<DeployAgentRequest>>,
}

impl FakeBackend {
    pub fn with_signals(mut self, signals: Vec<TradingSignal>) -> Self {
        self.signals = signals;
        self
    }

    pub fn failing_signals(mut self) -> Self {
        self.fail_signals = true;
        self
    }

    pub fn with_agents(mut self, agents: Vec<Value>) -> Self {
        self.agents = agents;
        self
    }

    pub fn failing_agents(mut self) -> Self {
        self.fail_agents = true;
        self
    }

    pub fn with_state_ack(mut self, ack: Value) -> Self {
        self.state_ack = Some(ack);
        self
    }

    pub fn with_trade_ack(mut self, ack: Value) -> Self {
        self.trade_ack = Some(ack);
        self
    }

    pub fn with_deploy_response(mut self, response: DeployResponse) -> Self {
        self.deploy_response = Some(response);
        self
    }

    /// Serve a fresh 1024-bit key from `encryption_key`
    pub fn with_rsa_key(mut self) -> Self {
        let mut rng = rand::thread_rng();
        self.rsa_key = Some(RsaPrivateKey::new(&mut rng, 1024).unwrap());
        self
    }

    pub fn decrypt(&self, sealed: &str) -> Value {
        let key = self.rsa_key.as_ref().expect("backend has no rsa key");
        let bytes = STANDARD.decode(sealed).unwrap();
        let plain = key.decrypt(Oaep::new::<Sha1>(), &bytes).unwrap();
        serde_json::from_slice(&plain).unwrap()
    }

    pub fn issued_for(&self) -> Vec<String> {
        self.issued.lock().unwrap().clone()
    }

    pub fn signal_requests(&self) -> Vec<(AgentRef, u32, u32)> {
        self.signal_calls.lock().unwrap().clone()
    }

    pub fn agent_queries(&self) -> Vec<String> {
        self.agent_calls.lock().unwrap().clone()
    }

    pub fn state_calls(&self) -> Vec<(AgentRef, AgentAction, String)> {
        self.state_log.lock().unwrap().clone()
    }

    pub fn trades(&self) -> Vec<TradeRequest> {
        self.trade_log.lock().unwrap().clone()
    }

    pub fn deployments(&self) -> Vec<DeployAgentRequest> {
        self.deploy_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentBackend for FakeBackend {
    async fn issue_token(&self, address: &str) -> Result<SecretString> {
        self.issued.lock().unwrap().push(address.to_string());
        let prefix: String = address.chars().take(6).collect();
        Ok(SecretString::from(format!("jwt-for-{}", prefix)))
    }

    async fn deploy_agent(&self, request: &DeployAgentRequest) -> Result<DeployResponse> {
        // stay pending for one poll so concurrent submits overlap
        tokio::task::yield_now().await;
        self.deploy_log.lock().unwrap().push(request.clone());
        Ok(self.deploy_response.clone().unwrap_or_else(|| {
            serde_json::from_value(json!({"success": true, "agentId": "agent-1"})).unwrap()
        }))
    }

    async fn list_agents(&self, creator: &str) -> Result<Vec<Value>> {
        self.agent_calls.lock().unwrap().push(creator.to_string());
        if self.fail_agents {
            return Err(Error::Backend("agents unavailable".to_string()));
        }
        Ok(self.agents.clone())
    }

    async fn get_agent(&self, agent: &AgentRef) -> Result<Option<Value>> {
        Ok(self
            .agents
            .iter()
            .find(|row| row.get("agentid").and_then(Value::as_str) == Some(agent.agent_id.as_str()))
            .cloned())
    }

    async fn set_agent_state(
        &self,
        agent: &AgentRef,
        action: AgentAction,
        name: &str,
    ) -> Result<Value> {
        self.state_log
            .lock()
            .unwrap()
            .push((agent.clone(), action, name.to_string()));
        Ok(self
            .state_ack
            .clone()
            .unwrap_or_else(|| json!({"success": true})))
    }

    async fn trade_signals(
        &self,
        agent: &AgentRef,
        page: u32,
        limit: u32,
    ) -> Result<Vec<TradingSignal>> {
        self.signal_calls
            .lock()
            .unwrap()
            .push((agent.clone(), page, limit));
        if self.fail_signals {
            return Err(Error::Backend("signals unavailable".to_string()));
        }
        let skip = (page.saturating_sub(1) * limit) as usize;
        Ok(self
            .signals
            .iter()
            .skip(skip)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn encryption_key(&self) -> Result<String> {
        let key = self
            .rsa_key
            .as_ref()
            .ok_or_else(|| Error::Backend("no encryption key configured".to_string()))?;
        RsaPublicKey::from(key)
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| Error::Encryption(e.to_string()))
    }

    async fn submit_trade(&self, request: &TradeRequest) -> Result<Value> {
        self.trade_log.lock().unwrap().push(request.clone());
        Ok(self
            .trade_ack
            .clone()
            .unwrap_or_else(|| json!({"success": true})))
    }
}
