//! Backend API gateway
//!
//! `AgentBackend` is the seam every component talks through; `ApiClient` is
//! the reqwest implementation against the REST backend.

mod client;
pub mod crypto;

pub use client::ApiClient;

use crate::signals::TradingSignal;
use crate::trade::TradeRequest;
use crate::wizard::DeployAgentRequest;
use crate::{Error, Result};
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifies an agent on the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentRef {
    pub app_id: String,
    pub agent_id: String,
}

impl AgentRef {
    pub fn new(app_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            agent_id: agent_id.into(),
        }
    }

    /// Parse the `appId-agentId` route form. Agent ids may contain dashes;
    /// the app id never does.
    pub fn parse(route: &str) -> Result<Self> {
        match route.split_once('-') {
            Some((app_id, agent_id)) if !app_id.is_empty() && !agent_id.is_empty() => {
                Ok(Self::new(app_id, agent_id))
            }
            _ => Err(Error::InvalidArgument(format!(
                "Expected <appId>-<agentId>, got {}",
                route
            ))),
        }
    }
}

impl std::fmt::Display for AgentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.app_id, self.agent_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentAction {
    Start,
    Stop,
}

impl AgentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentAction::Start => "start",
            AgentAction::Stop => "stop",
        }
    }
}

/// Reply to `POST /agent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl DeployResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            extra: serde_json::Map::new(),
        }
    }
}

/// JavaScript-style truthiness for loosely typed acknowledgements
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Exchange a verified wallet address for a bearer token
    async fn issue_token(&self, address: &str) -> Result<SecretString>;

    async fn deploy_agent(&self, request: &DeployAgentRequest) -> Result<DeployResponse>;

    /// Raw agent records owned by `creator`
    async fn list_agents(&self, creator: &str) -> Result<Vec<Value>>;

    async fn get_agent(&self, agent: &AgentRef) -> Result<Option<Value>>;

    /// Start or stop an agent; returns the raw acknowledgement
    async fn set_agent_state(&self, agent: &AgentRef, action: AgentAction, name: &str)
        -> Result<Value>;

    async fn trade_signals(
        &self,
        agent: &AgentRef,
        page: u32,
        limit: u32,
    ) -> Result<Vec<TradingSignal>>;

    /// PEM public key for credential encryption
    async fn encryption_key(&self) -> Result<String>;

    async fn submit_trade(&self, request: &TradeRequest) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn agent_ref_splits_at_first_dash() {
        let agent = AgentRef::parse("110-5f2c-44aa").unwrap();
        assert_eq!(agent.app_id, "110");
        assert_eq!(agent.agent_id, "5f2c-44aa");
        assert_eq!(agent.to_string(), "110-5f2c-44aa");
        assert!(AgentRef::parse("nodash").is_err());
        assert!(AgentRef::parse("-abc").is_err());
    }

    #[test]
    fn truthiness_follows_javascript() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!("ok")));
        assert!(is_truthy(&json!(1)));
    }

    #[test]
    fn deploy_response_keeps_extra_fields() {
        let parsed: DeployResponse =
            serde_json::from_value(json!({"success": true, "agentId": "a1"})).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.extra.get("agentId"), Some(&json!("a1")));

        let missing: DeployResponse = serde_json::from_value(json!({})).unwrap();
        assert!(!missing.success);
    }
}
