//! Deployed agent records
//!
//! The backend returns loosely typed rows. Every field is coerced into a
//! fixed shape here, falling back to a default when it is missing or has the
//! wrong type, so one bad row never hides the others.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_LLM_PROVIDER: &str = "slinky";
pub const DEFAULT_TOKENS_LIMIT: u64 = 1_000_000;
pub const DEFAULT_OPERATOR: &str = "Default Operator";
pub const DEFAULT_STRATEGY: &str = "spot";
pub const DEFAULT_AGENT_TYPE: &str = "ANALYSIS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
}

impl AgentStatus {
    pub fn toggled(self) -> Self {
        match self {
            AgentStatus::Active => AgentStatus::Inactive,
            AgentStatus::Inactive => AgentStatus::Active,
        }
    }

    fn from_value(value: Option<&Value>) -> Self {
        let active = match value {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64() == Some(1.0),
            Some(Value::String(s)) => {
                matches!(s.to_ascii_lowercase().as_str(), "active" | "true")
            }
            _ => false,
        };
        if active {
            AgentStatus::Active
        } else {
            AgentStatus::Inactive
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Active => f.write_str("active"),
            AgentStatus::Inactive => f.write_str("inactive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operator {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmConfig {
    pub provider: String,
    pub tokens_used: u64,
    pub tokens_limit: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_LLM_PROVIDER.to_string(),
            tokens_used: 0,
            tokens_limit: DEFAULT_TOKENS_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tee: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployedAgent {
    pub id: String,
    pub app_id: String,
    pub name: String,
    pub description: String,
    pub status: AgentStatus,
    pub creator: String,
    pub deployed_at: Option<String>,
    pub operator: Operator,
    pub blockchains: Vec<String>,
    pub llm_config: LlmConfig,
    pub configuration: AgentConfiguration,
    pub strategy: String,
    pub trading_parameters: Map<String, Value>,
    pub agent_type: String,
    pub links: Option<Value>,
}

impl DeployedAgent {
    /// Coerce a raw backend row. Only non-object rows are rejected.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let row = raw.as_object()?;

        let id = text(row, &["agentid", "id"]).unwrap_or_default();
        if id.is_empty() {
            tracing::warn!("Agent row has no id");
        }
        let creator = text(row, &["creator"]).unwrap_or_default();

        Some(Self {
            id,
            app_id: text(row, &["appid", "appId"]).unwrap_or_default(),
            name: text(row, &["agentname", "name"])
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "-".to_string()),
            description: text(row, &["description"]).unwrap_or_default(),
            status: AgentStatus::from_value(row.get("status")),
            operator: operator(row.get("operator"), &creator),
            creator,
            deployed_at: text(row, &["createdat", "created_at", "createdAt"]),
            blockchains: blockchains(row.get("blockchains")),
            llm_config: llm_config(row.get("llm_config")),
            configuration: configuration(row.get("configuration")),
            strategy: text(row, &["strategy"])
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_STRATEGY.to_string()),
            trading_parameters: row
                .get("trading_parameters")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            agent_type: text(row, &["agent_type"])
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_AGENT_TYPE.to_string()),
            links: row.get("links").filter(|v| !v.is_null()).cloned(),
        })
    }
}

/// First key holding a string (or number, stringified)
fn text(row: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match row.get(*key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn operator(value: Option<&Value>, creator: &str) -> Operator {
    let parsed = value.and_then(Value::as_object).and_then(|op| {
        match (op.get("name"), op.get("address")) {
            (Some(Value::String(name)), Some(Value::String(address))) => Some(Operator {
                name: name.clone(),
                address: address.clone(),
            }),
            _ => None,
        }
    });
    parsed.unwrap_or_else(|| Operator {
        name: DEFAULT_OPERATOR.to_string(),
        address: creator.to_string(),
    })
}

fn blockchains(value: Option<&Value>) -> Vec<String> {
    let chains: Vec<String> = value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();
    if chains.is_empty() {
        vec!["All Chains".to_string()]
    } else {
        chains
    }
}

fn llm_config(value: Option<&Value>) -> LlmConfig {
    let Some(config) = value.and_then(Value::as_object) else {
        return LlmConfig::default();
    };
    let defaults = LlmConfig::default();
    let count = |key: &str, default: u64| {
        config
            .get(key)
            .and_then(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .filter(|f| f.is_finite() && *f > 0.0)
            .map(|f| f as u64)
            .unwrap_or(default)
    };

    LlmConfig {
        provider: match config.get("provider") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => defaults.provider,
        },
        tokens_used: count("tokens_used", defaults.tokens_used),
        tokens_limit: count("tokens_limit", defaults.tokens_limit),
    }
}

fn configuration(value: Option<&Value>) -> AgentConfiguration {
    let Some(config) = value.and_then(Value::as_object) else {
        return AgentConfiguration::default();
    };
    AgentConfiguration {
        tee: config.get("tee").and_then(Value::as_bool),
        chain: config.get("chain").and_then(Value::as_str).map(String::from),
    }
}
