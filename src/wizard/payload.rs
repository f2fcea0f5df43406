//! Deployment payload
//!
//! A finished form becomes a typed `DeploymentPayload`, which is lowered to
//! the wire `DeployAgentRequest` only at submission. Platform credentials
//! are collected for the platforms the agent actually runs on and for no
//! others.

use super::form::{AgentArchetype, CharacterDetails, SocialPlatform, TradingConfig, WizardForm};
use super::strategy::{strategy_description, trading_parameters};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

pub const DEFAULT_CHAIN: &str = "ethereum";
const CHARACTER_DESCRIPTION: &str = "Trading agent";
const TRADE_ANALYSIS_BOT: &str = "trade_analysis_bot";

/// Environment secrets handed to the agent runtime
#[derive(Default)]
pub struct Secrets(BTreeMap<&'static str, SecretString>);

impl Secrets {
    fn insert(&mut self, key: &'static str, value: &str) {
        self.0.insert(key, SecretString::from(value.to_string()));
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.0.keys().copied().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v.expose_secret())))
            .collect();
        Value::Object(map)
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingSignalsConfig {
    pub asset_pairs: Vec<String>,
    pub config: TradingConfig,
}

impl TradingSignalsConfig {
    fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("assetPairs".into(), json!(self.asset_pairs));
        out.extend(self.config.to_json());
        Value::Object(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramAccess {
    pub restricted: bool,
    pub allowed_ids: Vec<String>,
}

#[derive(Debug)]
pub struct CharacterBlock {
    pub name: String,
    pub username: String,
    pub description: String,
    pub clients: Vec<String>,
    pub telegram: TelegramAccess,
    pub model_provider: String,
    pub secrets: Secrets,
    pub trading_signals: TradingSignalsConfig,
    pub plugins: Vec<String>,
    pub tags: Vec<String>,
    pub persona: Option<CharacterDetails>,
}

impl CharacterBlock {
    fn to_json(&self) -> Result<Value> {
        let mut out = Map::new();
        out.insert("name".into(), json!(self.name));
        out.insert("description".into(), json!(self.description));
        out.insert("username".into(), json!(self.username));
        out.insert("clients".into(), json!(self.clients));
        out.insert(
            "clientConfig".into(),
            json!({
                "telegram": {
                    "shouldOnlyJoinInAllowedGroups": self.telegram.restricted,
                    "allowedGroupIds": self.telegram.allowed_ids,
                }
            }),
        );
        out.insert("modelProvider".into(), json!(self.model_provider));
        out.insert(
            "settings".into(),
            json!({
                "secrets": self.secrets.to_json(),
                "trading_signals_config": self.trading_signals.to_json(),
            }),
        );
        out.insert("plugins".into(), json!(self.plugins));
        out.insert("tags".into(), json!(self.tags));

        if let Some(persona) = &self.persona {
            if let Value::Object(fields) = serde_json::to_value(persona)? {
                out.extend(fields);
            }
        }
        Ok(Value::Object(out))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentLinks {
    pub telegram: TelegramAccess,
    pub twitter: String,
    pub kind: String,
    pub social_platforms_opt_out: bool,
    pub trading_signals: TradingSignalsConfig,
}

impl AgentLinks {
    fn to_json(&self) -> Value {
        json!({
            "telegram": {
                "allowSelectedUsers": self.telegram.restricted,
                "allowedUserIds": self.telegram.allowed_ids,
            },
            "twitter": self.twitter,
            "type": self.kind,
            "socialPlatformsOptOut": self.social_platforms_opt_out,
            "trading_signals_config": self.trading_signals.to_json(),
        })
    }
}

/// Fields shared by every deployment
#[derive(Debug)]
pub struct SocialPayload {
    pub creator: String,
    pub provider: String,
    pub character: CharacterBlock,
    pub links: AgentLinks,
}

#[derive(Debug)]
pub struct OnchainPayload {
    pub agent: SocialPayload,
    pub strategy: String,
    pub strategy_description: String,
    pub chain: String,
    pub trading_parameters: Map<String, Value>,
}

#[derive(Debug)]
pub enum DeploymentPayload {
    Social(SocialPayload),
    Onchain(OnchainPayload),
}

/// Wire body of `POST /agent`. Onchain strategy fields travel inside
/// `character`; the top level is the same for every archetype.
#[derive(Clone, PartialEq, Serialize)]
pub struct DeployAgentRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub creator: String,
    pub character: Value,
    pub provider: String,
    pub links: Value,
}

impl std::fmt::Debug for DeployAgentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployAgentRequest")
            .field("kind", &self.kind)
            .field("creator", &self.creator)
            .field("provider", &self.provider)
            .field("character", &"[REDACTED]")
            .finish()
    }
}

impl DeploymentPayload {
    pub fn agent(&self) -> &SocialPayload {
        match self {
            DeploymentPayload::Social(agent) => agent,
            DeploymentPayload::Onchain(onchain) => &onchain.agent,
        }
    }

    pub fn into_request(self) -> Result<DeployAgentRequest> {
        let (agent, character) = match self {
            DeploymentPayload::Social(agent) => {
                let character = agent.character.to_json()?;
                (agent, character)
            }
            DeploymentPayload::Onchain(OnchainPayload {
                agent,
                strategy,
                strategy_description,
                chain,
                trading_parameters,
            }) => {
                let mut character = agent.character.to_json()?;
                if let Value::Object(fields) = &mut character {
                    fields.insert("description".into(), json!(strategy_description));
                    fields.insert("strategy".into(), json!(strategy));
                    fields.insert("chain".into(), json!(chain));
                    fields.insert("trading_parameters".into(), Value::Object(trading_parameters));
                }
                (agent, character)
            }
        };

        Ok(DeployAgentRequest {
            kind: agent.provider.clone(),
            creator: agent.creator,
            character,
            provider: agent.provider,
            links: agent.links.to_json(),
        })
    }
}

/// Build the deployment payload from a completed form
pub fn build_payload(
    form: &WizardForm,
    archetype: AgentArchetype,
    wallet: &str,
) -> Result<DeploymentPayload> {
    let creator = wallet.trim().to_lowercase();
    if creator.is_empty() {
        return Err(Error::InvalidArgument(
            "Wallet address is required for agent deployment".to_string(),
        ));
    }
    if form.selected_provider.is_empty() {
        return Err(Error::InvalidArgument(
            "Provider selection is required".to_string(),
        ));
    }
    if archetype == AgentArchetype::Social
        && !form.social_platforms_opt_out
        && form.character_details.is_none()
    {
        return Err(Error::Validation(vec![
            "Agent details are required for social agents".to_string(),
        ]));
    }

    let trading_signals = TradingSignalsConfig {
        asset_pairs: form.asset_pairs.iter().cloned().collect(),
        config: form.trading_config.clone(),
    };
    let telegram = TelegramAccess {
        restricted: form.telegram.restricts_groups(),
        allowed_ids: form.telegram.allowed_group_ids(),
    };

    let character = CharacterBlock {
        name: form.name.clone(),
        username: form.name.trim().to_string(),
        description: CHARACTER_DESCRIPTION.to_string(),
        clients: clients(form),
        telegram: telegram.clone(),
        model_provider: form.base_model.provider.clone(),
        secrets: secrets(form),
        trading_signals: trading_signals.clone(),
        plugins: Vec::new(),
        tags: tags(form),
        persona: persona(form, archetype),
    };
    let links = AgentLinks {
        telegram,
        twitter: form.twitter.handle.clone(),
        kind: if form.social_platforms_opt_out {
            TRADE_ANALYSIS_BOT.to_string()
        } else {
            String::new()
        },
        social_platforms_opt_out: form.social_platforms_opt_out,
        trading_signals: trading_signals.clone(),
    };
    let agent = SocialPayload {
        creator,
        provider: form.selected_provider.clone(),
        character,
        links,
    };

    match archetype {
        AgentArchetype::Social => Ok(DeploymentPayload::Social(agent)),
        AgentArchetype::Onchain => {
            let chain = match form.chain.trim() {
                "" => DEFAULT_CHAIN.to_string(),
                chain => chain.to_string(),
            };
            let mut params = trading_parameters(&form.strategy);
            params.insert(
                "tradingConfig".into(),
                Value::Object(trading_signals.config.to_json()),
            );
            params.insert("assetPairs".into(), json!(trading_signals.asset_pairs));

            Ok(DeploymentPayload::Onchain(OnchainPayload {
                agent,
                strategy: form.strategy.clone(),
                strategy_description: strategy_description(&form.strategy).to_string(),
                chain,
                trading_parameters: params,
            }))
        }
    }
}

fn clients(form: &WizardForm) -> Vec<String> {
    [SocialPlatform::Telegram, SocialPlatform::Twitter]
        .into_iter()
        .filter(|p| form.uses(*p))
        .map(|p| p.as_str().to_string())
        .collect()
}

fn tags(form: &WizardForm) -> Vec<String> {
    let mut tags = vec!["ASSISTANT".to_string()];
    if form.uses(SocialPlatform::Telegram) {
        tags.push("TELEGRAM".to_string());
    }
    if form.uses(SocialPlatform::Twitter) {
        tags.push("X/TWITTER".to_string());
    }
    tags
}

fn secrets(form: &WizardForm) -> Secrets {
    let mut secrets = Secrets::default();

    let model = &form.base_model;
    if !model.api_key.is_empty() {
        match model.provider.as_str() {
            "openai" => secrets.insert("OPENAI_API_KEY", &model.api_key),
            "anthropic" => secrets.insert("ANTHROPIC_API_KEY", &model.api_key),
            _ => {}
        }
    }

    if form.uses(SocialPlatform::Telegram) {
        secrets.insert("TELEGRAM_BOT_TOKEN", &form.telegram.bot_token);
    }
    if form.uses(SocialPlatform::Twitter) {
        let twitter = &form.twitter;
        secrets.insert("TWITTER_USERNAME", &twitter.handle);
        secrets.insert("TWITTER_EMAIL", &twitter.email);
        secrets.insert("TWITTER_PASSWORD", &twitter.password);
        secrets.insert("TWITTER_2FA_SECRET", &twitter.two_factor_secret);
    }
    secrets
}

fn persona(form: &WizardForm, archetype: AgentArchetype) -> Option<CharacterDetails> {
    let analyst = archetype == AgentArchetype::Social && form.social_platforms_opt_out;
    let details = match &form.character_details {
        Some(details) if !analyst || details.has_bio() => details.clone(),
        _ if analyst => CharacterDetails::trade_analyst(&form.name),
        _ => return None,
    };
    Some(CharacterDetails {
        post_examples: details
            .post_examples
            .into_iter()
            .filter(|post| !post.trim().is_empty())
            .collect(),
        ..details
    })
}
