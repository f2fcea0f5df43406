//! Wizard form state
//!
//! Raw inputs gathered across the wizard steps. Credential blocks keep plain
//! strings while the user is editing; they only leave the process inside a
//! deployment request, and their `Debug` output is redacted.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentArchetype {
    Social,
    Onchain,
}

impl FromStr for AgentArchetype {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "social" => Ok(AgentArchetype::Social),
            "onchain" => Ok(AgentArchetype::Onchain),
            other => Err(Error::InvalidArgument(format!(
                "Unknown agent archetype: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Ai,
    Algorithmic,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Spot,
    Perpetual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerpetualDirection {
    Long,
    Short,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Telegram,
    Twitter,
}

impl SocialPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocialPlatform::Telegram => "telegram",
            SocialPlatform::Twitter => "twitter",
        }
    }
}

/// Signal and trade type selection.
///
/// Perpetual directions only exist while `Perpetual` is among the trade
/// types; removing it drops them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingConfig {
    #[serde(rename = "tradeSignalType", default)]
    signal_types: BTreeSet<SignalType>,
    #[serde(rename = "tradeType", default)]
    trade_types: BTreeSet<TradeType>,
    #[serde(rename = "perpetualType", default, skip_serializing_if = "BTreeSet::is_empty")]
    perpetual_types: BTreeSet<PerpetualDirection>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            signal_types: BTreeSet::from([SignalType::Ai]),
            trade_types: BTreeSet::from([TradeType::Spot]),
            perpetual_types: BTreeSet::new(),
        }
    }
}

impl TradingConfig {
    pub fn empty() -> Self {
        Self {
            signal_types: BTreeSet::new(),
            trade_types: BTreeSet::new(),
            perpetual_types: BTreeSet::new(),
        }
    }

    pub fn signal_types(&self) -> &BTreeSet<SignalType> {
        &self.signal_types
    }

    pub fn trade_types(&self) -> &BTreeSet<TradeType> {
        &self.trade_types
    }

    /// Directions that apply; empty unless perpetual trading is selected
    pub fn perpetual_types(&self) -> BTreeSet<PerpetualDirection> {
        if self.has_perpetual() {
            self.perpetual_types.clone()
        } else {
            BTreeSet::new()
        }
    }

    pub fn has_perpetual(&self) -> bool {
        self.trade_types.contains(&TradeType::Perpetual)
    }

    pub fn set_signal_types(&mut self, types: impl IntoIterator<Item = SignalType>) {
        self.signal_types = types.into_iter().collect();
    }

    pub fn set_trade_types(&mut self, types: impl IntoIterator<Item = TradeType>) {
        self.trade_types = types.into_iter().collect();
        if !self.has_perpetual() {
            self.perpetual_types.clear();
        }
    }

    /// Ignored unless perpetual trading is selected
    pub fn set_perpetual_types(&mut self, directions: impl IntoIterator<Item = PerpetualDirection>) {
        if self.has_perpetual() {
            self.perpetual_types = directions.into_iter().collect();
        }
    }

    /// Wire shape with stale directions removed
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut out = serde_json::Map::new();
        out.insert("tradeSignalType".into(), serde_json::json!(self.signal_types));
        out.insert("tradeType".into(), serde_json::json!(self.trade_types));
        if self.has_perpetual() {
            out.insert("perpetualType".into(), serde_json::json!(self.perpetual_types));
        }
        out
    }
}

/// LLM selection for onchain agents
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseModel {
    pub provider: String,
    pub sub_model: String,
    pub api_key: String,
}

impl BaseModel {
    /// Providers that run on the user's own key
    pub const KEYED_PROVIDERS: [&'static str; 3] = ["openai", "anthropic", "grok"];

    pub fn requires_api_key(&self) -> bool {
        Self::KEYED_PROVIDERS.contains(&self.provider.as_str())
    }

    pub(crate) fn social_default() -> Self {
        Self {
            provider: "openai".to_string(),
            sub_model: "gpt-4".to_string(),
            api_key: String::new(),
        }
    }
}

impl std::fmt::Debug for BaseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseModel")
            .field("provider", &self.provider)
            .field("sub_model", &self.sub_model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwitterConfig {
    pub email: String,
    pub password: String,
    pub two_factor_secret: String,
    pub handle: String,
}

impl std::fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterConfig")
            .field("handle", &self.handle)
            .field("email", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .field("two_factor_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub allow_selected_users: bool,
    /// Comma separated group ids
    pub selected_user_ids: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allow_selected_users: true,
            selected_user_ids: String::new(),
        }
    }
}

impl TelegramConfig {
    /// Group allow-list only applies to a configured bot
    pub fn restricts_groups(&self) -> bool {
        !self.bot_token.trim().is_empty() && self.allow_selected_users
    }

    pub fn allowed_group_ids(&self) -> Vec<String> {
        if !self.restricts_groups() {
            return Vec::new();
        }
        self.selected_user_ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("allow_selected_users", &self.allow_selected_users)
            .field("selected_user_ids", &self.selected_user_ids)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterStyle {
    pub all: Vec<String>,
    pub chat: Vec<String>,
    pub post: Vec<String>,
}

/// Persona block merged into the deployed character file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterDetails {
    pub bio: Vec<String>,
    pub lore: Vec<String>,
    pub knowledge: Vec<String>,
    pub message_examples: Vec<serde_json::Value>,
    pub style: CharacterStyle,
    pub topics: Vec<String>,
    pub adjectives: Vec<String>,
    pub post_examples: Vec<String>,
}

impl CharacterDetails {
    pub fn has_bio(&self) -> bool {
        self.bio.iter().any(|line| !line.trim().is_empty())
    }

    /// Stock persona for agents that only publish trade analysis
    pub fn trade_analyst(name: &str) -> Self {
        let name = name.trim();
        let lines = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            bio: vec![
                format!("{} is an autonomous trading analyst watching crypto markets around the clock.", name),
                format!("{} turns price action and indicator readings into concise trade signals.", name),
            ],
            lore: vec![format!(
                "{} was deployed to keep its operator informed about market moves.",
                name
            )],
            knowledge: lines(&[
                "Technical analysis with RSI, MACD and moving averages",
                "Spot and perpetual futures market structure",
                "Position sizing with stop losses and take profit targets",
            ]),
            message_examples: Vec::new(),
            style: CharacterStyle {
                all: lines(&["Concise", "Data driven"]),
                chat: lines(&["Answers with levels and invalidation points"]),
                post: lines(&["Leads with the ticker and direction"]),
            },
            topics: lines(&["crypto trading", "technical analysis", "risk management"]),
            adjectives: lines(&["analytical", "disciplined", "precise"]),
            post_examples: Vec::new(),
        }
    }
}

/// Chain preselected on the chain step
pub const DEFAULT_FORM_CHAIN: &str = "solana";

/// Everything the wizard collects before deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WizardForm {
    pub name: String,
    pub base_model: BaseModel,
    pub strategy: String,
    pub chain: String,
    pub social_platforms: BTreeSet<SocialPlatform>,
    pub social_platforms_opt_out: bool,
    pub asset_pairs: BTreeSet<String>,
    pub trading_config: TradingConfig,
    #[serde(rename = "twitterConfig")]
    pub twitter: TwitterConfig,
    #[serde(rename = "telegramConfig")]
    pub telegram: TelegramConfig,
    pub character_details: Option<CharacterDetails>,
    pub selected_provider: String,
}

impl Default for WizardForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_model: BaseModel::default(),
            strategy: String::new(),
            chain: DEFAULT_FORM_CHAIN.to_string(),
            social_platforms: BTreeSet::new(),
            social_platforms_opt_out: true,
            asset_pairs: BTreeSet::from(["BTC/USDT".to_string()]),
            trading_config: TradingConfig::default(),
            twitter: TwitterConfig::default(),
            telegram: TelegramConfig::default(),
            character_details: None,
            selected_provider: String::new(),
        }
    }
}

impl WizardForm {
    /// Platforms the agent will actually run on; none when opted out
    pub fn active_platforms(&self) -> BTreeSet<SocialPlatform> {
        if self.social_platforms_opt_out {
            BTreeSet::new()
        } else {
            self.social_platforms.clone()
        }
    }

    pub fn uses(&self, platform: SocialPlatform) -> bool {
        !self.social_platforms_opt_out && self.social_platforms.contains(&platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn removing_perpetual_drops_directions() {
        let mut config = TradingConfig::default();
        config.set_trade_types([TradeType::Spot, TradeType::Perpetual]);
        config.set_perpetual_types([PerpetualDirection::Long]);
        assert_eq!(config.perpetual_types().len(), 1);

        config.set_trade_types([TradeType::Spot]);
        assert!(config.perpetual_types().is_empty());

        // re-adding perpetual starts from no direction
        config.set_trade_types([TradeType::Perpetual]);
        assert!(config.perpetual_types().is_empty());
    }

    #[test]
    fn stale_directions_never_reach_the_wire() {
        let parsed: TradingConfig = serde_json::from_value(json!({
            "tradeSignalType": ["ai"],
            "tradeType": ["spot"],
            "perpetualType": ["long"]
        }))
        .unwrap();
        let wire = serde_json::Value::Object(parsed.to_json());
        assert_eq!(wire, json!({"tradeSignalType": ["ai"], "tradeType": ["spot"]}));
        assert!(parsed.perpetual_types().is_empty());
    }

    #[test]
    fn telegram_group_ids_need_bot_and_opt_in() {
        let mut telegram = TelegramConfig {
            bot_token: String::new(),
            allow_selected_users: true,
            selected_user_ids: "-100, -200 ,".to_string(),
        };
        assert!(telegram.allowed_group_ids().is_empty());

        telegram.bot_token = "123:abc".to_string();
        assert_eq!(telegram.allowed_group_ids(), vec!["-100", "-200"]);

        telegram.allow_selected_users = false;
        assert!(telegram.allowed_group_ids().is_empty());
    }

    #[test]
    fn form_parses_from_camel_case_json() {
        let form: WizardForm = serde_json::from_value(json!({
            "name": "Bot One",
            "socialPlatformsOptOut": false,
            "socialPlatforms": ["telegram"],
            "telegramConfig": {"botToken": "123:abc"},
            "baseModel": {"provider": "openai", "subModel": "gpt-4", "apiKey": "sk-test"}
        }))
        .unwrap();
        assert_eq!(form.name, "Bot One");
        assert!(form.uses(SocialPlatform::Telegram));
        assert!(form.telegram.allow_selected_users);
        assert!(form.asset_pairs.contains("BTC/USDT"));
        assert_eq!(form.chain, "solana");
        assert!(form.base_model.requires_api_key());
    }

    #[test]
    fn debug_hides_credentials() {
        let form = WizardForm {
            base_model: BaseModel {
                api_key: "sk-live-secret".to_string(),
                ..BaseModel::social_default()
            },
            twitter: TwitterConfig {
                password: "hunter2".to_string(),
                ..TwitterConfig::default()
            },
            ..WizardForm::default()
        };
        let rendered = format!("{:?}", form);
        assert!(!rendered.contains("sk-live-secret"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn archetype_from_cli_text() {
        assert_eq!("social".parse::<AgentArchetype>().unwrap(), AgentArchetype::Social);
        assert_eq!("ONCHAIN".parse::<AgentArchetype>().unwrap(), AgentArchetype::Onchain);
        assert!("cex".parse::<AgentArchetype>().is_err());
    }
}
