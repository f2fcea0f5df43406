//! Agent deployment wizard
//!
//! A declarative step table per archetype, pure per-step validators, the
//! provider/payment step and the payload builder. `WizardEngine` drives the
//! steps; `Deployer` submits the finished form exactly once at a time.

mod deploy;
mod engine;
mod form;
mod payload;
mod provider;
mod steps;
pub mod strategy;
mod validate;

pub use deploy::{DeployOutcome, Deployer};
pub use engine::{Advance, WizardEngine};
pub use form::{
    AgentArchetype, BaseModel, CharacterDetails, CharacterStyle, PerpetualDirection, SignalType,
    SocialPlatform, TelegramConfig, TradeType, TradingConfig, TwitterConfig, WizardForm,
    DEFAULT_FORM_CHAIN,
};
pub use payload::{
    build_payload, AgentLinks, CharacterBlock, DeployAgentRequest, DeploymentPayload,
    OnchainPayload, Secrets, SocialPayload, TelegramAccess, TradingSignalsConfig, DEFAULT_CHAIN,
};
pub use provider::{PaymentState, ProviderSelection};
pub use steps::{step_count, step_table, Step};
pub use validate::{is_next_disabled, validate_step};
