//! Step tables
//!
//! The steps a wizard walks through depend only on the archetype and the
//! social opt-out flag.

use super::form::AgentArchetype;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Step {
    Name,
    TradingConfig,
    SocialPlatforms,
    CharacterDetails,
    BaseModel,
    Strategy,
    Chain,
    Provider,
}

impl Step {
    pub fn title(&self) -> &'static str {
        match self {
            Step::Name => "Agent Name",
            Step::TradingConfig => "Trading Configuration",
            Step::SocialPlatforms => "Social Platforms",
            Step::CharacterDetails => "Character Details",
            Step::BaseModel => "Base Model",
            Step::Strategy => "Strategy",
            Step::Chain => "Blockchain",
            Step::Provider => "Provider",
        }
    }
}

const SOCIAL_OPT_OUT: &[Step] = &[
    Step::Name,
    Step::TradingConfig,
    Step::SocialPlatforms,
    Step::Provider,
];

const SOCIAL: &[Step] = &[
    Step::Name,
    Step::TradingConfig,
    Step::SocialPlatforms,
    Step::CharacterDetails,
    Step::Provider,
];

const ONCHAIN: &[Step] = &[
    Step::Name,
    Step::BaseModel,
    Step::Strategy,
    Step::Chain,
    Step::Provider,
];

pub fn step_table(archetype: AgentArchetype, opt_out: bool) -> &'static [Step] {
    match (archetype, opt_out) {
        (AgentArchetype::Social, true) => SOCIAL_OPT_OUT,
        (AgentArchetype::Social, false) => SOCIAL,
        // opt-out only shapes the social flow
        (AgentArchetype::Onchain, _) => ONCHAIN,
    }
}

pub fn step_count(archetype: AgentArchetype, opt_out: bool) -> usize {
    step_table(archetype, opt_out).len()
}
