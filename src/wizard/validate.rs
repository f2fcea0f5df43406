//! Per-step validation
//!
//! `validate_step` produces the messages shown under a step; it never
//! mutates the form. `is_next_disabled` is the cheaper predicate used to grey
//! out the next button before the user tries to advance.

use super::form::{SocialPlatform, TradingConfig, WizardForm};
use super::steps::Step;

pub fn validate_step(form: &WizardForm, step: Step) -> Vec<String> {
    let mut errors = Vec::new();
    match step {
        Step::Name => validate_name(&form.name, &mut errors),
        Step::TradingConfig => {
            if form.asset_pairs.is_empty() {
                errors.push("At least one asset pair must be selected.".to_string());
            }
            trading_config_errors(&form.trading_config, &mut errors);
        }
        Step::SocialPlatforms => validate_platforms(form, &mut errors),
        Step::CharacterDetails => {
            let has_bio = form
                .character_details
                .as_ref()
                .is_some_and(|details| details.has_bio());
            if !form.social_platforms_opt_out && !has_bio {
                errors.push("Please provide at least one bio line.".to_string());
            }
        }
        Step::BaseModel => {
            let model = &form.base_model;
            if model.provider.trim().is_empty() {
                errors.push("Please select a base model provider.".to_string());
            }
            if model.sub_model.trim().is_empty() {
                errors.push("Please select a specific model from the provider.".to_string());
            }
            if model.requires_api_key() && model.api_key.trim().is_empty() {
                errors.push(format!("Please enter your {} API Key.", model.provider));
            }
        }
        Step::Strategy => {
            if form.strategy.trim().is_empty() {
                errors.push("A strategy is required.".to_string());
            }
        }
        Step::Chain => {
            if form.chain.trim().is_empty() {
                errors.push("Please select a blockchain.".to_string());
            }
        }
        Step::Provider => {
            if form.selected_provider.is_empty() {
                errors.push("Please select a provider.".to_string());
            }
        }
    }
    errors
}

fn validate_name(name: &str, errors: &mut Vec<String>) {
    let name = name.trim();
    if name.is_empty() {
        errors.push("Agent name is required.".to_string());
    } else if name.chars().count() < 3 {
        errors.push("Agent name must be at least 3 characters long.".to_string());
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
    {
        errors.push("Agent name can only contain letters and spaces.".to_string());
    }
}

fn trading_config_errors(config: &TradingConfig, errors: &mut Vec<String>) {
    if config.signal_types().is_empty() {
        errors.push("Please select a trading signal type.".to_string());
    }
    if config.trade_types().is_empty() {
        errors.push("Please select a trade type.".to_string());
    }
    if config.has_perpetual() && config.perpetual_types().is_empty() {
        errors.push("Please select a perpetual trade type (Long/Short/Both).".to_string());
    }
}

fn validate_platforms(form: &WizardForm, errors: &mut Vec<String>) {
    if form.social_platforms_opt_out {
        return;
    }
    if form.social_platforms.is_empty() {
        errors.push("At least one social platform must be selected.".to_string());
    }
    if form.uses(SocialPlatform::Twitter) {
        let twitter = &form.twitter;
        let required = [
            (&twitter.email, "Twitter email is required."),
            (&twitter.password, "Twitter password is required."),
            (&twitter.two_factor_secret, "Twitter 2FA secret is required."),
            (&twitter.handle, "Twitter handle is required."),
        ];
        for (value, message) in required {
            if value.trim().is_empty() {
                errors.push(message.to_string());
            }
        }
    }
    if form.uses(SocialPlatform::Telegram) && form.telegram.bot_token.trim().is_empty() {
        errors.push("Telegram bot token is required.".to_string());
    }
}

/// Whether the next button should be greyed out on `step`.
///
/// Looser than `validate_step` for the name step: only emptiness disables,
/// the detailed rules are reported when the user presses next.
pub fn is_next_disabled(form: &WizardForm, step: Step, paid: bool) -> bool {
    match step {
        Step::Name => form.name.trim().is_empty(),
        Step::Provider => !paid,
        Step::TradingConfig
        | Step::SocialPlatforms
        | Step::CharacterDetails
        | Step::BaseModel
        | Step::Strategy
        | Step::Chain => !validate_step(form, step).is_empty(),
    }
}
