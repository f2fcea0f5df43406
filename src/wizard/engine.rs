//! Wizard state machine
//!
//! Steps are numbered from 1. `next` only moves forward when the current
//! step validates; `prev` always succeeds above step 1. Whether the wallet
//! has used up its free-trial allowance is decided once, when the engine is
//! built, and is never re-checked.

use super::form::{AgentArchetype, BaseModel, WizardForm};
use super::payload::{build_payload, DeploymentPayload};
use super::provider::ProviderSelection;
use super::steps::{step_table, Step};
use super::validate::{is_next_disabled, validate_step};
use crate::api::AgentBackend;
use crate::config::Config;
use crate::notify::{Notice, Notifier, TracingNotifier};
use crate::{Error, Result};
use std::sync::Arc;

const LIMIT_DESCRIPTION: &str = "You can only create one agent in the free trial mode";

/// Result of a successful `next`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(usize),
    /// Final step passed; the form can be deployed
    ReadyToDeploy,
}

pub struct WizardEngine {
    archetype: AgentArchetype,
    form: WizardForm,
    cursor: usize,
    provider: ProviderSelection,
    limit_reached: bool,
    errors: Vec<String>,
    notifier: Arc<dyn Notifier>,
}

impl WizardEngine {
    pub fn new(archetype: AgentArchetype, existing_agents: usize, config: &Config) -> Self {
        let limit_reached = config.free_trial_only && existing_agents >= config.agent_limit;
        if limit_reached {
            tracing::info!(existing_agents, "Free-trial agent limit already reached");
        }

        let provider = ProviderSelection::new(config.providers.clone());
        let mut engine = Self {
            archetype,
            form: WizardForm::default(),
            cursor: 1,
            provider,
            limit_reached,
            errors: Vec::new(),
            notifier: Arc::new(TracingNotifier),
        };
        engine.normalize();
        engine
    }

    /// Count the wallet's agents once, then build the engine
    pub async fn mount(
        backend: &dyn AgentBackend,
        wallet: &str,
        archetype: AgentArchetype,
        config: &Config,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let existing = match backend.list_agents(&wallet.to_lowercase()).await {
            Ok(agents) => agents.len(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not count existing agents");
                notifier.notify(Notice::error("Error", "Could not fetch existing agents"));
                0
            }
        };
        Self::new(archetype, existing, config).with_notifier(notifier)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Start from a pre-filled form, e.g. one loaded from disk
    pub fn with_form(mut self, form: WizardForm) -> Self {
        self.form = form;
        self.normalize();
        self
    }

    pub fn archetype(&self) -> AgentArchetype {
        self.archetype
    }

    pub fn form(&self) -> &WizardForm {
        &self.form
    }

    pub fn steps(&self) -> &'static [Step] {
        step_table(self.archetype, self.form.social_platforms_opt_out)
    }

    pub fn total_steps(&self) -> usize {
        self.steps().len()
    }

    /// 1-based position
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn current_step(&self) -> Step {
        let steps = self.steps();
        steps[self.cursor.clamp(1, steps.len()) - 1]
    }

    pub fn is_final_step(&self) -> bool {
        self.cursor >= self.total_steps()
    }

    pub fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    /// Messages from the last rejected `next`
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn provider(&self) -> &ProviderSelection {
        &self.provider
    }

    /// Apply an edit to the form. Toggling the social opt-out can shrink
    /// the step list; the cursor is clamped to the new last step.
    pub fn update<F: FnOnce(&mut WizardForm)>(&mut self, edit: F) {
        edit(&mut self.form);
        self.normalize();
    }

    pub fn set_opt_out(&mut self, opt_out: bool) {
        self.update(|form| form.social_platforms_opt_out = opt_out);
    }

    pub fn select_provider(&mut self, code: &str) -> Result<()> {
        self.provider.select(code)?;
        self.form.selected_provider = code.to_string();
        Ok(())
    }

    pub fn pay(&mut self) {
        self.provider.pay(self.notifier.as_ref());
    }

    pub fn apply_free_trial(&mut self) {
        self.provider.apply_free_trial(self.notifier.as_ref());
    }

    fn normalize(&mut self) {
        if self.archetype == AgentArchetype::Social && self.form.base_model.provider.is_empty() {
            let api_key = std::mem::take(&mut self.form.base_model.api_key);
            self.form.base_model = BaseModel {
                api_key,
                ..BaseModel::social_default()
            };
        }
        if self.form.selected_provider.is_empty() {
            self.form.selected_provider = self.provider.selected().to_string();
        } else if self.form.selected_provider != self.provider.selected() {
            let code = self.form.selected_provider.clone();
            if let Err(e) = self.provider.select(&code) {
                tracing::warn!(error = %e, "Form names a provider outside the catalog");
                self.form.selected_provider = self.provider.selected().to_string();
            }
        }

        let total = self.total_steps();
        if self.cursor > total {
            tracing::debug!(from = self.cursor, to = total, "Clamping wizard cursor");
            self.cursor = total;
        }
    }

    /// Whether the next button is greyed out. Never disabled while the
    /// free-trial limit applies, so pressing it can explain the block.
    pub fn is_next_disabled(&self) -> bool {
        if self.limit_reached {
            return false;
        }
        is_next_disabled(&self.form, self.current_step(), self.provider.is_paid())
    }

    pub fn next(&mut self) -> Result<Advance> {
        if self.cursor == 1 && self.limit_reached {
            self.notifier
                .notify(Notice::error("Agent Limit Reached", LIMIT_DESCRIPTION));
            return Err(Error::AgentLimitReached);
        }

        let step = self.current_step();
        let errors = validate_step(&self.form, step);
        if !errors.is_empty() {
            tracing::debug!(?step, count = errors.len(), "Step failed validation");
            self.errors = errors.clone();
            return Err(Error::Validation(errors));
        }
        self.errors.clear();

        if self.is_final_step() {
            if !self.provider.is_paid() {
                let errors = vec!["Please pay or apply the free trial before deploying.".to_string()];
                self.errors = errors.clone();
                return Err(Error::Validation(errors));
            }
            return Ok(Advance::ReadyToDeploy);
        }

        self.cursor += 1;
        tracing::debug!(position = self.cursor, step = ?self.current_step(), "Wizard advanced");
        Ok(Advance::Moved(self.cursor))
    }

    pub fn prev(&mut self) -> bool {
        if self.cursor > 1 {
            self.cursor -= 1;
            self.errors.clear();
            true
        } else {
            false
        }
    }

    /// Payload for the final step; the form must be complete and paid for
    pub fn deployment_payload(&self, wallet: &str) -> Result<DeploymentPayload> {
        if !self.is_final_step() {
            return Err(Error::InvalidArgument(format!(
                "Deployment is only possible from the final step (at {} of {})",
                self.cursor,
                self.total_steps()
            )));
        }
        let errors = validate_step(&self.form, Step::Provider);
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }
        if !self.provider.is_paid() {
            return Err(Error::Validation(vec![
                "Please pay or apply the free trial before deploying.".to_string(),
            ]));
        }
        build_payload(&self.form, self.archetype, wallet)
    }
}

impl std::fmt::Debug for WizardEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardEngine")
            .field("archetype", &self.archetype)
            .field("position", &self.cursor)
            .field("step", &self.current_step())
            .field("limit_reached", &self.limit_reached)
            .field("payment", &self.provider.payment())
            .finish()
    }
}
