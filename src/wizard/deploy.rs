//! Deployment submission
//!
//! At most one deployment is outstanding per `Deployer`. A second submit
//! while the first is awaiting the backend returns `AlreadyInFlight`
//! without building or sending anything.

use super::engine::WizardEngine;
use crate::api::{AgentBackend, DeployResponse};
use crate::notify::{Notice, Notifier};
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum DeployOutcome {
    Deployed(DeployResponse),
    AlreadyInFlight,
}

/// Clears the in-flight flag however the submission ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Deployer {
    in_flight: AtomicBool,
    notifier: Arc<dyn Notifier>,
}

impl Deployer {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            notifier,
        }
    }

    pub fn is_deploying(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn submit(
        &self,
        backend: &dyn AgentBackend,
        engine: &WizardEngine,
        wallet: Option<&str>,
    ) -> Result<DeployOutcome> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("Deployment already in flight; ignoring submit");
            return Ok(DeployOutcome::AlreadyInFlight);
        };

        match self.deploy(backend, engine, wallet.unwrap_or_default()).await {
            Ok(response) => {
                self.notifier.notify(Notice::success(
                    "Agent Deployed Successfully",
                    "Your agent has been created and is ready to use.",
                ));
                Ok(DeployOutcome::Deployed(response))
            }
            Err(e) => {
                tracing::error!(error = %e, "Deployment failed");
                self.notifier
                    .notify(Notice::error("Deployment Failed", e.to_string()));
                Err(e)
            }
        }
    }

    async fn deploy(
        &self,
        backend: &dyn AgentBackend,
        engine: &WizardEngine,
        wallet: &str,
    ) -> Result<DeployResponse> {
        let request = engine.deployment_payload(wallet)?.into_request()?;
        tracing::info!(
            creator = %request.creator,
            provider = %request.provider,
            archetype = ?engine.archetype(),
            "Submitting agent deployment"
        );

        let response = backend.deploy_agent(&request).await?;
        if !response.success {
            return Err(Error::Backend(
                response
                    .message
                    .clone()
                    .unwrap_or_else(|| "Failed to deploy agent".to_string()),
            ));
        }
        tracing::info!(creator = %request.creator, "Agent deployed");
        Ok(response)
    }
}

impl std::fmt::Debug for Deployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployer")
            .field("in_flight", &self.is_deploying())
            .finish()
    }
}
