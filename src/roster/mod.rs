//! Deployed agent roster
//!
//! Read-through view of the wallet's agents. Status flips only after the
//! backend acknowledges a start/stop call.

mod agent;

pub use agent::{AgentConfiguration, AgentStatus, DeployedAgent, LlmConfig, Operator};

use crate::api::{is_truthy, AgentAction, AgentBackend, AgentRef};
use crate::notify::{Notice, Notifier};
use crate::{Error, Result};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RosterStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

pub struct AgentRoster {
    wallet: String,
    agents: Vec<DeployedAgent>,
    notifier: Arc<dyn Notifier>,
}

impl AgentRoster {
    pub async fn load(
        backend: &dyn AgentBackend,
        wallet: &str,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let wallet = wallet.to_lowercase();
        let rows = match backend.list_agents(&wallet).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(%wallet, error = %e, "Failed to fetch agents");
                notifier.notify(Notice::error(
                    "Error",
                    "Failed to fetch agents. Please try again later.",
                ));
                return Err(e);
            }
        };

        let agents: Vec<DeployedAgent> = rows.iter().filter_map(DeployedAgent::from_raw).collect();
        if agents.len() != rows.len() {
            tracing::warn!(
                dropped = rows.len() - agents.len(),
                "Dropped agent rows that were not objects"
            );
        }
        tracing::info!(%wallet, count = agents.len(), "Loaded agent roster");

        Ok(Self {
            wallet,
            agents,
            notifier,
        })
    }

    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    pub fn agents(&self) -> &[DeployedAgent] {
        &self.agents
    }

    pub fn get(&self, agent_id: &str) -> Option<&DeployedAgent> {
        self.agents.iter().find(|a| a.id == agent_id)
    }

    pub fn stats(&self) -> RosterStats {
        let active = self
            .agents
            .iter()
            .filter(|a| a.status == AgentStatus::Active)
            .count();
        RosterStats {
            total: self.agents.len(),
            active,
            inactive: self.agents.len() - active,
        }
    }

    /// Start an inactive agent or stop an active one
    pub async fn toggle(&mut self, backend: &dyn AgentBackend, agent_id: &str) -> Result<AgentStatus> {
        let agent = self
            .agents
            .iter_mut()
            .find(|a| a.id == agent_id)
            .ok_or_else(|| Error::InvalidArgument(format!("Unknown agent {}", agent_id)))?;

        let target = agent.status.toggled();
        let action = match target {
            AgentStatus::Active => AgentAction::Start,
            AgentStatus::Inactive => AgentAction::Stop,
        };
        let agent_ref = AgentRef::new(agent.app_id.clone(), agent.id.clone());

        let acknowledged = match backend.set_agent_state(&agent_ref, action, &agent.name).await {
            Ok(ack) => is_truthy(&ack),
            Err(e) => {
                tracing::error!(agent = %agent_ref, error = %e, "Agent state change failed");
                false
            }
        };

        if !acknowledged {
            self.notifier.notify(Notice::error(
                "Error",
                "Failed to update agent status. Please try again.",
            ));
            return Err(Error::Backend(format!(
                "Backend did not acknowledge {} for agent {}",
                action.as_str(),
                agent_id
            )));
        }

        agent.status = target;
        let verb = match target {
            AgentStatus::Active => "resumed",
            AgentStatus::Inactive => "stopped",
        };
        tracing::info!(agent = %agent_ref, status = %target, "Agent status updated");
        self.notifier.notify(Notice::success(
            format!("Agent {}", verb),
            format!("Agent has been successfully {}.", verb),
        ));
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::recording::RecordingNotifier;
    use crate::testing::FakeBackend;
    use serde_json::json;

    fn rows() -> Vec<serde_json::Value> {
        vec![
            json!({"agentid": "a1", "appid": "110", "agentname": "Alpha", "status": true}),
            json!({"agentid": "a2", "appid": "113", "agentname": "Beta", "status": 0}),
            json!("garbage"),
        ]
    }

    #[tokio::test]
    async fn load_normalizes_and_counts() {
        let backend = FakeBackend::default().with_agents(rows());
        let roster = AgentRoster::load(
            &backend,
            "0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266",
            Arc::new(RecordingNotifier::default()),
        )
        .await
        .unwrap();

        assert_eq!(
            backend.agent_queries(),
            vec!["0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string()]
        );
        assert_eq!(
            roster.stats(),
            RosterStats {
                total: 2,
                active: 1,
                inactive: 1
            }
        );
    }

    #[tokio::test]
    async fn toggle_flips_after_truthy_ack() {
        let backend = FakeBackend::default().with_agents(rows());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut roster = AgentRoster::load(&backend, "0xabc", notifier.clone())
            .await
            .unwrap();

        let status = roster.toggle(&backend, "a2").await.unwrap();
        assert_eq!(status, AgentStatus::Active);
        assert_eq!(roster.get("a2").unwrap().status, AgentStatus::Active);

        let calls = backend.state_calls();
        assert_eq!(
            calls,
            vec![(AgentRef::new("113", "a2"), AgentAction::Start, "Beta".to_string())]
        );
        assert_eq!(notifier.titles(), vec!["Agent resumed"]);
    }

    #[tokio::test]
    async fn falsy_ack_leaves_status_alone() {
        let backend = FakeBackend::default()
            .with_agents(rows())
            .with_state_ack(json!(null));
        let notifier = Arc::new(RecordingNotifier::default());
        let mut roster = AgentRoster::load(&backend, "0xabc", notifier.clone())
            .await
            .unwrap();

        let err = roster.toggle(&backend, "a1").await.unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
        assert_eq!(roster.get("a1").unwrap().status, AgentStatus::Active);
        assert_eq!(notifier.titles(), vec!["Error"]);
    }

    #[tokio::test]
    async fn unknown_agent_is_invalid_argument() {
        let backend = FakeBackend::default().with_agents(rows());
        let mut roster = AgentRoster::load(&backend, "0xabc", Arc::new(RecordingNotifier::default()))
            .await
            .unwrap();
        assert!(matches!(
            roster.toggle(&backend, "nope").await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(backend.state_calls().is_empty());
    }
}
