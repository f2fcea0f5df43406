//! Review screen for one agent: initial page plus realtime upserts

use super::review::{MergeOutcome, Promotion, ReviewSnapshot, ReviewState, SignalReview};
use super::TradingSignal;
use crate::api::{AgentBackend, AgentRef};
use crate::notify::{Notice, Notifier};
use std::sync::Arc;

/// How the review screen was entered
#[derive(Debug, Clone)]
pub enum ReviewStart {
    /// Fetch the first page
    Fresh,
    /// Fetch the first page and jump to this signal
    Focus(String),
    /// Back from the trade form; no fetch
    Restore(ReviewSnapshot),
}

pub struct ReviewSession {
    agent: AgentRef,
    review: SignalReview,
    notifier: Arc<dyn Notifier>,
}

impl ReviewSession {
    /// Fetch failures leave an empty queue and raise a notice
    pub async fn open(
        backend: &dyn AgentBackend,
        agent: AgentRef,
        start: ReviewStart,
        page_size: u32,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let mut review = SignalReview::new();

        let focus = match start {
            ReviewStart::Restore(snapshot) => {
                tracing::debug!(%agent, cursor = snapshot.cursor, "Resuming signal review");
                review.restore(snapshot);
                return Self {
                    agent,
                    review,
                    notifier,
                };
            }
            ReviewStart::Focus(id) => Some(id),
            ReviewStart::Fresh => None,
        };

        let signals = match backend.trade_signals(&agent, 1, page_size).await {
            Ok(signals) => signals,
            Err(e) => {
                tracing::error!(%agent, error = %e, "Failed to fetch trading signals");
                notifier.notify(Notice::error("Failed to load signals", e.to_string()));
                Vec::new()
            }
        };

        match focus {
            Some(id) => review.load_focused(signals, &id),
            None => review.load(signals),
        }
        tracing::info!(%agent, count = review.len(), "Loaded trading signals");

        Self {
            agent,
            review,
            notifier,
        }
    }

    pub fn agent(&self) -> &AgentRef {
        &self.agent
    }

    pub fn review(&self) -> &SignalReview {
        &self.review
    }

    pub fn state(&self) -> ReviewState {
        self.review.state()
    }

    pub fn current(&self) -> Option<&TradingSignal> {
        self.review.current()
    }

    /// Apply a pushed signal
    pub fn apply(&mut self, signal: TradingSignal) -> MergeOutcome {
        self.review.merge(signal)
    }

    pub fn dismiss(&mut self) -> ReviewState {
        let state = self.review.dismiss();
        if state == ReviewState::Exhausted {
            self.notifier.notify(Notice::info(
                "No more signals",
                "You have reviewed every signal for this agent",
            ));
        }
        state
    }

    pub fn promote(&self) -> Option<Promotion> {
        self.review.promote()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::recording::RecordingNotifier;
    use crate::signals::fixtures::signal;
    use crate::testing::FakeBackend;

    fn agent() -> AgentRef {
        AgentRef::new("110", "agent-1")
    }

    #[tokio::test]
    async fn fresh_open_fetches_first_page() {
        let backend = FakeBackend::default().with_signals(vec![signal("b", 2), signal("a", 1)]);
        let notifier = Arc::new(RecordingNotifier::default());

        let session =
            ReviewSession::open(&backend, agent(), ReviewStart::Fresh, 50, notifier).await;

        assert_eq!(session.current().unwrap().id, "a");
        assert_eq!(backend.signal_requests(), vec![(agent(), 1, 50)]);
    }

    #[tokio::test]
    async fn restore_skips_fetch() {
        let backend = FakeBackend::default().with_signals(vec![signal("x", 1)]);
        let snapshot = ReviewSnapshot {
            signals: vec![signal("a", 1), signal("b", 2)],
            cursor: 1,
        };

        let session = ReviewSession::open(
            &backend,
            agent(),
            ReviewStart::Restore(snapshot),
            50,
            Arc::new(RecordingNotifier::default()),
        )
        .await;

        assert_eq!(session.current().unwrap().id, "b");
        assert!(backend.signal_requests().is_empty());
    }

    #[tokio::test]
    async fn focus_start_jumps_to_signal() {
        let backend =
            FakeBackend::default().with_signals(vec![signal("a", 1), signal("b", 2), signal("c", 3)]);
        let session = ReviewSession::open(
            &backend,
            agent(),
            ReviewStart::Focus("c".to_string()),
            50,
            Arc::new(RecordingNotifier::default()),
        )
        .await;
        assert_eq!(session.current().unwrap().id, "c");
    }

    #[tokio::test]
    async fn fetch_failure_degrades_to_empty_queue() {
        let backend = FakeBackend::default().failing_signals();
        let notifier = Arc::new(RecordingNotifier::default());

        let session =
            ReviewSession::open(&backend, agent(), ReviewStart::Fresh, 50, notifier.clone()).await;

        assert_eq!(session.state(), ReviewState::Exhausted);
        assert_eq!(notifier.titles(), vec!["Failed to load signals"]);
    }

    #[tokio::test]
    async fn exhausting_queue_notifies_once_per_dismiss() {
        let backend = FakeBackend::default().with_signals(vec![signal("a", 1)]);
        let notifier = Arc::new(RecordingNotifier::default());
        let mut session =
            ReviewSession::open(&backend, agent(), ReviewStart::Fresh, 50, notifier.clone()).await;

        assert_eq!(session.dismiss(), ReviewState::Exhausted);
        assert_eq!(notifier.titles(), vec!["No more signals"]);

        session.apply(signal("b", 5));
        assert_eq!(session.current().unwrap().id, "b");
        assert!(session.promote().is_some());
    }
}
