//! Review queue state machine
//!
//! Entries are kept sorted by timestamp, ties broken by arrival order. The
//! cursor is tracked by signal id across merges, so a re-sort never swaps the
//! signal under review for another one.

use super::TradingSignal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    /// Nothing loaded yet
    Loading,
    /// `index` is the signal currently shown
    Reviewing { index: usize },
    /// Every signal has been dismissed or the list is empty
    Exhausted,
}

/// List and cursor carried to the trade form and back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSnapshot {
    pub signals: Vec<TradingSignal>,
    pub cursor: usize,
}

/// A signal handed to the trade form
#[derive(Debug, Clone, PartialEq)]
pub struct Promotion {
    pub signal: TradingSignal,
    pub snapshot: ReviewSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Replaced,
    /// Same id and same content; the list was left alone
    Unchanged,
}

#[derive(Debug, Clone)]
struct Entry {
    signal: TradingSignal,
    arrival: u64,
}

#[derive(Debug, Default)]
pub struct SignalReview {
    entries: Vec<Entry>,
    cursor: usize,
    loaded: bool,
    next_arrival: u64,
}

impl SignalReview {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue with a fresh page and start at the oldest signal
    pub fn load(&mut self, signals: Vec<TradingSignal>) {
        self.entries.clear();
        self.next_arrival = 0;
        for signal in signals {
            self.push(signal);
        }
        self.sort();
        self.cursor = 0;
        self.loaded = true;
    }

    /// Like `load`, but start at `focus_id` when it is present
    pub fn load_focused(&mut self, signals: Vec<TradingSignal>, focus_id: &str) {
        self.load(signals);
        if let Some(index) = self.position(focus_id) {
            self.cursor = index;
        }
    }

    /// Resume exactly where the snapshot was taken. Order is kept as-is.
    pub fn restore(&mut self, snapshot: ReviewSnapshot) {
        self.entries.clear();
        self.next_arrival = 0;
        for signal in snapshot.signals {
            self.push(signal);
        }
        self.cursor = snapshot.cursor.min(self.entries.len());
        self.loaded = true;
    }

    /// Upsert a signal from the realtime feed
    pub fn merge(&mut self, signal: TradingSignal) -> MergeOutcome {
        let anchor = self.anchor();

        let outcome = match self.position(&signal.id) {
            Some(index) if self.entries[index].signal == signal => return MergeOutcome::Unchanged,
            Some(index) => {
                self.entries[index].signal = signal;
                MergeOutcome::Replaced
            }
            None => {
                self.push(signal);
                MergeOutcome::Inserted
            }
        };

        self.sort();
        self.cursor = match anchor {
            Anchor::Current(id) => self.position(&id).unwrap_or(self.cursor),
            Anchor::After(id) => self.position(&id).map_or(self.cursor, |i| i + 1),
            Anchor::Start => 0,
        };
        self.loaded = true;

        tracing::debug!(?outcome, cursor = self.cursor, len = self.entries.len(), "Merged signal");
        outcome
    }

    pub fn state(&self) -> ReviewState {
        if !self.loaded {
            ReviewState::Loading
        } else if self.cursor < self.entries.len() {
            ReviewState::Reviewing { index: self.cursor }
        } else {
            ReviewState::Exhausted
        }
    }

    pub fn current(&self) -> Option<&TradingSignal> {
        match self.state() {
            ReviewState::Reviewing { index } => self.entries.get(index).map(|e| &e.signal),
            _ => None,
        }
    }

    /// Move past the current signal
    pub fn dismiss(&mut self) -> ReviewState {
        if let ReviewState::Reviewing { index } = self.state() {
            self.cursor = index + 1;
        }
        self.state()
    }

    /// Hand the current signal, with the queue, to the trade form
    pub fn promote(&self) -> Option<Promotion> {
        self.current().map(|signal| Promotion {
            signal: signal.clone(),
            snapshot: self.snapshot(),
        })
    }

    pub fn snapshot(&self) -> ReviewSnapshot {
        ReviewSnapshot {
            signals: self.signals().cloned().collect(),
            cursor: self.cursor,
        }
    }

    pub fn signals(&self) -> impl Iterator<Item = &TradingSignal> {
        self.entries.iter().map(|e| &e.signal)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, signal: TradingSignal) {
        self.entries.push(Entry {
            signal,
            arrival: self.next_arrival,
        });
        self.next_arrival += 1;
    }

    fn sort(&mut self) {
        self.entries.sort_by(|a, b| {
            a.signal
                .timestamp
                .cmp(&b.signal.timestamp)
                .then(a.arrival.cmp(&b.arrival))
        });
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.signal.id == id)
    }

    fn anchor(&self) -> Anchor {
        match self.entries.get(self.cursor) {
            Some(entry) => Anchor::Current(entry.signal.id.clone()),
            None => match self.cursor.checked_sub(1).and_then(|i| self.entries.get(i)) {
                Some(last) => Anchor::After(last.signal.id.clone()),
                None => Anchor::Start,
            },
        }
    }
}

/// Where the cursor should land after a re-sort
enum Anchor {
    Current(String),
    /// Exhausted; resume just past the last reviewed signal
    After(String),
    Start,
}
