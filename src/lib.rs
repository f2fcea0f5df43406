//! Agent Launch Client
//!
//! Client library for deploying and supervising AI crypto trading agents:
//! - Wallet sessions established by signing a nonce
//! - A guided wizard that validates and deploys new agents
//! - Review of each agent's trading signals, with realtime updates
//! - Placing trades from a reviewed signal
//! - The roster of deployed agents with start/stop control
//!
//! # Security Model
//!
//! - Private keys stay behind the `WalletProvider` seam
//! - Bearer tokens and platform credentials are `SecretString`s and never logged
//! - Exchange credentials leave the process only RSA-encrypted

pub mod api;
pub mod config;
pub mod notify;
pub mod roster;
pub mod signals;
pub mod storage;
pub mod trade;
pub mod wallet;
pub mod wizard;

mod error;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use api::{AgentBackend, ApiClient};
pub use config::Config;
pub use error::{Error, ErrorCategory, Result};
pub use wallet::SessionManager;
pub use wizard::WizardEngine;
