//! Wallet connection and session management
//!
//! Private keys stay behind the `WalletProvider` seam. The rest of the crate
//! only sees the session: a lowercase address plus the backend token.

mod provider;
mod session;
mod signer;
pub mod verify;

pub use provider::{ProviderError, WalletProvider, CODE_UNRECOGNIZED_CHAIN, CODE_USER_REJECTED};
pub use session::{SessionChange, SessionManager, StoredSession, WalletSession};
pub use signer::{LocalWalletProvider, PRIVATE_KEY_ENV};
