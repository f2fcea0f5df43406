//! Trade placement from a promoted signal

mod credentials;
mod form;
mod placement;

pub use credentials::{CredentialMap, CredentialRecord, ExchangeCredentialStore, ExchangeCredentials};
pub use form::{
    compute_total, Exchange, MarginType, OrderType, Side, Slippage, TradeForm, TradeKind,
    ValidatedOrder,
};
pub use placement::{exchange_symbol, OrderSignal, TradeOutcome, TradePlacement, TradeRequest};
