//! Trade entry form
//!
//! Numeric fields are held as the raw text the user typed; they are only
//! parsed by `total()` (lenient) and `validate()` (strict).

use crate::signals::{Direction, TradingSignal};
use serde::{Deserialize, Serialize};

pub const MIN_AMOUNT: f64 = 0.0001;
pub const MIN_PRICE: f64 = 0.0001;
pub const MIN_LEVERAGE: f64 = 1.0;
pub const MAX_LEVERAGE: f64 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeKind {
    #[default]
    Spot,
    Perpetual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    #[default]
    Binance,
    Kucoin,
    Dex,
}

impl Exchange {
    /// Lowercase name the backend expects
    pub fn wire_name(&self) -> &'static str {
        match self {
            Exchange::Binance => "binance",
            Exchange::Kucoin => "kucoin",
            Exchange::Dex => "dex",
        }
    }

    /// Centralized exchanges need the user's API credentials
    pub fn requires_credentials(&self) -> bool {
        matches!(self, Exchange::Binance | Exchange::Kucoin)
    }
}

impl std::str::FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binance" => Ok(Exchange::Binance),
            "kucoin" => Ok(Exchange::Kucoin),
            "dex" => Ok(Exchange::Dex),
            other => Err(format!("Unknown exchange {}", other)),
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    #[default]
    Limit,
    Stop,
    #[serde(rename = "Stop-Limit")]
    StopLimit,
    Conditional,
}

impl OrderType {
    pub fn label(&self) -> &'static str {
        match self {
            OrderType::Market => "Market",
            OrderType::Limit => "Limit",
            OrderType::Stop => "Stop",
            OrderType::StopLimit => "Stop-Limit",
            OrderType::Conditional => "Conditional",
        }
    }

    pub fn requires_price(&self) -> bool {
        matches!(self, OrderType::Limit | OrderType::Stop | OrderType::StopLimit)
    }

    pub fn allowed_for(&self, kind: TradeKind) -> bool {
        match kind {
            TradeKind::Spot => matches!(self, OrderType::Limit | OrderType::Market),
            TradeKind::Perpetual => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl From<Direction> for Side {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Long => Side::Buy,
            Direction::Short => Side::Sell,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginType {
    #[default]
    Cross,
    Isolated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slippage {
    #[default]
    #[serde(rename = "0.1%")]
    Tenth,
    #[serde(rename = "0.5%")]
    Half,
    #[serde(rename = "1%")]
    One,
    #[serde(rename = "2%")]
    Two,
}

impl Slippage {
    pub fn percent(&self) -> f64 {
        match self {
            Slippage::Tenth => 0.1,
            Slippage::Half => 0.5,
            Slippage::One => 1.0,
            Slippage::Two => 2.0,
        }
    }
}

/// `amount * price`, with anything unparsable, negative or non-finite
/// counted as zero
pub fn compute_total(amount: &str, price: &str) -> f64 {
    let total = lenient(amount) * lenient(price);
    if total.is_finite() {
        total
    } else {
        0.0
    }
}

fn lenient(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeForm {
    pub trade_kind: TradeKind,
    pub exchange: Exchange,
    pub pair: String,
    pub order_type: OrderType,
    pub side: Side,
    pub amount: String,
    pub limit_price: String,
    pub leverage: String,
    pub take_profit: String,
    pub stop_loss: String,
    pub slippage: Slippage,
    pub margin_type: MarginType,
    pub reduce_only: bool,
    pub post_only: bool,
}

impl Default for TradeForm {
    fn default() -> Self {
        Self {
            trade_kind: TradeKind::Spot,
            exchange: Exchange::Binance,
            pair: String::new(),
            order_type: OrderType::Limit,
            side: Side::Buy,
            amount: "0".to_string(),
            limit_price: "0".to_string(),
            leverage: String::new(),
            take_profit: String::new(),
            stop_loss: String::new(),
            slippage: Slippage::Tenth,
            margin_type: MarginType::Cross,
            reduce_only: false,
            post_only: false,
        }
    }
}

/// A form that passed validation, with every number parsed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrder {
    pub trade_kind: TradeKind,
    pub exchange: Exchange,
    pub pair: String,
    pub order_type: OrderType,
    pub side: Side,
    pub amount: f64,
    pub limit_price: Option<f64>,
    pub leverage: Option<f64>,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
    pub slippage: Slippage,
    pub margin_type: Option<MarginType>,
    pub reduce_only: bool,
    pub post_only: bool,
}

impl TradeForm {
    /// Pre-fill from a promoted signal
    pub fn from_signal(signal: &TradingSignal) -> Self {
        let text = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
        let pair = if signal.ticker.trim().is_empty() {
            "N/A".to_string()
        } else {
            signal.ticker.clone()
        };

        Self {
            trade_kind: TradeKind::Perpetual,
            exchange: Exchange::Binance,
            pair,
            order_type: OrderType::Limit,
            side: signal.direction.into(),
            amount: "10".to_string(),
            limit_price: text(signal.entry_price),
            leverage: "5".to_string(),
            take_profit: text(signal.first_target()),
            stop_loss: text(signal.stop_price),
            slippage: Slippage::Tenth,
            margin_type: MarginType::Cross,
            reduce_only: false,
            post_only: false,
        }
    }

    /// Derived order value shown next to the inputs
    pub fn total(&self) -> f64 {
        compute_total(&self.amount, &self.limit_price)
    }

    pub fn validate(&self) -> Result<ValidatedOrder, Vec<String>> {
        let mut errors = Vec::new();

        let pair = self.pair.trim();
        if pair.is_empty() || pair == "N/A" {
            errors.push("Trading pair is required".to_string());
        }

        if !self.order_type.allowed_for(self.trade_kind) {
            errors.push(format!(
                "{} orders are not available for spot trading",
                self.order_type.label()
            ));
        }

        let amount = match strict(&self.amount) {
            Some(v) if v >= MIN_AMOUNT => Some(v),
            _ => {
                errors.push("Amount must be greater than 0".to_string());
                None
            }
        };

        let limit_price = if self.order_type.requires_price() {
            match strict(&self.limit_price) {
                Some(v) if v >= MIN_PRICE => Some(v),
                _ => {
                    errors.push("Price must be greater than 0".to_string());
                    None
                }
            }
        } else {
            None
        };

        let leverage = match self.trade_kind {
            TradeKind::Perpetual => match strict(&self.leverage) {
                Some(v) if (MIN_LEVERAGE..=MAX_LEVERAGE).contains(&v) => Some(v),
                _ => {
                    errors.push("Leverage must be between 1 and 100".to_string());
                    None
                }
            },
            TradeKind::Spot => None,
        };

        let take_profit = optional(&self.take_profit, "Take profit must be a number", &mut errors);
        let stop_loss = optional(&self.stop_loss, "Stop loss must be a number", &mut errors);

        match amount {
            Some(amount) if errors.is_empty() => Ok(ValidatedOrder {
                trade_kind: self.trade_kind,
                exchange: self.exchange,
                pair: pair.to_string(),
                order_type: self.order_type,
                side: self.side,
                amount,
                limit_price,
                leverage,
                take_profit,
                stop_loss,
                slippage: self.slippage,
                margin_type: match self.trade_kind {
                    TradeKind::Perpetual => Some(self.margin_type),
                    TradeKind::Spot => None,
                },
                reduce_only: self.reduce_only,
                post_only: self.post_only,
            }),
            _ => Err(errors),
        }
    }
}

fn strict(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn optional(raw: &str, message: &str, errors: &mut Vec<String>) -> Option<f64> {
    if raw.trim().is_empty() {
        return None;
    }
    let parsed = strict(raw);
    if parsed.is_none() {
        errors.push(message.to_string());
    }
    parsed
}
