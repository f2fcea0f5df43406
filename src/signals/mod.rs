//! Trading signal review
//!
//! Signals arrive from a paged REST fetch and from the realtime feed. The
//! review queue orders them oldest first and lets the user dismiss or
//! promote them one at a time.

pub mod feed;
mod review;
mod session;

pub use feed::RealtimeFeed;
pub use review::{MergeOutcome, Promotion, ReviewSnapshot, ReviewState, SignalReview};
pub use session::{ReviewSession, ReviewStart};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "long" | "buy" => Some(Direction::Long),
            "short" | "sell" => Some(Direction::Short),
            _ => None,
        }
    }
}

/// One trade idea produced by an agent. Immutable once received; a later
/// message with the same id supersedes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireSignal")]
pub struct TradingSignal {
    pub id: String,
    pub ticker: String,
    pub direction: Direction,
    #[serde(rename = "entry")]
    pub entry_price: Option<f64>,
    #[serde(rename = "stop")]
    pub stop_price: Option<f64>,
    pub targets: Vec<f64>,
    pub timestamp: DateTime<Utc>,
    pub indicator: Option<String>,
    #[serde(rename = "type")]
    pub signal_type: Option<String>,
}

impl TradingSignal {
    /// First take-profit target
    pub fn first_target(&self) -> Option<f64> {
        self.targets.first().copied()
    }
}

/// Loose shape shared by the REST API and the realtime feed
#[derive(Deserialize)]
struct WireSignal {
    id: Option<Value>,
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    entry: Option<Value>,
    #[serde(default)]
    stop: Option<Value>,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    targets: Option<Vec<Value>>,
    #[serde(default)]
    data: Option<Map<String, Value>>,
    timestamp: Option<Value>,
    #[serde(default)]
    indicator: Option<String>,
    #[serde(default, rename = "type")]
    signal_type: Option<String>,
}

impl TryFrom<WireSignal> for TradingSignal {
    type Error = String;

    fn try_from(wire: WireSignal) -> Result<Self, Self::Error> {
        let id = match wire.id {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err("signal has no id".to_string()),
        };

        let data = wire.data.unwrap_or_default();

        let direction = wire
            .direction
            .as_deref()
            .or_else(|| data.get("direction").and_then(Value::as_str))
            .and_then(Direction::parse)
            .ok_or_else(|| format!("signal {} has no direction", id))?;

        let targets = match wire.targets {
            Some(list) => list.iter().filter_map(number).collect(),
            None => numbered_targets(&data),
        };

        let timestamp = wire
            .timestamp
            .as_ref()
            .and_then(parse_timestamp)
            .ok_or_else(|| format!("signal {} has no usable timestamp", id))?;

        Ok(TradingSignal {
            id,
            ticker: wire.ticker.unwrap_or_default(),
            direction,
            entry_price: wire.entry.as_ref().and_then(number),
            stop_price: wire.stop.as_ref().and_then(number),
            targets,
            timestamp,
            indicator: wire.indicator,
            signal_type: wire.signal_type,
        })
    }
}

/// Numbers sometimes arrive as strings
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// `t1`, `t2`, ... in order, stopping at the first gap
fn numbered_targets(data: &Map<String, Value>) -> Vec<f64> {
    (1..)
        .map_while(|i| data.get(&format!("t{}", i)))
        .filter_map(number)
        .collect()
}

/// RFC 3339 strings, or epoch values in milliseconds (seconds when small)
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<i64>().ok().and_then(from_epoch)),
        Value::Number(n) => n.as_i64().and_then(from_epoch),
        _ => None,
    }
}

fn from_epoch(raw: i64) -> Option<DateTime<Utc>> {
    if raw.abs() < 100_000_000_000 {
        Utc.timestamp_opt(raw, 0).single()
    } else {
        Utc.timestamp_millis_opt(raw).single()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_backend_shape() {
        let signal: TradingSignal = serde_json::from_value(json!({
            "id": 42,
            "ticker": "ETH/USDT",
            "entry": "3100.5",
            "stop": 3000,
            "data": {"direction": "Short", "t1": 2900, "t2": "2800", "t4": 1},
            "timestamp": "2024-05-01T10:00:00+02:00",
            "indicator": "MACD",
            "type": "algorithmic"
        }))
        .unwrap();

        assert_eq!(signal.id, "42");
        assert_eq!(signal.direction, Direction::Short);
        assert_eq!(signal.entry_price, Some(3100.5));
        assert_eq!(signal.stop_price, Some(3000.0));
        assert_eq!(signal.targets, vec![2900.0, 2800.0]);
        assert_eq!(signal.timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        assert_eq!(signal.signal_type.as_deref(), Some("algorithmic"));
    }

    #[test]
    fn epoch_millis_and_seconds() {
        let millis = parse_timestamp(&json!(1714557600000i64)).unwrap();
        let seconds = parse_timestamp(&json!(1714557600)).unwrap();
        assert_eq!(millis, seconds);
        assert!(parse_timestamp(&json!("yesterday")).is_none());
    }

    #[test]
    fn rejects_missing_id_or_direction() {
        let no_id = serde_json::from_value::<TradingSignal>(json!({
            "data": {"direction": "Long"},
            "timestamp": 1714557600
        }));
        assert!(no_id.is_err());

        let no_direction = serde_json::from_value::<TradingSignal>(json!({
            "id": "s1",
            "timestamp": 1714557600
        }));
        assert!(no_direction.is_err());
    }

    #[test]
    fn serialized_form_parses_back() {
        let original = fixtures::signal("s1", 5);
        let value = serde_json::to_value(&original).unwrap();
        assert_eq!(value["entry"], json!(100.0));
        let parsed: TradingSignal = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, original);
    }
}
