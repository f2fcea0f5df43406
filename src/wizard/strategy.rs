//! Onchain strategy presets

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyPreset {
    CexSpot,
    Grid,
    Dca,
    SignalBased,
    Momentum,
}

impl StrategyPreset {
    pub const ALL: [StrategyPreset; 5] = [
        StrategyPreset::CexSpot,
        StrategyPreset::Grid,
        StrategyPreset::Dca,
        StrategyPreset::SignalBased,
        StrategyPreset::Momentum,
    ];

    /// Display name, also the value stored in the form
    pub fn name(&self) -> &'static str {
        match self {
            StrategyPreset::CexSpot => "CEX Spot Trading",
            StrategyPreset::Grid => "Grid Trading",
            StrategyPreset::Dca => "DCA Trading",
            StrategyPreset::SignalBased => "Signal-based Trading",
            StrategyPreset::Momentum => "Momentum Trading",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            StrategyPreset::CexSpot => "Automatically executes spot trades on centralized exchanges using advanced algorithms and real-time market data analysis",
            StrategyPreset::Grid => "Implements a grid trading strategy that places multiple buy and sell orders at regular price intervals to profit from market volatility",
            StrategyPreset::Dca => "Executes Dollar Cost Averaging strategy by making regular purchases at set intervals to reduce impact of volatility",
            StrategyPreset::SignalBased => "Uses technical indicators and market signals to identify and execute trading opportunities",
            StrategyPreset::Momentum => "Capitalizes on market momentum by identifying and trading strong price trends",
        }
    }

    fn extra_parameters(&self) -> Value {
        match self {
            StrategyPreset::CexSpot => json!({}),
            StrategyPreset::Grid => json!({"gridLevels": 5, "gridSpacing": 2}),
            StrategyPreset::Dca => json!({"interval": "daily", "purchaseAmount": 100}),
            StrategyPreset::SignalBased => {
                json!({"indicators": ["RSI", "MACD", "MA"], "timeframe": "4h"})
            }
            StrategyPreset::Momentum => {
                json!({"momentumPeriod": 14, "trendStrengthThreshold": 25})
            }
        }
    }
}

pub fn strategy_description(name: &str) -> &'static str {
    StrategyPreset::from_name(name)
        .map(|preset| preset.description())
        .unwrap_or("Custom trading strategy")
}

/// Risk parameters for a strategy; unknown strategies get the base set
pub fn trading_parameters(name: &str) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("maxTradeSize".into(), json!(1000));
    params.insert("stopLoss".into(), json!(5));
    params.insert("takeProfit".into(), json!(10));
    params.insert("leverageEnabled".into(), json!(false));
    params.insert("riskLevel".into(), json!("medium"));

    if let Some(Value::Object(extra)) = StrategyPreset::from_name(name).map(|p| p.extra_parameters())
    {
        params.extend(extra);
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_round_trip_by_name() {
        for preset in StrategyPreset::ALL {
            assert_eq!(StrategyPreset::from_name(preset.name()), Some(preset));
        }
        assert_eq!(StrategyPreset::from_name("grid trading"), None);
    }

    #[test]
    fn unknown_strategy_falls_back() {
        assert_eq!(strategy_description("Yolo"), "Custom trading strategy");
        let params = trading_parameters("Yolo");
        assert_eq!(params.len(), 5);
        assert_eq!(params["riskLevel"], "medium");
    }

    #[test]
    fn grid_adds_levels_on_top_of_base() {
        let params = trading_parameters("Grid Trading");
        assert_eq!(params["gridLevels"], 5);
        assert_eq!(params["gridSpacing"], 2);
        assert_eq!(params["maxTradeSize"], 1000);
        assert!(trading_parameters("Signal-based Trading").contains_key("indicators"));
    }
}
