use crate::gold::Gold;
use crate::types::{Difficulty, UnitType};
use serde::{Deserialize, Serialize};

/// Trade-ship spawn-rate curve: `min(max, round(coefficient * ports^exponent))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeShipConfig {
    pub coefficient: f64,
    pub exponent: f64,
    pub max: u32,
}

impl Default for TradeShipConfig {
    fn default() -> Self {
        Self {
            coefficient: 10.0,
            exponent: 0.6,
            max: 50,
        }
    }
}

/// Game configuration values the agents consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub difficulty: Difficulty,
    #[serde(default)]
    pub disabled_units: Vec<UnitType>,
    #[serde(default)]
    pub trade_ship: TradeShipConfig,
    /// Reserve a newly registered delegated builder starts with.
    pub delegation_default_reserve: Gold,
}

impl GameConfig {
    /// Load from a JSON file.
    /// In tests, use GameConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: GameConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            disabled_units: Vec::new(),
            trade_ship: TradeShipConfig::default(),
            delegation_default_reserve: Gold::new(500_000),
        }
    }

    pub fn is_unit_disabled(&self, unit_type: UnitType) -> bool {
        self.disabled_units.contains(&unit_type)
    }

    /// Base denominator for the per-check trade-ship chance, given the
    /// number of ports considered. Never below 1.
    pub fn trade_ship_spawn_rate(&self, port_count: usize) -> u32 {
        let curve = &self.trade_ship;
        let raw = (curve.coefficient * (port_count as f64).powf(curve.exponent)).round();
        (raw as u32).min(curve.max).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_rate_follows_curve_and_caps() {
        let config = GameConfig::default_test();
        assert_eq!(config.trade_ship_spawn_rate(1), 10);
        // 10 * 4^0.6 = 22.97
        assert_eq!(config.trade_ship_spawn_rate(4), 23);
        assert_eq!(config.trade_ship_spawn_rate(10_000), 50);
    }

    #[test]
    fn config_round_trips_through_json() {
        let json = r#"{
            "difficulty": "hard",
            "disabled_units": ["train"],
            "delegation_default_reserve": 250000
        }"#;
        let config: GameConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.difficulty, Difficulty::Hard);
        assert!(config.is_unit_disabled(UnitType::Train));
        assert_eq!(config.delegation_default_reserve, Gold::new(250_000));
        assert_eq!(config.trade_ship.max, 50);
    }
}
