//! Scan configuration
//!
//! Loaded once at startup from a JSON/YAML/TOML file layered with `SCANNER_*`
//! environment overrides. Any failure falls back to [`ScanConfig::default`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::types::{Result, ScannerError};

/// Static scan parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Moving average window
    #[serde(
        alias = "sma_period",
        alias = "sma50_period",
        alias = "maPeriod",
        alias = "maperiod",
        default = "default_ma_period"
    )]
    pub ma_period: usize,
    /// Trailing candles that must share a colour
    #[serde(default = "default_candle_count")]
    pub candle_count: usize,
    /// IV percentile above which credit strategies are chosen (0.0 - 1.0)
    #[serde(default = "default_iv_threshold")]
    pub iv_threshold: f64,
    /// Required reward-to-risk ratio, carried for downstream consumers
    #[serde(default = "default_min_reward_risk")]
    pub min_reward_risk: f64,
    /// Symbols scanned when a request does not override them
    #[serde(default = "default_universe")]
    pub universe: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ma_period: default_ma_period(),
            candle_count: default_candle_count(),
            iv_threshold: default_iv_threshold(),
            min_reward_risk: default_min_reward_risk(),
            universe: default_universe(),
        }
    }
}

/// Upper bound for `ma_period`
pub const MAX_MA_PERIOD: usize = 1000;
/// Upper bound for `candle_count`
pub const MAX_CANDLE_COUNT: usize = 100;
/// Lower bound for `min_reward_risk`
pub const MIN_REWARD_RISK: f64 = 0.1;

fn default_ma_period() -> usize { 50 }
fn default_candle_count() -> usize { 2 }
fn default_iv_threshold() -> f64 { 0.8 }
fn default_min_reward_risk() -> f64 { 1.0 }
fn default_universe() -> Vec<String> {
    ["AAPL", "MSFT", "SPY"].iter().map(|s| s.to_string()).collect()
}

impl ScanConfig {
    /// Load from `path` plus `SCANNER_*` environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix("SCANNER")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("universe"),
            )
            .build()
            .map_err(|e| ScannerError::InvalidConfig(e.to_string()))?;

        let cfg: ScanConfig = settings
            .try_deserialize()
            .map_err(|e| ScannerError::InvalidConfig(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path`, substituting defaults on any failure
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cfg) => {
                info!(
                    path = %path.display(),
                    ma_period = cfg.ma_period,
                    candle_count = cfg.candle_count,
                    symbols = cfg.universe.len(),
                    "Loaded scan configuration"
                );
                cfg
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load config, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Check the invariants the engine relies on
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_MA_PERIOD).contains(&self.ma_period) {
            return Err(ScannerError::InvalidConfig(format!(
                "ma_period must be between 1 and {}, got {}",
                MAX_MA_PERIOD, self.ma_period
            )));
        }
        if !(1..=MAX_CANDLE_COUNT).contains(&self.candle_count) {
            return Err(ScannerError::InvalidConfig(format!(
                "candle_count must be between 1 and {}, got {}",
                MAX_CANDLE_COUNT, self.candle_count
            )));
        }
        if !(0.0..=1.0).contains(&self.iv_threshold) {
            return Err(ScannerError::InvalidConfig(format!(
                "iv_threshold must be between 0 and 1, got {}",
                self.iv_threshold
            )));
        }
        if !(self.min_reward_risk >= MIN_REWARD_RISK) {
            return Err(ScannerError::InvalidConfig(format!(
                "min_reward_risk must be at least {}, got {}",
                MIN_REWARD_RISK, self.min_reward_risk
            )));
        }
        Ok(())
    }

    /// Number of daily bars requested per symbol
    pub fn lookback_days(&self) -> usize {
        self.ma_period.saturating_add(self.candle_count)
    }

    /// Declarative description of every configurable field
    pub fn schema() -> Vec<FieldSpec> {
        vec![
            FieldSpec {
                name: "ma_period",
                kind: FieldKind::Integer,
                default: serde_json::json!(default_ma_period()),
                minimum: Some(1.0),
                maximum: Some(MAX_MA_PERIOD as f64),
                description: "Period for the simple moving average",
            },
            FieldSpec {
                name: "candle_count",
                kind: FieldKind::Integer,
                default: serde_json::json!(default_candle_count()),
                minimum: Some(1.0),
                maximum: Some(MAX_CANDLE_COUNT as f64),
                description: "Number of trailing candles evaluated for the pattern",
            },
            FieldSpec {
                name: "iv_threshold",
                kind: FieldKind::Number,
                default: serde_json::json!(default_iv_threshold()),
                minimum: Some(0.0),
                maximum: Some(1.0),
                description: "IV percentile above which credit strategies are selected",
            },
            FieldSpec {
                name: "min_reward_risk",
                kind: FieldKind::Number,
                default: serde_json::json!(default_min_reward_risk()),
                minimum: Some(MIN_REWARD_RISK),
                maximum: None,
                description: "Required reward-to-risk ratio",
            },
            FieldSpec {
                name: "universe",
                kind: FieldKind::StringList,
                default: serde_json::json!(default_universe()),
                minimum: None,
                maximum: None,
                description: "Symbols scanned when a request does not supply its own",
            },
        ]
    }
}

/// Type of a configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Integer,
    Number,
    StringList,
}

/// Name, type and bounds of one configuration field
#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub default: serde_json::Value,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub description: &'static str,
}
