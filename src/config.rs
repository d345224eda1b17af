//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable overrides. Every field has a default, so `{}` is a valid file
//! and `Config::default()` is the stock screen.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::Symbol;

/// Default screening universe
pub const DEFAULT_UNIVERSE: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "NVDA", "AMZN", "META", "TSLA", "AMD", "INTC", "CSCO", "NFLX", "PEP",
    "ADBE", "PYPL", "CMCSA", "QCOM", "TXN", "AVGO", "COST", "TMUS",
];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub universe: UniverseConfig,
    pub filter: FilterConfig,
    pub signal: SignalConfig,
    pub risk: RiskConfig,
    pub data: DataConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file when it exists, otherwise start from defaults.
    /// Environment overrides apply in both cases.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::from_file(path);
        }
        let mut config = Config::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Override sizing and data settings from the environment
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("SCREENER_ACCOUNT_SIZE") {
            self.risk.account_size = value
                .parse()
                .with_context(|| format!("Invalid SCREENER_ACCOUNT_SIZE: {}", value))?;
        }
        if let Ok(value) = std::env::var("SCREENER_RISK_PER_TRADE") {
            self.risk.risk_per_trade = value
                .parse()
                .with_context(|| format!("Invalid SCREENER_RISK_PER_TRADE: {}", value))?;
        }
        if let Ok(value) = std::env::var("SCREENER_DATA_DIR") {
            self.data.data_dir = value;
        }
        Ok(())
    }

    /// Reject thresholds the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.universe.tickers.is_empty() {
            anyhow::bail!("universe.tickers must not be empty");
        }
        for (name, period) in [
            ("filter.sma_period", self.filter.sma_period),
            ("filter.volume_period", self.filter.volume_period),
            ("signal.lookback", self.signal.lookback),
            ("risk.atr_period", self.risk.atr_period),
            ("risk.trailing_sma_period", self.risk.trailing_sma_period),
        ] {
            if period == 0 {
                anyhow::bail!("{} must be positive", name);
            }
        }
        if self.signal.min_tread_days > self.signal.max_tread_days {
            anyhow::bail!(
                "signal.min_tread_days ({}) exceeds signal.max_tread_days ({})",
                self.signal.min_tread_days,
                self.signal.max_tread_days
            );
        }
        for (name, fraction) in [
            ("signal.max_drawdown", self.signal.max_drawdown),
            ("signal.setup_proximity", self.signal.setup_proximity),
            ("risk.risk_per_trade", self.risk.risk_per_trade),
        ] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                anyhow::bail!("{} must be in (0, 1], got {}", name, fraction);
            }
        }
        if self.signal.min_move <= 0.0 {
            anyhow::bail!("signal.min_move must be positive");
        }
        if self.risk.account_size <= 0.0 || self.risk.max_stop_atr <= 0.0 {
            anyhow::bail!("risk.account_size and risk.max_stop_atr must be positive");
        }
        Ok(())
    }
}

/// The fixed, ordered ticker list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    pub tickers: Vec<String>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            tickers: DEFAULT_UNIVERSE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl UniverseConfig {
    pub fn symbols(&self) -> Vec<Symbol> {
        self.tickers.iter().map(Symbol::new).collect()
    }
}

/// Liquidity and trend filters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum last close (default: 3.00)
    pub min_price: f64,
    /// Minimum average daily volume (default: 300,000)
    pub min_avg_volume: f64,
    /// Trend SMA window, also the minimum history (default: 50)
    pub sma_period: usize,
    /// Volume averaging window (default: 50)
    pub volume_period: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_price: 3.0,
            min_avg_volume: 300_000.0,
            sma_period: 50,
            volume_period: 50,
        }
    }
}

/// Riser / Tread / Breakout thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Momentum window in bars (default: 63)
    pub lookback: usize,
    /// Minimum (high - low) / low over the window (default: 0.30)
    pub min_move: f64,
    /// Inclusive tread window bounds in bars since the peak (default: 4..=40)
    pub min_tread_days: usize,
    pub max_tread_days: usize,
    /// Drawdown from the peak that fails the tread (default: 0.25)
    pub max_drawdown: f64,
    /// Fraction of the pivot at which a close counts as SETUP (default: 0.95)
    pub setup_proximity: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            lookback: 63,
            min_move: 0.30,
            min_tread_days: 4,
            max_tread_days: 40,
            max_drawdown: 0.25,
            setup_proximity: 0.95,
        }
    }
}

impl SignalConfig {
    pub fn with_min_move(mut self, min_move: f64) -> Self {
        self.min_move = min_move;
        self
    }

    pub fn with_tread_window(mut self, min_days: usize, max_days: usize) -> Self {
        self.min_tread_days = min_days;
        self.max_tread_days = max_days;
        self
    }

    pub fn with_max_drawdown(mut self, max_drawdown: f64) -> Self {
        self.max_drawdown = max_drawdown;
        self
    }
}

/// Position sizing
///
/// Currency-agnostic: `account_size` must be in the same currency as the
/// price data. No conversion is performed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub account_size: f64,
    /// Fraction of the account risked per trade (default: 0.02)
    pub risk_per_trade: f64,
    pub atr_period: usize,
    /// Stop distance cap in ATR multiples (default: 1.0)
    pub max_stop_atr: f64,
    pub trailing_sma_period: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            account_size: 100_000.0,
            risk_per_trade: 0.02,
            atr_period: 14,
            max_stop_atr: 1.0,
            trailing_sma_period: 10,
        }
    }
}

impl RiskConfig {
    pub fn with_account_size(mut self, account_size: f64) -> Self {
        self.account_size = account_size;
        self
    }

    /// Set risk per trade as a fraction (e.g., 0.02 = 2%)
    pub fn with_risk_per_trade(mut self, risk: f64) -> Self {
        self.risk_per_trade = risk;
        self
    }

    /// Dollar amount at risk on one trade
    pub fn risk_amount(&self) -> f64 {
        self.account_size * self.risk_per_trade
    }
}

/// Market data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Yahoo,
    Csv,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "csv" => Ok(ProviderKind::Csv),
            _ => Err(format!("Unknown provider: {}. Use 'yahoo' or 'csv'", s)),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Yahoo => write!(f, "yahoo"),
            ProviderKind::Csv => write!(f, "csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub provider: ProviderKind,
    /// Directory for the CSV provider and the download command
    pub data_dir: String,
    pub lookback: String,
    pub interval: String,
    /// Pause between quote requests
    pub request_delay_ms: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Yahoo,
            data_dir: "data".to_string(),
            lookback: "1y".to_string(),
            interval: "1d".to_string(),
            request_delay_ms: 250,
        }
    }
}
