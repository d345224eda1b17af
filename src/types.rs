//! Core data types used across the screening pipeline

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-ticker analysis errors.
///
/// None of these abort a scan: the aggregator turns each one into a
/// rejection for the ticker that produced it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("bars out of order at position {position}: {date} does not follow {previous}")]
    UnorderedBars {
        position: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("insufficient history: {have} bars < {need}")]
    InsufficientHistory { have: usize, need: usize },

    #[error("degenerate price range: period low is {0}")]
    DegenerateRange(f64),
}

/// Daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A bar is complete when every field is a finite number.
    /// Providers map missing quote cells to NaN.
    pub fn is_complete(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Ticker symbol using Arc<str> for cheap cloning
///
/// Symbols are cloned into every candidate, rejection and report row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

/// Custom serde for Arc<str>
mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(std::sync::Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered daily series for one ticker.
///
/// Construction drops incomplete bars and rejects duplicate or
/// out-of-order dates, so a bar's position in `bars()` is its bar index
/// and "days since" is plain index subtraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    pub fn new(bars: Vec<Bar>) -> Result<Self, AnalysisError> {
        let bars: Vec<Bar> = bars.into_iter().filter(Bar::is_complete).collect();

        for (position, pair) in bars.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(AnalysisError::UnorderedBars {
                    position: position + 1,
                    date: pair[1].date,
                    previous: pair[0].date,
                });
            }
        }

        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Position of the most recent bar
    pub fn last_position(&self) -> Option<usize> {
        self.bars.len().checked_sub(1)
    }

    /// The trailing `n` bars (or all of them when shorter)
    pub fn tail(&self, n: usize) -> &[Bar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}

/// A ticker that passed every universe filter
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    pub ticker: Symbol,
    pub current_price: f64,
    pub sma50: f64,
    pub vol_avg50: f64,
    pub series: Series,
}

/// Breakout lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalStatus {
    Wait,
    Setup,
    Buy,
    Fail,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Wait => "WAIT",
            SignalStatus::Setup => "SETUP",
            SignalStatus::Buy => "BUY",
            SignalStatus::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the Riser/Tread/Breakout detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub status: SignalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_peak: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawdown: Option<f64>,
}

impl SignalResult {
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            status: SignalStatus::Fail,
            reason: Some(reason.into()),
            signal_price: None,
            days_since_peak: None,
            drawdown: None,
        }
    }

    /// BUY and SETUP are the only states that get a risk profile
    pub fn is_actionable(&self) -> bool {
        matches!(self.status, SignalStatus::Buy | SignalStatus::Setup)
    }

    /// WAIT issued because the peak is outside the tread window
    pub fn is_disqualifying_wait(&self) -> bool {
        self.status == SignalStatus::Wait && self.reason.is_some()
    }
}

/// How the stop price was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopNote {
    #[serde(rename = "LOD")]
    LowOfDay,
    #[serde(rename = "Capped at 1ATR")]
    CappedAtr,
}

impl std::fmt::Display for StopNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopNote::LowOfDay => f.write_str("LOD"),
            StopNote::CappedAtr => f.write_str("Capped at 1ATR"),
        }
    }
}

/// Stop, trailing stop and size for one qualifying ticker.
/// Monetary fields are rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub risk_per_share: Money,
    pub stop_price: Money,
    pub stop_note: StopNote,
    pub shares: u64,
    pub position_value: Money,
    pub trailing_stop_sma10: Money,
    pub atr_14: Money,
}

/// A ticker excluded from the report's accepted list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub ticker: Symbol,
    pub reason: String,
}

impl Rejection {
    pub fn new(ticker: Symbol, reason: impl Into<String>) -> Self {
        Self {
            ticker,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Money Type - Precise Decimal Arithmetic for Monetary Values
// ============================================================================

use rust_decimal::Decimal;
use std::fmt;

/// Money type for monetary values at the output boundary.
///
/// Indicator math runs in f64 at full precision; values are converted and
/// rounded exactly once when a report row is built.
///
/// # Example
/// ```
/// use momentum_screener::Money;
/// let stop = Money::cents(48.499);
/// assert_eq!(stop.to_string(), "48.50");
/// ```
#[derive(Debug, Clone, Copy, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::str")] Decimal);

impl Money {
    /// Zero value
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Exact binary value of an f64. NaN and infinities become zero.
    pub fn from_f64(value: f64) -> Self {
        Money(Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO))
    }

    /// Create from f64 rounded to two decimal places
    pub fn cents(value: f64) -> Self {
        let mut rounded = Self::from_f64(value).round_dp(2).0;
        rounded.rescale(2);
        Money(rounded)
    }

    /// Check if value is zero
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Round to specified decimal places (banker's rounding)
    pub fn round_dp(self, dp: u32) -> Self {
        Money(self.0.round_dp(dp))
    }

    /// Get the underlying Decimal
    pub fn inner(self) -> Decimal {
        self.0
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
