//! Risk engine
//!
//! Derives the stop, trailing stop and share count for a BUY or SETUP
//! candidate.
//!
//! # Currency-Agnostic Design
//!
//! All sizing is currency-agnostic: the code treats monetary values as
//! dimensionless numbers and works as long as `account_size` and price data
//! share a currency.
//!
//! Position sizing formula:
//! ```text
//! stop     = max(low_of_day, price - max_stop_atr * ATR14)
//! shares   = floor((account_size * risk_per_trade) / (price - stop))
//! ```

use tracing::debug;

use crate::config::RiskConfig;
use crate::indicators::{atr, last_sma};
use crate::{AnalysisError, CandidateRecord, Money, RiskProfile, SignalResult, StopNote};

pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Size a candidate. Returns `Ok(None)` for signals that are not BUY or
    /// SETUP.
    pub fn calculate_risk(
        &self,
        candidate: &CandidateRecord,
        signal: &SignalResult,
    ) -> Result<Option<RiskProfile>, AnalysisError> {
        if !signal.is_actionable() {
            return Ok(None);
        }

        let series = &candidate.series;
        let closes = series.closes();

        let atr_14 = atr(&series.highs(), &series.lows(), &closes, self.config.atr_period)
            .last()
            .copied()
            .flatten()
            .ok_or(AnalysisError::InsufficientHistory {
                have: series.len(),
                need: self.config.atr_period,
            })?;
        let trailing = last_sma(&closes, self.config.trailing_sma_period).ok_or(
            AnalysisError::InsufficientHistory {
                have: series.len(),
                need: self.config.trailing_sma_period,
            },
        )?;
        let lod = series
            .last()
            .map(|b| b.low)
            .ok_or(AnalysisError::InsufficientHistory { have: 0, need: 1 })?;

        let profile = self.size_position(candidate.current_price, lod, atr_14, trailing);
        debug!(
            "{} sized: stop={} ({}) shares={} value={}",
            candidate.ticker, profile.stop_price, profile.stop_note, profile.shares, profile.position_value
        );
        Ok(Some(profile))
    }

    /// Pure sizing step on precomputed inputs
    pub fn size_position(
        &self,
        current_price: f64,
        lod: f64,
        atr_14: f64,
        trailing_sma: f64,
    ) -> RiskProfile {
        let stop_distance = current_price - lod;
        let max_stop_distance = self.config.max_stop_atr * atr_14;

        let (stop_price, stop_note) = if stop_distance > max_stop_distance {
            (current_price - max_stop_distance, StopNote::CappedAtr)
        } else {
            (lod, StopNote::LowOfDay)
        };

        let risk_per_share = current_price - stop_price;
        // Degenerate geometry (stop at or above entry) sizes to zero
        let shares = if risk_per_share <= 0.0 {
            0
        } else {
            (self.config.risk_amount() / risk_per_share).floor() as u64
        };

        RiskProfile {
            risk_per_share: Money::cents(risk_per_share),
            stop_price: Money::cents(stop_price),
            stop_note,
            shares,
            position_value: Money::cents(shares as f64 * current_price),
            trailing_stop_sma10: Money::cents(trailing_sma),
            atr_14: Money::cents(atr_14),
        }
    }
}
