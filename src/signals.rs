//! Riser / Tread / Breakout detector
//!
//! Classifies a candidate into a breakout lifecycle state:
//!
//! - **Riser**: the trailing window spans a move of at least `min_move`
//!   from its lowest low to its highest high.
//! - **Tread**: the highest high printed between `min_tread_days` and
//!   `max_tread_days` bars ago, and price has not retraced `max_drawdown`
//!   or more from it since.
//! - **Breakout**: the last close against the window high (the pivot).
//!
//! The window includes the current bar, so the pivot is the window high
//! *including today*. A close can only exceed it when the bar closes above
//! its own high; equality is a SETUP, not a BUY.

use tracing::debug;

use crate::config::SignalConfig;
use crate::indicators::{argmax, min_value};
use crate::{AnalysisError, CandidateRecord, Series, SignalResult, SignalStatus};

pub struct SignalDetector {
    config: SignalConfig,
}

impl SignalDetector {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Run detection on a candidate.
    ///
    /// Errors (short history, zero window low) mean no classification could
    /// be made at all; they are distinct from a FAIL.
    pub fn detect(&self, candidate: &CandidateRecord) -> Result<SignalResult, AnalysisError> {
        let result = self.detect_series(&candidate.series)?;
        debug!(
            "{} signal: {} {}",
            candidate.ticker,
            result.status,
            result.reason.as_deref().unwrap_or("")
        );
        Ok(result)
    }

    pub fn detect_series(&self, series: &Series) -> Result<SignalResult, AnalysisError> {
        let cfg = &self.config;
        let (Some(last), Some(current_pos)) = (series.last(), series.last_position()) else {
            return Err(AnalysisError::InsufficientHistory {
                have: 0,
                need: cfg.lookback,
            });
        };
        if series.len() < cfg.lookback {
            return Err(AnalysisError::InsufficientHistory {
                have: series.len(),
                need: cfg.lookback,
            });
        }

        // Riser
        let window_start = series.len() - cfg.lookback;
        let window = &series.bars()[window_start..];
        let highs: Vec<f64> = window.iter().map(|b| b.high).collect();
        let Some((peak_offset, period_high)) = argmax(&highs) else {
            return Err(AnalysisError::InsufficientHistory {
                have: 0,
                need: cfg.lookback,
            });
        };
        let period_low = min_value(window.iter().map(|b| b.low)).unwrap_or(0.0);

        if period_low == 0.0 {
            return Err(AnalysisError::DegenerateRange(period_low));
        }

        let move_pct = (period_high - period_low) / period_low;
        if move_pct < cfg.min_move {
            return Ok(SignalResult::fail(format!(
                "No Riser (Move < {}%)",
                percent(cfg.min_move)
            )));
        }

        // Tread
        let peak_pos = window_start + peak_offset;
        let days_since_peak = current_pos - peak_pos;
        let min_since_peak =
            min_value(series.bars()[peak_pos..].iter().map(|b| b.low)).unwrap_or(period_high);
        let drawdown = (period_high - min_since_peak) / period_high;

        if !(cfg.min_tread_days..=cfg.max_tread_days).contains(&days_since_peak) {
            return Ok(SignalResult {
                status: SignalStatus::Wait,
                reason: Some(format!(
                    "Days since peak: {} (Req {}-{})",
                    days_since_peak, cfg.min_tread_days, cfg.max_tread_days
                )),
                signal_price: Some(period_high),
                days_since_peak: Some(days_since_peak),
                drawdown: Some(drawdown),
            });
        }

        if drawdown >= cfg.max_drawdown {
            return Ok(SignalResult::fail(format!(
                "Drawdown too deep: {:.1}%",
                drawdown * 100.0
            )));
        }

        // Breakout
        let curr_close = last.close;
        let status = if curr_close > period_high {
            SignalStatus::Buy
        } else if curr_close >= cfg.setup_proximity * period_high {
            SignalStatus::Setup
        } else {
            SignalStatus::Wait
        };

        Ok(SignalResult {
            status,
            reason: None,
            signal_price: Some(period_high),
            days_since_peak: Some(days_since_peak),
            drawdown: Some(drawdown),
        })
    }
}

/// 0.30 -> "30", 0.125 -> "12.5"
fn percent(fraction: f64) -> String {
    let pct = (fraction * 1000.0).round() / 10.0;
    if pct.fract() == 0.0 {
        format!("{}", pct as i64)
    } else {
        format!("{}", pct)
    }
}
