//! Scan orchestration
//!
//! Fetches the universe in one provider call, runs filter → detector → risk
//! per ticker on the rayon pool, and merges the outcomes into a report whose
//! lists follow universe order.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::data::{DataError, OhlcvProvider, SeriesBatch};
use crate::market::{market_status, MarketStatus};
use crate::risk::RiskEngine;
use crate::screener::{FilterOutcome, UniverseFilter};
use crate::signals::SignalDetector;
use crate::{Bar, Money, Rejection, RiskProfile, SignalResult, SignalStatus, Symbol};

/// A ticker that survived filtering and detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedEntry {
    pub ticker: Symbol,
    pub price: Money,
    pub sma_50: Money,
    pub vol_avg: u64,
    pub status: SignalStatus,
    pub signal_details: SignalResult,
    /// Present for BUY and SETUP only
    pub execution: Option<RiskProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub status: MarketStatus,
    pub accepted: Vec<AcceptedEntry>,
    pub rejected: Vec<Rejection>,
    pub universe_size: usize,
}

impl ScanReport {
    pub fn count(&self, status: SignalStatus) -> usize {
        self.accepted.iter().filter(|e| e.status == status).count()
    }
}

/// Outcome of the full pipeline for one ticker
#[derive(Debug, Clone)]
pub enum TickerOutcome {
    Accepted(Box<AcceptedEntry>),
    Rejected(Rejection),
}

/// The three analysis stages wired together
pub struct Pipeline {
    filter: UniverseFilter,
    detector: SignalDetector,
    risk: RiskEngine,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            filter: UniverseFilter::new(config.filter.clone()),
            detector: SignalDetector::new(config.signal.clone()),
            risk: RiskEngine::new(config.risk.clone()),
        }
    }

    /// Run one ticker through every stage. Never fails: every fault ends up
    /// as a rejection for this ticker alone.
    pub fn process_ticker(
        &self,
        ticker: &Symbol,
        raw: Option<Result<Vec<Bar>, DataError>>,
    ) -> TickerOutcome {
        let candidate = match self.filter.evaluate(ticker, raw) {
            FilterOutcome::Candidate(c) => c,
            FilterOutcome::Rejected(r) => return TickerOutcome::Rejected(r),
        };

        let signal = match self.detector.detect(&candidate) {
            Ok(signal) => signal,
            Err(e) => {
                debug!("{} signal check failed: {}", ticker, e);
                return TickerOutcome::Rejected(Rejection::new(
                    ticker.clone(),
                    "Signal Check Failed (Unknown)",
                ));
            }
        };

        if signal.status == SignalStatus::Fail {
            let reason = signal
                .reason
                .unwrap_or_else(|| "Failed Signal Criteria".to_string());
            return TickerOutcome::Rejected(Rejection::new(ticker.clone(), reason));
        }

        let execution = match self.risk.calculate_risk(&candidate, &signal) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("{} risk sizing failed: {}", ticker, e);
                return TickerOutcome::Rejected(Rejection::new(ticker.clone(), format!("Error: {}", e)));
            }
        };

        TickerOutcome::Accepted(Box::new(AcceptedEntry {
            ticker: ticker.clone(),
            price: Money::cents(candidate.current_price),
            sma_50: Money::cents(candidate.sma50),
            vol_avg: candidate.vol_avg50.trunc() as u64,
            status: signal.status,
            signal_details: signal,
            execution,
        }))
    }

    /// Process the universe in parallel. Both lists keep universe order.
    pub fn run(&self, tickers: &[Symbol], mut batch: SeriesBatch) -> (Vec<AcceptedEntry>, Vec<Rejection>) {
        let work: Vec<(Symbol, Option<Result<Vec<Bar>, DataError>>)> = tickers
            .iter()
            .map(|t| (t.clone(), batch.remove(t)))
            .collect();

        let outcomes: Vec<TickerOutcome> = work
            .into_par_iter()
            .map(|(ticker, raw)| self.process_ticker(&ticker, raw))
            .collect();

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for outcome in outcomes {
            match outcome {
                TickerOutcome::Accepted(entry) => accepted.push(*entry),
                TickerOutcome::Rejected(r) => rejected.push(r),
            }
        }
        (accepted, rejected)
    }
}

/// Fetch, analyse and report on the configured universe.
///
/// Only a provider failure for the whole batch is an error; per-ticker
/// problems land in `rejected`.
pub fn run_scan(provider: &dyn OhlcvProvider, config: &Config, now: DateTime<Utc>) -> Result<ScanReport> {
    let tickers = config.universe.symbols();
    info!("Scanning {} tickers", tickers.len());

    let batch = provider
        .fetch_series(&tickers, &config.data.lookback, &config.data.interval)
        .context("Failed to fetch market data")?;

    let (accepted, rejected) = Pipeline::new(config).run(&tickers, batch);

    let report = ScanReport {
        status: market_status(now),
        accepted,
        rejected,
        universe_size: tickers.len(),
    };

    info!(
        "Scan complete: {} BUY, {} SETUP, {} WAIT, {} rejected (market {})",
        report.count(SignalStatus::Buy),
        report.count(SignalStatus::Setup),
        report.count(SignalStatus::Wait),
        report.rejected.len(),
        report.status
    );

    Ok(report)
}
