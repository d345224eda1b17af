//! Universe filter
//!
//! First pipeline stage: turns each ticker's raw bars into either a
//! [`CandidateRecord`] or a [`Rejection`]. Filters run in a fixed order and
//! stop at the first failure:
//!
//! 1. Price: last close >= `min_price`
//! 2. Liquidity: 50-day average volume >= `min_avg_volume`
//! 3. Trend: last close > 50-day SMA

use tracing::debug;

use crate::config::FilterConfig;
use crate::data::{DataError, SeriesBatch};
use crate::indicators::last_sma;
use crate::{Bar, CandidateRecord, Rejection, Series, Symbol};

/// Result of filtering one ticker
#[derive(Debug, Clone)]
pub enum FilterOutcome {
    Candidate(CandidateRecord),
    Rejected(Rejection),
}

pub struct UniverseFilter {
    config: FilterConfig,
}

impl UniverseFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Bars needed before any filter can be evaluated
    pub fn min_history(&self) -> usize {
        self.config.sma_period.max(self.config.volume_period)
    }

    /// Filter one ticker. `raw` is `None` when the provider returned nothing
    /// for it.
    pub fn evaluate(&self, ticker: &Symbol, raw: Option<Result<Vec<Bar>, DataError>>) -> FilterOutcome {
        let reject = |reason: String| {
            debug!("{} rejected: {}", ticker, reason);
            FilterOutcome::Rejected(Rejection::new(ticker.clone(), reason))
        };

        let bars = match raw {
            None => return reject("No Data".to_string()),
            Some(Err(e)) => return reject(format!("Error: {}", e)),
            Some(Ok(bars)) => bars,
        };

        let series = match Series::new(bars) {
            Ok(series) => series,
            Err(e) => return reject(format!("Error: {}", e)),
        };

        if series.is_empty() {
            return reject("No Data".to_string());
        }
        let min_history = self.min_history();
        if series.len() < min_history {
            return reject(format!("Not enough data (<{} days)", min_history));
        }

        let closes = series.closes();
        let (Some(current_price), Some(sma), Some(vol_avg)) = (
            closes.last().copied(),
            last_sma(&closes, self.config.sma_period),
            last_sma(&series.volumes(), self.config.volume_period),
        ) else {
            return reject(format!("Error: indicator window not filled ({} bars)", series.len()));
        };

        if current_price < self.config.min_price {
            return reject(format!(
                "Price ${:.2} < ${:.2}",
                current_price, self.config.min_price
            ));
        }

        if vol_avg < self.config.min_avg_volume {
            return reject(format!(
                "Volume {} < {}",
                vol_avg.trunc() as i64,
                volume_label(self.config.min_avg_volume)
            ));
        }

        if current_price <= sma {
            return reject(format!(
                "Downtrend (Price ${:.2} <= SMA{})",
                current_price, self.config.sma_period
            ));
        }

        debug!(
            "{} passed filters: price={:.2} sma={:.2} vol_avg={:.0}",
            ticker, current_price, sma, vol_avg
        );

        FilterOutcome::Candidate(CandidateRecord {
            ticker: ticker.clone(),
            current_price,
            sma50: sma,
            vol_avg50: vol_avg,
            series,
        })
    }

    /// Filter the whole universe in order, draining `batch`
    pub fn filter_universe(
        &self,
        tickers: &[Symbol],
        mut batch: SeriesBatch,
    ) -> (Vec<CandidateRecord>, Vec<Rejection>) {
        let mut candidates = Vec::new();
        let mut rejected = Vec::new();

        for ticker in tickers {
            match self.evaluate(ticker, batch.remove(ticker)) {
                FilterOutcome::Candidate(c) => candidates.push(c),
                FilterOutcome::Rejected(r) => rejected.push(r),
            }
        }

        (candidates, rejected)
    }
}

/// Compact threshold label: 300000 -> "300k", 2000000 -> "2M"
fn volume_label(volume: f64) -> String {
    if volume >= 1_000_000.0 && volume % 1_000_000.0 == 0.0 {
        format!("{}M", (volume / 1_000_000.0) as i64)
    } else if volume >= 1_000.0 && volume % 1_000.0 == 0.0 {
        format!("{}k", (volume / 1_000.0) as i64)
    } else {
        format!("{}", volume as i64)
    }
}
