//! Single-ticker price history with the trend SMA overlay

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::OhlcvProvider;
use crate::indicators::sma;
use crate::{Series, Symbol};

/// One chart row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// `None` until the SMA window is full
    pub sma_50: Option<f64>,
}

/// Chart rows for a series with an SMA of `sma_period` closes
pub fn history_rows(series: &Series, sma_period: usize) -> Vec<HistoryRow> {
    let sma_values = sma(&series.closes(), sma_period);

    series
        .bars()
        .iter()
        .zip(sma_values)
        .map(|(bar, sma_50)| HistoryRow {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume as u64,
            sma_50,
        })
        .collect()
}

/// Fetch one ticker and build its chart rows
pub fn fetch_history(
    provider: &dyn OhlcvProvider,
    ticker: &Symbol,
    lookback: &str,
    interval: &str,
    sma_period: usize,
) -> Result<Vec<HistoryRow>> {
    let mut batch = provider.fetch_series(std::slice::from_ref(ticker), lookback, interval)?;
    let bars = match batch.remove(ticker) {
        Some(result) => result?,
        None => Vec::new(),
    };

    let series = Series::new(bars)?;
    if series.is_empty() {
        anyhow::bail!("Ticker not found: {}", ticker);
    }
    Ok(history_rows(&series, sma_period))
}
