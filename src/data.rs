//! Data loading and management
//!
//! The screen treats market data as an opaque provider: one batched call
//! returns a raw bar vector per ticker. Two providers ship with the crate,
//! the Yahoo chart API and a directory of CSV files written by `download`.

use chrono::{DateTime, Duration, NaiveDate};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration as StdDuration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{Bar, Symbol};

// =============================================================================
// Provider Interface
// =============================================================================

const YAHOO_CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors from a data provider
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} for {symbol}")]
    HttpStatus { status: u16, symbol: String },

    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("invalid lookback period: {0}")]
    InvalidLookback(String),

    #[error("CSV error in {path}: {message}")]
    Csv { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Raw bars per ticker.
///
/// A missing key or an empty vector means the provider had no data for the
/// ticker; an `Err` is a fault confined to that ticker.
pub type SeriesBatch = HashMap<Symbol, Result<Vec<Bar>, DataError>>;

/// Source of daily OHLCV history
pub trait OhlcvProvider: Send + Sync {
    /// Fetch `lookback` of `interval` bars for every ticker in one batch.
    /// An `Err` here fails the whole scan.
    fn fetch_series(
        &self,
        tickers: &[Symbol],
        lookback: &str,
        interval: &str,
    ) -> Result<SeriesBatch, DataError>;
}

/// In-memory provider, used by tests and for replaying a captured batch
#[derive(Debug, Default, Clone)]
pub struct StaticProvider {
    series: HashMap<Symbol, Vec<Bar>>,
    failures: HashMap<Symbol, String>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, ticker: &str, bars: Vec<Bar>) -> Self {
        self.series.insert(Symbol::new(ticker), bars);
        self
    }

    /// Make `ticker` come back as a malformed-response fault
    pub fn with_failure(mut self, ticker: &str, message: &str) -> Self {
        self.failures.insert(Symbol::new(ticker), message.to_string());
        self
    }
}

impl OhlcvProvider for StaticProvider {
    fn fetch_series(
        &self,
        tickers: &[Symbol],
        _lookback: &str,
        _interval: &str,
    ) -> Result<SeriesBatch, DataError> {
        Ok(tickers
            .iter()
            .filter_map(|t| {
                if let Some(message) = self.failures.get(t) {
                    return Some((t.clone(), Err(DataError::ResponseFormat(message.clone()))));
                }
                self.series.get(t).map(|bars| (t.clone(), Ok(bars.clone())))
            })
            .collect())
    }
}

/// Parse a lookback period such as `1y`, `6mo`, `90d` or `max`.
/// `None` means unbounded.
pub fn parse_lookback(lookback: &str) -> Result<Option<Duration>, DataError> {
    let lookback = lookback.trim();
    if lookback == "max" {
        return Ok(None);
    }

    let split = lookback
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| DataError::InvalidLookback(lookback.to_string()))?;
    let (count, unit) = lookback.split_at(split);
    let count: i64 = count
        .parse()
        .map_err(|_| DataError::InvalidLookback(lookback.to_string()))?;

    let days = match unit {
        "d" => count,
        "wk" => count * 7,
        "mo" => count * 30,
        "y" => count * 365,
        _ => return Err(DataError::InvalidLookback(lookback.to_string())),
    };
    Ok(Some(Duration::days(days)))
}

/// Keep only bars inside the lookback window ending at the last bar
fn trim_to_lookback(bars: &mut Vec<Bar>, window: Option<Duration>) {
    let (Some(window), Some(last)) = (window, bars.last().map(|b| b.date)) else {
        return;
    };
    let start = last - window;
    bars.retain(|b| b.date > start);
}

// =============================================================================
// CSV Data Loading
// =============================================================================

fn parse_field(record: &csv::StringRecord, idx: usize, name: &str, path: &Path) -> Result<f64, DataError> {
    let raw = record.get(idx).ok_or_else(|| DataError::Csv {
        path: path.display().to_string(),
        message: format!("missing {} column", name),
    })?;
    let raw = raw.trim();
    if raw.is_empty() {
        // Missing cell: the bar is incomplete and gets dropped downstream
        return Ok(f64::NAN);
    }
    raw.parse().map_err(|_| DataError::Csv {
        path: path.display().to_string(),
        message: format!("failed to parse {}: {}", name, raw),
    })
}

/// Load daily OHLCV bars from a CSV file with a
/// `date,open,high,low,close,volume` header
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    let path = path.as_ref();
    let csv_err = |e: csv::Error| DataError::Csv {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let mut bars = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(csv_err)?;

        let date_str = record.get(0).unwrap_or_default().trim();
        // Accept both plain dates and "YYYY-MM-DD HH:MM:SS"
        let date = NaiveDate::parse_from_str(date_str.get(..10).unwrap_or(date_str), "%Y-%m-%d")
            .map_err(|_| DataError::Csv {
                path: path.display().to_string(),
                message: format!("row {}: failed to parse date: {}", row_idx + 1, date_str),
            })?;

        bars.push(Bar {
            date,
            open: parse_field(&record, 1, "open", path)?,
            high: parse_field(&record, 2, "high", path)?,
            low: parse_field(&record, 3, "low", path)?,
            close: parse_field(&record, 4, "close", path)?,
            volume: parse_field(&record, 5, "volume", path)?,
        });
    }

    Ok(bars)
}

/// Save bars to CSV in the format `load_csv` reads
pub fn save_csv(bars: &[Bar], path: impl AsRef<Path>) -> Result<PathBuf, DataError> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(&path)?;

    writeln!(file, "date,open,high,low,close,volume")?;
    for bar in bars {
        writeln!(
            file,
            "{},{},{},{},{},{}",
            bar.date.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        )?;
    }

    info!("Saved {} rows to {}", bars.len(), path.display());
    Ok(path)
}

/// File name used for a ticker's CSV
pub fn csv_filename(symbol: &Symbol, interval: &str) -> String {
    format!("{}_{}.csv", symbol.as_str(), interval)
}

/// Reads `<data_dir>/<TICKER>_<interval>.csv`
pub struct CsvProvider {
    data_dir: PathBuf,
}

impl CsvProvider {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }
}

impl OhlcvProvider for CsvProvider {
    fn fetch_series(
        &self,
        tickers: &[Symbol],
        lookback: &str,
        interval: &str,
    ) -> Result<SeriesBatch, DataError> {
        let window = parse_lookback(lookback)?;
        let mut batch = HashMap::new();

        for symbol in tickers {
            let path = self.data_dir.join(csv_filename(symbol, interval));
            if !path.exists() {
                warn!("Data file not found: {}", path.display());
                continue;
            }

            let loaded = load_csv(&path).map(|mut bars| {
                trim_to_lookback(&mut bars, window);
                bars
            });
            match &loaded {
                Ok(bars) => debug!("Loaded {} bars for {}", bars.len(), symbol),
                Err(e) => warn!("Failed to load {}: {}", symbol, e),
            }
            batch.insert(symbol.clone(), loaded);
        }

        info!("Loaded CSV data for {}/{} tickers", batch.len(), tickers.len());
        Ok(batch)
    }
}

// =============================================================================
// Yahoo Finance Chart API
// =============================================================================

#[derive(Debug, serde::Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, serde::Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, serde::Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, serde::Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, serde::Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, serde::Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Fetches daily bars from Yahoo's v8 chart API, one request per ticker
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    request_delay: StdDuration,
}

impl YahooProvider {
    pub fn new(request_delay_ms: u64) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        Ok(Self {
            client,
            request_delay: StdDuration::from_millis(request_delay_ms),
        })
    }

    fn chart_url(symbol: &Symbol, lookback: &str, interval: &str) -> String {
        format!(
            "{}/{}?range={}&interval={}&includePrePost=false",
            YAHOO_CHART_URL,
            symbol.as_str(),
            lookback,
            interval
        )
    }

    /// Fetch one ticker's bars
    pub fn fetch_one(&self, symbol: &Symbol, lookback: &str, interval: &str) -> Result<Vec<Bar>, DataError> {
        let url = Self::chart_url(symbol, lookback, interval);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                symbol: symbol.to_string(),
            });
        }

        let chart: ChartResponse = response
            .json()
            .map_err(|e| DataError::ResponseFormat(format!("{}: {}", symbol, e)))?;
        parse_chart(symbol, chart)
    }
}

/// Convert a chart response to bars. Null quote cells become NaN so the
/// bar is treated as incomplete rather than silently zero-filled.
fn parse_chart(symbol: &Symbol, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound(symbol.to_string()),
        Some(err) => DataError::ResponseFormat(format!("{}: {}", err.code, err.description)),
        None => DataError::ResponseFormat("empty result with no error".into()),
    })?;

    let Some(data) = result.into_iter().next() else {
        return Ok(Vec::new());
    };
    // Listed but no trading history in range
    let Some(timestamps) = data.timestamp else {
        return Ok(Vec::new());
    };
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormat("no quote data".into()))?;

    let cell = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten().unwrap_or(f64::NAN);

    timestamps
        .iter()
        .enumerate()
        .map(|(i, &ts)| -> Result<Bar, DataError> {
            let date = DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| DataError::ResponseFormat(format!("invalid timestamp: {}", ts)))?;
            Ok(Bar {
                date,
                open: cell(&quote.open, i),
                high: cell(&quote.high, i),
                low: cell(&quote.low, i),
                close: cell(&quote.close, i),
                volume: cell(&quote.volume, i),
            })
        })
        .collect()
}

impl OhlcvProvider for YahooProvider {
    fn fetch_series(
        &self,
        tickers: &[Symbol],
        lookback: &str,
        interval: &str,
    ) -> Result<SeriesBatch, DataError> {
        info!("Fetching {} {} of {} bars from Yahoo", tickers.len(), lookback, interval);

        let mut batch = HashMap::new();
        let mut unreachable = 0;

        for (i, symbol) in tickers.iter().enumerate() {
            if i > 0 {
                sleep(self.request_delay);
            }
            let fetched = self.fetch_one(symbol, lookback, interval);
            match &fetched {
                Ok(bars) => debug!("Fetched {} bars for {}", bars.len(), symbol),
                Err(DataError::NetworkUnreachable(msg)) => {
                    unreachable += 1;
                    warn!("Network error for {}: {}", symbol, msg);
                }
                Err(e) => warn!("Fetch failed for {}: {}", symbol, e),
            }
            batch.insert(symbol.clone(), fetched);
        }

        if !tickers.is_empty() && unreachable == tickers.len() {
            return Err(DataError::NetworkUnreachable(
                "every ticker request failed".to_string(),
            ));
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lookback() {
        assert_eq!(parse_lookback("1y").unwrap(), Some(Duration::days(365)));
        assert_eq!(parse_lookback("6mo").unwrap(), Some(Duration::days(180)));
        assert_eq!(parse_lookback("90d").unwrap(), Some(Duration::days(90)));
        assert_eq!(parse_lookback("max").unwrap(), None);
        assert!(parse_lookback("y").is_err());
        assert!(parse_lookback("12").is_err());
        assert!(parse_lookback("3h").is_err());
    }

    #[test]
    fn test_trim_to_lookback() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut bars: Vec<Bar> = (0..10)
            .map(|i| Bar::new(start + Duration::days(i), 1.0, 1.0, 1.0, 1.0, 1.0))
            .collect();
        trim_to_lookback(&mut bars, Some(Duration::days(3)));
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, start + Duration::days(7));
    }

    #[test]
    fn test_parse_chart_maps_nulls_to_nan() {
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1704205800, 1704292200],
                    "indicators": { "quote": [{
                        "open": [10.0, null],
                        "high": [11.0, 12.0],
                        "low": [9.5, 10.5],
                        "close": [10.5, 11.5],
                        "volume": [1000000, 900000]
                    }]}
                }],
                "error": null
            }
        }"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let bars = parse_chart(&Symbol::new("AAPL"), resp).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!(bars[0].is_complete());
        assert!(bars[1].open.is_nan());
        assert!(!bars[1].is_complete());
    }

    #[test]
    fn test_parse_chart_not_found() {
        let json = r#"{"chart": {"result": null,
            "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let err = parse_chart(&Symbol::new("ZZZZ"), resp).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound(s) if s == "ZZZZ"));
    }

    #[test]
    fn test_csv_round_trip_keeps_missing_cells() {
        let dir = std::env::temp_dir().join(format!("screener-csv-{}", std::process::id()));
        let path = dir.join("TEST_1d.csv");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            &path,
            "date,open,high,low,close,volume\n2024-01-02,10,11,9,10.5,1000\n2024-01-03,,11,9,10.5,1000\n",
        )
        .unwrap();

        let bars = load_csv(&path).unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[1].open.is_nan());

        let provider = CsvProvider::new(&dir);
        let batch = provider
            .fetch_series(&[Symbol::new("TEST"), Symbol::new("NOPE")], "1y", "1d")
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[&Symbol::new("TEST")].as_ref().unwrap().len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_static_provider_omits_unknown_tickers() {
        let provider = StaticProvider::new().with_series("AAPL", Vec::new());
        let batch = provider
            .fetch_series(&[Symbol::new("AAPL"), Symbol::new("MSFT")], "1y", "1d")
            .unwrap();
        assert!(batch.contains_key(&Symbol::new("AAPL")));
        assert!(!batch.contains_key(&Symbol::new("MSFT")));
    }
}
