//! Integration tests for the momentum screener
//!
//! These tests drive a full scan through the in-memory provider and check
//! that every stage's outcome reaches the report.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use momentum_screener::config::UniverseConfig;
use momentum_screener::data::{DataError, OhlcvProvider, SeriesBatch, StaticProvider};
use momentum_screener::market::MarketStatus;
use momentum_screener::scan::Pipeline;
use momentum_screener::{
    run_scan, Bar, Config, ScanReport, SignalStatus, StopNote, Symbol,
};

// =============================================================================
// Test Utilities
// =============================================================================

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

/// Wednesday 10:00 EDT
fn session_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 10, 14, 0, 0).unwrap()
}

/// 80 bars that rally into a peak `days_since_peak` bars before the end and
/// then hold in a tight 0.93x-0.97x range. The window low (0.70x) sits on
/// the first bar of the 63-bar window.
fn generate_breakout_bars(pivot: f64, days_since_peak: usize, last_close: f64) -> Vec<Bar> {
    let n = 80;
    let peak = n - 1 - days_since_peak;

    (0..n)
        .map(|i| {
            let (high, low, close) = if i == n - 63 {
                (pivot * 0.78, pivot * 0.70, pivot * 0.74)
            } else if i == peak {
                (pivot, pivot * 0.92, pivot * 0.96)
            } else if i > peak {
                (pivot * 0.97, pivot * 0.93, pivot * 0.95)
            } else {
                (pivot * 0.84, pivot * 0.80, pivot * 0.82)
            };
            let close = if i == n - 1 { last_close } else { close };
            Bar::new(start_date() + Days::new(i as u64), close, high, low, close, 1_000_000.0)
        })
        .collect()
}

/// Closes moving linearly from `first` to `last` in a one-dollar range
fn generate_linear_bars(count: usize, first: f64, last: f64, volume: f64) -> Vec<Bar> {
    let step = if count > 1 {
        (last - first) / (count - 1) as f64
    } else {
        0.0
    };
    (0..count)
        .map(|i| {
            let close = if i == count - 1 { last } else { first + step * i as f64 };
            Bar::new(
                start_date() + Days::new(i as u64),
                close,
                close + 0.5,
                close - 0.5,
                close,
                volume,
            )
        })
        .collect()
}

fn config_for(tickers: &[&str]) -> Config {
    Config {
        universe: UniverseConfig {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
        },
        ..Config::default()
    }
}

/// One ticker per pipeline outcome
fn mixed_universe() -> (Config, StaticProvider) {
    let mut deep = generate_breakout_bars(140.0, 10, 135.0);
    let n = deep.len();
    deep[n - 3].low = 101.8;

    let provider = StaticProvider::new()
        .with_series("BRK", generate_breakout_bars(140.0, 10, 140.5))
        .with_series("STP", generate_breakout_bars(140.0, 10, 135.0))
        .with_series("LAG", generate_breakout_bars(140.0, 10, 130.0))
        .with_series("NEW", generate_breakout_bars(140.0, 3, 135.0))
        .with_series("OLD", generate_breakout_bars(140.0, 41, 135.0))
        .with_series("DIP", deep)
        .with_series("FLAT", generate_linear_bars(80, 40.0, 50.0, 1_000_000.0))
        .with_series("PENNY", generate_linear_bars(80, 2.5, 2.99, 1_000_000.0))
        .with_series("THIN", generate_linear_bars(80, 40.0, 50.0, 100_000.0))
        .with_series("FALL", generate_linear_bars(80, 60.0, 50.0, 1_000_000.0))
        .with_series("YNG", generate_linear_bars(40, 40.0, 50.0, 1_000_000.0))
        .with_series("MID", generate_linear_bars(55, 40.0, 50.0, 1_000_000.0))
        .with_failure("BAD", "boom");

    let config = config_for(&[
        "BRK", "PENNY", "STP", "THIN", "LAG", "FALL", "NEW", "OLD", "YNG", "DIP", "MID", "FLAT",
        "GONE", "BAD",
    ]);

    (config, provider)
}

fn scan_mixed() -> ScanReport {
    let (config, provider) = mixed_universe();
    run_scan(&provider, &config, session_time()).unwrap()
}

fn accepted<'a>(report: &'a ScanReport, ticker: &str) -> &'a momentum_screener::AcceptedEntry {
    report
        .accepted
        .iter()
        .find(|e| e.ticker.as_str() == ticker)
        .unwrap_or_else(|| panic!("{} not accepted", ticker))
}

fn rejection_reason<'a>(report: &'a ScanReport, ticker: &str) -> &'a str {
    report
        .rejected
        .iter()
        .find(|r| r.ticker.as_str() == ticker)
        .map(|r| r.reason.as_str())
        .unwrap_or_else(|| panic!("{} not rejected", ticker))
}

// =============================================================================
// Report Shape Tests
// =============================================================================

#[test]
fn test_every_ticker_lands_in_exactly_one_list() {
    let (config, _) = mixed_universe();
    let report = scan_mixed();

    assert_eq!(report.universe_size, config.universe.tickers.len());
    assert_eq!(report.accepted.len() + report.rejected.len(), report.universe_size);

    for ticker in &config.universe.tickers {
        let hits = report.accepted.iter().filter(|e| e.ticker.as_str() == ticker).count()
            + report.rejected.iter().filter(|r| r.ticker.as_str() == ticker).count();
        assert_eq!(hits, 1, "{} appears {} times", ticker, hits);
    }
}

#[test]
fn test_lists_follow_universe_order() {
    let report = scan_mixed();

    let accepted: Vec<&str> = report.accepted.iter().map(|e| e.ticker.as_str()).collect();
    assert_eq!(accepted, vec!["BRK", "STP", "LAG", "NEW", "OLD"]);

    let rejected: Vec<&str> = report.rejected.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(
        rejected,
        vec!["PENNY", "THIN", "FALL", "YNG", "DIP", "MID", "FLAT", "GONE", "BAD"]
    );
}

#[test]
fn test_scan_is_idempotent() {
    let (config, provider) = mixed_universe();
    let first = run_scan(&provider, &config, session_time()).unwrap();
    let second = run_scan(&provider, &config, session_time()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_market_status_in_report() {
    let (config, provider) = mixed_universe();
    assert_eq!(scan_mixed().status, MarketStatus::Open);

    // Saturday
    let weekend = Utc.with_ymd_and_hms(2024, 7, 13, 15, 0, 0).unwrap();
    let report = run_scan(&provider, &config, weekend).unwrap();
    assert_eq!(report.status, MarketStatus::Closed);
}

#[test]
fn test_report_serializes_to_json() {
    let report = scan_mixed();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["status"], "OPEN");
    assert_eq!(json["universe_size"], 14);

    let brk = &json["accepted"][0];
    assert_eq!(brk["ticker"], "BRK");
    assert_eq!(brk["status"], "BUY");
    assert_eq!(brk["price"], "140.50");
    assert_eq!(brk["execution"]["stop_note"], "Capped at 1ATR");
    assert_eq!(brk["execution"]["shares"], 285);

    let lag = &json["accepted"][2];
    assert!(lag["execution"].is_null());
    assert!(lag["signal_details"].get("reason").is_none());
}

// =============================================================================
// Signal and Risk Tests
// =============================================================================

#[test]
fn test_buy_is_sized() {
    let report = scan_mixed();
    let entry = accepted(&report, "BRK");

    assert_eq!(entry.status, SignalStatus::Buy);
    assert_eq!(entry.signal_details.signal_price, Some(140.0));
    assert_eq!(entry.signal_details.days_since_peak, Some(10));

    let exec = entry.execution.as_ref().unwrap();
    // ATR14 = 7.0 and the 10.3 distance to the day's low is over the cap
    assert_eq!(exec.stop_note, StopNote::CappedAtr);
    assert_eq!(exec.atr_14.inner(), dec!(7.00));
    assert_eq!(exec.stop_price.inner(), dec!(133.50));
    assert_eq!(exec.risk_per_share.inner(), dec!(7.00));
    assert_eq!(exec.shares, 285);
    assert_eq!(exec.position_value.inner(), dec!(40042.50));
    assert_eq!(exec.trailing_stop_sma10.inner(), dec!(133.75));
}

#[test]
fn test_setup_is_sized_from_low_of_day() {
    let report = scan_mixed();
    let entry = accepted(&report, "STP");

    assert_eq!(entry.status, SignalStatus::Setup);
    assert_eq!(entry.vol_avg, 1_000_000);

    let exec = entry.execution.as_ref().unwrap();
    assert_eq!(exec.stop_note, StopNote::LowOfDay);
    assert_eq!(exec.stop_price.inner(), dec!(130.20));
    // floor(2000 / 4.8)
    assert_eq!(exec.shares, 416);
}

#[test]
fn test_waits_carry_no_execution() {
    let report = scan_mixed();

    let lag = accepted(&report, "LAG");
    assert_eq!(lag.status, SignalStatus::Wait);
    assert!(lag.signal_details.reason.is_none());
    assert!(lag.execution.is_none());

    for (ticker, days) in [("NEW", 3), ("OLD", 41)] {
        let entry = accepted(&report, ticker);
        assert_eq!(entry.status, SignalStatus::Wait);
        assert!(entry.execution.is_none());
        assert_eq!(
            entry.signal_details.reason.as_deref(),
            Some(format!("Days since peak: {} (Req 4-40)", days).as_str())
        );
    }
}

#[test]
fn test_counts_by_status() {
    let report = scan_mixed();
    assert_eq!(report.count(SignalStatus::Buy), 1);
    assert_eq!(report.count(SignalStatus::Setup), 1);
    assert_eq!(report.count(SignalStatus::Wait), 3);
    assert_eq!(report.count(SignalStatus::Fail), 0);
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[test]
fn test_rejection_reasons() {
    let report = scan_mixed();

    assert_eq!(rejection_reason(&report, "PENNY"), "Price $2.99 < $3.00");
    assert_eq!(rejection_reason(&report, "THIN"), "Volume 100000 < 300k");
    assert_eq!(rejection_reason(&report, "FALL"), "Downtrend (Price $50.00 <= SMA50)");
    assert_eq!(rejection_reason(&report, "YNG"), "Not enough data (<50 days)");
    assert_eq!(rejection_reason(&report, "DIP"), "Drawdown too deep: 27.3%");
    assert_eq!(
        rejection_reason(&report, "MID"),
        "Signal Check Failed (Unknown)"
    );
    assert_eq!(rejection_reason(&report, "FLAT"), "No Riser (Move < 30%)");
    assert_eq!(rejection_reason(&report, "GONE"), "No Data");
    assert_eq!(
        rejection_reason(&report, "BAD"),
        "Error: response format changed: boom"
    );
}

#[test]
fn test_empty_series_is_no_data() {
    let provider = StaticProvider::new().with_series("NONE", Vec::new());
    let report = run_scan(&provider, &config_for(&["NONE"]), session_time()).unwrap();
    assert_eq!(rejection_reason(&report, "NONE"), "No Data");
}

#[test]
fn test_incomplete_bars_are_dropped() {
    // NaN closes on every other bar leave 40 usable bars
    let bars: Vec<Bar> = generate_linear_bars(80, 40.0, 50.0, 1_000_000.0)
        .into_iter()
        .enumerate()
        .map(|(i, mut bar)| {
            if i % 2 == 0 {
                bar.close = f64::NAN;
            }
            bar
        })
        .collect();
    let provider = StaticProvider::new().with_series("GAPS", bars);
    let report = run_scan(&provider, &config_for(&["GAPS"]), session_time()).unwrap();
    assert_eq!(rejection_reason(&report, "GAPS"), "Not enough data (<50 days)");
}

#[test]
fn test_unordered_bars_are_rejected() {
    let mut bars = generate_breakout_bars(140.0, 10, 135.0);
    bars.swap(10, 11);
    let provider = StaticProvider::new().with_series("MIX", bars);
    let report = run_scan(&provider, &config_for(&["MIX"]), session_time()).unwrap();
    assert!(rejection_reason(&report, "MIX").starts_with("Error: bars out of order"));
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_account_size_scales_position() {
    let mut config = config_for(&["STP"]);
    config.risk = config.risk.with_account_size(50_000.0).with_risk_per_trade(0.01);
    let provider = StaticProvider::new().with_series("STP", generate_breakout_bars(140.0, 10, 135.0));

    let report = run_scan(&provider, &config, session_time()).unwrap();
    // floor(500 / 4.8)
    assert_eq!(accepted(&report, "STP").execution.as_ref().unwrap().shares, 104);
}

#[test]
fn test_pipeline_processes_batch_directly() {
    let config = config_for(&["STP", "GONE"]);
    let provider = StaticProvider::new().with_series("STP", generate_breakout_bars(140.0, 10, 135.0));
    let tickers = config.universe.symbols();
    let batch = provider.fetch_series(&tickers, "1y", "1d").unwrap();

    let (accepted, rejected) = Pipeline::new(&config).run(&tickers, batch);
    assert_eq!(accepted.len(), 1);
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].ticker, Symbol::new("GONE"));
}

// =============================================================================
// Provider Failure Tests
// =============================================================================

struct OfflineProvider;

impl OhlcvProvider for OfflineProvider {
    fn fetch_series(
        &self,
        _tickers: &[Symbol],
        _lookback: &str,
        _interval: &str,
    ) -> Result<SeriesBatch, DataError> {
        Err(DataError::NetworkUnreachable("connection refused".to_string()))
    }
}

#[test]
fn test_provider_failure_fails_scan() {
    let err = run_scan(&OfflineProvider, &Config::default(), session_time()).unwrap_err();
    assert_eq!(err.to_string(), "Failed to fetch market data");
    assert!(format!("{:#}", err).contains("connection refused"));
}
