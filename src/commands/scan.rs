//! Scan command implementation

use anyhow::Result;
use chrono::Utc;
use momentum_screener::{run_scan, ScanReport, SignalStatus};
use tracing::info;

pub fn run(
    config_path: String,
    provider_override: Option<String>,
    data_dir_override: Option<String>,
    json: bool,
) -> Result<()> {
    info!("Starting scan");

    let mut config = super::load_config(&config_path, provider_override)?;
    if let Some(data_dir) = data_dir_override {
        info!("Overriding data directory to: {}", data_dir);
        config.data.data_dir = data_dir;
    }

    let provider = super::build_provider(&config)?;
    let report = run_scan(provider.as_ref(), &config, Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    info!("Scan completed successfully");
    Ok(())
}

fn print_report(report: &ScanReport) {
    println!("\n{}", "=".repeat(96));
    println!(
        "MOMENTUM BREAKOUT SCAN  |  market {}  |  {} tickers",
        report.status, report.universe_size
    );
    println!("{}", "=".repeat(96));

    for status in [SignalStatus::Buy, SignalStatus::Setup] {
        let entries: Vec<_> = report.accepted.iter().filter(|e| e.status == status).collect();
        if entries.is_empty() {
            continue;
        }
        println!("\n{} ({})", status, entries.len());
        println!(
            "{:<8} {:>10} {:>10} {:>10} {:>6} {:>10} {:>16} {:>8} {:>12}",
            "Ticker", "Price", "Pivot", "Stop", "Days", "Drawdown", "Stop Note", "Shares", "Value"
        );
        println!("{}", "-".repeat(96));
        for entry in entries {
            let signal = &entry.signal_details;
            let Some(exec) = &entry.execution else {
                continue;
            };
            println!(
                "{:<8} {:>10} {:>10.2} {:>10} {:>6} {:>9.1}% {:>16} {:>8} {:>12}",
                entry.ticker,
                entry.price,
                signal.signal_price.unwrap_or_default(),
                exec.stop_price,
                signal.days_since_peak.unwrap_or_default(),
                signal.drawdown.unwrap_or_default() * 100.0,
                exec.stop_note.to_string(),
                exec.shares,
                exec.position_value
            );
        }
    }

    let waiting: Vec<_> = report
        .accepted
        .iter()
        .filter(|e| e.status == SignalStatus::Wait)
        .collect();
    if !waiting.is_empty() {
        println!("\nWAIT ({})", waiting.len());
        for entry in waiting {
            println!(
                "  {:<8} {:>10}  {}",
                entry.ticker,
                entry.price,
                entry.signal_details.reason.as_deref().unwrap_or("Below setup zone")
            );
        }
    }

    if !report.rejected.is_empty() {
        println!("\nREJECTED ({})", report.rejected.len());
        for rejection in &report.rejected {
            println!("  {:<8} {}", rejection.ticker, rejection.reason);
        }
    }
    println!("{}", "=".repeat(96));
}
