//! Download command - save Yahoo daily bars as CSV for the csv provider

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use momentum_screener::data::{csv_filename, save_csv, YahooProvider};
use momentum_screener::Symbol;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;
use tracing::{info, warn};

pub fn run(config_path: String, tickers: Option<String>, output: Option<String>) -> Result<()> {
    info!("Starting data download from Yahoo");

    let config = super::load_config(&config_path, None)?;
    let symbols: Vec<Symbol> = match tickers {
        Some(list) => list
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| Symbol::new(s.to_uppercase()))
            .collect(),
        None => config.universe.symbols(),
    };
    let output = PathBuf::from(output.unwrap_or_else(|| config.data.data_dir.clone()));
    std::fs::create_dir_all(&output)?;

    println!("\n{}", "=".repeat(60));
    println!("DOWNLOADING HISTORICAL DATA FROM YAHOO");
    println!("{}", "=".repeat(60));
    println!("  Tickers:  {}", symbols.len());
    println!("  Lookback: {}", config.data.lookback);
    println!("  Interval: {}", config.data.interval);
    println!("  Output:   {}", output.display());
    println!("{}\n", "=".repeat(60));

    let provider = YahooProvider::new(config.data.request_delay_ms)?;
    let delay = Duration::from_millis(config.data.request_delay_ms);

    let pb = ProgressBar::new(symbols.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner} {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}] {msg}")?
            .progress_chars("█░ "),
    );

    let mut total_bars = 0;
    let mut failures = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        if i > 0 {
            sleep(delay);
        }
        pb.set_message(symbol.to_string());

        let path = output.join(csv_filename(symbol, &config.data.interval));
        match provider
            .fetch_one(symbol, &config.data.lookback, &config.data.interval)
            .and_then(|bars| save_csv(&bars, &path).map(|_| bars.len()))
        {
            Ok(count) => {
                total_bars += count;
                info!("Saved {} bars for {} to {}", count, symbol, path.display());
            }
            Err(e) => {
                warn!("Download failed for {}: {}", symbol, e);
                failures.push((symbol.clone(), e.to_string()));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    println!("\n{}", "=".repeat(60));
    println!(
        "Downloaded {}/{} tickers, {} bars",
        symbols.len() - failures.len(),
        symbols.len(),
        total_bars
    );
    for (symbol, error) in &failures {
        println!("  ✗ {}: {}", symbol, error);
    }
    println!("{}", "=".repeat(60));

    if !symbols.is_empty() && failures.len() == symbols.len() {
        anyhow::bail!("Every download failed");
    }
    Ok(())
}
