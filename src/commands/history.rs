//! History command implementation

use anyhow::Result;
use momentum_screener::history::fetch_history;
use momentum_screener::Symbol;
use tracing::info;

pub fn run(ticker: String, config_path: String, provider_override: Option<String>) -> Result<()> {
    let config = super::load_config(&config_path, provider_override)?;
    let provider = super::build_provider(&config)?;

    let symbol = Symbol::new(ticker.trim().to_uppercase());
    let rows = fetch_history(
        provider.as_ref(),
        &symbol,
        &config.data.lookback,
        &config.data.interval,
        config.filter.sma_period,
    )?;

    info!("{} rows for {}", rows.len(), symbol);
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
