//! Subcommand implementations

pub mod download;
pub mod history;
pub mod scan;

use anyhow::Result;
use momentum_screener::config::ProviderKind;
use momentum_screener::data::{CsvProvider, OhlcvProvider, YahooProvider};
use momentum_screener::Config;
use tracing::info;

/// Load the config file (or defaults) and apply CLI overrides
pub fn load_config(config_path: &str, provider_override: Option<String>) -> Result<Config> {
    let mut config = Config::load_or_default(config_path)?;
    info!("Loaded configuration from: {}", config_path);

    if let Some(provider) = provider_override {
        let kind: ProviderKind = provider.parse().map_err(anyhow::Error::msg)?;
        info!("Overriding provider to: {}", kind);
        config.data.provider = kind;
    }
    Ok(config)
}

pub fn build_provider(config: &Config) -> Result<Box<dyn OhlcvProvider>> {
    let provider: Box<dyn OhlcvProvider> = match config.data.provider {
        ProviderKind::Yahoo => Box::new(YahooProvider::new(config.data.request_delay_ms)?),
        ProviderKind::Csv => {
            info!("Loading data from: {}", config.data.data_dir);
            Box::new(CsvProvider::new(&config.data.data_dir))
        }
    };
    Ok(provider)
}
