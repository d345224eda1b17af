//! Momentum screener - main entry point
//!
//! This binary provides three subcommands:
//! - scan: Run the breakout screen over the configured universe
//! - history: Print one ticker's bars with the trend SMA
//! - download: Save the universe's daily bars from Yahoo as CSV

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "momentum-screener")]
#[command(about = "Riser / Tread / Breakout screener for US equities", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Screen the universe for breakout candidates
    Scan {
        /// Path to configuration file (defaults apply when missing)
        #[arg(short, long, default_value = "configs/screener.json")]
        config: String,

        /// Data provider: yahoo or csv (overrides config file)
        #[arg(short, long)]
        provider: Option<String>,

        /// CSV data directory (overrides config file)
        #[arg(long)]
        data_dir: Option<String>,

        /// Print the report as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Show price history with the trend SMA for one ticker
    History {
        /// Ticker symbol. E.g., "AAPL"
        ticker: String,

        /// Path to configuration file (defaults apply when missing)
        #[arg(short, long, default_value = "configs/screener.json")]
        config: String,

        /// Data provider: yahoo or csv (overrides config file)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Download daily bars for the universe from Yahoo
    Download {
        /// Path to configuration file (defaults apply when missing)
        #[arg(short, long, default_value = "configs/screener.json")]
        config: String,

        /// Tickers to download (comma-separated, overrides the universe). E.g., "AAPL,MSFT"
        #[arg(short, long)]
        tickers: Option<String>,

        /// Output directory (overrides config data_dir)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy HTTP crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    // Reports go to stdout, so the console layer writes to stderr
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Scan { .. } => "scan",
        Commands::History { .. } => "history",
        Commands::Download { .. } => "download",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Scan {
            config,
            provider,
            data_dir,
            json,
        } => commands::scan::run(config, provider, data_dir, json),

        Commands::History {
            ticker,
            config,
            provider,
        } => commands::history::run(ticker, config, provider),

        Commands::Download {
            config,
            tickers,
            output,
        } => commands::download::run(config, tickers, output),
    }
}
