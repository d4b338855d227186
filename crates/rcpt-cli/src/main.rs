//! CLI application for receipt OCR suggestions.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::{config, memory, quota, suggest};

/// Receipt OCR - suggest date, vendor, location and total for a receipt
#[derive(Parser)]
#[command(name = "rcpt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Suggest fields for a receipt image or PDF
    Suggest(suggest::SuggestArgs),

    /// Show or adjust the monthly cloud OCR quota
    Quota(quota::QuotaArgs),

    /// Inspect the vendor memory
    Memory(memory::MemoryArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // RUST_LOG, when set, overrides the -v count
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Suggest(args) => suggest::run(args, config_path).await,
        Commands::Quota(args) => quota::run(args, config_path),
        Commands::Memory(args) => memory::run(args, config_path),
        Commands::Config(args) => config::run(args, config_path),
    }
}
