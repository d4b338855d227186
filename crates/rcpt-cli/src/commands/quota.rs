//! Quota command - show or adjust the monthly cloud OCR budget.

use clap::{Args, Subcommand};
use console::style;

use rcpt_core::quota::QuotaState;

use super::{load_config, quota_tracker};

/// Arguments for the quota command.
#[derive(Args)]
pub struct QuotaArgs {
    #[command(subcommand)]
    command: QuotaCommand,
}

#[derive(Subcommand)]
enum QuotaCommand {
    /// Show usage for a period
    Status {
        /// Period as YYYY-MM (default: current month)
        #[arg(long)]
        period: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Set the remaining calls for a period, e.g. after checking the
    /// provider's own console
    SetRemaining {
        /// Remaining calls, clamped to the monthly limit
        value: u32,

        /// Period as YYYY-MM (default: current month)
        #[arg(long)]
        period: Option<String>,
    },
}

pub fn run(args: QuotaArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let tracker = quota_tracker(&config);

    match args.command {
        QuotaCommand::Status { period, json } => {
            let state = tracker.status(period.as_deref());
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print_state(&state);
            }
        }
        QuotaCommand::SetRemaining { value, period } => {
            let state = tracker.set_remaining(value, period.as_deref());
            if state.is_unlimited() {
                println!(
                    "{} Quota is unlimited (monthly_limit = 0), nothing to set.",
                    style("ℹ").blue()
                );
            } else {
                println!("{} Quota updated.", style("✓").green());
            }
            print_state(&state);
        }
    }

    Ok(())
}

fn print_state(state: &QuotaState) {
    println!("Period:    {}", state.period);
    match state.remaining {
        None => println!("Used:      {} (unlimited)", state.used),
        Some(remaining) => {
            println!("Used:      {}/{}", state.used, state.limit);
            let remaining = if state.is_exhausted() {
                style(remaining.to_string()).red()
            } else {
                style(remaining.to_string()).green()
            };
            println!("Remaining: {}", remaining);
        }
    }
}
