//! Suggest command - extract receipt fields from a single file.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use rcpt_core::models::receipt::{ExtractionMode, RequestToken};
use rcpt_core::pipeline::{Pipeline, PipelineBuilder, PipelineResult, RunOutcome, StatusSink};

use super::load_config;

/// Arguments for the suggest command.
#[derive(Args)]
pub struct SuggestArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Provider mode
    #[arg(short, long, value_enum, default_value = "auto")]
    mode: Mode,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Remember the suggested vendor for future receipts
    #[arg(long)]
    accept: bool,

    /// Hide the progress spinner
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Mode {
    /// PDF text layer, then cloud OCR, then local OCR
    Auto,
    /// Never call the cloud service
    ForceLocal,
    /// Cloud OCR only
    ForceCloud,
}

impl From<Mode> for ExtractionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Auto => ExtractionMode::Auto,
            Mode::ForceLocal => ExtractionMode::ForceLocal,
            Mode::ForceCloud => ExtractionMode::ForceCloud,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

/// Renders pipeline status on a progress bar.
struct ProgressStatus {
    bar: ProgressBar,
}

impl StatusSink for ProgressStatus {
    fn status(&self, token: RequestToken, message: &str) {
        debug!("[{}] {}", token, message);
        self.bar.set_message(message.to_string());
    }

    fn progress(&self, _token: RequestToken, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }
}

fn progress_bar(quiet: bool) -> anyhow::Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

pub async fn run(args: SuggestArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    info!("Suggesting fields for {}", args.input.display());

    let status = Arc::new(ProgressStatus {
        bar: progress_bar(args.quiet)?,
    });
    let pipeline = PipelineBuilder::from_config(config)?
        .status(status.clone())
        .build();

    let outcome = pipeline.suggest(&args.input, args.mode.into()).await;
    status.bar.finish_and_clear();

    if args.accept {
        accept_vendor(&pipeline, &outcome).await?;
    }

    let output = format_outcome(&outcome, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    match outcome {
        RunOutcome::Failed { blocker, .. } => anyhow::bail!("No suggestion: {}", blocker),
        _ => Ok(()),
    }
}

async fn accept_vendor(pipeline: &Pipeline, outcome: &RunOutcome) -> anyhow::Result<()> {
    let Some(result) = outcome.completed() else {
        return Ok(());
    };
    let Some(vendor) = result.suggestion.as_ref().and_then(|s| s.vendor.as_deref()) else {
        eprintln!("{} No vendor to remember.", style("ℹ").blue());
        return Ok(());
    };

    if let Some(entry) = pipeline.confirm_vendor(&result.text, vendor).await? {
        eprintln!(
            "{} Remembered {} (seen {} times)",
            style("✓").green(),
            entry.name,
            entry.count
        );
    }
    Ok(())
}

fn format_outcome(outcome: &RunOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Csv => format_csv(outcome),
        OutputFormat::Text => Ok(format_text(outcome)),
    }
}

fn format_csv(outcome: &RunOutcome) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["date", "vendor", "location", "total", "category", "provider"])?;

    if let Some(result) = outcome.completed() {
        let suggestion = result.suggestion.as_ref();
        wtr.write_record([
            suggestion.and_then(|s| s.date_string()).unwrap_or_default(),
            suggestion.and_then(|s| s.vendor.clone()).unwrap_or_default(),
            suggestion.and_then(|s| s.location.clone()).unwrap_or_default(),
            suggestion
                .and_then(|s| s.total)
                .map(|t| t.to_string())
                .unwrap_or_default(),
            result.category.clone(),
            result.decision.provider.to_string(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Completed(result) => format_result(result),
        RunOutcome::Failed {
            blocker, attempts, ..
        } => {
            let mut output = format!("No suggestion: {}\n", blocker);
            for attempt in attempts {
                if let Some(error) = &attempt.error {
                    output.push_str(&format!("  {}: {}\n", attempt.provider, error));
                }
            }
            output
        }
        RunOutcome::Superseded { token } => format!("Request {} was superseded\n", token),
    }
}

fn format_result(result: &PipelineResult) -> String {
    let mut output = String::new();
    let field = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    let suggestion = result.suggestion.as_ref();

    output.push_str(&format!("Date:     {}\n", field(suggestion.and_then(|s| s.date_string()))));
    output.push_str(&format!("Vendor:   {}\n", field(suggestion.and_then(|s| s.vendor.clone()))));
    output.push_str(&format!("Location: {}\n", field(suggestion.and_then(|s| s.location.clone()))));
    output.push_str(&format!(
        "Total:    {}\n",
        field(suggestion.and_then(|s| s.total).map(|t| t.to_string()))
    ));
    if !result.category.is_empty() {
        output.push_str(&format!("Category: {}\n", result.category));
    }
    output.push('\n');
    output.push_str(&format!(
        "Provider: {} ({})\n",
        result.decision.provider, result.decision.reason
    ));
    if let Some(quota) = &result.quota {
        if let Some(remaining) = quota.remaining {
            output.push_str(&format!("Cloud quota remaining: {}\n", remaining));
        }
    }

    output
}
