//! Memory command - inspect remembered vendors.

use clap::{Args, Subcommand};
use console::style;

use rcpt_core::memory::{JsonVendorStore, VendorMemory, VendorStore};

use super::load_config;

/// Arguments for the memory command.
#[derive(Args)]
pub struct MemoryArgs {
    #[command(subcommand)]
    command: MemoryCommand,
}

#[derive(Subcommand)]
enum MemoryCommand {
    /// List remembered vendors, most frequent first
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show which remembered vendor a text would match
    Match {
        /// Text to match (e.g. OCR output)
        text: String,
    },
}

pub fn run(args: MemoryArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = JsonVendorStore::new(config.storage.vendors_path());
    let memory = VendorMemory::new(store.load_all()?);

    match args.command {
        MemoryCommand::List { json } => {
            let mut entries = memory.entries().to_vec();
            entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("{} No vendors remembered yet.", style("ℹ").blue());
                return Ok(());
            }

            for entry in &entries {
                println!("{:>4}  {}", entry.count, style(&entry.name).bold());
                for domain in &entry.domains {
                    println!("      {}", domain);
                }
                for line in &entry.address_lines {
                    println!("      {}", line);
                }
            }
        }
        MemoryCommand::Match { text } => match memory.find_match(&text) {
            Some(found) => println!(
                "{} {} (score {})",
                style("✓").green(),
                found.name,
                found.score
            ),
            None => println!("{} No confident match.", style("✗").red()),
        },
    }

    Ok(())
}
