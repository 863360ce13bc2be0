use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use md2notion::upload::{ApiCall, JsonFileLog, MemoryApi, MemoryLog, Uploader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "md2notion")]
#[command(about = "Convert Markdown files to Notion blocks")]
struct Cli {
    /// Config file (defaults are used when it does not exist)
    #[arg(short, long, default_value = "md2notion.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the blocks for a Markdown file as JSON
    Convert {
        /// Input Markdown file
        input: PathBuf,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show how many requests a Markdown file needs
    Batches {
        /// Input Markdown file
        input: PathBuf,
    },
    /// Dry-run a folder upload and list the pages it would create
    Plan {
        /// Folder of Markdown files
        dir: PathBuf,

        /// Page the folder is uploaded under
        #[arg(long, default_value = "root")]
        parent: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = md2notion::Config::load_from_path(&cli.config)?;

    match cli.command {
        Command::Convert {
            input,
            pretty,
            output,
        } => {
            let bytes = fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
            let blocks = md2notion::transform_bytes(&bytes)?;
            let json = if pretty {
                serde_json::to_string_pretty(&blocks)?
            } else {
                serde_json::to_string(&blocks)?
            };

            match output {
                Some(output) => {
                    fs::write(&output, json)
                        .with_context(|| format!("writing {}", output.display()))?;
                    eprintln!("Created {}", output.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Batches { input } => {
            let bytes = fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
            let batches =
                md2notion::bytes_to_batches(&bytes, config.upload.effective_batch_size())?;
            let total: usize = batches.iter().map(Vec::len).sum();
            println!("{} blocks in {} request(s)", total, batches.len());
        }
        Command::Plan { dir, parent } => {
            let existing = JsonFileLog::open(&config.upload.log_file, &config.upload.error_file)?;
            let log = MemoryLog {
                records: existing.records().clone(),
                errors: existing.errors().clone(),
            };
            let mut uploader = Uploader::new(MemoryApi::new(), log, config.upload.clone());
            let summary = uploader.upload_folder(&dir, &parent)?;

            for call in &uploader.api().calls {
                match call {
                    ApiCall::CreatePage {
                        parent_id,
                        title,
                        children,
                        ..
                    } => println!("create {title:?} under {parent_id} ({children} blocks)"),
                    ApiCall::AppendChildren { block_id, children } => {
                        println!("append {children} blocks to {block_id}")
                    }
                }
            }
            println!(
                "{} to upload, {} skipped, {} failed",
                summary.uploaded, summary.skipped, summary.failed
            );
        }
    }

    Ok(())
}
