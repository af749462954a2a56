//! Intrinsic Batch CLI - Batch intrinsic image decomposition
//!
//! Decomposes every image of a list into reflectance and shading maps.

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::batch::BatchCommand;

#[derive(Parser)]
#[command(
    name = "intrinsic-batch",
    version,
    about = "Batch intrinsic image decomposition",
    long_about = "Split each image of a list into a reflectance map and a shading map.\n\
                  For an input P, writes P-without-extension plus -r.png (reflectance)\n\
                  and -s.png (shading) next to it. Images are processed in parallel on\n\
                  up to four worker threads.",
    after_help = "EXAMPLES:\n  \
                  # Decompose every image listed in list.txt with default parameters\n  \
                  intrinsic-batch -l list.txt\n\n  \
                  # Use solver parameters from a file (JSON, or YAML for .yaml/.yml)\n  \
                  intrinsic-batch -l list.txt -p params.json\n\n  \
                  # Machine-readable report\n  \
                  intrinsic-batch -l list.txt --format jsonl"
)]
struct Cli {
    #[command(flatten)]
    batch: BatchCommand,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // stdout is reserved for the JSONL report
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    cli.batch.execute()
}
