//! Batch command - decompose every image of a list

use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use intrinsic_core::{
    enumerate_jobs, log_result, result_json, run_batch, BatchReport, ImagePipeline,
    ProgressTracker, RetinexSolver, SolverParameters, WorkerPool,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Final report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Per-image log lines and a colored summary
    Text,
    /// One JSON object per image as it completes, then a summary object, on stdout
    Jsonl,
}

#[derive(Args)]
pub struct BatchCommand {
    /// File listing input images, separated by whitespace
    #[arg(short = 'l', long = "image_list", value_name = "FILE")]
    image_list: PathBuf,

    /// Solver parameters file (JSON, or YAML for .yaml/.yml); defaults otherwise
    #[arg(short = 'p', long = "parameters_file", value_name = "FILE")]
    parameters_file: Option<PathBuf>,

    /// Output format: text (default) or jsonl (JSON lines)
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl BatchCommand {
    pub fn execute(self) -> Result<()> {
        info!("=== Intrinsic Batch ===");

        let params = SolverParameters::resolve(self.parameters_file.as_deref())
            .context("Failed to load solver parameters")?;

        let jobs = enumerate_jobs(&self.image_list).with_context(|| {
            format!("Failed to enumerate jobs from {}", self.image_list.display())
        })?;

        let pool = WorkerPool::new();
        let solver = Arc::new(RetinexSolver::new());
        let pipeline = Arc::new(ImagePipeline::new(solver, params));
        info!(
            "Solver: {} ({} iterations)",
            pipeline.solver_name(),
            pipeline.params().n_iters
        );

        // Progress goes to stderr in both formats; stdout carries only JSON
        let jsonl = self.format == OutputFormat::Jsonl;
        let mut tracker = ProgressTracker::new(jobs.len());

        let report = run_batch(&pool, jobs, pipeline, &mut tracker, |result, progress| {
            log_result(result, progress);
            if jsonl {
                println!("{}", result_json(result));
            }
        })
        .context("Failed to start batch execution")?;

        match self.format {
            OutputFormat::Text => print_summary(&report),
            OutputFormat::Jsonl => println!("{}", report.summary_json()),
        }

        // Per-image failures are reported, not fatal
        Ok(())
    }
}

fn print_summary(report: &BatchReport) {
    let succeeded = report.succeeded().len();
    let failed = report.failed().len();

    eprintln!("\n{}", "=== Batch Decomposition Summary ===".bold());
    eprintln!("{:<16} {}", "Total files:", report.total().to_string().cyan());
    eprintln!("{:<16} {}", "Succeeded:", succeeded.to_string().green());
    eprintln!(
        "{:<16} {}",
        "Failed:",
        if failed > 0 {
            failed.to_string().red()
        } else {
            failed.to_string().normal()
        }
    );
    eprintln!(
        "{:<16} {:.2}s",
        "Total time:",
        report.elapsed().as_secs_f64()
    );
    eprintln!(
        "{:<16} {:.2} files/sec",
        "Throughput:",
        report.throughput()
    );

    if failed > 0 {
        eprintln!("\n{}", "Failed files:".red().bold());
        for job in report.failed() {
            eprintln!(
                "  {} {} ({}): {}",
                "✗".red().bold(),
                job.job.input.display(),
                job.kind,
                job.error
            );
        }
    }
}
