use std::{
    fs::File,
    io::{self, BufReader, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tfidf_pipeline::{DocumentScores, FailurePolicy, PipelineConfig, ScoreMatrix, TfIdfPipeline};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    Isolate,
    FailFast,
}

impl From<Policy> for FailurePolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Isolate => FailurePolicy::Isolate,
            Policy::FailFast => FailurePolicy::FailFast,
        }
    }
}

#[derive(Parser)]
#[command(name = "tfidf", version, about = "Concurrent TF-IDF scores for a blank-line delimited corpus")]
struct Cli {
    /// Input text file, documents separated by blank lines
    input: PathBuf,
    /// Worker threads (default: available parallelism)
    #[arg(long)]
    threads: Option<usize>,
    /// Upper bound in seconds for each phase to finish
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
    /// What a failed task does to the run
    #[arg(long, value_enum, default_value = "isolate")]
    policy: Policy,
    /// Terms printed per document
    #[arg(long, default_value_t = 10)]
    top: usize,
    /// Print only the first N documents (0 = all)
    #[arg(long, default_value_t = 1)]
    documents: usize,
    /// Print the whole score matrix as JSON instead
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = PipelineConfig::new()
        .with_phase_timeout(Duration::from_secs(cli.timeout_secs))
        .with_failure_policy(cli.policy.into());
    if let Some(threads) = cli.threads {
        config = config.with_threads(threads);
    }

    let file = File::open(&cli.input).with_context(|| format!("failed to open {}", cli.input.display()))?;
    let pipeline = TfIdfPipeline::new(config);
    let matrix = pipeline
        .run_reader(BufReader::new(file))
        .with_context(|| format!("failed to score {}", cli.input.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        serde_json::to_writer(&mut out, &matrix)?;
        writeln!(out)?;
    } else {
        print_top_terms(&mut out, &matrix, cli.top, cli.documents)?;
    }
    Ok(())
}

fn print_top_terms<W: Write>(out: &mut W, matrix: &ScoreMatrix, top: usize, documents: usize) -> io::Result<()> {
    if matrix.is_empty() {
        writeln!(out, "no documents")?;
        return Ok(());
    }
    let limit = if documents == 0 { matrix.len() } else { documents.min(matrix.len()) };
    for (index, row) in matrix.iter().take(limit).enumerate() {
        writeln!(out, "document {}", index + 1)?;
        match row {
            DocumentScores::Scored(scores) if scores.is_empty() => writeln!(out, "  (no significant terms)")?,
            DocumentScores::Scored(scores) => {
                for (term, score) in scores.top_n(top) {
                    writeln!(out, "  {term:<24} {score:.4}")?;
                }
            }
            DocumentScores::Failed(reason) => writeln!(out, "  failed: {reason}")?,
        }
    }
    Ok(())
}
