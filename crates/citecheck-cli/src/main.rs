mod check;
mod display;
mod eval;

use std::path::{Path, PathBuf};

use anyhow::Context;
use citecheck_core::Config;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "citecheck", version)]
#[command(about = "Extract, cluster and verify the case citations in a legal document")]
struct Cli {
    /// TOML config file. Defaults apply when absent.
    #[arg(long, global = true, env = "CITECHECK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, cluster and verify every citation in a document
    Check {
        file: PathBuf,
        /// Print the full result as JSON instead of cards
        #[arg(long)]
        json: bool,
        /// Query no external source; every cluster stays unverified
        #[arg(long)]
        offline: bool,
        /// CourtListener API token
        #[arg(long, env = "COURTLISTENER_API_KEY", hide_env_values = true)]
        token: Option<String>,
        /// Query CourtListener only, skipping the web fallbacks
        #[arg(long)]
        primary_only: bool,
    },

    /// List the citations and clusters read from a document, without verification
    Extract {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Score case-name and year extraction against a labelled corpus
    Eval {
        labels: PathBuf,
        #[arg(long)]
        json: bool,
        /// Fail when field accuracy falls below this
        #[arg(long, default_value_t = 0.95)]
        min_accuracy: f64,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    Ok(config.with_env())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries cards and JSON.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    tracing::info!("citecheck v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Check {
            file,
            json,
            offline,
            token,
            primary_only,
        } => {
            if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
                config.verify.courtlistener_token = Some(token);
            }
            config.verify.primary_only |= primary_only;

            let (result, stats) = check::run_check(&config, &file, offline).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                display::print_report(&result);
            }
            eprintln!(
                "  Checked {} citations in {} clusters ({} verified) in {:.1}s, cache {}/{} hits",
                result.citations.len(),
                result.clusters.len(),
                result.verified_count(),
                stats.elapsed_secs,
                stats.cache_hits,
                stats.cache_hits + stats.cache_misses,
            );
        }
        Command::Extract { file, json } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            citecheck_pipeline::check_document(&text)?;
            let result = citecheck_pipeline::Pipeline::offline(&config).extract_and_cluster(&text);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                display::print_citations(&result);
            }
        }
        Command::Eval {
            labels,
            json,
            min_accuracy,
        } => {
            let report = eval::run_eval(&config, &labels)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                eval::print_report(&report);
            }
            if report.accuracy() < min_accuracy {
                anyhow::bail!(
                    "accuracy {:.1}% is below the {:.1}% floor",
                    report.accuracy() * 100.0,
                    min_accuracy * 100.0
                );
            }
        }
    }
    Ok(())
}
