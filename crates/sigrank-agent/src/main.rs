//! sigrank: multi-evidence gene signature ranking.
//! Entry point for the command-line binary.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sigrank_common::ConfigDocument;
use sigrank_ranker::pipeline::{run, RunOptions};

#[derive(Debug, Parser)]
#[command(name = "sigrank", version, about = "Score and select candidate genes from layered evidence")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "SIGRANK_CONFIG", default_value = "sigrank.yaml")]
    config: PathBuf,

    /// Label appended to the run id
    #[arg(long)]
    run_name: Option<String>,

    /// Reuse the run directory if it already exists
    #[arg(long)]
    overwrite: bool,

    /// Directory holding `runs/` and the `latest` pointer
    #[arg(long, default_value = "results")]
    output_root: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sigrank_ranker=debug,sigrank_ingestion=debug")),
        )
        .init();

    let args = Args::parse();
    info!(version = env!("CARGO_PKG_VERSION"), config = %args.config.display(), "sigrank starting");

    let doc = ConfigDocument::load(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    let opts = RunOptions {
        output_root: args.output_root,
        run_name: args.run_name,
        overwrite: args.overwrite,
    };

    match run(&doc, &opts).await {
        Ok(outcome) => {
            info!(
                run_id = %outcome.run_id,
                run_dir = %outcome.run_dir.display(),
                universe = outcome.universe_size,
                selected = outcome.selected.len(),
                "Done"
            );
            println!("{}", outcome.run_dir.display());
            Ok(())
        }
        Err(e) => {
            error!(error = %e, fatal = e.is_fatal(), "Scoring run failed");
            Err(e).context("scoring run failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["sigrank"]).unwrap();
        assert_eq!(args.output_root, PathBuf::from("results"));
        assert!(!args.overwrite);
        assert!(args.run_name.is_none());
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "sigrank", "-c", "pcd.yaml", "--run-name", "pilot", "--overwrite", "--output-root", "out",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("pcd.yaml"));
        assert_eq!(args.run_name.as_deref(), Some("pilot"));
        assert!(args.overwrite);
    }
}
