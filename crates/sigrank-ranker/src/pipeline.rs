//! End-to-end scoring run.
//!
//! 1. Validate config and compile synergy rules (no I/O yet)
//! 2. Hash the config document, create the run directory, snapshot the config
//! 3. Load every evidence source concurrently and join per gene
//! 4. Score, aggregate and rank
//! 5. Select the high-confidence subset
//! 6. Write outputs, then the manifest, then repoint `latest`

use std::path::PathBuf;

use tracing::{info, warn};

use sigrank_common::{ConfigDocument, GeneKey, Result};
use sigrank_ingestion::load_evidence;
use sigrank_runs::{config_hash, update_latest, ArtifactKind, ArtifactSpec, RunId, RunLayout, RunManifest};

use crate::aggregate::aggregate;
use crate::report::{write_all, OutputNames, ReportContext};
use crate::selection::select;
use crate::synergy::compile;
use crate::weights::{LayerCaps, ScoringWeights};

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Parent of `runs/`.
    pub output_root: PathBuf,
    /// Optional label appended to the run id.
    pub run_name: Option<String>,
    /// Reuse an existing run directory instead of failing on collision.
    pub overwrite: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { output_root: PathBuf::from("results"), run_name: None, overwrite: false }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub config_hash: String,
    pub universe_size: usize,
    /// High-confidence genes in rank order.
    pub selected: Vec<GeneKey>,
}

pub async fn run(doc: &ConfigDocument, opts: &RunOptions) -> Result<RunOutcome> {
    let config = &doc.config;
    config.validate()?;
    let rules = compile(&config.scoring.synergy_rules)?;
    let weights = ScoringWeights::from_config(&config.scoring.weights);
    let caps = LayerCaps::from_config(&config.scoring.caps);

    let hash = config_hash(&doc.value)?;
    let run_id = RunId::generate(&config.output_prefix, &hash, opts.run_name.as_deref());
    let layout = RunLayout::create(&opts.output_root, &run_id, opts.overwrite)?;
    let snapshot = layout.write_config_snapshot(&doc.value)?;
    info!(run_id = %layout.run_id, config_hash = %hash, rules = rules.len(), "Starting scoring run");

    let bundle = load_evidence(config).await?;
    let layers = bundle.reports();
    let genes = bundle.assemble(&config.evidence.domain.expected_domains);
    let universe_size = genes.len();
    let ranked = aggregate(genes, &weights, &caps, &rules);
    let selection = select(&ranked, &config.selection);

    let ctx = ReportContext {
        layout: &layout,
        names: OutputNames::new(&config.output_prefix),
        config_hash: &hash,
        layers: &layers,
    };
    let mut artifacts = vec![ArtifactSpec::new(snapshot, "Configuration used for this run", ArtifactKind::Document)];
    artifacts.extend(write_all(&ctx, &ranked, &selection)?);

    let manifest = RunManifest::build(&layout, &hash, &artifacts)?;
    let manifest_path = manifest.write(&layout)?;

    if let Err(e) = update_latest(&opts.output_root, &layout.run_dir) {
        warn!(error = %e, "Could not update latest-run pointer");
    }

    info!(
        run_id = %layout.run_id,
        universe = universe_size,
        selected = selection.selected.len(),
        threshold = selection.threshold,
        "Scoring run complete"
    );

    Ok(RunOutcome {
        run_id: layout.run_id.clone(),
        run_dir: layout.run_dir.clone(),
        manifest_path,
        config_hash: hash,
        universe_size,
        selected: selection.selected,
    })
}
