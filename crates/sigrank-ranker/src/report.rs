//! Output tables and summaries of a run, written under `<run>/outputs/`.
//!
//! Every writer returns the [`ArtifactSpec`] it produced so the pipeline can
//! register it in the manifest. Tables are tab-separated with a header row;
//! scores use the shortest round-trip float formatting.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use sigrank_common::entities::OrthologyClass;
use sigrank_common::{GeneEvidence, LayerKind, Result, SelectionMode};
use sigrank_ingestion::LayerReport;
use sigrank_runs::{ArtifactKind, ArtifactSpec, RunLayout};

use crate::aggregate::ScoredGene;
use crate::selection::{ScoreSummary, SelectionResult};

pub const DESCRIPTION_MAX_CHARS: usize = 200;
pub const OVERVIEW_CONTEXT_TERMS: usize = 5;

const SCORED_COLUMNS: &[&str] = &[
    "gene_id",
    "go_terms",
    "go_score_raw",
    "go_score",
    "domain_hits",
    "domain_score_raw",
    "domain_score",
    "best_ortholog_id",
    "best_orth_score",
    "orth_class",
    "orth_score_raw",
    "orth_score",
    "curated_symbol",
    "curated_description",
    "keyword_hits",
    "keyword_score_raw",
    "keyword_score",
    "context_hits",
    "context_score_raw",
    "context_score",
    "synergy_bonus_raw",
    "synergy_bonus",
    "synergy_triggers",
    "total_score",
];

const OVERVIEW_COLUMNS: &[&str] = &[
    "gene_id",
    "category",
    "total_score",
    "go_score",
    "domain_score",
    "orth_score",
    "keyword_score",
    "context_score",
    "synergy_bonus",
    "go_terms",
    "domain_hits",
    "best_ortholog_id",
    "orth_class",
    "ortholog_hits",
    "curated_symbol",
    "curated_description",
    "keyword_hits",
    "context_terms",
    "synergy_triggers",
    "evidence_summary",
];

// ── File names ───────────────────────────────────────────────────────────────

/// Output file names for a configured prefix.
#[derive(Debug, Clone)]
pub struct OutputNames {
    prefix: String,
}

impl OutputNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn base(&self) -> String {
        format!("{}_genes.base.txt", self.prefix)
    }
    pub fn scored(&self) -> String {
        format!("{}_genes.scored.tsv", self.prefix)
    }
    pub fn all_overview(&self) -> String {
        format!("{}_genes.ALL_overview.tsv", self.prefix)
    }
    pub fn high_overview(&self) -> String {
        format!("{}_genes.HIGH_overview.tsv", self.prefix)
    }
    pub fn high_confidence(&self) -> String {
        format!("{}_genes.high_confidence.txt", self.prefix)
    }
    pub fn high_confidence_summary(&self) -> String {
        format!("{}_genes.high_confidence.summary.txt", self.prefix)
    }
    pub fn high_category(&self) -> String {
        format!("{}_genes.HIGH_category.tsv", self.prefix)
    }
    pub fn run_summary(&self) -> String {
        format!("{}_run_summary.json", self.prefix)
    }
}

// ── Cell formatting ──────────────────────────────────────────────────────────

fn join<I, S>(items: I, sep: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        out.push_str(item.as_ref());
    }
    out
}

/// Flatten whitespace and cut to `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").chars().take(max).collect()
}

fn domain_hits(ev: &GeneEvidence) -> String {
    ev.domain
        .as_ref()
        .map(|d| join(d.hits.iter().map(|h| h.label()), ";"))
        .unwrap_or_default()
}

fn ortholog_hits(ev: &GeneEvidence) -> String {
    ev.orthology
        .as_ref()
        .map(|o| join(o.hits.iter().map(|h| format!("{}({})", h.locus, h.confidence)), ";"))
        .unwrap_or_default()
}

fn curated_fields(ev: &GeneEvidence) -> (String, String, String) {
    match &ev.curated {
        Some(c) => (
            c.symbol.clone(),
            truncate_chars(&c.description, DESCRIPTION_MAX_CHARS),
            join(&c.keyword_hits, ";"),
        ),
        None => Default::default(),
    }
}

/// Short human-readable account of which layers contributed.
pub fn evidence_summary(ev: &GeneEvidence) -> String {
    let mut parts = Vec::new();
    if !ev.ontology.categories.is_empty() {
        parts.push(format!("{}_GO", join(&ev.ontology.categories, "+")));
    }
    if ev.has_domain_match() {
        parts.push("Domain".to_string());
    }
    if ev.keyword_hit_count() > 0 {
        parts.push("Keywords".to_string());
    }
    match (ev.orthology_class(), ev.best_ortholog()) {
        (OrthologyClass::OneToOne, Some(best)) => parts.push(format!("1:1_{}", best.locus)),
        (OrthologyClass::OneToMany, _) => parts.push("1:many_ortho".to_string()),
        _ => {}
    }
    if ev.has_context_hit() {
        parts.push("Context".to_string());
    }
    if parts.is_empty() {
        "GO_only".to_string()
    } else {
        parts.join("; ")
    }
}

fn scored_row(g: &ScoredGene) -> Vec<String> {
    let ev = &g.evidence;
    let s = |layer: LayerKind| g.layer(layer);
    let best = ev.best_ortholog();
    let (symbol, description, keywords) = curated_fields(ev);
    vec![
        g.gene.to_string(),
        join(&ev.ontology.terms, ";"),
        s(LayerKind::Ontology).raw.to_string(),
        s(LayerKind::Ontology).capped.to_string(),
        domain_hits(ev),
        s(LayerKind::Domain).raw.to_string(),
        s(LayerKind::Domain).capped.to_string(),
        best.map(|h| h.locus.to_string()).unwrap_or_default(),
        best.map(|h| h.confidence.to_string()).unwrap_or_default(),
        ev.orthology_class().to_string(),
        s(LayerKind::Orthology).raw.to_string(),
        s(LayerKind::Orthology).capped.to_string(),
        symbol,
        description,
        keywords,
        s(LayerKind::Curated).raw.to_string(),
        s(LayerKind::Curated).capped.to_string(),
        ev.context.as_ref().map(|c| join(&c.stage_hits, ";")).unwrap_or_default(),
        s(LayerKind::Context).raw.to_string(),
        s(LayerKind::Context).capped.to_string(),
        g.synergy.bonus_raw.to_string(),
        g.synergy.bonus_capped.to_string(),
        join(&g.synergy.triggered_rules, ";"),
        g.total.to_string(),
    ]
}

fn overview_row(g: &ScoredGene) -> Vec<String> {
    let ev = &g.evidence;
    let capped = |layer: LayerKind| g.layer(layer).capped.to_string();
    let (symbol, description, keywords) = curated_fields(ev);
    vec![
        g.gene.to_string(),
        ev.ontology.category_label(),
        g.total.to_string(),
        capped(LayerKind::Ontology),
        capped(LayerKind::Domain),
        capped(LayerKind::Orthology),
        capped(LayerKind::Curated),
        capped(LayerKind::Context),
        g.synergy.bonus_capped.to_string(),
        join(&ev.ontology.terms, ";"),
        domain_hits(ev),
        ev.best_ortholog().map(|h| h.locus.to_string()).unwrap_or_default(),
        ev.orthology_class().to_string(),
        ortholog_hits(ev),
        symbol,
        description,
        keywords,
        ev.context
            .as_ref()
            .map(|c| join(c.terms.iter().take(OVERVIEW_CONTEXT_TERMS), ";"))
            .unwrap_or_default(),
        join(&g.synergy.triggered_rules, ";"),
        evidence_summary(ev),
    ]
}

// ── Writers ──────────────────────────────────────────────────────────────────

fn tsv_writer(path: &Path) -> Result<csv::Writer<File>> {
    Ok(csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?)
}

fn write_table<I>(path: &Path, header: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut wtr = tsv_writer(path)?;
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_list<'a, I>(path: &Path, ids: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for id in ids {
        out.push_str(id);
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}

/// Plain-text account of the selection.
pub fn selection_summary_text(selection: &SelectionResult) -> String {
    let method = match selection.method {
        SelectionMode::Quantile => format!("quantile (q={})", selection.quantile.unwrap_or_default()),
        SelectionMode::Knee => match selection.knee_index {
            Some(i) => format!("knee (index={i})"),
            None => "knee (no knee; bounded by gene limits)".to_string(),
        },
    };
    let s = &selection.summary;
    let mut out = String::new();
    let _ = writeln!(out, "HIGH-CONFIDENCE GENE SELECTION");
    let _ = writeln!(out, "==============================");
    let _ = writeln!(out, "Method: {method}");
    let _ = writeln!(out, "Threshold: {}", selection.threshold);
    if selection.tied_at_cutoff > 0 {
        let _ = writeln!(
            out,
            "Tied at threshold but not selected: {} (knee mode cuts by rank)",
            selection.tied_at_cutoff
        );
    }
    let _ = writeln!(
        out,
        "Selected: {} of {} genes ({:.1}%)",
        selection.selected.len(),
        selection.total,
        selection.percentage()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Score distribution:");
    let _ = writeln!(out, "  min: {}", s.min);
    let _ = writeln!(out, "  max: {}", s.max);
    let _ = writeln!(out, "  mean: {:.3}", s.mean);
    let _ = writeln!(out, "  median: {}", s.median);
    out
}

#[derive(Debug, Serialize)]
struct SelectionReport<'a> {
    method: SelectionMode,
    threshold: f64,
    selected: usize,
    total: usize,
    percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantile: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    knee_index: Option<usize>,
    tied_at_cutoff: usize,
    scores: &'a ScoreSummary,
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    run_id: &'a str,
    config_hash: &'a str,
    universe_size: usize,
    layers: &'a [LayerReport],
    /// Genes whose raw score exceeded the cap, per layer plus `synergy`
    cap_hits: BTreeMap<String, usize>,
    selection: SelectionReport<'a>,
}

fn cap_hits(ranked: &[ScoredGene]) -> BTreeMap<String, usize> {
    let mut hits: BTreeMap<String, usize> = LayerKind::ALL
        .iter()
        .map(|&layer| {
            let n = ranked.iter().filter(|g| g.layer(layer).hit_cap()).count();
            (layer.column_stem().to_string(), n)
        })
        .collect();
    let synergy = ranked.iter().filter(|g| g.synergy.bonus_raw > g.synergy.bonus_capped).count();
    hits.insert("synergy".to_string(), synergy);
    hits
}

/// Inputs shared by every writer.
pub struct ReportContext<'a> {
    pub layout: &'a RunLayout,
    pub names: OutputNames,
    pub config_hash: &'a str,
    pub layers: &'a [LayerReport],
}

/// Write every output file and return them for the manifest, in write order.
pub fn write_all(
    ctx: &ReportContext<'_>,
    ranked: &[ScoredGene],
    selection: &SelectionResult,
) -> Result<Vec<ArtifactSpec>> {
    let out = |name: String| ctx.layout.output_path(&name);
    let mut artifacts = Vec::new();

    let mut universe: Vec<&str> = ranked.iter().map(|g| g.gene.as_str()).collect();
    universe.sort_unstable();
    let path = out(ctx.names.base());
    write_list(&path, universe)?;
    artifacts.push(ArtifactSpec::new(path, "Candidate gene universe", ArtifactKind::List));

    let path = out(ctx.names.scored());
    write_table(&path, SCORED_COLUMNS, ranked.iter().map(scored_row))?;
    artifacts.push(ArtifactSpec::new(path, "Per-layer raw and capped scores", ArtifactKind::Table));

    let path = out(ctx.names.all_overview());
    write_table(&path, OVERVIEW_COLUMNS, ranked.iter().map(overview_row))?;
    artifacts.push(ArtifactSpec::new(path, "Evidence overview, all genes", ArtifactKind::Table));

    let selected: std::collections::BTreeSet<&str> = selection.selected.iter().map(|g| g.as_str()).collect();
    let high: Vec<&ScoredGene> = ranked.iter().filter(|g| selected.contains(g.gene.as_str())).collect();

    let path = out(ctx.names.high_overview());
    write_table(&path, OVERVIEW_COLUMNS, high.iter().map(|g| overview_row(g)))?;
    artifacts.push(ArtifactSpec::new(path, "Evidence overview, high-confidence genes", ArtifactKind::Table));

    let path = out(ctx.names.high_confidence());
    write_list(&path, selection.selected.iter().map(|g| g.as_str()))?;
    artifacts.push(ArtifactSpec::new(path, "High-confidence gene list", ArtifactKind::List));

    let path = out(ctx.names.high_confidence_summary());
    fs::write(&path, selection_summary_text(selection))?;
    artifacts.push(ArtifactSpec::new(path, "Selection method and score distribution", ArtifactKind::Document));

    let path = out(ctx.names.high_category());
    write_table(
        &path,
        &["gene_id", "category"],
        high.iter().map(|g| vec![g.gene.to_string(), g.evidence.ontology.category_label()]),
    )?;
    artifacts.push(ArtifactSpec::new(path, "Ontology category of each high-confidence gene", ArtifactKind::Table));

    let summary = RunSummary {
        run_id: &ctx.layout.run_id,
        config_hash: ctx.config_hash,
        universe_size: ranked.len(),
        layers: ctx.layers,
        cap_hits: cap_hits(ranked),
        selection: SelectionReport {
            method: selection.method,
            threshold: selection.threshold,
            selected: selection.selected.len(),
            total: selection.total,
            percentage: selection.percentage(),
            quantile: selection.quantile,
            knee_index: selection.knee_index,
            tied_at_cutoff: selection.tied_at_cutoff,
            scores: &selection.summary,
        },
    };
    let path = out(ctx.names.run_summary());
    fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
    artifacts.push(ArtifactSpec::new(path, "Layer status, load statistics and selection", ArtifactKind::Document));

    debug!(files = artifacts.len(), dir = %ctx.layout.outputs.display(), "Wrote run outputs");
    Ok(artifacts)
}
