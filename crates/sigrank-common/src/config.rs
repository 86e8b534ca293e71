//! Ranking run configuration.
//!
//! A run is described by one YAML document: identifier mapping, the mandatory
//! ontology source, optional evidence layers, scoring weights/caps/synergy
//! rules and the selection strategy. Every optional field has a default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entities::LayerKind;
use crate::error::{Result, SigrankError};
use crate::predicate::Predicate;

/// Complete ranking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerConfig {
    /// Prefix for output file names and the run id
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Identifier canonicalisation rules
    pub id_mapping: IdMappingConfig,

    /// Mandatory ontology annotation source (defines the candidate universe)
    pub ontology: OntologyConfig,

    /// Scoring weights, caps and synergy rules
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// High-confidence selection strategy
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Optional evidence layers
    #[serde(default)]
    pub evidence: EvidenceConfig,
}

fn default_output_prefix() -> String { "gene_signatures".to_string() }

// ── Identifier mapping ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdMappingConfig {
    /// Pattern extracting the core candidate id; capture group 1 if present, else the whole match
    pub protein_to_core_regex: String,

    /// Suffix appended to every candidate core id (e.g. ".v1.2")
    #[serde(default)]
    pub canonical_suffix: String,

    /// Pattern extracting reference-organism loci (orthology hits, curated features, context table)
    #[serde(default = "default_reference_locus_regex")]
    pub reference_locus_regex: String,
}

fn default_reference_locus_regex() -> String { r"AT[1-5MC]G\d{5}".to_string() }

// ── Ontology source ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntologyConfig {
    /// Annotation table (TSV)
    pub file: PathBuf,

    #[serde(default = "default_ontology_id_column")]
    pub id_column: String,

    #[serde(default = "default_ontology_term_column")]
    pub term_column: String,

    /// Column holding the ontology branch code (BP/MF/CC)
    #[serde(default = "default_ontology_branch_column")]
    pub branch_column: String,

    /// Keep only rows of this branch; `ALL` or null disables the filter
    #[serde(default = "default_branch_filter", alias = "category_filter")]
    pub branch_filter: Option<String>,
}

fn default_ontology_id_column() -> String { "gene".to_string() }
fn default_ontology_term_column() -> String { "GO".to_string() }
fn default_ontology_branch_column() -> String { "level".to_string() }
fn default_branch_filter() -> Option<String> { Some("BP".to_string()) }

impl OntologyConfig {
    pub fn effective_branch_filter(&self) -> Option<String> {
        self.branch_filter
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty() && !b.eq_ignore_ascii_case("ALL"))
            .map(str::to_uppercase)
    }
}

// ── Scoring ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: WeightsConfig,

    #[serde(default)]
    pub caps: CapsConfig,

    #[serde(default)]
    pub synergy_rules: Vec<SynergyRuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsConfig {
    /// category → (term id → weight)
    #[serde(default)]
    pub ontology: BTreeMap<String, BTreeMap<String, f64>>,

    /// Points per unique matched domain
    #[serde(default = "default_domain_match")]
    pub domain_match: f64,

    #[serde(default)]
    pub orthology: OrthologyWeights,

    /// Points per curated keyword hit
    #[serde(default = "default_curated_keyword_hit")]
    pub curated_keyword_hit: f64,

    /// Points per matched context stage
    #[serde(default = "default_context_hit")]
    pub context_hit: f64,
}

fn default_domain_match() -> f64 { 2.0 }
fn default_curated_keyword_hit() -> f64 { 2.0 }
fn default_context_hit() -> f64 { 1.0 }

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            ontology: BTreeMap::new(),
            domain_match: default_domain_match(),
            orthology: OrthologyWeights::default(),
            curated_keyword_hit: default_curated_keyword_hit(),
            context_hit: default_context_hit(),
        }
    }
}

impl WeightsConfig {
    /// Every weighted ontology term id, across categories.
    pub fn ontology_terms(&self) -> impl Iterator<Item = &str> {
        self.ontology.values().flat_map(|terms| terms.keys().map(String::as_str))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrthologyWeights {
    #[serde(default = "default_best_hit_multiplier")]
    pub best_hit_multiplier: f64,

    #[serde(default = "default_one_to_one_bonus")]
    pub one_to_one_bonus: f64,

    /// Below this best-hit confidence the layer scores zero
    #[serde(default = "default_min_best_score_for_points")]
    pub min_best_score_for_points: f64,
}

fn default_best_hit_multiplier() -> f64 { 3.0 }
fn default_one_to_one_bonus() -> f64 { 2.0 }
fn default_min_best_score_for_points() -> f64 { 0.5 }

impl Default for OrthologyWeights {
    fn default() -> Self {
        Self {
            best_hit_multiplier: default_best_hit_multiplier(),
            one_to_one_bonus: default_one_to_one_bonus(),
            min_best_score_for_points: default_min_best_score_for_points(),
        }
    }
}

/// Per-layer caps. A missing key takes the default; an explicit `null` means uncapped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapsConfig {
    #[serde(default = "default_ontology_cap")]
    pub ontology: Option<f64>,
    #[serde(default = "default_domain_cap")]
    pub domain: Option<f64>,
    #[serde(default = "default_orthology_cap")]
    pub orthology: Option<f64>,
    #[serde(default = "default_curated_cap")]
    pub curated: Option<f64>,
    #[serde(default = "default_context_cap")]
    pub context: Option<f64>,
    #[serde(default = "default_synergy_cap")]
    pub synergy: Option<f64>,
}

fn default_ontology_cap() -> Option<f64> { Some(15.0) }
fn default_domain_cap() -> Option<f64> { Some(10.0) }
fn default_orthology_cap() -> Option<f64> { Some(6.0) }
fn default_curated_cap() -> Option<f64> { Some(6.0) }
fn default_context_cap() -> Option<f64> { Some(3.0) }
fn default_synergy_cap() -> Option<f64> { Some(6.0) }

impl Default for CapsConfig {
    fn default() -> Self {
        Self {
            ontology: default_ontology_cap(),
            domain: default_domain_cap(),
            orthology: default_orthology_cap(),
            curated: default_curated_cap(),
            context: default_context_cap(),
            synergy: default_synergy_cap(),
        }
    }
}

impl CapsConfig {
    pub fn for_layer(&self, layer: LayerKind) -> Option<f64> {
        match layer {
            LayerKind::Ontology => self.ontology,
            LayerKind::Domain => self.domain,
            LayerKind::Orthology => self.orthology,
            LayerKind::Curated => self.curated,
            LayerKind::Context => self.context,
        }
    }

    fn all(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("ontology", self.ontology),
            ("domain", self.domain),
            ("orthology", self.orthology),
            ("curated", self.curated),
            ("context", self.context),
            ("synergy", self.synergy),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynergyRuleConfig {
    pub name: String,
    /// Predicate names that must all hold
    pub if_all: Vec<String>,
    pub bonus: f64,
}

impl SynergyRuleConfig {
    pub fn predicates(&self) -> Result<Vec<Predicate>> {
        self.if_all.iter().map(|p| p.parse()).collect()
    }
}

// ── Selection ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    Quantile,
    Knee,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_selection_mode")]
    pub mode: SelectionMode,

    #[serde(default = "default_quantile")]
    pub quantile: f64,

    #[serde(default = "default_min_genes")]
    pub min_genes: usize,

    #[serde(default = "default_max_genes")]
    pub max_genes: usize,
}

fn default_selection_mode() -> SelectionMode { SelectionMode::Knee }
fn default_quantile() -> f64 { 0.90 }
fn default_min_genes() -> usize { 10 }
fn default_max_genes() -> usize { 500 }

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mode: default_selection_mode(),
            quantile: default_quantile(),
            min_genes: default_min_genes(),
            max_genes: default_max_genes(),
        }
    }
}

// ── Optional evidence layers ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceConfig {
    #[serde(default)]
    pub orthology: OrthologyConfig,
    #[serde(default)]
    pub domain: DomainConfig,
    #[serde(default)]
    pub curated: CuratedConfig,
    #[serde(default)]
    pub context: ContextConfig,
}

impl EvidenceConfig {
    pub fn is_enabled(&self, layer: LayerKind) -> bool {
        match layer {
            LayerKind::Ontology => true,
            LayerKind::Domain => self.domain.enabled,
            LayerKind::Orthology => self.orthology.enabled,
            LayerKind::Curated => self.curated.enabled,
            LayerKind::Context => self.context.enabled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrthologyConfig {
    #[serde(default)]
    pub enabled: bool,

    pub file: Option<PathBuf>,

    #[serde(default = "default_query_column")]
    pub query_column: String,

    #[serde(default = "default_hit_column")]
    pub hit_column: String,

    /// Best hit must reach this confidence to be classified at all
    #[serde(default = "default_min_best_score")]
    pub min_best_score: f64,

    /// Minimum confidence gap between best and runner-up for one-to-one
    #[serde(default = "default_min_second_best_gap")]
    pub min_second_best_gap: f64,
}

fn default_query_column() -> String { "OrtoA".to_string() }
fn default_hit_column() -> String { "OrtoB".to_string() }
fn default_min_best_score() -> f64 { 0.8 }
fn default_min_second_best_gap() -> f64 { 0.2 }

impl Default for OrthologyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            file: None,
            query_column: default_query_column(),
            hit_column: default_hit_column(),
            min_best_score: default_min_best_score(),
            min_second_best_gap: default_min_second_best_gap(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainFormat {
    #[default]
    Tsv,
    Domtblout,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub files: Vec<DomainFileConfig>,

    /// ontology category → expected domain ids; empty means any domain counts
    #[serde(default)]
    pub expected_domains: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainFileConfig {
    pub path: PathBuf,

    #[serde(default = "default_domain_database")]
    pub database: String,

    #[serde(default)]
    pub format: DomainFormat,

    #[serde(default = "default_domain_id_column")]
    pub id_column: String,

    #[serde(default = "default_domain_column")]
    pub domain_column: String,

    /// Best-domain E-value cutoff (domtblout only)
    #[serde(default = "default_evalue_threshold")]
    pub evalue_threshold: f64,
}

fn default_domain_database() -> String { "pfam".to_string() }
fn default_domain_id_column() -> String { "gene".to_string() }
fn default_domain_column() -> String { "pfam".to_string() }
fn default_evalue_threshold() -> f64 { 1e-5 }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CuratedConfig {
    #[serde(default)]
    pub enabled: bool,

    /// GFF3 gene-feature file
    pub file: Option<PathBuf>,

    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub enabled: bool,

    pub file: Option<PathBuf>,

    #[serde(default = "default_locus_column")]
    pub locus_column: String,

    #[serde(default = "default_term_column")]
    pub term_column: String,
}

fn default_locus_column() -> String { "locus_name".to_string() }
fn default_term_column() -> String { "term_name".to_string() }

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            file: None,
            locus_column: default_locus_column(),
            term_column: default_term_column(),
        }
    }
}

// ── Loading & validation ─────────────────────────────────────────────────────

impl RankerConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| SigrankError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        Ok(ConfigDocument::load(path)?.config)
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        let prefix = self.output_prefix.trim();
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(cfg_err(format!("output_prefix {:?} is not a valid name", self.output_prefix)));
        }

        compile_pattern("id_mapping.protein_to_core_regex", &self.id_mapping.protein_to_core_regex)?;
        compile_pattern("id_mapping.reference_locus_regex", &self.id_mapping.reference_locus_regex)?;

        let weights = &self.scoring.weights;
        if weights.ontology_terms().next().is_none() {
            return Err(cfg_err("scoring.weights.ontology defines no terms"));
        }
        for (category, terms) in &weights.ontology {
            for (term, w) in terms {
                check_non_negative(&format!("scoring.weights.ontology.{category}.{term}"), *w)?;
            }
        }
        check_non_negative("scoring.weights.domain_match", weights.domain_match)?;
        check_non_negative("scoring.weights.curated_keyword_hit", weights.curated_keyword_hit)?;
        check_non_negative("scoring.weights.context_hit", weights.context_hit)?;
        check_non_negative("scoring.weights.orthology.best_hit_multiplier", weights.orthology.best_hit_multiplier)?;
        check_non_negative("scoring.weights.orthology.one_to_one_bonus", weights.orthology.one_to_one_bonus)?;
        if !weights.orthology.min_best_score_for_points.is_finite() {
            return Err(cfg_err("scoring.weights.orthology.min_best_score_for_points must be finite"));
        }

        for (name, cap) in self.scoring.caps.all() {
            if let Some(c) = cap {
                if c.is_nan() || c < 0.0 {
                    return Err(cfg_err(format!("scoring.caps.{name} must be >= 0 (got {c})")));
                }
            }
        }

        let mut rule_names = std::collections::BTreeSet::new();
        for rule in &self.scoring.synergy_rules {
            if rule.name.trim().is_empty() {
                return Err(cfg_err("synergy rule without a name"));
            }
            if !rule_names.insert(rule.name.as_str()) {
                return Err(cfg_err(format!("duplicate synergy rule name {:?}", rule.name)));
            }
            if rule.if_all.is_empty() {
                return Err(cfg_err(format!("synergy rule {:?} has no predicates", rule.name)));
            }
            check_non_negative(&format!("synergy rule {:?} bonus", rule.name), rule.bonus)?;
            for predicate in rule.predicates()? {
                if let Predicate::HasOntologyCategory(cat) = &predicate {
                    if !weights.ontology.contains_key(cat) {
                        return Err(cfg_err(format!(
                            "synergy rule {:?}: {predicate} names category {cat:?}, which has no ontology weights",
                            rule.name
                        )));
                    }
                }
            }
        }

        let sel = &self.selection;
        if !(0.0..=1.0).contains(&sel.quantile) {
            return Err(cfg_err(format!("selection.quantile must be within [0, 1] (got {})", sel.quantile)));
        }
        if sel.max_genes == 0 || sel.min_genes > sel.max_genes {
            return Err(cfg_err(format!(
                "selection bounds invalid: min_genes={} max_genes={}",
                sel.min_genes, sel.max_genes
            )));
        }

        let ev = &self.evidence;
        if ev.orthology.enabled && ev.orthology.file.is_none() {
            return Err(cfg_err("evidence.orthology is enabled but has no file"));
        }
        if ev.domain.enabled && ev.domain.files.is_empty() {
            return Err(cfg_err("evidence.domain is enabled but lists no files"));
        }
        if ev.curated.enabled && ev.curated.file.is_none() {
            return Err(cfg_err("evidence.curated is enabled but has no file"));
        }
        if ev.context.enabled && ev.context.file.is_none() {
            return Err(cfg_err("evidence.context is enabled but has no file"));
        }

        Ok(())
    }
}

/// The configuration as written (for hashing and the snapshot) plus its typed form.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    pub source_path: Option<PathBuf>,
    pub value: serde_yaml::Value,
    pub config: RankerConfig,
}

impl ConfigDocument {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| SigrankError::Config(format!("invalid YAML: {e}")))?;
        let config = RankerConfig::from_yaml_str(content)?;
        Ok(Self { source_path: None, value, config })
    }

    /// Load from a YAML file. A missing or unreadable file is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SigrankError::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let mut doc = Self::from_yaml_str(&content)?;
        doc.source_path = Some(path.to_path_buf());
        Ok(doc)
    }
}

fn cfg_err(msg: impl Into<String>) -> SigrankError {
    SigrankError::Config(msg.into())
}

fn compile_pattern(field: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| cfg_err(format!("{field} is not a valid pattern: {e}")))
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(cfg_err(format!("{field} must be a finite value >= 0 (got {value})")))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
