//! Core domain types: gene keys, evidence layers and per-gene evidence records.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Identifiers ──────────────────────────────────────────────────────────────

/// Canonical gene identifier produced by the identifier resolver.
///
/// Candidate genes carry the configured canonical suffix
/// (e.g. `BdiBd21-3.1G0000100.v1.2`); reference-organism loci
/// (e.g. `AT1G01010`) are keys in their own namespace without a suffix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneKey(String);

impl GeneKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GeneKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Where a raw identifier came from; selects the resolver's extraction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Ontology,
    Domain,
    OrthologyQuery,
    OrthologyHit,
    CuratedFeature,
    ContextLocus,
}

impl SourceKind {
    /// Reference-organism identifiers resolve with the locus pattern and no suffix.
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            SourceKind::OrthologyHit | SourceKind::CuratedFeature | SourceKind::ContextLocus
        )
    }

    /// Compound `"speciesTag:LOCUS.version score"` tokens need the species tag stripped.
    pub fn is_compound(self) -> bool {
        matches!(self, SourceKind::OrthologyQuery | SourceKind::OrthologyHit)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Ontology => "ontology",
            SourceKind::Domain => "domain",
            SourceKind::OrthologyQuery => "orthology query",
            SourceKind::OrthologyHit => "orthology hit",
            SourceKind::CuratedFeature => "curated feature",
            SourceKind::ContextLocus => "context locus",
        };
        f.write_str(s)
    }
}

// ── Layers ───────────────────────────────────────────────────────────────────

/// One independent evidence source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Ontology,
    Domain,
    Orthology,
    Curated,
    Context,
}

impl LayerKind {
    /// All layers in output column order.
    pub const ALL: [LayerKind; 5] = [
        LayerKind::Ontology,
        LayerKind::Domain,
        LayerKind::Orthology,
        LayerKind::Curated,
        LayerKind::Context,
    ];

    pub fn index(self) -> usize {
        match self {
            LayerKind::Ontology => 0,
            LayerKind::Domain => 1,
            LayerKind::Orthology => 2,
            LayerKind::Curated => 3,
            LayerKind::Context => 4,
        }
    }

    /// Column stem used in the scored and overview tables.
    pub fn column_stem(self) -> &'static str {
        match self {
            LayerKind::Ontology => "go",
            LayerKind::Domain => "domain",
            LayerKind::Orthology => "orth",
            LayerKind::Curated => "keyword",
            LayerKind::Context => "context",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LayerKind::Ontology => "ontology",
            LayerKind::Domain => "domain",
            LayerKind::Orthology => "orthology",
            LayerKind::Curated => "curated-annotation",
            LayerKind::Context => "context",
        };
        f.write_str(s)
    }
}

/// An optional layer is either loaded or explicitly switched off.
///
/// A disabled layer contributes zero to every gene; it never removes genes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LayerSource<T> {
    Enabled(T),
    Disabled { reason: String },
}

impl<T> LayerSource<T> {
    pub fn disabled(reason: impl Into<String>) -> Self {
        LayerSource::Disabled { reason: reason.into() }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, LayerSource::Enabled(_))
    }

    pub fn as_enabled(&self) -> Option<&T> {
        match self {
            LayerSource::Enabled(data) => Some(data),
            LayerSource::Disabled { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LayerSource<U> {
        match self {
            LayerSource::Enabled(data) => LayerSource::Enabled(f(data)),
            LayerSource::Disabled { reason } => LayerSource::Disabled { reason },
        }
    }
}

// ── Evidence records ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OntologyEvidence {
    /// Matched weighted term identifiers.
    pub terms: BTreeSet<String>,
    /// Weight categories with at least one matched term.
    pub categories: BTreeSet<String>,
}

impl OntologyEvidence {
    /// `PCD-ROS`, `PCD` or `unknown`.
    pub fn category_label(&self) -> String {
        if self.categories.is_empty() {
            "unknown".to_string()
        } else {
            self.categories.iter().cloned().collect::<Vec<_>>().join("-")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainHit {
    /// Unversioned domain accession, e.g. `PF00656`.
    pub domain_id: String,
    /// Source database tag, e.g. `pfam`.
    pub database: String,
    pub evalue: Option<f64>,
}

impl DomainHit {
    pub fn label(&self) -> String {
        match self.evalue {
            Some(e) => format!("{}({},E={:.1e})", self.domain_id, self.database, e),
            None => format!("{}({})", self.domain_id, self.database),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainEvidence {
    pub hits: Vec<DomainHit>,
}

impl DomainEvidence {
    pub fn unique_domain_ids(&self) -> BTreeSet<&str> {
        self.hits.iter().map(|h| h.domain_id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrthologyClass {
    OneToOne,
    OneToMany,
    #[default]
    None,
}

impl fmt::Display for OrthologyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrthologyClass::OneToOne => "one_to_one",
            OrthologyClass::OneToMany => "one_to_many",
            OrthologyClass::None => "none",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrthologHit {
    pub locus: GeneKey,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrthologyEvidence {
    /// Sorted by confidence, best first.
    pub hits: Vec<OrthologHit>,
    pub class: OrthologyClass,
}

impl OrthologyEvidence {
    pub fn best(&self) -> Option<&OrthologHit> {
        self.hits.first()
    }

    pub fn best_confidence(&self) -> f64 {
        self.best().map(|h| h.confidence).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CuratedEvidence {
    pub symbol: String,
    pub description: String,
    /// Configured keywords found in `symbol + description`, in configuration order.
    pub keyword_hits: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextEvidence {
    pub terms: Vec<String>,
    /// Distinct term texts matching a built-in stage keyword.
    pub stage_hits: Vec<String>,
}

/// Borrowed view of one layer's record for one gene.
#[derive(Debug, Clone, Copy)]
pub enum EvidenceRecord<'a> {
    Ontology(&'a OntologyEvidence),
    Domain(&'a DomainEvidence),
    Orthology(&'a OrthologyEvidence),
    Curated(&'a CuratedEvidence),
    Context(&'a ContextEvidence),
}

impl EvidenceRecord<'_> {
    pub fn layer(&self) -> LayerKind {
        match self {
            EvidenceRecord::Ontology(_) => LayerKind::Ontology,
            EvidenceRecord::Domain(_) => LayerKind::Domain,
            EvidenceRecord::Orthology(_) => LayerKind::Orthology,
            EvidenceRecord::Curated(_) => LayerKind::Curated,
            EvidenceRecord::Context(_) => LayerKind::Context,
        }
    }
}

/// All evidence gathered for one candidate gene.
///
/// `None` means "no evidence" for that layer, never "excluded".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneEvidence {
    pub ontology: OntologyEvidence,
    pub domain: Option<DomainEvidence>,
    pub orthology: Option<OrthologyEvidence>,
    pub curated: Option<CuratedEvidence>,
    pub context: Option<ContextEvidence>,
}

impl GeneEvidence {
    pub fn record(&self, layer: LayerKind) -> Option<EvidenceRecord<'_>> {
        match layer {
            LayerKind::Ontology => Some(EvidenceRecord::Ontology(&self.ontology)),
            LayerKind::Domain => self.domain.as_ref().map(EvidenceRecord::Domain),
            LayerKind::Orthology => self.orthology.as_ref().map(EvidenceRecord::Orthology),
            LayerKind::Curated => self.curated.as_ref().map(EvidenceRecord::Curated),
            LayerKind::Context => self.context.as_ref().map(EvidenceRecord::Context),
        }
    }

    pub fn best_ortholog(&self) -> Option<&OrthologHit> {
        self.orthology.as_ref().and_then(|o| o.best())
    }

    pub fn orthology_class(&self) -> OrthologyClass {
        self.orthology.as_ref().map(|o| o.class).unwrap_or_default()
    }

    pub fn has_domain_match(&self) -> bool {
        self.domain.as_ref().is_some_and(|d| !d.is_empty())
    }

    pub fn keyword_hit_count(&self) -> usize {
        self.curated.as_ref().map(|c| c.keyword_hits.len()).unwrap_or(0)
    }

    pub fn has_context_hit(&self) -> bool {
        self.context.as_ref().is_some_and(|c| !c.stage_hits.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_label() {
        let mut ev = OntologyEvidence::default();
        assert_eq!(ev.category_label(), "unknown");
        ev.categories.insert("ROS".into());
        ev.categories.insert("PCD".into());
        assert_eq!(ev.category_label(), "PCD-ROS");
    }

    #[test]
    fn test_domain_label() {
        let hit = DomainHit {
            domain_id: "PF00656".into(),
            database: "pfam".into(),
            evalue: Some(1.5e-10),
        };
        assert_eq!(hit.label(), "PF00656(pfam,E=1.5e-10)");
    }

    #[test]
    fn test_missing_layer_has_no_record() {
        let ev = GeneEvidence::default();
        assert!(ev.record(LayerKind::Ontology).is_some());
        assert!(ev.record(LayerKind::Domain).is_none());
        assert_eq!(ev.orthology_class(), OrthologyClass::None);
        assert_eq!(ev.keyword_hit_count(), 0);
    }

    #[test]
    fn test_layer_source_map_keeps_reason() {
        let src: LayerSource<u32> = LayerSource::disabled("file missing");
        let mapped = src.map(|n| n + 1);
        assert_eq!(mapped, LayerSource::Disabled { reason: "file missing".into() });
    }
}
