//! Loading every configured source and joining them over the candidate universe.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use sigrank_common::entities::{
    ContextEvidence, CuratedEvidence, DomainEvidence, OntologyEvidence, OrthologyEvidence,
};
use sigrank_common::{GeneEvidence, GeneKey, LayerKind, LayerSource, RankerConfig, Result, SigrankError};

use crate::resolve::IdentifierResolver;
use crate::sources::domain::strip_version;
use crate::sources::{
    load_optional, log_stats, ContextSource, CuratedSource, DomainSource, EvidenceSource, LoadStats,
    OntologySource, OrthologySource, SourceTable,
};

/// Everything read from disk for one run.
#[derive(Debug, Clone)]
pub struct EvidenceBundle {
    pub ontology: SourceTable<OntologyEvidence>,
    pub domain: LayerSource<SourceTable<DomainEvidence>>,
    pub orthology: LayerSource<SourceTable<OrthologyEvidence>>,
    pub curated: LayerSource<SourceTable<CuratedEvidence>>,
    pub context: LayerSource<SourceTable<ContextEvidence>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerStatus {
    Enabled,
    Disabled,
}

/// Per-layer line of the run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerReport {
    pub layer: LayerKind,
    pub status: LayerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<LoadStats>,
}

impl LayerReport {
    fn from_source<R>(layer: LayerKind, source: &LayerSource<SourceTable<R>>) -> Self {
        match source {
            LayerSource::Enabled(table) => Self {
                layer,
                status: LayerStatus::Enabled,
                reason: None,
                stats: Some(table.stats),
            },
            LayerSource::Disabled { reason } => Self {
                layer,
                status: LayerStatus::Disabled,
                reason: Some(reason.clone()),
                stats: None,
            },
        }
    }
}

// ── Expected domains ─────────────────────────────────────────────────────────

/// Category-scoped allow-list of domain ids.
#[derive(Debug, Clone, Default)]
pub struct DomainAllowList {
    by_category: BTreeMap<String, BTreeSet<String>>,
    all: BTreeSet<String>,
}

impl DomainAllowList {
    pub fn new(expected: &BTreeMap<String, Vec<String>>) -> Self {
        let mut list = Self::default();
        for (category, ids) in expected {
            let ids: BTreeSet<String> = ids
                .iter()
                .map(|id| strip_version(id.trim()).to_string())
                .filter(|id| !id.is_empty())
                .collect();
            if ids.is_empty() {
                continue;
            }
            list.all.extend(ids.iter().cloned());
            list.by_category.insert(category.clone(), ids);
        }
        list
    }

    /// Domains that count for a gene in `categories`; `None` means any domain counts.
    pub fn allowed(&self, categories: &BTreeSet<String>) -> Option<BTreeSet<&str>> {
        if self.all.is_empty() {
            return None;
        }
        let own: BTreeSet<&str> = categories
            .iter()
            .filter_map(|c| self.by_category.get(c))
            .flatten()
            .map(String::as_str)
            .collect();
        if own.is_empty() {
            Some(self.all.iter().map(String::as_str).collect())
        } else {
            Some(own)
        }
    }
}

// ── Assembly ─────────────────────────────────────────────────────────────────

impl EvidenceBundle {
    pub fn universe_size(&self) -> usize {
        self.ontology.records.len()
    }

    pub fn reports(&self) -> Vec<LayerReport> {
        vec![
            LayerReport {
                layer: LayerKind::Ontology,
                status: LayerStatus::Enabled,
                reason: None,
                stats: Some(self.ontology.stats),
            },
            LayerReport::from_source(LayerKind::Domain, &self.domain),
            LayerReport::from_source(LayerKind::Orthology, &self.orthology),
            LayerReport::from_source(LayerKind::Curated, &self.curated),
            LayerReport::from_source(LayerKind::Context, &self.context),
        ]
    }

    /// Join every layer onto the ontology-derived universe.
    ///
    /// Genes are never added or removed here. Domain hits are restricted to the
    /// gene's allow-list; curated and context evidence attach through the
    /// gene's best ortholog.
    pub fn assemble(&self, expected_domains: &BTreeMap<String, Vec<String>>) -> BTreeMap<GeneKey, GeneEvidence> {
        let allow = DomainAllowList::new(expected_domains);

        let orthology = self.orthology.as_enabled();
        if orthology.is_none() && (self.curated.is_enabled() || self.context.is_enabled()) {
            warn!("Orthology layer is disabled; curated and context evidence cannot reach candidate genes");
        }

        let mut genes = BTreeMap::new();
        for (gene, ontology) in &self.ontology.records {
            let mut evidence = GeneEvidence {
                ontology: ontology.clone(),
                ..Default::default()
            };

            if let Some(domains) = self.domain.as_enabled().and_then(|t| t.get(gene)) {
                let allowed = allow.allowed(&ontology.categories);
                let hits: Vec<_> = domains
                    .hits
                    .iter()
                    .filter(|h| allowed.as_ref().map_or(true, |a| a.contains(h.domain_id.as_str())))
                    .cloned()
                    .collect();
                if !hits.is_empty() {
                    evidence.domain = Some(DomainEvidence { hits });
                }
            }

            evidence.orthology = orthology.and_then(|t| t.get(gene)).cloned();

            if let Some(best) = evidence.best_ortholog().map(|h| h.locus.clone()) {
                evidence.curated = self.curated.as_enabled().and_then(|t| t.get(&best)).cloned();
                evidence.context = self.context.as_enabled().and_then(|t| t.get(&best)).cloned();
            }

            genes.insert(gene.clone(), evidence);
        }

        info!(
            genes = genes.len(),
            with_domain = genes.values().filter(|g| g.has_domain_match()).count(),
            with_ortholog = genes.values().filter(|g| g.best_ortholog().is_some()).count(),
            with_keyword = genes.values().filter(|g| g.keyword_hit_count() > 0).count(),
            with_context = genes.values().filter(|g| g.has_context_hit()).count(),
            "Assembled gene evidence"
        );
        genes
    }
}

// ── Loading ──────────────────────────────────────────────────────────────────

/// Load every source. Sources are independent and read concurrently on
/// blocking threads; this returns once all of them have finished.
///
/// Only the ontology source can fail the run. Optional layers that are
/// switched off, misconfigured or unreadable come back `Disabled`.
pub async fn load_evidence(config: &RankerConfig) -> Result<EvidenceBundle> {
    let resolver = Arc::new(IdentifierResolver::from_config(&config.id_mapping)?);
    let ev = &config.evidence;

    let ontology_source = OntologySource::from_config(&config.ontology, &config.scoring.weights);
    let ontology_path = config.ontology.file.clone();
    let ontology_resolver = Arc::clone(&resolver);
    let ontology = async move {
        tokio::task::spawn_blocking(move || ontology_source.load(&ontology_resolver))
            .await
            .map_err(|e| SigrankError::SourceUnavailable {
                layer: LayerKind::Ontology,
                path: ontology_path,
                reason: format!("loader task failed: {e}"),
            })?
    };

    let (ontology, domain, orthology, curated, context) = tokio::join!(
        ontology,
        load_layer(LayerKind::Domain, ev.domain.enabled.then(|| DomainSource::from_config(&ev.domain)), Arc::clone(&resolver)),
        load_layer(LayerKind::Orthology, ev.orthology.enabled.then(|| OrthologySource::from_config(&ev.orthology)), Arc::clone(&resolver)),
        load_layer(LayerKind::Curated, ev.curated.enabled.then(|| CuratedSource::from_config(&ev.curated)), Arc::clone(&resolver)),
        load_layer(LayerKind::Context, ev.context.enabled.then(|| ContextSource::from_config(&ev.context)), Arc::clone(&resolver)),
    );

    let ontology = ontology?;
    log_stats(LayerKind::Ontology, &ontology.stats);

    Ok(EvidenceBundle { ontology, domain, orthology, curated, context })
}

async fn load_layer<S>(
    layer: LayerKind,
    source: Option<Result<S>>,
    resolver: Arc<IdentifierResolver>,
) -> LayerSource<SourceTable<S::Record>>
where
    S: EvidenceSource + 'static,
    S::Record: 'static,
{
    let source = match source {
        None => {
            info!(layer = %layer, "Evidence layer disabled in configuration");
            return LayerSource::disabled("disabled in configuration");
        }
        Some(Err(e)) => {
            warn!(layer = %layer, error = %e, "Evidence layer disabled");
            return LayerSource::disabled(e.to_string());
        }
        Some(Ok(source)) => source,
    };

    match tokio::task::spawn_blocking(move || load_optional(&source, &resolver)).await {
        Ok(loaded) => loaded,
        Err(e) => {
            warn!(layer = %layer, error = %e, "Evidence loader task failed");
            LayerSource::disabled(format!("loader task failed: {e}"))
        }
    }
}
