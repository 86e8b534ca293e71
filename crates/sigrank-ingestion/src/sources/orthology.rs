//! Cross-species orthology clusters (InParanoid-style paired columns).
//!
//! Each side of a row is a list of `"speciesTag:LOCUS.version confidence"`
//! pairs. The candidate is the first resolvable query token; every resolvable
//! hit token followed by a parseable confidence becomes an ortholog hit.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use sigrank_common::config::OrthologyConfig;
use sigrank_common::entities::{OrthologHit, OrthologyClass, OrthologyEvidence};
use sigrank_common::{GeneKey, LayerKind, Result, SigrankError, SourceKind};

use super::{cell, open_tsv, source_name, ColumnSchema, EvidenceSource, LoadStats, SourceTable};
use crate::resolve::IdentifierResolver;

/// Tolerance when comparing the best/runner-up gap against the threshold.
const GAP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct OrthologySource {
    path: PathBuf,
    query_column: String,
    hit_column: String,
    min_best_score: f64,
    min_second_best_gap: f64,
}

impl OrthologySource {
    pub fn from_config(cfg: &OrthologyConfig) -> Result<Self> {
        let path = cfg
            .file
            .clone()
            .ok_or_else(|| SigrankError::Config("evidence.orthology.file is not set".into()))?;
        Ok(Self {
            path,
            query_column: cfg.query_column.clone(),
            hit_column: cfg.hit_column.clone(),
            min_best_score: cfg.min_best_score,
            min_second_best_gap: cfg.min_second_best_gap,
        })
    }
}

/// Classify a relationship from hit confidences sorted best first.
///
/// - no hits, or best below `min_best` → `none`
/// - a single hit → `one_to_one`
/// - best leads the runner-up by at least `min_gap` → `one_to_one`
/// - otherwise → `one_to_many`
pub fn classify(confidences_desc: &[f64], min_best: f64, min_gap: f64) -> OrthologyClass {
    let Some(&best) = confidences_desc.first() else {
        return OrthologyClass::None;
    };
    if best < min_best {
        return OrthologyClass::None;
    }
    match confidences_desc.get(1) {
        None => OrthologyClass::OneToOne,
        Some(&second) if best - second + GAP_EPSILON >= min_gap => OrthologyClass::OneToOne,
        Some(_) => OrthologyClass::OneToMany,
    }
}

impl EvidenceSource for OrthologySource {
    type Record = OrthologyEvidence;

    fn layer(&self) -> LayerKind {
        LayerKind::Orthology
    }

    fn load(&self, resolver: &IdentifierResolver) -> Result<SourceTable<OrthologyEvidence>> {
        let name = source_name(&self.path);
        let mut reader = open_tsv(&self.path, LayerKind::Orthology)?;
        let idx = ColumnSchema::new(&name, &[self.query_column.as_str(), self.hit_column.as_str()])
            .locate(reader.headers()?)?;

        let mut stats = LoadStats::default();
        // candidate → (reference locus → best confidence seen)
        let mut merged: BTreeMap<GeneKey, BTreeMap<GeneKey, f64>> = BTreeMap::new();

        for (i, row) in reader.records().enumerate() {
            stats.rows_read += 1;
            let line = i + 2;
            let row = match row {
                Ok(r) => r,
                Err(e) => {
                    debug!(source = %name, line, error = %e, "Skipping unreadable row");
                    stats.malformed += 1;
                    continue;
                }
            };

            let (Some(query), Some(hits)) = (cell(&row, idx[0]), cell(&row, idx[1])) else {
                stats.malformed += 1;
                continue;
            };

            let Some(gene) = query
                .split_whitespace()
                .find_map(|tok| resolver.resolve(tok, SourceKind::OrthologyQuery).ok())
            else {
                debug!(source = %name, line, query, "No resolvable query identifier");
                stats.unresolved += 1;
                continue;
            };

            let tokens: Vec<&str> = hits.split_whitespace().collect();
            let mut t = 0;
            while t < tokens.len() {
                let Ok(locus) = resolver.resolve(tokens[t], SourceKind::OrthologyHit) else {
                    t += 1;
                    continue;
                };
                match tokens.get(t + 1).and_then(|s| s.parse::<f64>().ok()).filter(|c| c.is_finite()) {
                    Some(confidence) => {
                        let slot = merged.entry(gene.clone()).or_default().entry(locus).or_insert(confidence);
                        if confidence > *slot {
                            *slot = confidence;
                        }
                        t += 2;
                    }
                    None => {
                        debug!(source = %name, line, token = tokens[t], "Hit without a confidence value");
                        stats.malformed += 1;
                        t += 1;
                    }
                }
            }
        }

        let records = merged
            .into_iter()
            .filter(|(_, hits)| !hits.is_empty())
            .map(|(gene, hits)| {
                let mut hits: Vec<OrthologHit> = hits
                    .into_iter()
                    .map(|(locus, confidence)| OrthologHit { locus, confidence })
                    .collect();
                // Ties keep locus order from the map.
                hits.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
                let confidences: Vec<f64> = hits.iter().map(|h| h.confidence).collect();
                let class = classify(&confidences, self.min_best_score, self.min_second_best_gap);
                (gene, OrthologyEvidence { hits, class })
            })
            .collect();

        Ok(SourceTable::new(records, stats))
    }
}
