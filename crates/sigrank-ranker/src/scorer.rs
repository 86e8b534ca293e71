//! Per-layer raw and capped scores.
//!
//! Raw formulas:
//! - ontology: Σ weight(term) over matched terms
//! - domain: unique matched domains × `domain_match`
//! - orthology: best confidence × `best_hit_multiplier` (+ `one_to_one_bonus`),
//!   zero below `min_best_score_for_points`
//! - curated: keyword hits × `curated_keyword_hit`
//! - context: stage hits × `context_hit`
//!
//! Capped score = min(raw, cap). Neither is ever negative.

use serde::{Deserialize, Serialize};

use sigrank_common::entities::{EvidenceRecord, OrthologyClass};
use sigrank_common::{GeneEvidence, LayerKind};

use crate::weights::{LayerCaps, ScoringWeights};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerScore {
    pub raw: f64,
    pub capped: f64,
}

impl LayerScore {
    pub fn capped_at(raw: f64, cap: Option<f64>) -> Self {
        let raw = raw.max(0.0);
        Self { raw, capped: apply_cap(raw, cap) }
    }

    pub fn hit_cap(&self) -> bool {
        self.raw > self.capped
    }
}

pub fn apply_cap(raw: f64, cap: Option<f64>) -> f64 {
    let raw = raw.max(0.0);
    match cap {
        Some(c) => raw.min(c.max(0.0)),
        None => raw,
    }
}

/// Raw score of one layer record.
pub fn raw_score(record: EvidenceRecord<'_>, weights: &ScoringWeights) -> f64 {
    let raw = match record {
        EvidenceRecord::Ontology(ev) => ev.terms.iter().map(|t| weights.term_weight(t)).sum(),
        EvidenceRecord::Domain(ev) => ev.unique_domain_ids().len() as f64 * weights.domain_match,
        EvidenceRecord::Orthology(ev) => {
            let best = ev.best_confidence();
            if ev.best().is_none() || best < weights.min_best_score_for_points {
                0.0
            } else {
                let bonus = if ev.class == OrthologyClass::OneToOne { weights.one_to_one_bonus } else { 0.0 };
                best * weights.best_hit_multiplier + bonus
            }
        }
        EvidenceRecord::Curated(ev) => ev.keyword_hits.len() as f64 * weights.curated_keyword_hit,
        EvidenceRecord::Context(ev) => ev.stage_hits.len() as f64 * weights.context_hit,
    };
    raw.max(0.0)
}

pub fn score(record: EvidenceRecord<'_>, weights: &ScoringWeights, caps: &LayerCaps) -> LayerScore {
    LayerScore::capped_at(raw_score(record, weights), caps.cap(record.layer()))
}

/// Every layer for one gene, in [`LayerKind::ALL`] order. Missing evidence scores zero.
pub fn score_gene(evidence: &GeneEvidence, weights: &ScoringWeights, caps: &LayerCaps) -> [LayerScore; 5] {
    let mut scores = [LayerScore::default(); 5];
    for layer in LayerKind::ALL {
        if let Some(record) = evidence.record(layer) {
            scores[layer.index()] = score(record, weights, caps);
        }
    }
    scores
}
