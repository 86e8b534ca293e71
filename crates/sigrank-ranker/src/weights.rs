//! Scoring weights and per-layer caps, flattened from the configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sigrank_common::config::{CapsConfig, WeightsConfig};
use sigrank_common::LayerKind;

/// Per-layer weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Ontology term id → weight, summed over every category listing the term
    pub ontology_terms: BTreeMap<String, f64>,
    /// Points per unique matched domain
    pub domain_match: f64,
    /// Multiplier on the best ortholog confidence
    pub best_hit_multiplier: f64,
    /// Added when the relationship is one-to-one
    pub one_to_one_bonus: f64,
    /// Best ortholog confidence below this scores nothing
    pub min_best_score_for_points: f64,
    /// Points per curated keyword hit
    pub curated_keyword_hit: f64,
    /// Points per matched context stage
    pub context_hit: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::from_config(&WeightsConfig::default())
    }
}

impl ScoringWeights {
    pub fn from_config(cfg: &WeightsConfig) -> Self {
        let mut ontology_terms: BTreeMap<String, f64> = BTreeMap::new();
        for terms in cfg.ontology.values() {
            for (term, weight) in terms {
                *ontology_terms.entry(term.clone()).or_insert(0.0) += weight;
            }
        }
        Self {
            ontology_terms,
            domain_match: cfg.domain_match,
            best_hit_multiplier: cfg.orthology.best_hit_multiplier,
            one_to_one_bonus: cfg.orthology.one_to_one_bonus,
            min_best_score_for_points: cfg.orthology.min_best_score_for_points,
            curated_keyword_hit: cfg.curated_keyword_hit,
            context_hit: cfg.context_hit,
        }
    }

    pub fn term_weight(&self, term: &str) -> f64 {
        self.ontology_terms.get(term).copied().unwrap_or(0.0)
    }
}

/// Upper bounds applied to raw scores. `None` is uncapped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerCaps {
    /// Indexed by [`LayerKind::index`]
    pub layers: [Option<f64>; 5],
    pub synergy: Option<f64>,
}

impl Default for LayerCaps {
    fn default() -> Self {
        Self::from_config(&CapsConfig::default())
    }
}

impl LayerCaps {
    pub fn from_config(cfg: &CapsConfig) -> Self {
        let mut layers = [None; 5];
        for layer in LayerKind::ALL {
            layers[layer.index()] = cfg.for_layer(layer);
        }
        Self { layers, synergy: cfg.synergy }
    }

    #[cfg(test)]
    pub fn uncapped() -> Self {
        Self { layers: [None; 5], synergy: None }
    }

    pub fn cap(&self, layer: LayerKind) -> Option<f64> {
        self.layers[layer.index()]
    }
}
