//! Aggregation: layer scores plus synergy into one total per gene, then ranking.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::{debug, info};

use sigrank_common::{GeneEvidence, GeneKey, LayerKind};

use crate::scorer::{score_gene, LayerScore};
use crate::synergy::{evaluate, SynergyResult, SynergyRule};
use crate::weights::{LayerCaps, ScoringWeights};

/// One gene with its evidence and every score component.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredGene {
    pub gene: GeneKey,
    pub evidence: GeneEvidence,
    /// Indexed by [`LayerKind::index`]
    pub layers: [LayerScore; 5],
    pub synergy: SynergyResult,
    /// Σ capped layer scores + capped synergy bonus
    pub total: f64,
}

impl ScoredGene {
    pub fn layer(&self, layer: LayerKind) -> LayerScore {
        self.layers[layer.index()]
    }
}

pub fn score_one(
    gene: GeneKey,
    evidence: GeneEvidence,
    weights: &ScoringWeights,
    caps: &LayerCaps,
    rules: &[SynergyRule],
) -> ScoredGene {
    let layers = score_gene(&evidence, weights, caps);
    let synergy = evaluate(rules, &evidence, caps.synergy);
    let total = layers.iter().map(|s| s.capped).sum::<f64>() + synergy.bonus_capped;
    ScoredGene { gene, evidence, layers, synergy, total }
}

/// Highest total first; ties broken by gene key ascending.
pub fn rank_order(a: &ScoredGene, b: &ScoredGene) -> Ordering {
    b.total.total_cmp(&a.total).then_with(|| a.gene.cmp(&b.gene))
}

/// Score every gene in the universe and return them in rank order.
pub fn aggregate(
    genes: BTreeMap<GeneKey, GeneEvidence>,
    weights: &ScoringWeights,
    caps: &LayerCaps,
    rules: &[SynergyRule],
) -> Vec<ScoredGene> {
    let mut scored: Vec<ScoredGene> = genes
        .into_iter()
        .map(|(gene, evidence)| score_one(gene, evidence, weights, caps, rules))
        .collect();
    scored.sort_by(rank_order);

    for layer in LayerKind::ALL {
        let hits = scored.iter().filter(|g| g.layer(layer).hit_cap()).count();
        if hits > 0 {
            debug!(layer = %layer, genes = hits, "Layer cap reached");
        }
    }
    let synergy_capped = scored
        .iter()
        .filter(|g| g.synergy.bonus_raw > g.synergy.bonus_capped)
        .count();
    let with_synergy = scored.iter().filter(|g| !g.synergy.triggered_rules.is_empty()).count();

    info!(
        genes = scored.len(),
        with_synergy,
        synergy_capped,
        top = scored.first().map(|g| g.total).unwrap_or(0.0),
        "Aggregated gene scores"
    );
    scored
}
