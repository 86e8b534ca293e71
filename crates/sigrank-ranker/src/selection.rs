//! High-confidence selection over the ranked score distribution.
//!
//! Quantile mode keeps every gene at or above the configured quantile of the
//! totals. Knee mode finds the elbow of the descending curve as the point
//! farthest below the chord joining its endpoints, then clamps the count to
//! `[min_genes, max_genes]`.
//!
//! Knee mode is a rank cut: genes beyond the count that tie with the last
//! selected total stay out and are reported in `tied_at_cutoff`.

use serde::Serialize;
use tracing::{info, warn};

use sigrank_common::{GeneKey, SelectionConfig, SelectionMode};

use crate::aggregate::ScoredGene;
use crate::normalise::{mean, median, minmax_normalise, quantile};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl ScoreSummary {
    pub fn from_totals(totals: &[f64]) -> Self {
        let mut sorted = totals.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self {
            min: sorted.first().copied().unwrap_or(0.0),
            max: sorted.last().copied().unwrap_or(0.0),
            mean: mean(&sorted).unwrap_or(0.0),
            median: median(&sorted).unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionResult {
    pub method: SelectionMode,
    pub threshold: f64,
    /// In rank order.
    pub selected: Vec<GeneKey>,
    /// Size of the scored universe.
    pub total: usize,
    /// Zero-based position of the unclamped knee (knee mode only).
    pub knee_index: Option<usize>,
    /// Quantile used (quantile mode only).
    pub quantile: Option<f64>,
    /// Unselected genes whose total equals the threshold (knee mode only).
    pub tied_at_cutoff: usize,
    pub summary: ScoreSummary,
}

impl SelectionResult {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.selected.len() as f64 * 100.0 / self.total as f64
        }
    }
}

/// The `q`-quantile of `totals` (any order).
pub fn quantile_threshold(totals: &[f64], q: f64) -> Option<f64> {
    let mut sorted = totals.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile(&sorted, q)
}

/// Index of the knee in a descending sequence.
///
/// Both axes are scaled to [0, 1]; the knee maximises `1 - x - y`, the
/// distance below the chord from `(0, 1)` to `(1, 0)`. The earliest index
/// wins ties. Returns `None` when fewer than three points or the curve is flat.
pub fn knee_index(sorted_desc: &[f64]) -> Option<usize> {
    let n = sorted_desc.len();
    if n < 3 {
        return None;
    }
    let hi = sorted_desc[0];
    let lo = sorted_desc[n - 1];
    if (hi - lo).abs() < 1e-12 {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, &s) in sorted_desc.iter().enumerate() {
        let x = i as f64 / (n - 1) as f64;
        let y = minmax_normalise(s, lo, hi);
        let d = 1.0 - x - y;
        match best {
            Some((_, bd)) if d <= bd => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

/// Number of genes knee mode selects: `knee + 1`, or all genes when there is
/// no knee, clamped to `[min_genes, max_genes]` and to the universe size.
pub fn knee_count(sorted_desc: &[f64], min_genes: usize, max_genes: usize) -> usize {
    let n = sorted_desc.len();
    let raw = knee_index(sorted_desc).map(|i| i + 1).unwrap_or(n);
    raw.max(min_genes).min(max_genes).min(n)
}

/// Apply the configured mode to genes already in rank order.
pub fn select(ranked: &[ScoredGene], cfg: &SelectionConfig) -> SelectionResult {
    let totals: Vec<f64> = ranked.iter().map(|g| g.total).collect();
    let summary = ScoreSummary::from_totals(&totals);

    let result = match cfg.mode {
        SelectionMode::Quantile => {
            let threshold = quantile_threshold(&totals, cfg.quantile).unwrap_or(0.0);
            let selected = ranked
                .iter()
                .filter(|g| g.total >= threshold)
                .map(|g| g.gene.clone())
                .collect();
            SelectionResult {
                method: SelectionMode::Quantile,
                threshold,
                selected,
                total: ranked.len(),
                knee_index: None,
                quantile: Some(cfg.quantile),
                tied_at_cutoff: 0,
                summary,
            }
        }
        SelectionMode::Knee => {
            let count = knee_count(&totals, cfg.min_genes, cfg.max_genes);
            let threshold = count.checked_sub(1).map(|i| totals[i]).unwrap_or(0.0);
            let tied_at_cutoff = if count == 0 {
                0
            } else {
                totals[count..].iter().take_while(|t| **t == threshold).count()
            };
            if tied_at_cutoff > 0 {
                warn!(threshold, tied = tied_at_cutoff, "Genes tied with the knee cutoff were left out");
            }
            SelectionResult {
                method: SelectionMode::Knee,
                threshold,
                selected: ranked.iter().take(count).map(|g| g.gene.clone()).collect(),
                total: ranked.len(),
                knee_index: knee_index(&totals),
                quantile: None,
                tied_at_cutoff,
                summary,
            }
        }
    };

    info!(
        method = ?result.method,
        threshold = result.threshold,
        selected = result.selected.len(),
        total = result.total,
        "High-confidence selection"
    );
    result
}
