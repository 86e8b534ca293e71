//! sigrank-ranker: Capped multi-evidence scoring engine.
//! Per-layer scores with hard caps, rule-based synergy bonuses, aggregation,
//! high-confidence selection and the output tables of a run.

pub mod weights;
pub mod normalise;
pub mod scorer;
pub mod synergy;
pub mod aggregate;
pub mod selection;
pub mod report;
pub mod pipeline;

pub use aggregate::{aggregate, ScoredGene};
pub use pipeline::{run, RunOptions, RunOutcome};
pub use scorer::LayerScore;
pub use selection::{select, SelectionResult};
pub use synergy::{SynergyResult, SynergyRule};
pub use weights::{LayerCaps, ScoringWeights};
