//! sigrank-common: Shared types, errors, and configuration used across all sigrank crates.

pub mod error;
pub mod entities;
pub mod predicate;
pub mod config;

// Re-export commonly used types
pub use config::{ConfigDocument, RankerConfig, ScoringConfig, SelectionConfig, SelectionMode};
pub use entities::{GeneEvidence, GeneKey, LayerKind, LayerSource, SourceKind};
pub use error::{ResolutionError, Result, SigrankError};
pub use predicate::Predicate;
