//! sigrank-ingestion: Evidence loading.
//! Covers the file-facing half of a ranking run:
//! - Identifier resolution into canonical gene keys
//! - One normaliser per evidence source (ontology, orthology, domain, curated, context)
//! - Assembly of per-gene evidence over the ontology-derived candidate universe

pub mod resolve;
pub mod sources;
pub mod evidence;

pub use evidence::{load_evidence, EvidenceBundle, LayerReport};
pub use resolve::IdentifierResolver;
pub use sources::{EvidenceSource, LoadStats, SourceTable};
