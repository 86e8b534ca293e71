use std::path::PathBuf;

use thiserror::Error;

use crate::entities::{LayerKind, SourceKind};

/// An identifier that the resolver could not canonicalise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("identifier {raw:?} does not match the {kind} pattern")]
    NoMatch { raw: String, kind: SourceKind },
}

#[derive(Debug, Error)]
pub enum SigrankError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("{layer} source unavailable ({}): {reason}", path.display())]
    SourceUnavailable {
        layer: LayerKind,
        path: PathBuf,
        reason: String,
    },

    #[error("Malformed record in {source_name} line {line}: {reason}")]
    MalformedRecord {
        source_name: String,
        line: usize,
        reason: String,
    },

    #[error("Candidate universe is empty ({unresolved} ontology identifiers could not be resolved)")]
    EmptyUniverse { unresolved: usize },

    #[error("Run directory already exists: {} (pass --overwrite to reuse it, or change the config / run name)", .0.display())]
    Collision(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Table error: {0}")]
    Csv(#[from] csv::Error),
}

impl SigrankError {
    /// True for failures that must abort a run rather than degrade a layer.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SigrankError::Config(_) | SigrankError::Collision(_) | SigrankError::EmptyUniverse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SigrankError>;
