//! Evidence source normalisers.

pub mod ontology;
pub mod orthology;
pub mod domain;
pub mod curated;
pub mod context;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use sigrank_common::{GeneKey, LayerKind, LayerSource, Result, SigrankError};

use crate::resolve::IdentifierResolver;

pub use context::ContextSource;
pub use curated::CuratedSource;
pub use domain::DomainSource;
pub use ontology::OntologySource;
pub use orthology::OrthologySource;

/// Per-source counters; per-record failures end up here instead of raising.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub rows_read: usize,
    pub records_kept: usize,
    pub unresolved: usize,
    pub malformed: usize,
}

/// Normalised evidence for one source, keyed by canonical gene key.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable<R> {
    pub records: BTreeMap<GeneKey, R>,
    pub stats: LoadStats,
}

impl<R> SourceTable<R> {
    pub fn new(records: BTreeMap<GeneKey, R>, mut stats: LoadStats) -> Self {
        stats.records_kept = records.len();
        Self { records, stats }
    }

    pub fn get(&self, key: &GeneKey) -> Option<&R> {
        self.records.get(key)
    }
}

/// Common interface for every evidence source.
///
/// Loading is blocking file I/O; callers run it on a blocking thread.
pub trait EvidenceSource: Send + Sync {
    type Record: Send;

    fn layer(&self) -> LayerKind;

    /// Read the source file(s) and normalise them into per-gene records.
    fn load(&self, resolver: &IdentifierResolver) -> Result<SourceTable<Self::Record>>;
}

/// Load an optional layer, degrading any failure to `Disabled`.
pub fn load_optional<S: EvidenceSource>(
    source: &S,
    resolver: &IdentifierResolver,
) -> LayerSource<SourceTable<S::Record>> {
    match source.load(resolver) {
        Ok(table) => {
            log_stats(source.layer(), &table.stats);
            LayerSource::Enabled(table)
        }
        Err(e) => {
            warn!(layer = %source.layer(), error = %e, "Evidence layer disabled");
            LayerSource::disabled(e.to_string())
        }
    }
}

pub(crate) fn log_stats(layer: LayerKind, stats: &LoadStats) {
    info!(
        layer = %layer,
        rows_read = stats.rows_read,
        records_kept = stats.records_kept,
        unresolved = stats.unresolved,
        malformed = stats.malformed,
        "Loaded evidence source"
    );
}

// ── Tabular helpers ──────────────────────────────────────────────────────────

/// Tab-delimited reader with a header row. Quotes are literal text.
pub(crate) fn open_tsv(path: &Path, layer: LayerKind) -> Result<csv::Reader<File>> {
    let file = open_source(path, layer)?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(file))
}

pub(crate) fn open_source(path: &Path, layer: LayerKind) -> Result<File> {
    File::open(path).map_err(|e| SigrankError::SourceUnavailable {
        layer,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Declared column names for a tabular source, located once against the header.
#[derive(Debug, Clone)]
pub(crate) struct ColumnSchema {
    source_name: String,
    columns: Vec<String>,
}

impl ColumnSchema {
    pub fn new(source_name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            source_name: source_name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Index of every declared column, in declaration order.
    pub fn locate(&self, headers: &csv::StringRecord) -> Result<Vec<usize>> {
        self.columns
            .iter()
            .map(|col| {
                headers.iter().position(|h| h.trim() == col).ok_or_else(|| {
                    SigrankError::MalformedRecord {
                        source_name: self.source_name.clone(),
                        line: 1,
                        reason: format!("missing column {col:?}"),
                    }
                })
            })
            .collect()
    }
}

/// Trimmed cell, `None` when absent or empty.
pub(crate) fn cell(record: &csv::StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Lines of a text source with the trailing `\n` or `\r\n` removed.
/// A line that is not valid UTF-8 comes back as `Ok(None)` so the caller can
/// count it as malformed and carry on with the rest of the file.
pub(crate) fn text_lines<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<Option<String>>> {
    reader.split(b'\n').map(|line| {
        line.map(|mut bytes| {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            String::from_utf8(bytes).ok()
        })
    })
}

pub(crate) fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
