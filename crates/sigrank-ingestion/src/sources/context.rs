//! Developmental / expression context terms per reference locus.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use sigrank_common::config::ContextConfig;
use sigrank_common::entities::ContextEvidence;
use sigrank_common::{GeneKey, LayerKind, Result, SigrankError, SourceKind};

use super::{cell, open_tsv, source_name, ColumnSchema, EvidenceSource, LoadStats, SourceTable};
use crate::resolve::IdentifierResolver;

/// Built-in stage / condition keywords matched against term text.
pub const STAGE_KEYWORDS: [&str; 6] = [
    "senescence",
    "senescent",
    "cell death",
    "hypersensitive",
    "dying",
    "necrosis",
];

pub fn is_stage_term(term: &str) -> bool {
    let lower = term.to_lowercase();
    STAGE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[derive(Debug, Clone)]
pub struct ContextSource {
    path: PathBuf,
    locus_column: String,
    term_column: String,
}

impl ContextSource {
    pub fn from_config(cfg: &ContextConfig) -> Result<Self> {
        let path = cfg
            .file
            .clone()
            .ok_or_else(|| SigrankError::Config("evidence.context.file is not set".into()))?;
        Ok(Self {
            path,
            locus_column: cfg.locus_column.clone(),
            term_column: cfg.term_column.clone(),
        })
    }
}

impl EvidenceSource for ContextSource {
    type Record = ContextEvidence;

    fn layer(&self) -> LayerKind {
        LayerKind::Context
    }

    fn load(&self, resolver: &IdentifierResolver) -> Result<SourceTable<ContextEvidence>> {
        let name = source_name(&self.path);
        let mut reader = open_tsv(&self.path, LayerKind::Context)?;
        let idx = ColumnSchema::new(&name, &[self.locus_column.as_str(), self.term_column.as_str()])
            .locate(reader.headers()?)?;

        let mut stats = LoadStats::default();
        let mut records: BTreeMap<GeneKey, ContextEvidence> = BTreeMap::new();

        for (i, row) in reader.records().enumerate() {
            stats.rows_read += 1;
            let row = match row {
                Ok(r) => r,
                Err(_) => {
                    stats.malformed += 1;
                    continue;
                }
            };
            let (Some(raw_locus), Some(term)) = (cell(&row, idx[0]), cell(&row, idx[1])) else {
                stats.malformed += 1;
                continue;
            };
            let locus = match resolver.resolve(raw_locus, SourceKind::ContextLocus) {
                Ok(l) => l,
                Err(e) => {
                    debug!(source = %name, line = i + 2, error = %e, "Skipping unresolved context row");
                    stats.unresolved += 1;
                    continue;
                }
            };

            let entry = records.entry(locus).or_default();
            if !entry.terms.iter().any(|t| t == term) {
                entry.terms.push(term.to_string());
                if is_stage_term(term) {
                    entry.stage_hits.push(term.to_string());
                }
            }
        }

        Ok(SourceTable::new(records, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stage_keywords() {
        assert!(is_stage_term("leaf senescence stage"));
        assert!(is_stage_term("Programmed Cell Death"));
        assert!(!is_stage_term("flowering stage"));
    }

    #[test]
    fn test_terms_deduplicated_per_locus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("po.tsv");
        std::fs::write(
            &path,
            "locus_name\tterm_name\n\
             AT5G45890\tleaf senescence stage\n\
             AT5G45890\tleaf senescence stage\n\
             AT5G45890\tvascular leaf\n\
             AT5G45890\tsenescent leaf\n\
             AT1G01010\tflower\n\
             unknown\tpetal\n",
        )
        .unwrap();

        let cfg = ContextConfig { enabled: true, file: Some(path), ..Default::default() };
        let resolver = IdentifierResolver::new("^(X)", "", r"AT[1-5MC]G\d{5}").unwrap();
        let table = ContextSource::from_config(&cfg).unwrap().load(&resolver).unwrap();

        let sag = &table.records[&GeneKey::new("AT5G45890")];
        assert_eq!(sag.terms, vec!["leaf senescence stage", "vascular leaf", "senescent leaf"]);
        assert_eq!(sag.stage_hits, vec!["leaf senescence stage", "senescent leaf"]);

        let nac = &table.records[&GeneKey::new("AT1G01010")];
        assert!(nac.stage_hits.is_empty());
        assert_eq!(table.stats.unresolved, 1);
    }
}
