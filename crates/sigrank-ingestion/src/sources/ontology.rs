//! Ontology annotations: the mandatory source defining the candidate universe.
//!
//! A gene enters the universe when at least one of its annotation rows names a
//! weighted term (and passes the branch filter). Repeated rows for the same
//! (gene, term) pair count once.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::debug;

use sigrank_common::config::{OntologyConfig, WeightsConfig};
use sigrank_common::entities::OntologyEvidence;
use sigrank_common::{GeneKey, LayerKind, Result, SigrankError, SourceKind};

use super::{cell, open_tsv, source_name, ColumnSchema, EvidenceSource, LoadStats, SourceTable};
use crate::resolve::IdentifierResolver;

#[derive(Debug, Clone)]
pub struct OntologySource {
    path: PathBuf,
    id_column: String,
    term_column: String,
    branch_column: String,
    branch_filter: Option<String>,
    /// term id → categories weighting it
    term_categories: BTreeMap<String, BTreeSet<String>>,
}

impl OntologySource {
    pub fn from_config(cfg: &OntologyConfig, weights: &WeightsConfig) -> Self {
        let mut term_categories: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (category, terms) in &weights.ontology {
            for term in terms.keys() {
                term_categories
                    .entry(term.clone())
                    .or_default()
                    .insert(category.clone());
            }
        }
        Self {
            path: cfg.file.clone(),
            id_column: cfg.id_column.clone(),
            term_column: cfg.term_column.clone(),
            branch_column: cfg.branch_column.clone(),
            branch_filter: cfg.effective_branch_filter(),
            term_categories,
        }
    }
}

impl EvidenceSource for OntologySource {
    type Record = OntologyEvidence;

    fn layer(&self) -> LayerKind {
        LayerKind::Ontology
    }

    fn load(&self, resolver: &IdentifierResolver) -> Result<SourceTable<OntologyEvidence>> {
        let name = source_name(&self.path);
        let mut reader = open_tsv(&self.path, LayerKind::Ontology)?;

        let mut columns = vec![self.id_column.as_str(), self.term_column.as_str()];
        if self.branch_filter.is_some() {
            columns.push(self.branch_column.as_str());
        }
        let idx = ColumnSchema::new(&name, &columns).locate(reader.headers()?)?;

        let mut stats = LoadStats::default();
        let mut records: BTreeMap<GeneKey, OntologyEvidence> = BTreeMap::new();

        for (i, row) in reader.records().enumerate() {
            stats.rows_read += 1;
            let row = match row {
                Ok(r) => r,
                Err(e) => {
                    debug!(source = %name, line = i + 2, error = %e, "Skipping unreadable row");
                    stats.malformed += 1;
                    continue;
                }
            };

            let (Some(raw_id), Some(term)) = (cell(&row, idx[0]), cell(&row, idx[1])) else {
                stats.malformed += 1;
                continue;
            };
            let Some(categories) = self.term_categories.get(term) else {
                continue;
            };
            if let Some(filter) = &self.branch_filter {
                let branch = cell(&row, idx[2]).unwrap_or("");
                if !branch.eq_ignore_ascii_case(filter) {
                    continue;
                }
            }

            let key = match resolver.resolve(raw_id, SourceKind::Ontology) {
                Ok(k) => k,
                Err(e) => {
                    debug!(source = %name, line = i + 2, error = %e, "Skipping unresolved ontology row");
                    stats.unresolved += 1;
                    continue;
                }
            };

            let evidence = records.entry(key).or_default();
            evidence.terms.insert(term.to_string());
            evidence.categories.extend(categories.iter().cloned());
        }

        if records.is_empty() {
            return Err(SigrankError::EmptyUniverse { unresolved: stats.unresolved });
        }
        Ok(SourceTable::new(records, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn weights() -> WeightsConfig {
        serde_yaml::from_str(
            "ontology:\n  PCD: { 'GO:0012501': 5, 'GO:0010623': 3 }\n  ROS: { 'GO:0000302': 2, 'GO:0012501': 1 }\n",
        )
        .unwrap()
    }

    fn source(path: &Path, filter: Option<&str>) -> OntologySource {
        let cfg = OntologyConfig {
            file: path.to_path_buf(),
            id_column: "gene".into(),
            term_column: "GO".into(),
            branch_column: "level".into(),
            branch_filter: filter.map(String::from),
        };
        OntologySource::from_config(&cfg, &weights())
    }

    fn resolver() -> IdentifierResolver {
        IdentifierResolver::new(r"^(G\d+)", ".v1", "AT[1-5]G\\d{5}").unwrap()
    }

    const TABLE: &str = "gene\tGO\tlevel\n\
        G1.1.p\tGO:0012501\tBP\n\
        G1.2.p\tGO:0012501\tBP\n\
        G2.1.p\tGO:0000302\tBP\n\
        G3.1.p\tGO:0000302\tMF\n\
        G4.1.p\tGO:9999999\tBP\n\
        X9.1.p\tGO:0010623\tBP\n";

    #[test]
    fn test_universe_and_categories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("go.tsv");
        std::fs::write(&path, TABLE).unwrap();

        let table = source(&path, Some("BP")).load(&resolver()).unwrap();
        let genes: Vec<&str> = table.records.keys().map(|k| k.as_str()).collect();
        assert_eq!(genes, vec!["G1.v1", "G2.v1"]);

        let g1 = &table.records[&GeneKey::new("G1.v1")];
        assert_eq!(g1.terms.len(), 1, "duplicate rows count once");
        assert_eq!(g1.category_label(), "PCD-ROS");

        assert_eq!(table.stats.rows_read, 6);
        assert_eq!(table.stats.unresolved, 1);
        assert_eq!(table.stats.records_kept, 2);
    }

    #[test]
    fn test_without_branch_filter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("go.tsv");
        std::fs::write(&path, TABLE).unwrap();

        let table = source(&path, Some("ALL")).load(&resolver()).unwrap();
        assert!(table.records.contains_key(&GeneKey::new("G3.v1")));
    }

    #[test]
    fn test_empty_universe_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("go.tsv");
        std::fs::write(&path, "gene\tGO\tlevel\nX1\tGO:0012501\tBP\n").unwrap();

        let err = source(&path, Some("BP")).load(&resolver()).unwrap_err();
        assert!(matches!(err, SigrankError::EmptyUniverse { unresolved: 1 }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_column_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("go.tsv");
        std::fs::write(&path, "gene\tterm\nG1\tGO:0012501\n").unwrap();
        assert!(source(&path, None).load(&resolver()).is_err());
    }
}
