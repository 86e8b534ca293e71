//! Protein-domain annotations from one or more files.
//!
//! Supported layouts:
//! - declared-schema TSV: an id column and a domain column whose cells may
//!   hold several ids separated by `;`, `,`, `|` or whitespace
//! - HMMER `--domtblout`: whitespace-separated, query name in column 4,
//!   target accession in column 2, best-domain E-value in column 13
//!
//! Version suffixes (`PF00656.26`) are stripped. The expected-domain allow-list
//! depends on ontology categories and is applied during evidence assembly.

use std::collections::BTreeMap;
use std::io::BufReader;

use tracing::{debug, warn};

use sigrank_common::config::{DomainConfig, DomainFileConfig, DomainFormat};
use sigrank_common::entities::{DomainEvidence, DomainHit};
use sigrank_common::{GeneKey, LayerKind, Result, SigrankError, SourceKind};

use super::{cell, log_stats, open_source, open_tsv, source_name, text_lines, ColumnSchema, EvidenceSource, LoadStats, SourceTable};
use crate::resolve::IdentifierResolver;

/// Fixed columns of a domtblout line before the free-text description.
const DOMTBL_MIN_COLUMNS: usize = 22;

#[derive(Debug, Clone)]
pub struct DomainSource {
    files: Vec<DomainFileConfig>,
}

type HitMap = BTreeMap<GeneKey, BTreeMap<(String, String), Option<f64>>>;

impl DomainSource {
    pub fn from_config(cfg: &DomainConfig) -> Result<Self> {
        if cfg.files.is_empty() {
            return Err(SigrankError::Config("evidence.domain lists no files".into()));
        }
        Ok(Self { files: cfg.files.clone() })
    }

    fn load_tsv(
        &self,
        file: &DomainFileConfig,
        resolver: &IdentifierResolver,
        hits: &mut HitMap,
        stats: &mut LoadStats,
    ) -> Result<()> {
        let name = source_name(&file.path);
        let mut reader = open_tsv(&file.path, LayerKind::Domain)?;
        let idx = ColumnSchema::new(&name, &[file.id_column.as_str(), file.domain_column.as_str()])
            .locate(reader.headers()?)?;

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
            let Some(raw_id) = cell(&row, idx[0]) else {
                stats.malformed += 1;
                continue;
            };
            let Some(domains) = cell(&row, idx[1]) else {
                continue;
            };
            let key = match resolver.resolve(raw_id, SourceKind::Domain) {
                Ok(k) => k,
                Err(e) => {
                    debug!(source = %name, line = i + 2, error = %e, "Skipping unresolved domain row");
                    stats.unresolved += 1;
                    continue;
                }
            };
            for domain_id in split_domain_ids(domains) {
                insert_hit(hits, key.clone(), domain_id, &file.database, None);
            }
        }
        Ok(())
    }

    fn load_domtblout(
        &self,
        file: &DomainFileConfig,
        resolver: &IdentifierResolver,
        hits: &mut HitMap,
        stats: &mut LoadStats,
    ) -> Result<()> {
        let name = source_name(&file.path);
        let reader = BufReader::new(open_source(&file.path, LayerKind::Domain)?);

        for (i, line) in text_lines(reader).enumerate() {
            let Some(line) = line? else {
                debug!(source = %name, line = i + 1, "Skipping line that is not valid UTF-8");
                stats.rows_read += 1;
                stats.malformed += 1;
                continue;
            };
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            stats.rows_read += 1;

            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < DOMTBL_MIN_COLUMNS {
                debug!(source = %name, line = i + 1, columns = parts.len(), "Short domtblout line");
                stats.malformed += 1;
                continue;
            }
            let Ok(evalue) = parts[12].parse::<f64>() else {
                stats.malformed += 1;
                continue;
            };
            if evalue > file.evalue_threshold {
                continue;
            }
            // Fall back to the target name when the database has no accessions.
            let accession = if parts[1] == "-" { parts[0] } else { parts[1] };

            let key = match resolver.resolve(parts[3], SourceKind::Domain) {
                Ok(k) => k,
                Err(e) => {
                    debug!(source = %name, line = i + 1, error = %e, "Skipping unresolved domtblout hit");
                    stats.unresolved += 1;
                    continue;
                }
            };
            insert_hit(hits, key, strip_version(accession), &file.database, Some(evalue));
        }
        Ok(())
    }
}

/// `"PF00656.26; PF00931|PF01582"` → `["PF00656", "PF00931", "PF01582"]`
pub fn split_domain_ids(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(|c: char| matches!(c, ';' | ',' | '|') || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "-")
        .map(strip_version)
}

pub fn strip_version(id: &str) -> &str {
    id.split('.').next().unwrap_or(id)
}

/// One hit per (domain, database); the smallest E-value wins.
fn insert_hit(hits: &mut HitMap, key: GeneKey, domain_id: &str, database: &str, evalue: Option<f64>) {
    let slot = hits
        .entry(key)
        .or_default()
        .entry((domain_id.to_string(), database.to_string()))
        .or_insert(evalue);
    if let (Some(new), Some(old)) = (evalue, *slot) {
        if new < old {
            *slot = Some(new);
        }
    } else if slot.is_none() {
        *slot = evalue;
    }
}

impl EvidenceSource for DomainSource {
    type Record = DomainEvidence;

    fn layer(&self) -> LayerKind {
        LayerKind::Domain
    }

    /// Files are merged. A file that cannot be read is skipped with a warning;
    /// the layer fails only when no file could be read.
    fn load(&self, resolver: &IdentifierResolver) -> Result<SourceTable<DomainEvidence>> {
        let mut hits: HitMap = BTreeMap::new();
        let mut stats = LoadStats::default();
        let mut loaded = 0usize;
        let mut last_error = None;

        for file in &self.files {
            let mut file_stats = LoadStats::default();
            let outcome = match file.format {
                DomainFormat::Tsv => self.load_tsv(file, resolver, &mut hits, &mut file_stats),
                DomainFormat::Domtblout => self.load_domtblout(file, resolver, &mut hits, &mut file_stats),
            };
            match outcome {
                Ok(()) => {
                    loaded += 1;
                    debug!(file = %file.path.display(), database = %file.database, rows = file_stats.rows_read, "Read domain file");
                    stats.rows_read += file_stats.rows_read;
                    stats.unresolved += file_stats.unresolved;
                    stats.malformed += file_stats.malformed;
                }
                Err(e) => {
                    warn!(file = %file.path.display(), error = %e, "Skipping domain file");
                    last_error = Some(e);
                }
            }
        }

        if loaded == 0 {
            return Err(last_error.unwrap_or_else(|| SigrankError::Config("no domain files configured".into())));
        }

        let records = hits
            .into_iter()
            .map(|(gene, by_domain)| {
                let hits = by_domain
                    .into_iter()
                    .map(|((domain_id, database), evalue)| DomainHit { domain_id, database, evalue })
                    .collect();
                (gene, DomainEvidence { hits })
            })
            .collect();

        let table = SourceTable::new(records, stats);
        if self.files.len() > 1 {
            log_stats(LayerKind::Domain, &table.stats);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn resolver() -> IdentifierResolver {
        IdentifierResolver::new(r"^(G\d+)", ".v1", r"AT[1-5MC]G\d{5}").unwrap()
    }

    fn file(path: &Path, format: DomainFormat, database: &str) -> DomainFileConfig {
        DomainFileConfig {
            path: path.to_path_buf(),
            database: database.into(),
            format,
            id_column: "gene".into(),
            domain_column: "pfam".into(),
            evalue_threshold: 1e-5,
        }
    }

    #[test]
    fn test_split_ids() {
        let ids: Vec<&str> = split_domain_ids("PF00656.26; PF00931|PF01582 , -").collect();
        assert_eq!(ids, vec!["PF00656", "PF00931", "PF01582"]);
    }

    #[test]
    fn test_tsv_and_domtblout_merge() {
        let dir = tempfile::tempdir().unwrap();
        let tsv = dir.path().join("pfam.tsv");
        std::fs::write(&tsv, "gene\tpfam\nG1.1\tPF00656.26;PF00931\nG2.1\t\nZZ\tPF00001\n").unwrap();

        let domtbl = dir.path().join("scan.domtblout");
        let mut content = String::from("# target name accession tlen query name ...\n");
        // 23 columns: target, acc, tlen, query, acc, qlen, E, score, bias, #, of, c-Evalue, i-Evalue, ...
        content.push_str("Peptidase_C14 PF00656.26 250 G1.1.p - 400 1e-30 100.0 0.1 1 1 1e-33 1e-30 99.0 0.1 1 250 10 260 5 270 0.95 Caspase\n");
        content.push_str("NB-ARC PF00931.25 280 G3.1.p - 900 1e-3 10.0 0.1 1 1 1e-4 1e-3 9.0 0.1 1 280 10 290 5 300 0.80 NB-ARC\n");
        content.push_str("short line\n");
        std::fs::write(&domtbl, content).unwrap();

        let cfg = DomainConfig {
            enabled: true,
            files: vec![
                file(&tsv, DomainFormat::Tsv, "pfam"),
                file(&domtbl, DomainFormat::Domtblout, "hmmscan"),
                file(&dir.path().join("missing.tsv"), DomainFormat::Tsv, "interpro"),
            ],
            expected_domains: Default::default(),
        };
        let table = DomainSource::from_config(&cfg).unwrap().load(&resolver()).unwrap();

        let g1 = &table.records[&GeneKey::new("G1.v1")];
        let labels: Vec<String> = g1.hits.iter().map(|h| h.label()).collect();
        assert_eq!(
            labels,
            vec!["PF00656(hmmscan,E=1.0e-30)", "PF00656(pfam)", "PF00931(pfam)"]
        );
        assert_eq!(g1.unique_domain_ids().len(), 2);

        // E-value above threshold is filtered, empty domain cell contributes nothing.
        assert!(!table.records.contains_key(&GeneKey::new("G3.v1")));
        assert!(!table.records.contains_key(&GeneKey::new("G2.v1")));
        assert_eq!(table.stats.unresolved, 1);
        assert_eq!(table.stats.malformed, 1);
    }

    #[test]
    fn test_domtblout_invalid_utf8_row_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let domtbl = dir.path().join("scan.domtblout");
        let mut content = b"Peptidase_C14 PF00656.26 250 G1.1.p - 400 1e-30 100.0 0.1 1 1 1e-33 1e-30 99.0 0.1 1 250 10 260 5 270 0.95 Caspase\n".to_vec();
        content.extend_from_slice(b"NB-ARC PF00931.25 280 G2.1.p - 900 1e-9 10.0 0.1 1 1 1e-9 1e-9 9.0 0.1 1 280 10 290 5 300 0.80 NB-ARC \xfe\n");
        std::fs::write(&domtbl, content).unwrap();

        let cfg = DomainConfig {
            enabled: true,
            files: vec![file(&domtbl, DomainFormat::Domtblout, "hmmscan")],
            expected_domains: Default::default(),
        };
        let table = DomainSource::from_config(&cfg).unwrap().load(&resolver()).unwrap();
        assert!(table.records.contains_key(&GeneKey::new("G1.v1")));
        assert!(!table.records.contains_key(&GeneKey::new("G2.v1")));
        assert_eq!(table.stats.malformed, 1);
    }

    #[test]
    fn test_all_files_missing_disables_layer() {
        let cfg = DomainConfig {
            enabled: true,
            files: vec![file(Path::new("/nonexistent/pfam.tsv"), DomainFormat::Tsv, "pfam")],
            expected_domains: Default::default(),
        };
        let err = DomainSource::from_config(&cfg).unwrap().load(&resolver()).unwrap_err();
        assert!(matches!(err, SigrankError::SourceUnavailable { .. }));
    }
}
