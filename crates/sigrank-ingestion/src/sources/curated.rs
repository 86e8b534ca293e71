//! Curated reference-organism annotations from a GFF3 gene-feature file.

use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::PathBuf;

use tracing::debug;

use sigrank_common::config::CuratedConfig;
use sigrank_common::entities::CuratedEvidence;
use sigrank_common::{GeneKey, LayerKind, Result, SigrankError, SourceKind};

use super::{open_source, source_name, text_lines, EvidenceSource, LoadStats, SourceTable};
use crate::resolve::IdentifierResolver;

/// Description attributes, most curated first.
pub const DESCRIPTION_PRIORITY: [&str; 4] = [
    "curator_summary",
    "full_name",
    "computational_description",
    "Note",
];

#[derive(Debug, Clone)]
pub struct CuratedSource {
    path: PathBuf,
    keywords: Vec<String>,
}

impl CuratedSource {
    pub fn from_config(cfg: &CuratedConfig) -> Result<Self> {
        let path = cfg
            .file
            .clone()
            .ok_or_else(|| SigrankError::Config("evidence.curated.file is not set".into()))?;
        let mut keywords: Vec<String> = Vec::new();
        for kw in cfg.keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
            if !keywords.iter().any(|k| k.eq_ignore_ascii_case(kw)) {
                keywords.push(kw.to_string());
            }
        }
        Ok(Self { path, keywords })
    }

    /// Keywords occurring in `text`, case-insensitive, in configuration order.
    pub fn keyword_hits(&self, text: &str) -> Vec<String> {
        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|kw| haystack.contains(&kw.to_lowercase()))
            .cloned()
            .collect()
    }
}

/// Parse the ninth GFF3 column (`key=value;key=value`), percent-decoding values.
pub fn parse_attributes(column: &str) -> BTreeMap<String, String> {
    column
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), percent_decode(v.trim())))
        .collect()
}

fn percent_decode(value: &str) -> String {
    match urlencoding::decode(value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value.to_string(),
    }
}

/// Pick the description by attribute priority.
pub fn describe(attrs: &BTreeMap<String, String>) -> String {
    DESCRIPTION_PRIORITY
        .iter()
        .find_map(|key| attrs.get(*key).filter(|v| !v.is_empty()))
        .cloned()
        .unwrap_or_default()
}

impl EvidenceSource for CuratedSource {
    type Record = CuratedEvidence;

    fn layer(&self) -> LayerKind {
        LayerKind::Curated
    }

    fn load(&self, resolver: &IdentifierResolver) -> Result<SourceTable<CuratedEvidence>> {
        let name = source_name(&self.path);
        let reader = BufReader::new(open_source(&self.path, LayerKind::Curated)?);
        let mut stats = LoadStats::default();
        let mut records: BTreeMap<GeneKey, CuratedEvidence> = BTreeMap::new();

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

            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 9 {
                stats.malformed += 1;
                continue;
            }
            // Top-level gene features only; mRNA/exon/CDS rows are skipped.
            if parts[2] != "gene" {
                continue;
            }

            let attrs = parse_attributes(parts[8]);
            let locus = ["ID", "Name"]
                .iter()
                .filter_map(|k| attrs.get(*k).map(String::as_str))
                .chain(std::iter::once(parts[8]))
                .find_map(|candidate| resolver.resolve(candidate, SourceKind::CuratedFeature).ok());
            let Some(locus) = locus else {
                debug!(source = %name, line = i + 1, "Gene feature without a reference locus");
                stats.unresolved += 1;
                continue;
            };
            if records.contains_key(&locus) {
                debug!(source = %name, line = i + 1, locus = %locus, "Duplicate gene feature ignored");
                continue;
            }

            let symbol = attrs.get("symbol").cloned().unwrap_or_default();
            let description = describe(&attrs);
            let keyword_hits = self.keyword_hits(&format!("{symbol} {description}"));

            records.insert(locus, CuratedEvidence { symbol, description, keyword_hits });
        }

        Ok(SourceTable::new(records, stats))
    }
}
