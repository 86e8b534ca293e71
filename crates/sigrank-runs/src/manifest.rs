//! Run manifest: the provenance record sealing a completed run.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use sigrank_common::Result;

use crate::hash::file_sha256;
use crate::run_dir::RunLayout;

pub const MANIFEST_FILE: &str = "manifest.json";

/// How rows are counted for an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Delimited table with a header line.
    Table,
    /// One identifier per non-empty line.
    List,
    /// Free-form text or JSON; no row count.
    Document,
}

/// An artifact produced by the pipeline, registered for the manifest.
#[derive(Debug, Clone)]
pub struct ArtifactSpec {
    pub path: PathBuf,
    pub description: String,
    pub kind: ArtifactKind,
}

impl ArtifactSpec {
    pub fn new(path: impl Into<PathBuf>, description: impl Into<String>, kind: ArtifactKind) -> Self {
        Self { path: path.into(), description: description.into(), kind }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Relative to the run directory.
    pub path: String,
    pub description: String,
    pub row_count: Option<u64>,
    pub size_bytes: u64,
    /// Hex SHA-256 of the file contents.
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub config_hash: String,
    pub files: Vec<ManifestEntry>,
}

impl RunManifest {
    /// Describe every artifact that exists on disk. Missing artifacts are skipped with a warning.
    pub fn build(layout: &RunLayout, config_hash: &str, artifacts: &[ArtifactSpec]) -> Result<Self> {
        let mut files = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            if !artifact.path.is_file() {
                warn!(path = %artifact.path.display(), "Artifact missing; left out of manifest");
                continue;
            }
            let size_bytes = fs::metadata(&artifact.path)?.len();
            let row_count = count_rows(&artifact.path, artifact.kind)?;
            let checksum = file_sha256(&artifact.path)?;
            debug!(path = %artifact.path.display(), size_bytes, ?row_count, "Registered artifact");

            files.push(ManifestEntry {
                path: layout.relative(&artifact.path),
                description: artifact.description.clone(),
                row_count,
                size_bytes,
                checksum,
            });
        }

        Ok(Self {
            run_id: layout.run_id.clone(),
            created_at: Utc::now(),
            config_hash: config_hash.to_string(),
            files,
        })
    }

    /// Write `outputs/manifest.json` through a temp file + rename so the
    /// manifest either exists completely or not at all.
    pub fn write(&self, layout: &RunLayout) -> Result<PathBuf> {
        let path = layout.output_path(MANIFEST_FILE);
        let tmp = layout.output_path(&format!(".{MANIFEST_FILE}.tmp"));
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, &path)?;
        info!(path = %path.display(), files = self.files.len(), "Wrote run manifest");
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

fn count_rows(path: &Path, kind: ArtifactKind) -> Result<Option<u64>> {
    if kind == ArtifactKind::Document {
        return Ok(None);
    }
    let reader = BufReader::new(fs::File::open(path)?);
    let mut lines = 0u64;
    for line in reader.lines() {
        if !line?.trim().is_empty() {
            lines += 1;
        }
    }
    Ok(Some(match kind {
        ArtifactKind::Table => lines.saturating_sub(1),
        _ => lines,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256_hex;
    use crate::run_dir::RunId;

    fn layout(dir: &Path) -> RunLayout {
        RunLayout::create(dir, &RunId::generate("p", "cafebabe", None), false).unwrap()
    }

    #[test]
    fn test_manifest_counts_rows_and_checksums() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());

        let table = layout.output_path("p_genes.scored.tsv");
        fs::write(&table, "gene\ttotal\nA\t3\nB\t1\n").unwrap();
        let list = layout.output_path("p_genes.base.txt");
        fs::write(&list, "A\nB\nC\n").unwrap();
        let doc = layout.output_path("p_run_summary.json");
        fs::write(&doc, "{}").unwrap();

        let manifest = RunManifest::build(
            &layout,
            "cafebabe",
            &[
                ArtifactSpec::new(&table, "scored", ArtifactKind::Table),
                ArtifactSpec::new(&list, "base", ArtifactKind::List),
                ArtifactSpec::new(&doc, "summary", ArtifactKind::Document),
            ],
        )
        .unwrap();

        assert_eq!(manifest.files.len(), 3);
        assert_eq!(manifest.files[0].path, "outputs/p_genes.scored.tsv");
        assert_eq!(manifest.files[0].row_count, Some(2));
        assert_eq!(manifest.files[1].row_count, Some(3));
        assert_eq!(manifest.files[2].row_count, None);
        assert_eq!(manifest.files[2].size_bytes, 2);
        assert_eq!(manifest.files[2].checksum, sha256_hex(b"{}"));
    }

    #[test]
    fn test_missing_artifact_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        let manifest = RunManifest::build(
            &layout,
            "cafebabe",
            &[ArtifactSpec::new(layout.output_path("nope.tsv"), "missing", ArtifactKind::Table)],
        )
        .unwrap();
        assert!(manifest.files.is_empty());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        let manifest = RunManifest::build(&layout, "cafebabe", &[]).unwrap();
        let path = manifest.write(&layout).unwrap();
        assert!(!layout.output_path(".manifest.json.tmp").exists());
        assert_eq!(RunManifest::load(&path).unwrap(), manifest);
    }
}
