//! Run identifiers and the on-disk run directory layout.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde_yaml::Value;
use tracing::{info, warn};

use sigrank_common::{Result, SigrankError};

use crate::manifest::MANIFEST_FILE;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";
pub const RUNS_DIR: &str = "runs";
pub const CONFIG_SNAPSHOT: &str = "config_used.yaml";

/// `timestamp__prefix__hash8[__label]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunId {
    pub timestamp: String,
    pub prefix: String,
    pub config_hash: String,
    pub label: Option<String>,
}

impl RunId {
    /// Run id stamped with the current local time.
    pub fn generate(prefix: &str, config_hash: &str, label: Option<&str>) -> Self {
        Self::at(Local::now().naive_local(), prefix, config_hash, label)
    }

    pub fn at(time: NaiveDateTime, prefix: &str, config_hash: &str, label: Option<&str>) -> Self {
        let label = label
            .map(sanitize_component)
            .filter(|l| !l.is_empty());
        Self {
            timestamp: time.format(TIMESTAMP_FORMAT).to_string(),
            prefix: sanitize_component(prefix),
            config_hash: config_hash.to_string(),
            label,
        }
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}__{}__{}", self.timestamp, self.prefix, self.config_hash)?;
        if let Some(label) = &self.label {
            write!(f, "__{label}")?;
        }
        Ok(())
    }
}

/// Keep run-id components to a filesystem-safe alphabet.
fn sanitize_component(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect()
}

/// Paths of one run directory.
#[derive(Debug, Clone)]
pub struct RunLayout {
    pub run_id: String,
    pub output_root: PathBuf,
    pub run_dir: PathBuf,
    pub outputs: PathBuf,
    pub qc: PathBuf,
    pub logs: PathBuf,
}

impl RunLayout {
    /// Create `<output_root>/runs/<run_id>/{outputs,qc,logs}`.
    ///
    /// The run directory itself is created with a single `create_dir`, so two
    /// concurrent runs with the same id cannot both succeed. An existing
    /// directory is a [`SigrankError::Collision`] unless `overwrite` is set, in
    /// which case its manifest is removed first so an aborted rerun does not
    /// look complete.
    pub fn create(output_root: &Path, run_id: &RunId, overwrite: bool) -> Result<Self> {
        let runs_dir = output_root.join(RUNS_DIR);
        fs::create_dir_all(&runs_dir)?;

        let run_id = run_id.to_string();
        let run_dir = runs_dir.join(&run_id);
        let reused = match fs::create_dir(&run_dir) {
            Ok(()) => false,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !overwrite {
                    return Err(SigrankError::Collision(run_dir));
                }
                warn!(run_dir = %run_dir.display(), "Reusing existing run directory (--overwrite)");
                true
            }
            Err(e) => return Err(e.into()),
        };

        let layout = Self {
            run_id,
            output_root: output_root.to_path_buf(),
            outputs: run_dir.join("outputs"),
            qc: run_dir.join("qc"),
            logs: run_dir.join("logs"),
            run_dir,
        };
        for dir in [&layout.outputs, &layout.qc, &layout.logs] {
            fs::create_dir_all(dir)?;
        }
        if reused {
            match fs::remove_file(layout.output_path(MANIFEST_FILE)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!(run_id = %layout.run_id, run_dir = %layout.run_dir.display(), "Created run directory");
        Ok(layout)
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.outputs.join(file_name)
    }

    /// Path relative to the run directory, with `/` separators, for the manifest.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.run_dir).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Write the configuration document as used into `config_used.yaml`.
    pub fn write_config_snapshot(&self, config: &Value) -> Result<PathBuf> {
        let path = self.run_dir.join(CONFIG_SNAPSHOT);
        fs::write(&path, serde_yaml::to_string(config)?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 28)
            .unwrap()
            .and_hms_opt(14, 35, 1)
            .unwrap()
    }

    #[test]
    fn test_run_id_format() {
        let id = RunId::at(fixed_time(), "PCD_ROS", "abc12345", None);
        assert_eq!(id.to_string(), "2026-01-28_143501__PCD_ROS__abc12345");

        let labelled = RunId::at(fixed_time(), "PCD_ROS", "abc12345", Some("pilot run"));
        assert_eq!(labelled.to_string(), "2026-01-28_143501__PCD_ROS__abc12345__pilot_run");
    }

    #[test]
    fn test_blank_label_is_dropped() {
        let id = RunId::at(fixed_time(), "p", "h", Some("  "));
        assert_eq!(id.label, None);
    }

    #[test]
    fn test_collision_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let id = RunId::at(fixed_time(), "p", "deadbeef", None);

        let layout = RunLayout::create(dir.path(), &id, false).unwrap();
        assert!(layout.outputs.is_dir());
        assert!(layout.qc.is_dir());
        assert!(layout.logs.is_dir());

        let err = RunLayout::create(dir.path(), &id, false).unwrap_err();
        assert!(matches!(err, SigrankError::Collision(_)));

        assert!(RunLayout::create(dir.path(), &id, true).is_ok());
    }

    #[test]
    fn test_overwrite_removes_stale_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let id = RunId::at(fixed_time(), "p", "deadbeef", None);
        let first = RunLayout::create(dir.path(), &id, false).unwrap();
        let manifest = first.output_path(MANIFEST_FILE);
        let table = first.output_path("p_genes.scored.tsv");
        std::fs::write(&manifest, "{}").unwrap();
        std::fs::write(&table, "gene\n").unwrap();

        let second = RunLayout::create(dir.path(), &id, true).unwrap();
        assert_eq!(second.run_dir, first.run_dir);
        assert!(!manifest.exists());
        assert!(table.exists());
    }

    #[test]
    fn test_relative_paths_use_forward_slashes() {
        let dir = tempfile::tempdir().unwrap();
        let id = RunId::at(fixed_time(), "p", "deadbeef", None);
        let layout = RunLayout::create(dir.path(), &id, false).unwrap();
        assert_eq!(layout.relative(&layout.output_path("a.tsv")), "outputs/a.tsv");
    }

    #[test]
    fn test_config_snapshot_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let id = RunId::at(fixed_time(), "p", "deadbeef", None);
        let layout = RunLayout::create(dir.path(), &id, false).unwrap();

        let value: Value = serde_yaml::from_str("output_prefix: p\nselection: { mode: knee }\n").unwrap();
        let path = layout.write_config_snapshot(&value).unwrap();
        let back: Value = serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back, value);
    }
}
