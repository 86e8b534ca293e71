//! The `latest` pointer: the only state shared between runs.
//!
//! It is rebound once per successful run, after the manifest exists, by
//! creating a new link next to it and renaming it into place.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use sigrank_common::Result;

use crate::run_dir::RUNS_DIR;

pub const LATEST_LINK: &str = "latest";
pub const LATEST_PATH_FILE: &str = "latest_path.txt";

/// Point `<output_root>/latest` at `run_dir`.
#[cfg(unix)]
pub fn update_latest(output_root: &Path, run_dir: &Path) -> Result<PathBuf> {
    let link = output_root.join(LATEST_LINK);
    let target = run_dir
        .strip_prefix(output_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| run_dir.to_path_buf());

    let tmp = output_root.join(format!(".{LATEST_LINK}.tmp-{}", std::process::id()));
    if tmp.symlink_metadata().is_ok() {
        fs::remove_file(&tmp)?;
    }
    std::os::unix::fs::symlink(&target, &tmp)?;
    fs::rename(&tmp, &link)?;

    info!(link = %link.display(), target = %target.display(), "Updated latest pointer");
    Ok(link)
}

/// Without symlinks the pointer is a text file holding the absolute run path.
#[cfg(not(unix))]
pub fn update_latest(output_root: &Path, run_dir: &Path) -> Result<PathBuf> {
    let file = output_root.join(LATEST_PATH_FILE);
    let tmp = output_root.join(format!(".{LATEST_PATH_FILE}.tmp-{}", std::process::id()));
    let absolute = fs::canonicalize(run_dir).unwrap_or_else(|_| run_dir.to_path_buf());
    fs::write(&tmp, format!("{}\n", absolute.display()))?;
    fs::rename(&tmp, &file)?;

    info!(file = %file.display(), target = %absolute.display(), "Updated latest pointer");
    Ok(file)
}

/// Resolve the most recent run: the `latest` link, then `latest_path.txt`,
/// then the lexicographically greatest directory under `runs/` (run ids
/// start with a sortable timestamp).
pub fn latest_run_dir(output_root: &Path) -> Option<PathBuf> {
    let link = output_root.join(LATEST_LINK);
    if link.is_dir() {
        if let Ok(resolved) = fs::canonicalize(&link) {
            return Some(resolved);
        }
    }

    if let Ok(content) = fs::read_to_string(output_root.join(LATEST_PATH_FILE)) {
        let path = PathBuf::from(content.trim());
        if path.is_dir() {
            return Some(path);
        }
        debug!(path = %path.display(), "latest_path.txt points to a missing directory");
    }

    let entries = fs::read_dir(output_root.join(RUNS_DIR)).ok()?;
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .max_by_key(|e| e.file_name())
        .map(|e| e.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_picks_newest_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let runs = dir.path().join(RUNS_DIR);
        fs::create_dir_all(runs.join("2026-01-01_000000__p__aaaaaaaa")).unwrap();
        fs::create_dir_all(runs.join("2026-02-01_000000__p__bbbbbbbb")).unwrap();

        let latest = latest_run_dir(dir.path()).unwrap();
        assert!(latest.ends_with("2026-02-01_000000__p__bbbbbbbb"));
    }

    #[test]
    fn test_no_runs_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(latest_run_dir(dir.path()).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_rebinding_replaces_previous_link() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join(RUNS_DIR).join("2026-01-01_000000__p__aaaaaaaa");
        let second = dir.path().join(RUNS_DIR).join("2025-01-01_000000__p__cccccccc");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();

        let link = update_latest(dir.path(), &first).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), Path::new(RUNS_DIR).join("2026-01-01_000000__p__aaaaaaaa"));

        // The pointer wins over name ordering.
        update_latest(dir.path(), &second).unwrap();
        let resolved = latest_run_dir(dir.path()).unwrap();
        assert_eq!(resolved, fs::canonicalize(&second).unwrap());
    }
}
