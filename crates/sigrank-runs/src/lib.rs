//! sigrank-runs: Run identity and provenance.
//!
//! A run is identified by `timestamp__prefix__hash8[__label]`, lives in its own
//! directory under `<output_root>/runs/`, and is sealed by a manifest that is
//! always the last file written.

pub mod hash;
pub mod run_dir;
pub mod manifest;
pub mod latest;

pub use hash::{canonical_json, config_hash, file_sha256};
pub use latest::{latest_run_dir, update_latest};
pub use manifest::{ArtifactKind, ArtifactSpec, ManifestEntry, RunManifest};
pub use run_dir::{RunId, RunLayout};
