//! Content hashing for run identity and artifact checksums.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde_yaml::Value;
use sha2::{Digest, Sha256};

use sigrank_common::{Result, SigrankError};

/// Length of the config hash embedded in the run id.
pub const CONFIG_HASH_LEN: usize = 8;

/// Compact JSON with every mapping's keys sorted recursively.
///
/// Two YAML documents that differ only in key order serialise identically:
/// `serde_json::Map` is ordered by key. Non-string scalar keys are rendered
/// as their text; a key JSON cannot express is a configuration error.
pub fn canonical_json(value: &Value) -> Result<String> {
    let json = serde_json::to_value(value)
        .map_err(|e| SigrankError::Config(format!("configuration cannot be hashed: {e}")))?;
    Ok(serde_json::to_string(&json)?)
}

/// First eight hex chars of SHA-256 over [`canonical_json`].
pub fn config_hash(value: &Value) -> Result<String> {
    let mut digest = sha256_hex(canonical_json(value)?.as_bytes());
    digest.truncate(CONFIG_HASH_LEN);
    Ok(digest)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Streaming SHA-256 of a file's contents.
pub fn file_sha256(path: &Path) -> std::io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_canonical_sorts_nested_keys() {
        let v = yaml("b: 1\na:\n  z: [1, 2.5, x]\n  y: null\n");
        assert_eq!(canonical_json(&v).unwrap(), r#"{"a":{"y":null,"z":[1,2.5,"x"]},"b":1}"#);
    }

    #[test]
    fn test_hash_ignores_key_order() {
        let a = yaml("output_prefix: PCD\nselection:\n  mode: knee\n  min_genes: 10\n");
        let b = yaml("selection:\n  min_genes: 10\n  mode: knee\noutput_prefix: PCD\n");
        assert_eq!(config_hash(&a).unwrap(), config_hash(&b).unwrap());
        assert_eq!(config_hash(&a).unwrap().len(), CONFIG_HASH_LEN);
    }

    #[test]
    fn test_hash_changes_with_value() {
        let a = yaml("selection: { quantile: 0.9 }");
        let b = yaml("selection: { quantile: 0.8 }");
        assert_ne!(config_hash(&a).unwrap(), config_hash(&b).unwrap());
    }

    #[test]
    fn test_strings_are_escaped() {
        let v = yaml(r#"regex: '^(X\.\d+)"'"#);
        assert_eq!(canonical_json(&v).unwrap(), r#"{"regex":"^(X\\.\\d+)\""}"#);
    }

    #[test]
    fn test_integer_keys_render_as_text() {
        let v = yaml("10: b\n2: a\n");
        assert_eq!(canonical_json(&v).unwrap(), r#"{"10":"b","2":"a"}"#);
    }

    #[test]
    fn test_file_sha256_matches_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"gene\nA\n").unwrap();
        assert_eq!(file_sha256(&path).unwrap(), sha256_hex(b"gene\nA\n"));
    }
}
