use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_yaml::{Mapping, Value};
use sigrank_runs::{
    config_hash, latest_run_dir, update_latest, ArtifactKind, ArtifactSpec, RunId, RunLayout,
    RunManifest,
};

fn mapping_in_order(entries: &[(String, i64)]) -> Value {
    let mut map = Mapping::new();
    for (k, v) in entries {
        map.insert(Value::String(k.clone()), Value::Number((*v).into()));
    }
    Value::Mapping(map)
}

proptest! {
    #[test]
    fn hash_stable_under_key_permutation(entries in prop::collection::btree_map("[a-z_]{1,8}", any::<i64>(), 1..12)) {
        let forward: Vec<(String, i64)> = entries.clone().into_iter().collect();
        let mut reversed = forward.clone();
        reversed.reverse();

        let nested_a = Value::Mapping(Mapping::from_iter([(Value::from("scoring"), mapping_in_order(&forward))]));
        let nested_b = Value::Mapping(Mapping::from_iter([(Value::from("scoring"), mapping_in_order(&reversed))]));
        prop_assert_eq!(config_hash(&nested_a).unwrap(), config_hash(&nested_b).unwrap());
    }

    #[test]
    fn hash_changes_when_any_value_changes(
        entries in prop::collection::btree_map("[a-z_]{1,8}", -1000i64..1000, 1..12),
        pick in any::<prop::sample::Index>(),
    ) {
        let original: Vec<(String, i64)> = entries.into_iter().collect();
        let mut changed = original.clone();
        let i = pick.index(changed.len());
        changed[i].1 += 1;
        prop_assert_ne!(
            config_hash(&mapping_in_order(&original)).unwrap(),
            config_hash(&mapping_in_order(&changed)).unwrap()
        );
    }
}

#[test]
fn test_full_run_lifecycle() {
    let root = tempfile::tempdir().unwrap();
    let config: Value = serde_yaml::from_str("output_prefix: demo\nselection: { mode: quantile }\n").unwrap();
    let hash = config_hash(&config).unwrap();

    let id = RunId::generate("demo", &hash, Some("lifecycle"));
    let layout = RunLayout::create(root.path(), &id, false).unwrap();
    let snapshot = layout.write_config_snapshot(&config).unwrap();

    let base = layout.output_path("demo_genes.base.txt");
    std::fs::write(&base, "G1\nG2\n").unwrap();

    let manifest = RunManifest::build(
        &layout,
        &hash,
        &[
            ArtifactSpec::new(&snapshot, "Configuration used", ArtifactKind::Document),
            ArtifactSpec::new(&base, "Candidate universe", ArtifactKind::List),
        ],
    )
    .unwrap();
    manifest.write(&layout).unwrap();
    update_latest(root.path(), &layout.run_dir).unwrap();

    let paths: BTreeMap<_, _> = manifest.files.iter().map(|f| (f.path.as_str(), f.row_count)).collect();
    assert_eq!(paths.get("config_used.yaml"), Some(&None));
    assert_eq!(paths.get("outputs/demo_genes.base.txt"), Some(&Some(2)));
    assert!(layout.run_id.ends_with("__lifecycle"));
    assert!(layout.run_id.contains(&format!("__demo__{hash}")));

    let latest = latest_run_dir(root.path()).unwrap();
    assert_eq!(
        std::fs::canonicalize(latest).unwrap(),
        std::fs::canonicalize(&layout.run_dir).unwrap()
    );
}
