//! Loading every evidence source from disk through the async loader.

use std::path::Path;

use sigrank_common::entities::OrthologyClass;
use sigrank_common::{GeneKey, LayerSource, RankerConfig, SigrankError};
use sigrank_ingestion::load_evidence;

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.display().to_string()
}

fn config(dir: &Path, with_files: bool) -> RankerConfig {
    let go = write(
        dir,
        "go.tsv",
        "gene\tGO\tlevel\n\
         Bd0001.1.p\tGO:0012501\tBP\n\
         Bd0002.1.p\tGO:0000302\tBP\n\
         Bd0003.1.p\tGO:0000302\tMF\n",
    );
    let (orth, pfam, gff) = if with_files {
        (
            write(dir, "orth.tsv", "OrtoA\tOrtoB\nbdi:Bd0001.1 1.0\tath:AT5G45890.1 1.0\n"),
            write(dir, "pfam.tsv", "gene\tpfam\nBd0001.1\tPF00112.20\n"),
            write(
                dir,
                "genes.gff3",
                "Chr5\tAraport11\tgene\t1\t9\t.\t+\t.\tID=AT5G45890;symbol=SAG12;curator_summary=senescence protease\n",
            ),
        )
    } else {
        let missing = dir.join("missing.tsv").display().to_string();
        (missing.clone(), missing.clone(), missing)
    };

    let yaml = format!(
        r#"
output_prefix: test
id_mapping:
  protein_to_core_regex: '^(Bd\d{{4}})'
  canonical_suffix: '.v1'
ontology:
  file: '{go}'
scoring:
  weights:
    ontology:
      PCD: {{ 'GO:0012501': 5 }}
      ROS: {{ 'GO:0000302': 2 }}
evidence:
  orthology: {{ enabled: true, file: '{orth}' }}
  domain: {{ enabled: true, files: [ {{ path: '{pfam}' }} ] }}
  curated: {{ enabled: true, file: '{gff}', keywords: [senescence] }}
  context: {{ enabled: false }}
"#
    );
    RankerConfig::from_yaml_str(&yaml).unwrap()
}

#[tokio::test]
async fn test_all_layers_load() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = load_evidence(&config(dir.path(), true)).await.unwrap();

    assert_eq!(bundle.universe_size(), 2);
    assert!(bundle.domain.is_enabled());
    assert!(matches!(bundle.context, LayerSource::Disabled { .. }));

    let genes = bundle.assemble(&Default::default());
    let g1 = &genes[&GeneKey::new("Bd0001.v1")];
    assert_eq!(g1.orthology_class(), OrthologyClass::OneToOne);
    assert_eq!(g1.keyword_hit_count(), 1);
    assert!(g1.has_domain_match());
    assert!(!genes[&GeneKey::new("Bd0002.v1")].has_domain_match());
}

#[tokio::test]
async fn test_missing_optional_files_degrade() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = load_evidence(&config(dir.path(), false)).await.unwrap();

    assert_eq!(bundle.universe_size(), 2, "universe unchanged when layers are missing");
    for source in [bundle.domain.is_enabled(), bundle.orthology.is_enabled(), bundle.curated.is_enabled()] {
        assert!(!source);
    }
    let genes = bundle.assemble(&Default::default());
    assert!(genes.values().all(|g| g.domain.is_none() && g.orthology.is_none()));
}

#[tokio::test]
async fn test_missing_ontology_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), true);
    cfg.ontology.file = dir.path().join("nope.tsv");
    let err = load_evidence(&cfg).await.unwrap_err();
    assert!(matches!(err, SigrankError::SourceUnavailable { .. }));
}
