//! Named boolean predicates over a gene's evidence, referenced by synergy rules.

use std::fmt;
use std::str::FromStr;

use crate::entities::{GeneEvidence, OrthologyClass};
use crate::error::SigrankError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Predicate {
    /// `has_<CATEGORY>_GO`
    HasOntologyCategory(String),
    /// `has_expected_domain`
    HasExpectedDomain,
    /// `has_ortholog`
    HasOrtholog,
    /// `has_one_to_one_ortholog`
    HasOneToOneOrtholog,
    /// `has_keyword_hit`, `keyword_hits>=N`, `tair_keyword_hits>=N`
    KeywordHitsAtLeast(usize),
    /// `has_context_hit`
    HasContextHit,
}

impl Predicate {
    pub fn holds(&self, evidence: &GeneEvidence) -> bool {
        match self {
            Predicate::HasOntologyCategory(cat) => evidence.ontology.categories.contains(cat),
            Predicate::HasExpectedDomain => evidence.has_domain_match(),
            Predicate::HasOrtholog => evidence.best_ortholog().is_some(),
            Predicate::HasOneToOneOrtholog => evidence.orthology_class() == OrthologyClass::OneToOne,
            Predicate::KeywordHitsAtLeast(n) => evidence.keyword_hit_count() >= *n,
            Predicate::HasContextHit => evidence.has_context_hit(),
        }
    }
}

impl FromStr for Predicate {
    type Err = SigrankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        match name {
            "has_expected_domain" => return Ok(Predicate::HasExpectedDomain),
            "has_ortholog" => return Ok(Predicate::HasOrtholog),
            "has_one_to_one_ortholog" => return Ok(Predicate::HasOneToOneOrtholog),
            "has_keyword_hit" => return Ok(Predicate::KeywordHitsAtLeast(1)),
            "has_context_hit" => return Ok(Predicate::HasContextHit),
            _ => {}
        }

        if let Some(threshold) = name
            .strip_prefix("keyword_hits>=")
            .or_else(|| name.strip_prefix("tair_keyword_hits>="))
        {
            let n = threshold.trim().parse::<usize>().map_err(|_| {
                SigrankError::Config(format!("invalid keyword threshold in predicate {name:?}"))
            })?;
            return Ok(Predicate::KeywordHitsAtLeast(n));
        }

        if let Some(cat) = name.strip_prefix("has_").and_then(|r| r.strip_suffix("_GO")) {
            if !cat.is_empty() {
                return Ok(Predicate::HasOntologyCategory(cat.to_string()));
            }
        }

        Err(SigrankError::Config(format!("unknown synergy predicate {name:?}")))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::HasOntologyCategory(cat) => write!(f, "has_{cat}_GO"),
            Predicate::HasExpectedDomain => f.write_str("has_expected_domain"),
            Predicate::HasOrtholog => f.write_str("has_ortholog"),
            Predicate::HasOneToOneOrtholog => f.write_str("has_one_to_one_ortholog"),
            Predicate::KeywordHitsAtLeast(n) => write!(f, "keyword_hits>={n}"),
            Predicate::HasContextHit => f.write_str("has_context_hit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CuratedEvidence, DomainEvidence, DomainHit};

    #[test]
    fn test_parse_known_names() {
        assert_eq!(
            "has_PCD_GO".parse::<Predicate>().unwrap(),
            Predicate::HasOntologyCategory("PCD".into())
        );
        assert_eq!(
            "tair_keyword_hits>=2".parse::<Predicate>().unwrap(),
            Predicate::KeywordHitsAtLeast(2)
        );
        assert_eq!(
            "has_one_to_one_ortholog".parse::<Predicate>().unwrap(),
            Predicate::HasOneToOneOrtholog
        );
    }

    #[test]
    fn test_unknown_name_is_config_error() {
        let err = "has_magic".parse::<Predicate>().unwrap_err();
        assert!(matches!(err, SigrankError::Config(_)));
        assert!("keyword_hits>=lots".parse::<Predicate>().is_err());
        assert!("has__GO".parse::<Predicate>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for p in [
            Predicate::HasOntologyCategory("ROS".into()),
            Predicate::KeywordHitsAtLeast(3),
            Predicate::HasContextHit,
        ] {
            assert_eq!(p.to_string().parse::<Predicate>().unwrap(), p);
        }
    }

    #[test]
    fn test_holds_against_evidence() {
        let mut ev = GeneEvidence::default();
        ev.ontology.categories.insert("PCD".into());
        assert!(Predicate::HasOntologyCategory("PCD".into()).holds(&ev));
        assert!(!Predicate::HasExpectedDomain.holds(&ev));

        ev.domain = Some(DomainEvidence {
            hits: vec![DomainHit { domain_id: "PF00656".into(), database: "pfam".into(), evalue: None }],
        });
        assert!(Predicate::HasExpectedDomain.holds(&ev));

        ev.curated = Some(CuratedEvidence {
            keyword_hits: vec!["autophagy".into()],
            ..Default::default()
        });
        assert!(Predicate::KeywordHitsAtLeast(1).holds(&ev));
        assert!(!Predicate::KeywordHitsAtLeast(2).holds(&ev));
    }
}
