//! Convergence bonuses: a rule fires when all of its predicates hold.

use std::collections::BTreeSet;

use serde::Serialize;

use sigrank_common::config::SynergyRuleConfig;
use sigrank_common::{GeneEvidence, Predicate, Result};

use crate::scorer::apply_cap;

#[derive(Debug, Clone, PartialEq)]
pub struct SynergyRule {
    pub name: String,
    pub predicates: BTreeSet<Predicate>,
    pub bonus: f64,
}

impl SynergyRule {
    pub fn from_config(cfg: &SynergyRuleConfig) -> Result<Self> {
        Ok(Self {
            name: cfg.name.clone(),
            predicates: cfg.predicates()?.into_iter().collect(),
            bonus: cfg.bonus.max(0.0),
        })
    }

    pub fn triggers(&self, evidence: &GeneEvidence) -> bool {
        self.predicates.iter().all(|p| p.holds(evidence))
    }
}

/// Compile every configured rule; an unknown predicate name is a configuration error.
pub fn compile(rules: &[SynergyRuleConfig]) -> Result<Vec<SynergyRule>> {
    rules.iter().map(SynergyRule::from_config).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SynergyResult {
    pub bonus_raw: f64,
    pub bonus_capped: f64,
    pub triggered_rules: BTreeSet<String>,
}

/// Sum the bonuses of every triggered rule, then cap the sum.
pub fn evaluate(rules: &[SynergyRule], evidence: &GeneEvidence, cap: Option<f64>) -> SynergyResult {
    let mut result = SynergyResult::default();
    for rule in rules.iter().filter(|r| r.triggers(evidence)) {
        result.bonus_raw += rule.bonus;
        result.triggered_rules.insert(rule.name.clone());
    }
    result.bonus_capped = apply_cap(result.bonus_raw, cap);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigrank_common::entities::{OrthologHit, OrthologyClass, OrthologyEvidence};
    use sigrank_common::GeneKey;

    fn rule(name: &str, predicates: &[&str], bonus: f64) -> SynergyRule {
        SynergyRule::from_config(&SynergyRuleConfig {
            name: name.into(),
            if_all: predicates.iter().map(|p| p.to_string()).collect(),
            bonus,
        })
        .unwrap()
    }

    fn pcd_one_to_one() -> GeneEvidence {
        let mut ev = GeneEvidence::default();
        ev.ontology.categories.insert("PCD".into());
        ev.orthology = Some(OrthologyEvidence {
            hits: vec![OrthologHit { locus: GeneKey::new("AT1G01010"), confidence: 1.0 }],
            class: OrthologyClass::OneToOne,
        });
        ev
    }

    #[test]
    fn test_and_semantics() {
        let ev = pcd_one_to_one();
        let rules = vec![
            rule("go_orth", &["has_PCD_GO", "has_one_to_one_ortholog"], 2.0),
            rule("go_domain_orth", &["has_PCD_GO", "has_expected_domain", "has_one_to_one_ortholog"], 3.0),
        ];
        let result = evaluate(&rules, &ev, Some(6.0));
        assert_eq!(result.bonus_raw, 2.0);
        assert_eq!(result.triggered_rules, ["go_orth".to_string()].into());
    }

    #[test]
    fn test_bonus_capped_and_order_insensitive() {
        let ev = pcd_one_to_one();
        let mut rules = vec![
            rule("a", &["has_PCD_GO"], 4.0),
            rule("b", &["has_ortholog"], 4.0),
        ];
        let forward = evaluate(&rules, &ev, Some(6.0));
        rules.reverse();
        let backward = evaluate(&rules, &ev, Some(6.0));

        assert_eq!(forward, backward);
        assert_eq!(forward.bonus_raw, 8.0);
        assert_eq!(forward.bonus_capped, 6.0);
    }

    #[test]
    fn test_unknown_predicate_rejected() {
        let cfg = SynergyRuleConfig { name: "x".into(), if_all: vec!["has_wings".into()], bonus: 1.0 };
        assert!(compile(&[cfg]).is_err());
    }
}
