//! Identifier canonicalisation.
//!
//! Every source names genes differently: protein ids with isoform suffixes,
//! compound `"speciesTag:LOCUS.version score"` tokens, bare reference loci.
//! The resolver turns all of them into one [`GeneKey`] namespace per organism.
//!
//! Usage:
//! ```ignore
//! let resolver = IdentifierResolver::new(r"^(BdiBd21-3\.\dG\d{7})", ".v1.2", r"AT[1-5MC]G\d{5}")?;
//! let key = resolver.resolve("BdiBd21-3.1G0000100.1.p", SourceKind::Ontology)?;
//! assert_eq!(key.as_str(), "BdiBd21-3.1G0000100.v1.2");
//! ```

use regex::Regex;

use sigrank_common::config::IdMappingConfig;
use sigrank_common::{GeneKey, ResolutionError, Result, SigrankError, SourceKind};

#[derive(Debug, Clone)]
pub struct IdentifierResolver {
    /// Extracts the candidate core id (group 1 if present, else the whole match).
    core: Regex,
    /// Appended to every candidate core id.
    suffix: String,
    /// Extracts reference-organism loci.
    locus: Regex,
}

impl IdentifierResolver {
    pub fn new(core_pattern: &str, suffix: &str, locus_pattern: &str) -> Result<Self> {
        let compile = |p: &str| {
            Regex::new(p).map_err(|e| SigrankError::Config(format!("invalid identifier pattern {p:?}: {e}")))
        };
        Ok(Self {
            core: compile(core_pattern)?,
            suffix: suffix.to_string(),
            locus: compile(locus_pattern)?,
        })
    }

    pub fn from_config(cfg: &IdMappingConfig) -> Result<Self> {
        Self::new(&cfg.protein_to_core_regex, &cfg.canonical_suffix, &cfg.reference_locus_regex)
    }

    /// Canonicalise `raw` according to where it came from.
    pub fn resolve(&self, raw: &str, kind: SourceKind) -> std::result::Result<GeneKey, ResolutionError> {
        let candidate = if kind.is_compound() { compound_locus(raw) } else { raw.trim() };

        let no_match = || ResolutionError::NoMatch { raw: raw.to_string(), kind };

        if kind.is_reference() {
            let locus = extract(&self.locus, candidate).ok_or_else(no_match)?;
            Ok(GeneKey::new(locus))
        } else {
            let core = extract(&self.core, candidate).ok_or_else(no_match)?;
            Ok(GeneKey::new(format!("{core}{}", self.suffix)))
        }
    }
}

/// `"speciesTag:LOCUS.version 0.95"` → `"LOCUS.version"`.
fn compound_locus(raw: &str) -> &str {
    let token = raw.split_whitespace().next().unwrap_or("");
    match token.rsplit_once(':') {
        Some((_, id)) => id,
        None => token,
    }
}

fn extract<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    let caps = re.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> IdentifierResolver {
        IdentifierResolver::new(r"^(BdiBd21-3\.\dG\d{7})", ".v1.2", r"AT[1-5MC]G\d{5}").unwrap()
    }

    #[test]
    fn test_protein_id_gets_suffix() {
        let key = resolver().resolve("BdiBd21-3.2G0277200.1.p", SourceKind::Ontology).unwrap();
        assert_eq!(key.as_str(), "BdiBd21-3.2G0277200.v1.2");
    }

    #[test]
    fn test_already_canonical_id_is_stable() {
        let r = resolver();
        let once = r.resolve("BdiBd21-3.2G0277200.1", SourceKind::Domain).unwrap();
        let twice = r.resolve(once.as_str(), SourceKind::Domain).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_compound_query_token() {
        let key = resolver()
            .resolve("bdi:BdiBd21-3.1G0000100.1 1.000", SourceKind::OrthologyQuery)
            .unwrap();
        assert_eq!(key.as_str(), "BdiBd21-3.1G0000100.v1.2");
    }

    #[test]
    fn test_reference_locus_has_no_suffix() {
        let r = resolver();
        assert_eq!(r.resolve("ath:AT1G01010.1 0.95", SourceKind::OrthologyHit).unwrap().as_str(), "AT1G01010");
        assert_eq!(r.resolve("ID=gene:AT5G45890", SourceKind::CuratedFeature).unwrap().as_str(), "AT5G45890");
    }

    #[test]
    fn test_no_match_reports_kind() {
        let err = resolver().resolve("Os01g0100100", SourceKind::Ontology).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::NoMatch { raw: "Os01g0100100".into(), kind: SourceKind::Ontology }
        );
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = IdentifierResolver::new("(", "", "x").unwrap_err();
        assert!(err.is_fatal());
    }
}
