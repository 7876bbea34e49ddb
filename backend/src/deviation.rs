//! Per-posting balancing deviation settings.
//!
//! A deviation is how far apart the busiest and quietest month blocks of a
//! posting may be. Some postings are co-located: two catalog entries that
//! the solver balances as one pool. Such a pair is configured through a
//! single shared key, and at most one of `{A, B, shared}` is ever a key.
//!
//! Every operation takes the current mapping and returns a new one. Inputs
//! are clamped rather than rejected.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Upper bound for a deviation threshold.
pub const MAX_THRESHOLD: u32 = 15;

/// Threshold written by "apply defaults" when none is configured.
pub const DEFAULT_DEVIATION: u32 = 1;

/// Posting prefixes that receive a default deviation.
pub const DEFAULT_PREFIXES: [&str; 4] = ["CVM", "MICU", "NL", "RCCM"];

/// Posting id -> allowed deviation. Ordered, so serialization is stable.
pub type DeviationMap = BTreeMap<String, u32>;

/// Two postings sharing one deviation slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoLocatedPair {
    /// The shared key, e.g. `GRM+MedComm (TTSH)`.
    pub id: String,
    pub members: [String; 2],
}

impl CoLocatedPair {
    pub fn new(id: impl Into<String>, a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            members: [a.into(), b.into()],
        }
    }

    /// Whether `posting` is the shared key or one of the members.
    pub fn involves(&self, posting: &str) -> bool {
        self.id == posting || self.members.iter().any(|m| m == posting)
    }

    /// Whether any of the pair's three keys is configured.
    pub fn is_configured(&self, current: &DeviationMap) -> bool {
        current.contains_key(&self.id) || self.members.iter().any(|m| current.contains_key(m))
    }
}

/// The pairs known to the source configuration.
pub fn default_pairs() -> Vec<CoLocatedPair> {
    vec![CoLocatedPair::new(
        "GRM+MedComm (TTSH)",
        "GRM (TTSH)",
        "MedComm (TTSH)",
    )]
}

/// Rules for editing a [`DeviationMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingDeviationConfig {
    pub max_threshold: u32,
    pub pairs: Vec<CoLocatedPair>,
}

impl Default for PostingDeviationConfig {
    fn default() -> Self {
        Self {
            max_threshold: MAX_THRESHOLD,
            pairs: default_pairs(),
        }
    }
}

impl PostingDeviationConfig {
    pub fn new(max_threshold: u32, pairs: Vec<CoLocatedPair>) -> Self {
        Self {
            max_threshold,
            pairs,
        }
    }

    fn pair_for(&self, posting: &str) -> Option<&CoLocatedPair> {
        self.pairs.iter().find(|pair| pair.involves(posting))
    }

    fn max(&self) -> u32 {
        self.max_threshold.max(1)
    }

    /// The key a deviation for `posting` is stored under.
    pub fn storage_key<'a>(&'a self, posting: &'a str) -> &'a str {
        self.pair_for(posting)
            .map(|pair| pair.id.as_str())
            .unwrap_or(posting)
    }

    /// Clamp a threshold chosen for a new entry to `[1, max]`.
    pub fn clamp_new(&self, threshold: i64) -> u32 {
        threshold.clamp(1, i64::from(self.max())) as u32
    }

    /// Clamp an edited value to `[0, max]`; non-finite input becomes 0.
    pub fn sanitize(&self, raw: f64) -> u32 {
        if !raw.is_finite() {
            return 0;
        }
        raw.clamp(0.0, f64::from(self.max())).trunc() as u32
    }

    /// Postings that can still be given a deviation, sorted.
    pub fn available_postings<S: AsRef<str>>(
        &self,
        all_postings: &[S],
        current: &DeviationMap,
    ) -> Vec<String> {
        let mut available = BTreeSet::new();

        for posting in all_postings.iter().map(AsRef::as_ref) {
            if current.contains_key(posting) {
                continue;
            }
            if let Some(pair) = self.pair_for(posting) {
                // the shared key is offered below, members only while the pair is free
                if posting == pair.id || pair.is_configured(current) {
                    continue;
                }
            }
            available.insert(posting.to_string());
        }

        for pair in &self.pairs {
            if !pair.is_configured(current) {
                available.insert(pair.id.clone());
            }
        }

        available.into_iter().collect()
    }

    /// Add a deviation. Pair members are written under the shared key.
    pub fn add(&self, current: &DeviationMap, posting: &str, threshold: i64) -> DeviationMap {
        let threshold = self.clamp_new(threshold);
        let mut next = current.clone();
        match self.pair_for(posting) {
            Some(pair) => {
                for member in &pair.members {
                    next.remove(member);
                }
                next.insert(pair.id.clone(), threshold);
            }
            None => {
                next.insert(posting.to_string(), threshold);
            }
        }
        next
    }

    /// Change an existing deviation. Unknown keys are left alone.
    pub fn update(&self, current: &DeviationMap, posting: &str, raw: f64) -> DeviationMap {
        let mut next = current.clone();
        if let Some(value) = next.get_mut(posting) {
            *value = self.sanitize(raw);
        }
        next
    }

    /// [`update`](Self::update) from text input; anything non-numeric counts as 0.
    pub fn update_from_input(
        &self,
        current: &DeviationMap,
        posting: &str,
        input: &str,
    ) -> DeviationMap {
        let raw = input.trim().parse::<f64>().unwrap_or(0.0);
        self.update(current, posting, raw)
    }

    pub fn remove(&self, current: &DeviationMap, posting: &str) -> DeviationMap {
        let mut next = current.clone();
        next.remove(posting);
        next
    }

    /// Give every unconfigured posting matching `prefixes` the default value.
    pub fn apply_defaults<S: AsRef<str>, P: AsRef<str>>(
        &self,
        current: &DeviationMap,
        all_postings: &[S],
        prefixes: &[P],
        default_value: i64,
    ) -> DeviationMap {
        let value = self.clamp_new(default_value);
        let mut next = current.clone();

        for posting in all_postings.iter().map(AsRef::as_ref) {
            if !prefixes.iter().any(|p| posting.starts_with(p.as_ref())) {
                continue;
            }
            match self.pair_for(posting) {
                Some(pair) => {
                    if !pair.is_configured(&next) {
                        next.insert(pair.id.clone(), value);
                    }
                }
                None => {
                    next.entry(posting.to_string()).or_insert(value);
                }
            }
        }
        next
    }

    /// One-line description of a mapping.
    pub fn summary(current: &DeviationMap) -> String {
        if current.is_empty() {
            return "All postings use default balancing (no deviation).".to_string();
        }
        current
            .iter()
            .map(|(posting, value)| format!("{}: {}", posting, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRM: &str = "GRM (TTSH)";
    const MEDCOMM: &str = "MedComm (TTSH)";
    const SHARED: &str = "GRM+MedComm (TTSH)";

    fn catalog() -> Vec<&'static str> {
        vec!["MICU (NUH)", GRM, "CVM (SGH)", MEDCOMM, "GM (TTSH)"]
    }

    fn map(entries: &[(&str, u32)]) -> DeviationMap {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_available_when_nothing_configured() {
        let config = PostingDeviationConfig::default();
        let available = config.available_postings(&catalog(), &DeviationMap::new());
        assert_eq!(
            available,
            vec!["CVM (SGH)", "GM (TTSH)", GRM, SHARED, "MICU (NUH)", MEDCOMM]
        );
    }

    #[test]
    fn test_shared_key_hides_members() {
        let config = PostingDeviationConfig::default();
        let available = config.available_postings(&catalog(), &map(&[(SHARED, 2)]));
        assert!(!available.iter().any(|p| p == GRM || p == MEDCOMM || p == SHARED));
        assert_eq!(available.len(), 3);
    }

    #[test]
    fn test_individual_member_hides_pair() {
        let config = PostingDeviationConfig::default();
        let available = config.available_postings(&catalog(), &map(&[(GRM, 2)]));
        assert!(!available.iter().any(|p| p == GRM || p == MEDCOMM || p == SHARED));
    }

    #[test]
    fn test_add_member_writes_shared_key() {
        let config = PostingDeviationConfig::default();
        let next = config.add(&map(&[(GRM, 4)]), MEDCOMM, 3);
        assert_eq!(next, map(&[(SHARED, 3)]));
    }

    #[test]
    fn test_add_clamps_to_one_and_max() {
        let config = PostingDeviationConfig::default();
        let next = config.add(&DeviationMap::new(), "CVM (SGH)", 0);
        assert_eq!(next["CVM (SGH)"], 1);
        let next = config.add(&next, "MICU (NUH)", 99);
        assert_eq!(next["MICU (NUH)"], MAX_THRESHOLD);
    }

    #[test]
    fn test_add_does_not_mutate_input() {
        let config = PostingDeviationConfig::default();
        let current = map(&[("CVM (SGH)", 2)]);
        let _ = config.add(&current, "MICU (NUH)", 5);
        assert_eq!(current, map(&[("CVM (SGH)", 2)]));
    }

    #[test]
    fn test_update_sanitizes() {
        let config = PostingDeviationConfig::default();
        let current = map(&[("CVM (SGH)", 2)]);
        assert_eq!(config.update(&current, "CVM (SGH)", -3.0)["CVM (SGH)"], 0);
        assert_eq!(config.update(&current, "CVM (SGH)", 40.0)["CVM (SGH)"], 15);
        assert_eq!(config.update(&current, "CVM (SGH)", f64::NAN)["CVM (SGH)"], 0);
        assert_eq!(config.update(&current, "CVM (SGH)", 7.9)["CVM (SGH)"], 7);
        assert_eq!(config.update_from_input(&current, "CVM (SGH)", "abc")["CVM (SGH)"], 0);
        assert_eq!(config.update_from_input(&current, "CVM (SGH)", " 6 ")["CVM (SGH)"], 6);
    }

    #[test]
    fn test_update_ignores_unknown_key() {
        let config = PostingDeviationConfig::default();
        let current = map(&[("CVM (SGH)", 2)]);
        assert_eq!(config.update(&current, "MICU (NUH)", 5.0), current);
    }

    #[test]
    fn test_remove_shared_key_frees_members() {
        let config = PostingDeviationConfig::default();
        let next = config.remove(&map(&[(SHARED, 2), ("CVM (SGH)", 1)]), SHARED);
        assert_eq!(next, map(&[("CVM (SGH)", 1)]));
        let available = config.available_postings(&catalog(), &next);
        assert!(available.iter().any(|p| p == GRM));
        assert!(available.iter().any(|p| p == MEDCOMM));
        assert!(available.iter().any(|p| p == SHARED));
    }

    #[test]
    fn test_remove_individual_member_keeps_siblings() {
        let config = PostingDeviationConfig::default();
        let next = config.remove(&map(&[(GRM, 2), ("CVM (SGH)", 1)]), GRM);
        assert_eq!(next, map(&[("CVM (SGH)", 1)]));
    }

    #[test]
    fn test_apply_defaults_collapses_pairs() {
        let config = PostingDeviationConfig::default();
        let next = config.apply_defaults(
            &map(&[("CVM (SGH)", 5)]),
            &catalog(),
            &["CVM", "GRM", "MedComm"],
            1,
        );
        assert_eq!(next, map(&[("CVM (SGH)", 5), (SHARED, 1)]));
    }

    #[test]
    fn test_apply_defaults_keeps_configured_member() {
        let config = PostingDeviationConfig::default();
        let next = config.apply_defaults(&map(&[(MEDCOMM, 4)]), &catalog(), &["GRM", "MedComm"], 1);
        assert_eq!(next, map(&[(MEDCOMM, 4)]));
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            PostingDeviationConfig::summary(&DeviationMap::new()),
            "All postings use default balancing (no deviation)."
        );
        assert_eq!(
            PostingDeviationConfig::summary(&map(&[("A", 1), ("B", 2)])),
            "A: 1, B: 2"
        );
    }

    #[test]
    fn test_storage_key() {
        let config = PostingDeviationConfig::default();
        assert_eq!(config.storage_key(GRM), SHARED);
        assert_eq!(config.storage_key("CVM (SGH)"), "CVM (SGH)");
    }
}
