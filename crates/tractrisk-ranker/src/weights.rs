//! Weight map for the composite risk index.
//!
//! Field name → relative weight, rebuilt from the analyst's profile on every
//! run. Weights are relative: the score is a weighted mean, so `{a: 1, b: 3}`
//! and `{a: 0.25, b: 0.75}` score identically.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tractrisk_common::IndexConfig;
use tractrisk_ingestion::normalise_field_name;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightMap {
    weights: BTreeMap<String, f64>,
}

impl WeightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the weights of a scoring profile.
    pub fn from_profile(profile: &IndexConfig) -> Self {
        profile.weights.iter().map(|(k, w)| (k.as_str(), *w)).collect()
    }

    /// Set a weight. The field name is normalised the same way dataset
    /// headers are, so `"Pop 65 Plus"` addresses column `pop65plus`.
    /// Returns the weight it replaced, if any.
    pub fn insert(&mut self, field: &str, weight: f64) -> Option<f64> {
        let key = normalise_field_name(field);
        let previous = self.weights.insert(key.clone(), weight);
        if let Some(old) = previous {
            warn!(field, column = %key, old, new = weight, "Weight overrides an earlier entry for the same column");
        }
        previous
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.weights.get(&normalise_field_name(field)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Every entry, including ones that will not participate.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, w)| (k.as_str(), *w))
    }

    /// Entries that participate in scoring: finite and strictly positive.
    pub fn active(&self) -> impl Iterator<Item = (&str, f64)> {
        self.iter().filter(|(_, w)| w.is_finite() && *w > 0.0)
    }

    /// Sum of the participating weights.
    pub fn active_total(&self) -> f64 {
        self.active().map(|(_, w)| w).sum()
    }
}

impl<'a> FromIterator<(&'a str, f64)> for WeightMap {
    fn from_iter<T: IntoIterator<Item = (&'a str, f64)>>(iter: T) -> Self {
        let mut map = WeightMap::new();
        for (field, weight) in iter {
            map.insert(field, weight);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colliding_keys_last_wins() {
        let mut w = WeightMap::new();
        assert_eq!(w.insert("Pop 65", 1.0), None);
        assert_eq!(w.insert("pop65", 2.0), Some(1.0));
        assert_eq!(w.len(), 1);
        assert_eq!(w.get("pop65"), Some(2.0));
    }

    #[test]
    fn test_keys_are_normalised() {
        let w: WeightMap = [(" Pop 65 Plus ", 2.0)].into_iter().collect();
        assert_eq!(w.get("pop65plus"), Some(2.0));
        assert_eq!(w.get("Pop 65 Plus"), Some(2.0));
    }

    #[test]
    fn test_active_excludes_non_positive_and_non_finite() {
        let w: WeightMap = [
            ("a", 1.0),
            ("b", 0.0),
            ("c", -2.0),
            ("d", f64::NAN),
            ("e", f64::INFINITY),
            ("f", 0.5),
        ]
        .into_iter()
        .collect();
        let active: Vec<&str> = w.active().map(|(k, _)| k).collect();
        assert_eq!(active, vec!["a", "f"]);
        assert!((w.active_total() - 1.5).abs() < 1e-12);
        assert_eq!(w.len(), 6);
    }

    #[test]
    fn test_from_profile() {
        let mut profile = IndexConfig::default();
        profile.weights.insert("Diabetes".into(), 1.0);
        let w = WeightMap::from_profile(&profile);
        assert_eq!(w.get("diabetes"), Some(1.0));
    }
}
