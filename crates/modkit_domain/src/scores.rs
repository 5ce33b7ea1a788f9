//! The fixed `CategoryScores` vector. Nine categories, each in
//! `[0, 1]`. An extended 9-field vector rather than a smaller closed set,
//! used everywhere in this crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The fixed set of moderation categories, in the canonical order used for
/// policy evaluation and for serializing `triggered_rules` explanations.
pub const CATEGORIES: [&str; 9] = [
    "toxicity",
    "hate",
    "harassment",
    "sexual_content",
    "violence",
    "profanity",
    "self_harm",
    "spam",
    "pii",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct CategoryScores {
    #[serde(default)]
    pub toxicity: f64,
    #[serde(default)]
    pub hate: f64,
    #[serde(default)]
    pub harassment: f64,
    #[serde(default)]
    pub sexual_content: f64,
    #[serde(default)]
    pub violence: f64,
    #[serde(default)]
    pub profanity: f64,
    #[serde(default)]
    pub self_harm: f64,
    #[serde(default)]
    pub spam: f64,
    #[serde(default)]
    pub pii: f64,
}

impl CategoryScores {
    pub fn get(&self, category: &str) -> f64 {
        match category {
            "toxicity" => self.toxicity,
            "hate" => self.hate,
            "harassment" => self.harassment,
            "sexual_content" => self.sexual_content,
            "violence" => self.violence,
            "profanity" => self.profanity,
            "self_harm" => self.self_harm,
            "spam" => self.spam,
            "pii" => self.pii,
            _ => 0.0,
        }
    }

    pub fn set(&mut self, category: &str, value: f64) {
        match category {
            "toxicity" => self.toxicity = value,
            "hate" => self.hate = value,
            "harassment" => self.harassment = value,
            "sexual_content" => self.sexual_content = value,
            "violence" => self.violence = value,
            "profanity" => self.profanity = value,
            "self_harm" => self.self_harm = value,
            "spam" => self.spam = value,
            "pii" => self.pii = value,
            _ => {}
        }
    }

    /// Clamp every field into `[0, 1]`. Providers must never surface scores
    /// outside this range.
    pub fn clamped(mut self) -> Self {
        for cat in CATEGORIES {
            let v = modkit_common::clamp01(self.get(cat));
            self.set(cat, v);
        }
        self
    }

    /// Build from a loosely-typed provider response: an open map of
    /// category name to score. Missing categories default to 0, unknown
    /// categories are ignored.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Self {
        let mut out = CategoryScores::default();
        for cat in CATEGORIES {
            if let Some(v) = map.get(cat) {
                out.set(cat, modkit_common::clamp01(*v));
            }
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        CATEGORIES.iter().map(move |c| (*c, self.get(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_category_in_map_is_ignored() {
        let mut map = BTreeMap::new();
        map.insert("toxicity".to_string(), 0.9);
        map.insert("not_a_real_category".to_string(), 1.0);
        let scores = CategoryScores::from_map(&map);
        assert_eq!(scores.toxicity, 0.9);
        assert_eq!(scores.hate, 0.0);
    }

    #[test]
    fn clamped_bounds_out_of_range_scores() {
        let scores = CategoryScores { toxicity: 1.5, hate: -0.2, ..Default::default() }.clamped();
        assert_eq!(scores.toxicity, 1.0);
        assert_eq!(scores.hate, 0.0);
    }

    #[test]
    fn get_set_round_trip_every_category() {
        let mut scores = CategoryScores::default();
        for (i, cat) in CATEGORIES.iter().enumerate() {
            scores.set(cat, i as f64 * 0.1);
        }
        for (i, cat) in CATEGORIES.iter().enumerate() {
            assert_eq!(scores.get(cat), i as f64 * 0.1);
        }
    }
}
