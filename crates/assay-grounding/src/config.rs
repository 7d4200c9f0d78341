//! Grounding rule configuration

use serde::{Deserialize, Serialize};

/// Tunables for the grounding rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingConfig {
    /// Phrases that count as an explicit source citation (case-insensitive)
    #[serde(default = "default_citation_markers")]
    pub citation_markers: Vec<String>,

    /// Hedging phrases that are not allowed in an answer (case-insensitive)
    #[serde(default = "default_approximation_phrases")]
    pub approximation_phrases: Vec<String>,

    /// Entity match rate below which the entity rule can fail
    #[serde(default = "default_entity_match_threshold")]
    pub entity_match_threshold: f64,

    /// The entity rule fails only when more entities than this are unmatched
    #[serde(default = "default_max_unmatched_entities")]
    pub max_unmatched_entities: usize,
}

fn default_citation_markers() -> Vec<String> {
    ["source:", "d'après", "selon"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_approximation_phrases() -> Vec<String> {
    ["environ", "à peu près", "approximativement", "autour de"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_entity_match_threshold() -> f64 {
    0.5
}

fn default_max_unmatched_entities() -> usize {
    2
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            citation_markers: default_citation_markers(),
            approximation_phrases: default_approximation_phrases(),
            entity_match_threshold: default_entity_match_threshold(),
            max_unmatched_entities: default_max_unmatched_entities(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GroundingConfig::default();
        assert_eq!(config.citation_markers.len(), 3);
        assert!(config.approximation_phrases.contains(&"environ".to_string()));
        assert_eq!(config.entity_match_threshold, 0.5);
        assert_eq!(config.max_unmatched_entities, 2);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: GroundingConfig =
            serde_json::from_value(serde_json::json!({"approximation_phrases": ["about"]})).unwrap();
        assert_eq!(config.approximation_phrases, vec!["about".to_string()]);
        assert_eq!(config.citation_markers, default_citation_markers());
    }
}
