//! The four grounding rules
//!
//! Each rule is a pure function producing one `ValidationFinding`.

use crate::{
    config::GroundingConfig,
    extract::{Extractor, data_numbers, searchable_text},
    finding::ValidationFinding,
};
use aho_corasick::AhoCorasick;
use assay_core::normalized::ToolCall;
use serde_json::Value;

/// Numbers in the answer must exactly match a numeric leaf of the tool data
pub fn numeric_grounding(extractor: &Extractor, answer: &str, results: &[Value]) -> ValidationFinding {
    let in_answer = extractor.numbers(answer);
    if in_answer.is_empty() {
        return ValidationFinding::pass(100);
    }

    let in_data = data_numbers(results);
    let unmatched: Vec<String> = in_answer
        .into_iter()
        .filter(|n| !in_data.contains(n))
        .map(|n| n.to_string())
        .collect();

    if unmatched.is_empty() {
        ValidationFinding::pass(100)
    } else {
        ValidationFinding::fail(
            50,
            format!("Numbers not found in data: {}", unmatched.join(", ")),
            "AI may have invented these numbers",
        )
    }
}

/// Names and emails in the answer should appear in the serialized tool data
pub fn entity_grounding(
    extractor: &Extractor,
    config: &GroundingConfig,
    answer: &str,
    results: &[Value],
) -> ValidationFinding {
    let entities = extractor.entities(answer);
    if entities.is_empty() {
        return ValidationFinding::pass(100);
    }

    let haystack = searchable_text(results);
    let unmatched: Vec<&String> = entities
        .iter()
        .filter(|e| !haystack.contains(&e.to_lowercase()))
        .collect();

    let match_rate = (entities.len() - unmatched.len()) as f64 / entities.len() as f64;
    let confidence = (match_rate * 100.0).round() as u8;

    if match_rate < config.entity_match_threshold && unmatched.len() > config.max_unmatched_entities {
        let sample: Vec<&str> = unmatched.iter().take(3).map(|e| e.as_str()).collect();
        ValidationFinding::fail(
            confidence,
            format!("Many entities not found in data: {}...", sample.join(", ")),
            "AI may have invented names or details",
        )
    } else {
        ValidationFinding::pass(confidence)
    }
}

/// The answer must carry a citation marker or name one of the called tools
pub fn source_citation(
    citation_markers: &AhoCorasick,
    answer: &str,
    tool_calls: &[ToolCall],
) -> ValidationFinding {
    let lower = answer.to_lowercase();

    let has_marker = citation_markers.is_match(&lower);
    let names_tool = tool_calls
        .iter()
        .any(|call| lower.contains(&call.name.to_lowercase()));

    if has_marker || names_tool {
        ValidationFinding::pass(100)
    } else {
        ValidationFinding::fail(
            70,
            "No source citation found",
            "AI should cite the tools used",
        )
    }
}

/// The answer must not contain hedging phrases
///
/// `phrases` holds the lowercased phrase for each pattern id of `matcher`.
pub fn no_approximations(matcher: &AhoCorasick, phrases: &[String], answer: &str) -> ValidationFinding {
    let lower = answer.to_lowercase();

    let mut hit = vec![false; phrases.len()];
    for m in matcher.find_overlapping_iter(&lower) {
        hit[m.pattern().as_usize()] = true;
    }

    let found: Vec<&str> = phrases
        .iter()
        .zip(&hit)
        .filter(|(_, hit)| **hit)
        .map(|(phrase, _)| phrase.as_str())
        .collect();

    if found.is_empty() {
        ValidationFinding::pass(100)
    } else {
        ValidationFinding::fail(
            40,
            format!("Approximation words found: {}", found.join(", ")),
            "AI should use exact numbers from tool results",
        )
    }
}
