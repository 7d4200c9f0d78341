//! Groundedness validator
//!
//! Compiles the extraction patterns and phrase matchers once and runs the
//! four rules against an answer and the tool data it was built from.

use crate::{
    config::GroundingConfig,
    extract::Extractor,
    finding::{GroundednessReport, GroundingRule},
    rules,
};
use aho_corasick::AhoCorasick;
use assay_core::normalized::{ToolCall, ToolResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum GroundingError {
    #[error("Invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid phrase list: {0}")]
    Phrases(#[from] aho_corasick::BuildError),
}

/// An answer plus the tool activity that produced it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationInput {
    pub answer: String,

    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    #[serde(default)]
    pub tool_results: Vec<ToolResult>,
}

pub struct GroundednessValidator {
    config: GroundingConfig,
    extractor: Extractor,
    citation_markers: AhoCorasick,
    approximation_matcher: AhoCorasick,
    approximation_phrases: Vec<String>,
}

fn lowercase_phrases(phrases: &[String]) -> Vec<String> {
    phrases
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.to_lowercase())
        .collect()
}

impl GroundednessValidator {
    pub fn new(config: GroundingConfig) -> Result<Self, GroundingError> {
        let extractor = Extractor::new()?;
        let citation_markers = AhoCorasick::new(lowercase_phrases(&config.citation_markers))?;
        let approximation_phrases = lowercase_phrases(&config.approximation_phrases);
        let approximation_matcher = AhoCorasick::new(&approximation_phrases)?;

        Ok(Self {
            config,
            extractor,
            citation_markers,
            approximation_matcher,
            approximation_phrases,
        })
    }

    pub fn with_defaults() -> Result<Self, GroundingError> {
        Self::new(GroundingConfig::default())
    }

    pub fn config(&self) -> &GroundingConfig {
        &self.config
    }

    /// Score an answer against the tool calls and results behind it
    pub fn validate(
        &self,
        answer: &str,
        tool_calls: &[ToolCall],
        tool_results: &[ToolResult],
    ) -> GroundednessReport {
        if tool_calls.is_empty() || tool_results.is_empty() {
            debug!("No tool data, skipping grounding rules");
            return GroundednessReport::no_tools();
        }

        let mut findings = BTreeMap::new();
        findings.insert(
            GroundingRule::Numbers,
            rules::numeric_grounding(&self.extractor, answer, tool_results),
        );
        findings.insert(
            GroundingRule::Entities,
            rules::entity_grounding(&self.extractor, &self.config, answer, tool_results),
        );
        findings.insert(
            GroundingRule::Sources,
            rules::source_citation(&self.citation_markers, answer, tool_calls),
        );
        findings.insert(
            GroundingRule::Approximations,
            rules::no_approximations(
                &self.approximation_matcher,
                &self.approximation_phrases,
                answer,
            ),
        );

        let report = GroundednessReport::from_findings(findings);
        debug!(
            confidence = report.confidence,
            has_hallucination = report.has_hallucination,
            issues = report.issues.len(),
            warnings = report.warnings.len(),
            "Grounding check finished"
        );
        report
    }

    pub fn validate_input(&self, input: &ValidationInput) -> GroundednessReport {
        self.validate(&input.answer, &input.tool_calls, &input.tool_results)
    }
}
