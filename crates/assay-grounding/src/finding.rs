//! Validation findings and the aggregated report

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Warning attached when there is no tool data to validate against
pub const NO_TOOLS_WARNING: &str = "No tools called - cannot validate response against data";

/// The four grounding rules, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundingRule {
    Numbers,
    Entities,
    Sources,
    Approximations,
}

impl GroundingRule {
    /// Hard rules put their issue in `issues`; the rest only warn
    pub fn is_hard(&self) -> bool {
        !matches!(self, GroundingRule::Sources)
    }
}

/// Outcome of one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub is_valid: bool,

    /// 0-100
    pub confidence: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationFinding {
    pub fn pass(confidence: u8) -> Self {
        Self {
            is_valid: true,
            confidence,
            issue: None,
            suggestion: None,
        }
    }

    pub fn fail(confidence: u8, issue: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            confidence,
            issue: Some(issue.into()),
            suggestion: Some(suggestion.into()),
        }
    }
}

/// Composite trust report for one answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundednessReport {
    pub has_hallucination: bool,

    /// Rounded mean of the finding confidences
    pub confidence: u8,

    /// Issues from failing hard rules
    pub issues: Vec<String>,

    /// Soft failures
    pub warnings: Vec<String>,

    pub findings: BTreeMap<GroundingRule, ValidationFinding>,
}

impl GroundednessReport {
    /// Report returned when there is nothing to validate against
    pub fn no_tools() -> Self {
        Self {
            has_hallucination: false,
            confidence: 100,
            issues: Vec::new(),
            warnings: vec![NO_TOOLS_WARNING.to_string()],
            findings: BTreeMap::new(),
        }
    }

    /// Aggregate rule findings into a report
    pub fn from_findings(findings: BTreeMap<GroundingRule, ValidationFinding>) -> Self {
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        for (rule, finding) in &findings {
            if finding.is_valid {
                continue;
            }
            if let Some(issue) = &finding.issue {
                if rule.is_hard() {
                    issues.push(issue.clone());
                } else {
                    warnings.push(issue.clone());
                }
            }
        }

        let confidence = if findings.is_empty() {
            100
        } else {
            let sum: u32 = findings.values().map(|f| u32::from(f.confidence)).sum();
            (f64::from(sum) / findings.len() as f64).round() as u8
        };

        Self {
            has_hallucination: !issues.is_empty(),
            confidence,
            issues,
            warnings,
            findings,
        }
    }

    pub fn finding(&self, rule: GroundingRule) -> Option<&ValidationFinding> {
        self.findings.get(&rule)
    }
}
