use crate::finding::ValidationResult;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_SCORE: u32 = 100;

/// Coarse risk band derived from the score.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            70..=u8::MAX => RiskLevel::High,
            40..=69 => RiskLevel::Medium,
            15..=39 => RiskLevel::Low,
            _ => RiskLevel::Minimal,
        }
    }

    /// Return the stable string identifier used in JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Minimal => "MINIMAL",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score in `0..=100` plus its band. Always derived from a finding list.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct RiskAssessment {
    pub risk_score: u8,
    pub risk_level: RiskLevel,
}

impl RiskAssessment {
    /// Fold severity weights over `findings`, capped at 100.
    pub fn from_findings(findings: &[ValidationResult]) -> Self {
        let total = findings
            .iter()
            .fold(0u32, |acc, finding| acc.saturating_add(finding.severity.weight()));
        let risk_score = u8::try_from(total.min(MAX_SCORE)).unwrap_or(u8::MAX);
        RiskAssessment {
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
        }
    }
}
