use super::{Evaluation, RiskLevel};
use crate::claim::ClaimRecord;
use crate::codebook::CodeBook;
use crate::finding::{Severity, ValidationResult};
use serde::{Deserialize, Serialize};

/// Per-claim output: the findings plus derived metadata.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClaimReport {
    pub claim_id: String,
    pub results: Vec<ValidationResult>,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ReportMetadata {
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub max_severity: Severity,
    pub is_flagged: bool,
    pub n_critical: usize,
    pub n_warning: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_year: Option<String>,
}

impl ClaimReport {
    pub(super) fn new(claim: &ClaimRecord, evaluation: Evaluation, codebook: &CodeBook) -> Self {
        let metadata = ReportMetadata {
            risk_score: evaluation.assessment.risk_score,
            risk_level: evaluation.assessment.risk_level,
            max_severity: evaluation.max_severity(),
            is_flagged: evaluation.is_flagged(),
            n_critical: evaluation.count(Severity::Critical),
            n_warning: evaluation.count(Severity::Warning),
            model_year: codebook.model_year().map(str::to_string),
        };
        ClaimReport {
            claim_id: claim.claim_id().to_string(),
            results: evaluation.findings,
            metadata,
        }
    }
}
