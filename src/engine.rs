//! Claim rule engine.
//!
//! `evaluate` maps a claim and a codebook to an ordered list of findings plus a
//! risk assessment. It is pure and total: the same inputs always give the same
//! output, and clinical contradictions come back as findings, never as errors.
//!
//! # Rule order
//!
//! ```text
//! 1. crosswalk      drug without a diagnosis its crosswalk entry accepts   WARNING
//! 2. conflicts      claim hits both groups of a conflict rule              per rule
//! 3. drug classes   restricted drug without indication / contraindicated   CRITICAL
//! 4. upcoding       risk code without its complication diagnosis           per rule
//! 5. clean          nothing at WARNING or above                            PASS
//! ```
//!
//! The order only affects the sequence of findings. Every rule runs; nothing
//! short-circuits except the empty-claim check, which replaces all of them.
use crate::claim::ClaimRecord;
use crate::codebook::CodeBook;
use crate::finding::{max_severity, Severity, ValidationResult};

mod report;
mod risk;
mod rules;

pub use report::{ClaimReport, ReportMetadata};
pub use risk::{RiskAssessment, RiskLevel};
pub use rules::{
    ConflictRules, CrosswalkRule, DrugClassRules, UpcodingRules, CLEAN_RULE_ID,
    INSUFFICIENT_DATA_RULE_ID,
};

/// One independent check over a claim.
///
/// Rules are appended to a [`RuleEngine`]; adding a rule never requires
/// editing an existing one.
pub trait Rule: Send + Sync {
    /// Stable identifier used in logs.
    fn id(&self) -> &'static str;

    /// Evaluate the claim, returning zero or more findings in emission order.
    fn evaluate(&self, claim: &ClaimRecord, codebook: &CodeBook) -> Vec<ValidationResult>;
}

/// Findings and risk for one claim.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub findings: Vec<ValidationResult>,
    pub assessment: RiskAssessment,
}

impl Evaluation {
    fn from_findings(findings: Vec<ValidationResult>) -> Self {
        let assessment = RiskAssessment::from_findings(&findings);
        Evaluation {
            findings,
            assessment,
        }
    }

    /// Worst severity among the findings.
    pub fn max_severity(&self) -> Severity {
        max_severity(&self.findings).unwrap_or(Severity::Pass)
    }

    pub fn is_flagged(&self) -> bool {
        self.max_severity().is_flagging()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|finding| finding.severity == severity)
            .count()
    }
}

/// Ordered list of rules applied to every claim.
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        RuleEngine::standard()
    }
}

impl RuleEngine {
    /// Engine with no rules; every non-empty claim comes back clean.
    pub fn empty() -> Self {
        RuleEngine { rules: Vec::new() }
    }

    /// The standard rule order: crosswalk, conflicts, drug classes, upcoding.
    pub fn standard() -> Self {
        RuleEngine::empty()
            .with_rule(CrosswalkRule)
            .with_rule(ConflictRules)
            .with_rule(DrugClassRules)
            .with_rule(UpcodingRules)
    }

    /// Append a rule after the existing ones.
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.id()).collect()
    }

    /// Evaluate one claim against `codebook`.
    pub fn evaluate(&self, claim: &ClaimRecord, codebook: &CodeBook) -> Evaluation {
        if claim.lacks_clinical_codes() {
            tracing::debug!(claim_id = claim.claim_id(), "claim has no ICD or NDC codes");
            return Evaluation::from_findings(vec![rules::insufficient_data()]);
        }

        let mut findings = Vec::new();
        for rule in &self.rules {
            let emitted = rule.evaluate(claim, codebook);
            if !emitted.is_empty() {
                tracing::debug!(
                    claim_id = claim.claim_id(),
                    rule = rule.id(),
                    findings = emitted.len(),
                    "rule fired"
                );
            }
            findings.extend(emitted);
        }

        if !findings
            .iter()
            .any(|finding| finding.severity.is_flagging())
        {
            findings.push(rules::clean_claim(self.rules.len()));
        }
        Evaluation::from_findings(findings)
    }

    /// Evaluate and package the result with report metadata.
    pub fn report(&self, claim: &ClaimRecord, codebook: &CodeBook) -> ClaimReport {
        let evaluation = self.evaluate(claim, codebook);
        ClaimReport::new(claim, evaluation, codebook)
    }
}

/// Evaluate `claim` with the standard rule order.
pub fn evaluate(claim: &ClaimRecord, codebook: &CodeBook) -> Evaluation {
    RuleEngine::standard().evaluate(claim, codebook)
}

#[cfg(test)]
mod tests;
