//! Standard rules, one struct per table in the codebook.
use super::Rule;
use crate::claim::{codes_matching, ClaimRecord};
use crate::codebook::{CodeBook, MappingEntry};
use crate::finding::{Severity, ValidationResult};
use std::collections::BTreeSet;

pub const INSUFFICIENT_DATA_RULE_ID: &str = "CLAIM-INSUFFICIENT-DATA";
pub const CLEAN_RULE_ID: &str = "CLAIM-CLEAN";
const CROSSWALK_RULE_ID: &str = "RX-XWALK";
const UPCODING_RULE_ID: &str = "HCC-UPCODE";

pub(super) fn insufficient_data() -> ValidationResult {
    ValidationResult::new(
        INSUFFICIENT_DATA_RULE_ID,
        "Insufficient data",
        Severity::Info,
        "Insufficient data: claim carries no diagnosis (ICD) or drug (NDC) codes.",
    )
}

pub(super) fn clean_claim(rules_run: usize) -> ValidationResult {
    ValidationResult::new(
        CLEAN_RULE_ID,
        "Claim integrity",
        Severity::Pass,
        "No integrity issues detected.",
    )
    .with_detail("rules_run", rules_run)
}

/// Sorted, de-duplicated, comma-joined view of matched codes.
fn joined(codes: Vec<&str>) -> String {
    codes
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(", ")
}

fn unique_in_order(codes: &[String]) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    codes
        .iter()
        .map(String::as_str)
        .filter(|code| seen.insert(*code))
        .collect()
}

/// Every drug needs a diagnosis that its crosswalk entries accept.
///
/// Among the entries that list the drug, the longest diagnosis prefix present
/// on the claim is the match. Drugs that no entry lists are not judged. A
/// mismatch is a WARNING unless a restricted class raises it.
pub struct CrosswalkRule;

impl Rule for CrosswalkRule {
    fn id(&self) -> &'static str {
        CROSSWALK_RULE_ID
    }

    fn evaluate(&self, claim: &ClaimRecord, codebook: &CodeBook) -> Vec<ValidationResult> {
        let mut findings = Vec::new();
        for drug in unique_in_order(claim.ndc_codes()) {
            let entries = codebook.crosswalk_entries_for_drug(drug);
            if entries.is_empty() {
                tracing::debug!(
                    claim_id = claim.claim_id(),
                    drug_code = drug,
                    "drug not covered by crosswalk"
                );
                continue;
            }
            if let Some(prefix) = longest_present_prefix(claim, &entries) {
                tracing::trace!(drug_code = drug, diagnosis_prefix = prefix, "crosswalk match");
                continue;
            }
            let severity = codebook.crosswalk_mismatch_severity(drug);
            findings.push(crosswalk_mismatch(claim, drug, &entries, severity));
        }
        findings
    }
}

fn longest_present_prefix<'a>(
    claim: &ClaimRecord,
    entries: &[(&'a str, &MappingEntry)],
) -> Option<&'a str> {
    entries
        .iter()
        .map(|(prefix, _)| *prefix)
        .filter(|prefix| claim.has_diagnosis_prefix(&[prefix]))
        .max_by_key(|prefix| prefix.len())
}

fn crosswalk_mismatch(
    claim: &ClaimRecord,
    drug: &str,
    entries: &[(&str, &MappingEntry)],
    severity: Severity,
) -> ValidationResult {
    let expected = entries
        .iter()
        .map(|(prefix, entry)| format!("{prefix} ({})", entry.description))
        .collect::<Vec<_>>()
        .join("; ");
    let diagnoses = if claim.icd_codes().is_empty() {
        "none".to_string()
    } else {
        claim.icd_codes().join(", ")
    };
    ValidationResult::new(
        CROSSWALK_RULE_ID,
        "Diagnosis-drug crosswalk",
        severity,
        format!(
            "Diagnosis-drug mismatch: {drug} requires a diagnosis under {expected}; claim diagnoses: {diagnoses}."
        ),
    )
    .with_detail("drug_code", drug)
    .with_detail(
        "expected_diagnosis_prefixes",
        entries
            .iter()
            .map(|(prefix, _)| *prefix)
            .collect::<Vec<_>>()
            .join(", "),
    )
    .with_detail("claim_diagnoses", diagnoses)
}

/// Claims must not hit both groups of any configured conflict rule.
pub struct ConflictRules;

impl Rule for ConflictRules {
    fn id(&self) -> &'static str {
        "DX-CONFLICT"
    }

    fn evaluate(&self, claim: &ClaimRecord, codebook: &CodeBook) -> Vec<ValidationResult> {
        codebook
            .conflict_rules()
            .iter()
            .filter_map(|rule| {
                let in_a = codes_matching(claim.icd_codes(), &rule.codes_a);
                let in_b = codes_matching(claim.icd_codes(), &rule.codes_b);
                if in_a.is_empty() || in_b.is_empty() {
                    return None;
                }
                let codes_a = joined(in_a);
                let codes_b = joined(in_b);
                let message = rule
                    .message
                    .replace("{codes_a}", &codes_a)
                    .replace("{codes_b}", &codes_b);
                Some(
                    ValidationResult::new(&rule.id, &rule.name, rule.severity, message)
                        .with_detail("codes_a", codes_a)
                        .with_detail("codes_b", codes_b),
                )
            })
            .collect()
    }
}

/// Restricted drug classes need an eligible indication and must not be paired
/// with an excluded one.
pub struct DrugClassRules;

impl Rule for DrugClassRules {
    fn id(&self) -> &'static str {
        "DRUG-CLASS"
    }

    fn evaluate(&self, claim: &ClaimRecord, codebook: &CodeBook) -> Vec<ValidationResult> {
        let mut findings = Vec::new();
        for class in codebook.drug_classes() {
            let drugs = codes_matching(claim.ndc_codes(), &class.drug_prefixes);
            if drugs.is_empty() {
                continue;
            }
            let drugs = joined(drugs);
            if !claim.has_diagnosis_prefix(&class.eligible_indications) {
                let eligible = class.eligible_indications.join(", ");
                findings.push(
                    ValidationResult::new(
                        format!("{}-ELIGIBILITY", class.id),
                        format!("{} eligibility", class.name),
                        Severity::Critical,
                        format!(
                            "Restricted drug {drugs} ({}) dispensed without qualifying indication; expected a diagnosis under {eligible}.",
                            class.name
                        ),
                    )
                    .with_detail("drug_class", class.id.as_str())
                    .with_detail("drug_codes", drugs.as_str())
                    .with_detail("eligible_indications", eligible),
                );
            }
            let excluded = codes_matching(claim.icd_codes(), &class.excluded_indications);
            if !excluded.is_empty() {
                let excluded = joined(excluded);
                findings.push(
                    ValidationResult::new(
                        format!("{}-CONTRAINDICATION", class.id),
                        format!("{} contraindication", class.name),
                        Severity::Critical,
                        format!(
                            "Contraindicated: {drugs} ({}) dispensed alongside excluded diagnosis {excluded}.",
                            class.name
                        ),
                    )
                    .with_detail("drug_class", class.id.as_str())
                    .with_detail("drug_codes", drugs.as_str())
                    .with_detail("excluded_diagnoses", excluded),
                );
            }
        }
        findings
    }
}

/// Risk codes that imply a complication need a complication diagnosis.
pub struct UpcodingRules;

impl Rule for UpcodingRules {
    fn id(&self) -> &'static str {
        UPCODING_RULE_ID
    }

    fn evaluate(&self, claim: &ClaimRecord, codebook: &CodeBook) -> Vec<ValidationResult> {
        codebook
            .upcoding_rules()
            .iter()
            .filter(|rule| claim.hcc_codes().iter().any(|code| *code == rule.risk_code))
            .filter(|rule| !claim.has_diagnosis_prefix(&rule.required_complication_prefixes))
            .map(|rule| {
                ValidationResult::new(
                    UPCODING_RULE_ID,
                    "Risk-score upcoding",
                    rule.severity,
                    format!(
                        "Possible risk-score upcoding: {} ({}) billed without a complication diagnosis under {}.",
                        rule.risk_code,
                        rule.description,
                        rule.required_complication_prefixes.join(", ")
                    ),
                )
                .with_detail("risk_code", rule.risk_code.as_str())
                .with_detail("claim_diagnoses", claim.icd_codes().join(", "))
            })
            .collect()
    }
}
