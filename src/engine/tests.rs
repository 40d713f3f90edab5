use super::*;
use crate::finding::DetailValue;
use proptest::prelude::*;

fn claim(icd: &str, ndc: &str) -> ClaimRecord {
    ClaimRecord::new("CLM-TEST")
        .with_icd_codes(icd)
        .with_ndc_codes(ndc)
}

fn rule_ids(evaluation: &Evaluation) -> Vec<&str> {
    evaluation
        .findings
        .iter()
        .map(|finding| finding.rule_id.as_str())
        .collect()
}

#[test]
fn matching_diabetes_claim_is_a_single_pass() {
    let codebook = CodeBook::rxhcc_2026();
    let evaluation = evaluate(&claim("E11.9", "00002-1433-80"), &codebook);
    assert_eq!(rule_ids(&evaluation), vec![CLEAN_RULE_ID]);
    assert_eq!(evaluation.findings[0].severity, Severity::Pass);
    assert_eq!(evaluation.assessment.risk_score, 0);
    assert_eq!(evaluation.assessment.risk_level, RiskLevel::Minimal);
    assert!(!evaluation.is_flagged());
}

#[test]
fn type_one_and_type_two_conflict_is_high_risk() {
    let codebook = CodeBook::rxhcc_2026();
    let evaluation = evaluate(&claim("E10.9, E11.65", ""), &codebook);
    assert_eq!(
        rule_ids(&evaluation),
        vec!["DX-CONFLICT-T1T2", "DX-CONFLICT-COMPLICATION"]
    );
    assert!(evaluation
        .findings
        .iter()
        .all(|finding| finding.severity == Severity::Critical));
    assert_eq!(
        evaluation.findings[0].message,
        "Type 1 (E10.9) and Type 2 (E11.65) diabetes cannot coexist on the same claim."
    );
    assert_eq!(evaluation.assessment.risk_score, 80);
    assert_eq!(evaluation.assessment.risk_level, RiskLevel::High);
}

#[test]
fn restricted_drug_without_indication_is_high_risk() {
    let codebook = CodeBook::rxhcc_2026();
    let evaluation = evaluate(&claim("I10", "00169-4060-12"), &codebook);
    assert_eq!(rule_ids(&evaluation), vec!["RX-XWALK", "GLP1-ELIGIBILITY"]);
    assert_eq!(evaluation.findings[0].severity, Severity::Critical);
    let eligibility = &evaluation.findings[1];
    assert_eq!(eligibility.severity, Severity::Critical);
    assert!(eligibility
        .message
        .contains("without qualifying indication"));
    assert_eq!(
        eligibility.details.get("drug_class"),
        Some(&DetailValue::from("GLP1"))
    );
    assert_eq!(evaluation.assessment.risk_score, 80);
    assert_eq!(evaluation.assessment.risk_level, RiskLevel::High);
}

#[test]
fn remission_with_active_diabetes_is_critical() {
    let codebook = CodeBook::rxhcc_2026();
    let evaluation = evaluate(&claim("E11.A,E11.9", ""), &codebook);
    assert_eq!(rule_ids(&evaluation), vec!["DX-CONFLICT-REMISSION"]);
    assert_eq!(evaluation.max_severity(), Severity::Critical);
    assert_eq!(evaluation.assessment.risk_level, RiskLevel::Medium);
}

#[test]
fn empty_claim_yields_only_insufficient_data() {
    let codebook = CodeBook::rxhcc_2026();
    let evaluation = evaluate(&claim("", " , "), &codebook);
    assert_eq!(rule_ids(&evaluation), vec![INSUFFICIENT_DATA_RULE_ID]);
    assert_eq!(evaluation.findings[0].severity, Severity::Info);
    assert!(evaluation.findings[0]
        .message
        .to_lowercase()
        .contains("insufficient data"));
    assert_eq!(evaluation.assessment.risk_score, 0);
    assert_eq!(evaluation.assessment.risk_level, RiskLevel::Minimal);
}

#[test]
fn glp1_with_type_one_is_both_ineligible_and_contraindicated() {
    let codebook = CodeBook::rxhcc_2026();
    let evaluation = evaluate(&claim("E10.9", "00169-4060-12"), &codebook);
    assert_eq!(
        rule_ids(&evaluation),
        vec!["RX-XWALK", "GLP1-ELIGIBILITY", "GLP1-CONTRAINDICATION"]
    );
    assert_eq!(evaluation.count(Severity::Critical), 3);
    assert_eq!(evaluation.assessment.risk_score, 100);
}

#[test]
fn contraindication_fires_even_when_eligible() {
    let codebook = CodeBook::rxhcc_2026();
    let evaluation = evaluate(&claim("E10.9,E66.01", "00169-4060-13"), &codebook);
    assert_eq!(rule_ids(&evaluation), vec!["GLP1-CONTRAINDICATION"]);
}

#[test]
fn risk_code_without_complication_is_upcoding() {
    let codebook = CodeBook::rxhcc_2026();
    let suspicious = claim("E11.9", "00002-1433-80").with_hcc_codes("HCC18");
    let evaluation = evaluate(&suspicious, &codebook);
    assert_eq!(rule_ids(&evaluation), vec!["HCC-UPCODE"]);
    assert!(evaluation.findings[0]
        .message
        .to_lowercase()
        .contains("possible risk-score upcoding"));
    assert_eq!(evaluation.assessment.risk_level, RiskLevel::Low);

    let supported = claim("E11.42", "00002-1433-80").with_hcc_codes("HCC18");
    assert_eq!(
        rule_ids(&evaluate(&supported, &codebook)),
        vec![CLEAN_RULE_ID]
    );
}

#[test]
fn crosswalk_mismatch_reports_drug_and_expected_prefixes() {
    let codebook = CodeBook::rxhcc_2026();
    let evaluation = evaluate(&claim("I10", "00088-2500-33"), &codebook);
    assert_eq!(rule_ids(&evaluation), vec!["RX-XWALK"]);
    let mismatch = &evaluation.findings[0];
    assert_eq!(mismatch.severity, Severity::Warning);
    assert_eq!(
        mismatch.details.get("drug_code"),
        Some(&DetailValue::from("00088-2500-33"))
    );
    assert_eq!(
        mismatch.details.get("expected_diagnosis_prefixes"),
        Some(&DetailValue::from("E10, E11"))
    );
    assert_eq!(evaluation.assessment.risk_score, 15);
    assert_eq!(evaluation.assessment.risk_level, RiskLevel::Low);
}

#[test]
fn unrestricted_antidiabetic_mismatch_stays_a_warning() {
    let codebook = CodeBook::rxhcc_2026();
    for drug in ["00088-2500-33", "00002-1433-80", "RX_METFORMIN", "RX_INSULIN"] {
        let evaluation = evaluate(&claim("I10", drug), &codebook);
        assert_eq!(rule_ids(&evaluation), vec!["RX-XWALK"], "{drug}");
        assert_eq!(evaluation.max_severity(), Severity::Warning, "{drug}");
    }
    assert_eq!(
        codebook.crosswalk_mismatch_severity("00169-4060-12"),
        Severity::Critical
    );
    assert_eq!(
        codebook.crosswalk_mismatch_severity("00088-2500-33"),
        Severity::Warning
    );
}

#[test]
fn unmapped_drugs_are_not_judged() {
    let codebook = CodeBook::rxhcc_2026();
    let evaluation = evaluate(&claim("J45.909", "99999-0000-01"), &codebook);
    assert_eq!(rule_ids(&evaluation), vec![CLEAN_RULE_ID]);
}

#[test]
fn duplicate_drug_codes_produce_one_mismatch() {
    let codebook = CodeBook::rxhcc_2026();
    let evaluation = evaluate(&claim("J45.909", "68180-0513-01,68180-0513-01"), &codebook);
    assert_eq!(rule_ids(&evaluation), vec!["RX-XWALK"]);
}

#[test]
fn report_carries_metadata() {
    let codebook = CodeBook::rxhcc_2026();
    let report = RuleEngine::standard().report(&claim("I10", "00169-4060-12"), &codebook);
    assert_eq!(report.claim_id, "CLM-TEST");
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.metadata.risk_score, 80);
    assert_eq!(report.metadata.max_severity, Severity::Critical);
    assert!(report.metadata.is_flagged);
    assert_eq!(report.metadata.n_critical, 2);
    assert_eq!(report.metadata.n_warning, 0);
    assert_eq!(report.metadata.model_year.as_deref(), Some("2026"));

    let value = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(value["metadata"]["risk_level"], "HIGH");
    assert_eq!(value["results"][0]["severity"], "CRITICAL");
}

struct AmountCeiling;

impl Rule for AmountCeiling {
    fn id(&self) -> &'static str {
        "AMOUNT-CEILING"
    }

    fn evaluate(&self, claim: &ClaimRecord, _codebook: &CodeBook) -> Vec<ValidationResult> {
        if claim.claim_amount() > 10_000.0 {
            vec![ValidationResult::new(
                "AMOUNT-CEILING",
                "Amount ceiling",
                Severity::Warning,
                "Claim amount above review ceiling.",
            )]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn appended_rule_runs_after_standard_rules() {
    let codebook = CodeBook::rxhcc_2026();
    let engine = RuleEngine::standard().with_rule(AmountCeiling);
    assert_eq!(
        engine.rule_ids(),
        vec!["RX-XWALK", "DX-CONFLICT", "DRUG-CLASS", "HCC-UPCODE", "AMOUNT-CEILING"]
    );
    let expensive = claim("E10.9,E11.9", "").with_claim_amount(25_000.0);
    let evaluation = engine.evaluate(&expensive, &codebook);
    assert_eq!(
        rule_ids(&evaluation),
        vec!["DX-CONFLICT-T1T2", "AMOUNT-CEILING"]
    );
}

#[test]
fn empty_engine_reports_clean() {
    let codebook = CodeBook::rxhcc_2026();
    let evaluation = RuleEngine::empty().evaluate(&claim("E10.9,E11.9", ""), &codebook);
    assert_eq!(rule_ids(&evaluation), vec![CLEAN_RULE_ID]);
    assert_eq!(
        evaluation.findings[0].details.get("rules_run"),
        Some(&DetailValue::Integer(0))
    );
}

const ICD_POOL: [&str; 12] = [
    "E10.9", "E10.65", "E11.9", "E11.42", "E11.65", "E11.A", "E66.01", "G62.9", "I10", "E78.5",
    "J45.909", "Z79.4",
];
const NDC_POOL: [&str; 8] = [
    "00002-1433-80",
    "00088-2500-33",
    "00169-4060-12",
    "00169-4060-13",
    "00071-1013-68",
    "68180-0513-01",
    "99999-0000-01",
    "RX_INSULIN",
];
const HCC_POOL: [&str; 3] = ["HCC18", "HCC37", "RXHCC30"];
const NEUTRAL_ICD: [&str; 4] = ["E78.5", "I10", "J45.909", "Z79.4"];
const NEUTRAL_NDC: [&str; 2] = ["99999-0000-01", "RX_INSULIN"];

fn arb_claim() -> impl Strategy<Value = ClaimRecord> {
    (
        proptest::sample::subsequence(ICD_POOL.to_vec(), 0..=5),
        proptest::sample::subsequence(NDC_POOL.to_vec(), 0..=3),
        proptest::sample::subsequence(HCC_POOL.to_vec(), 0..=2),
    )
        .prop_map(|(icd, ndc, hcc)| {
            ClaimRecord::new("CLM-PROP")
                .with_icd_codes(icd)
                .with_ndc_codes(ndc)
                .with_hcc_codes(hcc)
        })
}

/// Uncomplicated Type 2 diabetes on metformin plus codes no rule reacts to.
fn arb_clean_claim() -> impl Strategy<Value = ClaimRecord> {
    (
        proptest::sample::subsequence(NEUTRAL_ICD.to_vec(), 0..=4).prop_shuffle(),
        proptest::sample::subsequence(NEUTRAL_NDC.to_vec(), 0..=2),
    )
        .prop_map(|(extra_icd, extra_ndc)| {
            let mut icd = vec!["E11.9"];
            icd.extend(extra_icd);
            let mut ndc = vec!["00002-1433-80"];
            ndc.extend(extra_ndc);
            ClaimRecord::new("CLM-CLEAN")
                .with_icd_codes(icd)
                .with_ndc_codes(ndc)
        })
}

proptest! {
    #[test]
    fn every_claim_gets_at_least_one_finding(claim in arb_claim()) {
        let evaluation = evaluate(&claim, &CodeBook::rxhcc_2026());
        prop_assert!(!evaluation.findings.is_empty());
        prop_assert!(evaluation.assessment.risk_score <= 100);
    }

    #[test]
    fn evaluation_is_pure(claim in arb_claim()) {
        let codebook = CodeBook::rxhcc_2026();
        let first = serde_json::to_string(&RuleEngine::standard().report(&claim, &codebook))
            .expect("serialize first");
        let second = serde_json::to_string(&RuleEngine::standard().report(&claim, &codebook))
            .expect("serialize second");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn adding_a_conflict_never_lowers_a_clean_score(claim in arb_clean_claim()) {
        let codebook = CodeBook::rxhcc_2026();
        let base = evaluate(&claim, &codebook);
        prop_assert_eq!(base.max_severity(), Severity::Pass);

        let mut icd = claim.icd_codes().to_vec();
        icd.push("E10.9".to_string());
        icd.push("E11.65".to_string());
        let extended = claim.clone().with_icd_codes(icd);
        let after = evaluate(&extended, &codebook);
        prop_assert!(after.is_flagged());
        prop_assert!(after.assessment.risk_score >= base.assessment.risk_score);
    }

    #[test]
    fn conflict_detection_ignores_code_order(
        icd in proptest::sample::subsequence(ICD_POOL.to_vec(), 0..=6).prop_shuffle()
    ) {
        let codebook = CodeBook::rxhcc_2026();
        let mut sorted = icd.clone();
        sorted.sort_unstable();
        let shuffled = ClaimRecord::new("A").with_icd_codes(icd);
        let ordered = ClaimRecord::new("B").with_icd_codes(sorted);
        prop_assert_eq!(
            ConflictRules.evaluate(&shuffled, &codebook),
            ConflictRules.evaluate(&ordered, &codebook)
        );
    }
}
