//! Built-in demonstration claims.
//!
//! Each scenario pairs a claim with the worst severity the standard engine
//! should report for it against the built-in tables, so the set doubles as a
//! smoke test for a custom codebook.
use crate::claim::ClaimRecord;
use crate::finding::Severity;

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    pub claim: ClaimRecord,
    pub expected: Severity,
}

fn scenario(
    name: &'static str,
    description: &'static str,
    claim_id: &str,
    codes: [&str; 3],
    expected: Severity,
) -> Scenario {
    let [icd, ndc, hcc] = codes;
    let patient = claim_id.replace("DEMO-", "PAT-10");
    Scenario {
        name,
        description,
        claim: ClaimRecord::new(claim_id)
            .with_patient_id(patient)
            .with_icd_codes(icd)
            .with_ndc_codes(ndc)
            .with_hcc_codes(hcc),
        expected,
    }
}

/// The seven demonstration claims, in presentation order.
pub fn builtin() -> Vec<Scenario> {
    vec![
        scenario(
            "clean-t2-metformin",
            "Type 2 diabetes (E11.9) with metformin.",
            "DEMO-001",
            ["E11.9", "00002-1433-80", "HCC19"],
            Severity::Pass,
        ),
        scenario(
            "t1-t2-conflict",
            "Type 1 and Type 2 diabetes diagnosed together.",
            "DEMO-002",
            ["E10.9,E11.65", "00088-2500-33", "HCC18"],
            Severity::Critical,
        ),
        scenario(
            "glp1-without-indication",
            "GLP-1 (Ozempic) for hypertension (I10) with no diabetes or obesity diagnosis.",
            "DEMO-003",
            ["I10", "00169-4060-12", ""],
            Severity::Critical,
        ),
        scenario(
            "glp1-type1",
            "GLP-1 for Type 1 diabetes (E10.9), which the class excludes.",
            "DEMO-004",
            ["E10.9", "00169-4060-12", ""],
            Severity::Critical,
        ),
        scenario(
            "hcc-upcoding",
            "Complication risk code HCC18 on uncomplicated diabetes (E11.9).",
            "DEMO-005",
            ["E11.9", "00002-1433-80", "HCC18"],
            Severity::Warning,
        ),
        scenario(
            "insulin-for-hypertension",
            "Insulin dispensed against a hypertension diagnosis.",
            "DEMO-006",
            ["I10", "00088-2500-33", ""],
            Severity::Warning,
        ),
        scenario(
            "obesity-wegovy",
            "Obesity (E66.01) with Wegovy, an eligible GLP-1 indication.",
            "DEMO-007",
            ["E66.01", "00169-4060-13", ""],
            Severity::Pass,
        ),
    ]
}

/// Look a scenario up by name or claim id.
pub fn find(key: &str) -> Option<Scenario> {
    builtin().into_iter().find(|scenario| {
        scenario.name.eq_ignore_ascii_case(key)
            || scenario.claim.claim_id().eq_ignore_ascii_case(key)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebook::CodeBook;
    use crate::engine::{RiskLevel, RuleEngine};

    #[test]
    fn builtin_scenarios_match_expected_severity() {
        let codebook = CodeBook::rxhcc_2026();
        let engine = RuleEngine::standard();
        for scenario in builtin() {
            let evaluation = engine.evaluate(&scenario.claim, &codebook);
            assert_eq!(
                evaluation.max_severity(),
                scenario.expected,
                "{}: {:?}",
                scenario.name,
                evaluation.findings
            );
        }
    }

    #[test]
    fn scenario_risk_levels() {
        let codebook = CodeBook::rxhcc_2026();
        let levels: Vec<RiskLevel> = builtin()
            .iter()
            .map(|scenario| {
                RuleEngine::standard()
                    .evaluate(&scenario.claim, &codebook)
                    .assessment
                    .risk_level
            })
            .collect();
        assert_eq!(
            levels,
            vec![
                RiskLevel::Minimal,
                RiskLevel::High,
                RiskLevel::High,
                RiskLevel::High,
                RiskLevel::Low,
                RiskLevel::Low,
                RiskLevel::Minimal,
            ]
        );
    }

    #[test]
    fn lookup_by_name_or_claim_id() {
        assert_eq!(
            find("demo-005").map(|scenario| scenario.name),
            Some("hcc-upcoding")
        );
        assert_eq!(
            find("obesity-wegovy").and_then(|scenario| scenario.claim.patient_id().map(str::to_string)),
            Some("PAT-10007".to_string())
        );
        assert!(find("missing").is_none());
    }
}
