//! Built-in 2026 RxHCC reference tables.
//!
//! Drug prefixes are NDC labeler-product segments (or full NDCs where one
//! product has several labelled indications), plus the `RX_*` aliases used by
//! manually keyed claims.
use super::{
    CodeBookConfig, ConflictRule, DrugClass, MappingEntry, PipelineRefs, SpecificityGap,
    UpcodingRule, CODEBOOK_SCHEMA_VERSION,
};
use crate::finding::Severity;
use std::collections::BTreeMap;

const METFORMIN: &str = "00002-1433";
const INSULIN_GLARGINE: &str = "00088-2500";
const INSULIN_LISPRO: &str = "00002-8215";
const SEMAGLUTIDE: &str = "00169-4060";
const SEMAGLUTIDE_DIABETES: &str = "00169-4060-12";
const SEMAGLUTIDE_WEIGHT: &str = "00169-4060-13";
const PREGABALIN: &str = "00071-1013";
const LISINOPRIL: &str = "68180-0513";
const AMLODIPINE: &str = "00069-1530";
const ATORVASTATIN: &str = "00071-0155";

const DIABETES_COMPLICATIONS: [&str; 10] = [
    "E10.2", "E10.3", "E10.4", "E10.5", "E10.6", "E11.2", "E11.3", "E11.4", "E11.5", "E11.6",
];

fn codes(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn mapping(description: &str, drugs: &[&str]) -> MappingEntry {
    MappingEntry {
        description: description.to_string(),
        valid_drug_prefixes: codes(drugs),
    }
}

pub(super) fn tables() -> CodeBookConfig {
    let mut crosswalk = BTreeMap::new();
    crosswalk.insert(
        "E10".to_string(),
        mapping(
            "Type 1 diabetes mellitus",
            &[INSULIN_GLARGINE, INSULIN_LISPRO, "RX_INSULIN"],
        ),
    );
    crosswalk.insert(
        "E11".to_string(),
        mapping(
            "Type 2 diabetes mellitus",
            &[
                METFORMIN,
                INSULIN_GLARGINE,
                INSULIN_LISPRO,
                SEMAGLUTIDE_DIABETES,
                "RX_METFORMIN",
                "RX_INSULIN",
                "RX_GLP1_OZEMPIC",
            ],
        ),
    );
    crosswalk.insert(
        "E11.4".to_string(),
        mapping(
            "Type 2 diabetes mellitus with neurological complications",
            &[PREGABALIN, "RX_PREGABALIN"],
        ),
    );
    crosswalk.insert(
        "E66".to_string(),
        mapping(
            "Overweight and obesity",
            &[SEMAGLUTIDE_WEIGHT, "RX_GLP1_WEGOVY"],
        ),
    );
    crosswalk.insert(
        "E78".to_string(),
        mapping(
            "Disorders of lipoprotein metabolism",
            &[ATORVASTATIN, "RX_ATORVASTATIN"],
        ),
    );
    crosswalk.insert(
        "G62".to_string(),
        mapping(
            "Other and unspecified polyneuropathies",
            &[PREGABALIN, "RX_PREGABALIN"],
        ),
    );
    crosswalk.insert(
        "I10".to_string(),
        mapping(
            "Essential (primary) hypertension",
            &[LISINOPRIL, AMLODIPINE, "RX_LISINOPRIL"],
        ),
    );

    let conflict_rules = vec![
        ConflictRule {
            id: "DX-CONFLICT-T1T2".to_string(),
            name: "Type 1 / Type 2 diabetes conflict".to_string(),
            codes_a: codes(&["E10"]),
            codes_b: codes(&["E11"]),
            severity: Severity::Critical,
            message: "Type 1 ({codes_a}) and Type 2 ({codes_b}) diabetes cannot coexist on the same claim."
                .to_string(),
        },
        ConflictRule {
            id: "DX-CONFLICT-REMISSION".to_string(),
            name: "Remission / active diabetes conflict".to_string(),
            codes_a: codes(&["E11.A"]),
            codes_b: codes(&[
                "E11.0", "E11.1", "E11.2", "E11.3", "E11.4", "E11.5", "E11.6", "E11.8", "E11.9",
            ]),
            severity: Severity::Critical,
            message: "Diabetes in remission ({codes_a}) cannot coexist with active diabetes ({codes_b})."
                .to_string(),
        },
        ConflictRule {
            id: "DX-CONFLICT-COMPLICATION".to_string(),
            name: "Uncomplicated / complicated diabetes conflict".to_string(),
            codes_a: codes(&["E10.9", "E11.9"]),
            codes_b: codes(&DIABETES_COMPLICATIONS),
            severity: Severity::Critical,
            message: "Diabetes coded both without complications ({codes_a}) and with complications ({codes_b})."
                .to_string(),
        },
        ConflictRule {
            id: "DX-SPECIFICITY-NEUROPATHY".to_string(),
            name: "Unlinked diabetic polyneuropathy".to_string(),
            codes_a: codes(&["E11.9"]),
            codes_b: codes(&["G62.9"]),
            severity: Severity::Warning,
            message: "Unspecified diabetes ({codes_a}) with unlinked polyneuropathy ({codes_b}); E11.42 captures the complication."
                .to_string(),
        },
    ];

    let drug_classes = vec![
        DrugClass {
            id: "GLP1".to_string(),
            name: "GLP-1 receptor agonists".to_string(),
            drug_prefixes: codes(&[SEMAGLUTIDE, "RX_GLP1"]),
            eligible_indications: codes(&["E11", "E66"]),
            excluded_indications: codes(&["E10"]),
            mismatch_severity: Severity::Critical,
        },
    ];

    let upcoding_rules = [
        ("HCC18", "Diabetes with chronic complications (CMS-HCC V24)"),
        ("HCC37", "Diabetes with chronic complications (CMS-HCC V28)"),
        ("RXHCC30", "Diabetes with complications (RxHCC)"),
    ]
    .into_iter()
    .map(|(risk_code, description)| UpcodingRule {
        risk_code: risk_code.to_string(),
        description: description.to_string(),
        required_complication_prefixes: codes(&DIABETES_COMPLICATIONS),
        severity: Severity::Warning,
    })
    .collect();

    CodeBookConfig {
        schema_version: CODEBOOK_SCHEMA_VERSION,
        model_year: Some("2026".to_string()),
        crosswalk,
        conflict_rules,
        drug_classes,
        upcoding_rules,
        specificity_gaps: vec![SpecificityGap {
            unspecified_code: "E11.9".to_string(),
            companion_code: "G62.9".to_string(),
            suggested_code: "E11.42".to_string(),
            note: "Diabetes with polyneuropathy captures RxHCC30".to_string(),
        }],
        pipeline: PipelineRefs {
            antidiabetic_drug_prefixes: codes(&[
                METFORMIN,
                INSULIN_GLARGINE,
                INSULIN_LISPRO,
                SEMAGLUTIDE_DIABETES,
                "RX_METFORMIN",
                "RX_INSULIN",
                "RX_GLP1_OZEMPIC",
            ]),
            qualifying_diagnosis_prefixes: codes(&["E10", "E11"]),
            remission_rule: "DX-CONFLICT-REMISSION".to_string(),
            type_conflict_rule: "DX-CONFLICT-T1T2".to_string(),
        },
    }
}
