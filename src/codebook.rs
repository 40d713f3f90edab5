//! Static reference tables used by every rule.
//!
//! A [`CodeBook`] is built once from a [`CodeBookConfig`], validated and
//! normalized, then shared read-only for the life of the process. Loading a new
//! model year means building a new `CodeBook`; there is no mutation API.
//!
//! # Tables
//!
//! ```text
//! CodeBookConfig
//! ├── crosswalk:        diagnosis prefix -> {description, valid drug prefixes}
//! ├── conflict_rules:   [{id, group A prefixes, group B prefixes, severity, message}]
//! ├── drug_classes:     [{id, drug prefixes, eligible / excluded indications}]
//! ├── upcoding_rules:   [{risk code, required complication prefixes}]
//! ├── specificity_gaps: [{unspecified code, companion code, suggested code}]
//! └── pipeline:         stage-1 drug / diagnosis prefixes, stage-2 conflict rule ids
//! ```
use crate::claim::normalize_code;
use crate::finding::Severity;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

mod config;
mod rxhcc_2026;

pub use config::{
    load_codebook, resolve_codebook_path, write_codebook, CodeBookSource, CODEBOOK_ENV_VAR,
};

/// Current JSON schema version for codebook files.
pub const CODEBOOK_SCHEMA_VERSION: u32 = 1;

const CODE_PATTERN: &str = r"^[A-Z0-9][A-Z0-9._-]*$";

/// Configuration error raised while building a [`CodeBook`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeBookError {
    #[error("unsupported codebook schema_version {found} (expected {expected})")]
    UnsupportedSchemaVersion { found: u32, expected: u32 },
    #[error("crosswalk table is empty")]
    EmptyCrosswalk,
    #[error("{kind} entry has an empty id")]
    EmptyId { kind: &'static str },
    #[error("duplicate {kind} id {id:?}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("crosswalk entry {prefix}: description is missing")]
    MissingDescription { prefix: String },
    #[error("crosswalk entry {prefix}: no valid drug prefixes")]
    MissingDrugPrefixes { prefix: String },
    #[error("conflict rule {rule_id}: group {group} is empty")]
    EmptyConflictGroup { rule_id: String, group: char },
    #[error("conflict rule {rule_id}: group A prefix {prefix_a:?} overlaps group B prefix {prefix_b:?}")]
    OverlappingConflictGroups {
        rule_id: String,
        prefix_a: String,
        prefix_b: String,
    },
    #[error("{context}: severity {severity} cannot tag a finding of this kind")]
    InvalidSeverity { context: String, severity: Severity },
    #[error("drug class {class_id}: no drug prefixes")]
    EmptyDrugClass { class_id: String },
    #[error("drug class {class_id}: no eligible indications")]
    NoEligibleIndications { class_id: String },
    #[error("drug class {class_id}: indication prefix {prefix:?} is not in the crosswalk table")]
    DanglingIndication { class_id: String, prefix: String },
    #[error("upcoding rule {risk_code}: no required complication prefixes")]
    EmptyUpcodingRule { risk_code: String },
    #[error("{context}: malformed code {code:?}")]
    MalformedCode { context: String, code: String },
    #[error("pipeline {field} is empty")]
    EmptyPipelineList { field: &'static str },
    #[error("pipeline references unknown {kind} {id:?}")]
    UnknownReference { kind: &'static str, id: String },
}

/// Crosswalk entry for one diagnosis prefix.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MappingEntry {
    pub description: String,
    pub valid_drug_prefixes: Vec<String>,
}

/// Two diagnosis groups that must not both appear on one claim.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConflictRule {
    pub id: String,
    pub name: String,
    pub codes_a: Vec<String>,
    pub codes_b: Vec<String>,
    pub severity: Severity,
    /// Message template; `{codes_a}` and `{codes_b}` expand to the matched codes.
    pub message: String,
}

/// Restricted drug class with its eligible and excluded indications.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DrugClass {
    pub id: String,
    pub name: String,
    pub drug_prefixes: Vec<String>,
    pub eligible_indications: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_indications: Vec<String>,
    /// Severity of a crosswalk mismatch on one of this class's drugs.
    #[serde(default = "default_warning")]
    pub mismatch_severity: Severity,
}

/// Risk-adjustment code that is only supported by a complication diagnosis.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UpcodingRule {
    pub risk_code: String,
    pub description: String,
    pub required_complication_prefixes: Vec<String>,
    #[serde(default = "default_warning")]
    pub severity: Severity,
}

fn default_warning() -> Severity {
    Severity::Warning
}

/// An unspecified code that should have been coded more specifically when a
/// companion code is present.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SpecificityGap {
    pub unspecified_code: String,
    pub companion_code: String,
    pub suggested_code: String,
    #[serde(default)]
    pub note: String,
}

/// What the staged pipeline reads.
///
/// The stage-1 prefixes live here rather than in `drug_classes` so the rule
/// engine does not treat every anti-diabetic agent as a restricted drug.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PipelineRefs {
    pub antidiabetic_drug_prefixes: Vec<String>,
    /// Diagnosis prefixes that qualify an anti-diabetic drug; each must be a
    /// crosswalk key.
    pub qualifying_diagnosis_prefixes: Vec<String>,
    pub remission_rule: String,
    pub type_conflict_rule: String,
}

/// Serialized form of a codebook, as stored in `codebook.json`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CodeBookConfig {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_year: Option<String>,
    pub crosswalk: BTreeMap<String, MappingEntry>,
    pub conflict_rules: Vec<ConflictRule>,
    pub drug_classes: Vec<DrugClass>,
    #[serde(default)]
    pub upcoding_rules: Vec<UpcodingRule>,
    #[serde(default)]
    pub specificity_gaps: Vec<SpecificityGap>,
    pub pipeline: PipelineRefs,
}

/// Validated, immutable reference data.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(try_from = "CodeBookConfig", into = "CodeBookConfig")]
pub struct CodeBook {
    tables: CodeBookConfig,
}

impl TryFrom<CodeBookConfig> for CodeBook {
    type Error = CodeBookError;

    fn try_from(config: CodeBookConfig) -> Result<Self, Self::Error> {
        let tables = validate_tables(config)?;
        Ok(CodeBook { tables })
    }
}

impl From<CodeBook> for CodeBookConfig {
    fn from(codebook: CodeBook) -> Self {
        codebook.tables
    }
}

impl CodeBook {
    /// Validate and normalize `config` into a codebook.
    pub fn new(config: CodeBookConfig) -> Result<Self, CodeBookError> {
        CodeBook::try_from(config)
    }

    /// Built-in 2026 RxHCC reference tables.
    pub fn rxhcc_2026() -> Self {
        CodeBook::new(rxhcc_2026::tables()).expect("built-in 2026 tables are valid")
    }

    pub fn model_year(&self) -> Option<&str> {
        self.tables.model_year.as_deref()
    }

    pub fn crosswalk(&self) -> &BTreeMap<String, MappingEntry> {
        &self.tables.crosswalk
    }

    pub fn conflict_rules(&self) -> &[ConflictRule] {
        &self.tables.conflict_rules
    }

    pub fn drug_classes(&self) -> &[DrugClass] {
        &self.tables.drug_classes
    }

    pub fn upcoding_rules(&self) -> &[UpcodingRule] {
        &self.tables.upcoding_rules
    }

    pub fn specificity_gaps(&self) -> &[SpecificityGap] {
        &self.tables.specificity_gaps
    }

    pub fn pipeline_refs(&self) -> &PipelineRefs {
        &self.tables.pipeline
    }

    pub fn conflict_rule(&self, id: &str) -> Option<&ConflictRule> {
        self.tables.conflict_rules.iter().find(|rule| rule.id == id)
    }

    /// Severity of a crosswalk mismatch for `drug_code`: the highest
    /// `mismatch_severity` among restricted classes covering it, else WARNING.
    pub fn crosswalk_mismatch_severity(&self, drug_code: &str) -> Severity {
        self.tables
            .drug_classes
            .iter()
            .filter(|class| {
                class
                    .drug_prefixes
                    .iter()
                    .any(|prefix| drug_code.starts_with(prefix.as_str()))
            })
            .map(|class| class.mismatch_severity)
            .fold(Severity::Warning, Severity::max)
    }

    /// Crosswalk entries whose valid drug prefixes cover `drug_code`.
    pub fn crosswalk_entries_for_drug<'a>(
        &'a self,
        drug_code: &str,
    ) -> Vec<(&'a str, &'a MappingEntry)> {
        self.tables
            .crosswalk
            .iter()
            .filter(|(_, entry)| {
                entry
                    .valid_drug_prefixes
                    .iter()
                    .any(|prefix| drug_code.starts_with(prefix.as_str()))
            })
            .map(|(prefix, entry)| (prefix.as_str(), entry))
            .collect()
    }
}

fn validate_tables(mut config: CodeBookConfig) -> Result<CodeBookConfig, CodeBookError> {
    if config.schema_version != CODEBOOK_SCHEMA_VERSION {
        return Err(CodeBookError::UnsupportedSchemaVersion {
            found: config.schema_version,
            expected: CODEBOOK_SCHEMA_VERSION,
        });
    }
    let pattern = Regex::new(CODE_PATTERN).expect("regex for code pattern");

    config.crosswalk = normalize_crosswalk(config.crosswalk, &pattern)?;

    let mut rule_ids = BTreeSet::new();
    for rule in &mut config.conflict_rules {
        validate_conflict_rule(rule, &pattern, &mut rule_ids)?;
    }

    let mut class_ids = BTreeSet::new();
    for class in &mut config.drug_classes {
        validate_drug_class(class, &config.crosswalk, &pattern, &mut class_ids)?;
    }

    let mut risk_codes = BTreeSet::new();
    for rule in &mut config.upcoding_rules {
        rule.risk_code = normalize_code(&rule.risk_code);
        let context = format!("upcoding rule {}", rule.risk_code);
        check_code(&rule.risk_code, &context, &pattern)?;
        if !risk_codes.insert(rule.risk_code.clone()) {
            return Err(CodeBookError::DuplicateId {
                kind: "upcoding rule",
                id: rule.risk_code.clone(),
            });
        }
        rule.required_complication_prefixes =
            normalize_list(&rule.required_complication_prefixes, &context, &pattern)?;
        if rule.required_complication_prefixes.is_empty() {
            return Err(CodeBookError::EmptyUpcodingRule {
                risk_code: rule.risk_code.clone(),
            });
        }
        if rule.severity < Severity::Info {
            return Err(CodeBookError::InvalidSeverity {
                context,
                severity: rule.severity,
            });
        }
    }

    for gap in &mut config.specificity_gaps {
        let context = format!("specificity gap {}", gap.unspecified_code.trim());
        gap.unspecified_code = normalize_code(&gap.unspecified_code);
        gap.companion_code = normalize_code(&gap.companion_code);
        gap.suggested_code = normalize_code(&gap.suggested_code);
        for code in [&gap.unspecified_code, &gap.companion_code, &gap.suggested_code] {
            check_code(code, &context, &pattern)?;
        }
    }

    let refs = &mut config.pipeline;
    refs.antidiabetic_drug_prefixes =
        normalize_list(&refs.antidiabetic_drug_prefixes, "pipeline", &pattern)?;
    if refs.antidiabetic_drug_prefixes.is_empty() {
        return Err(CodeBookError::EmptyPipelineList {
            field: "antidiabetic_drug_prefixes",
        });
    }
    refs.qualifying_diagnosis_prefixes =
        normalize_list(&refs.qualifying_diagnosis_prefixes, "pipeline", &pattern)?;
    if refs.qualifying_diagnosis_prefixes.is_empty() {
        return Err(CodeBookError::EmptyPipelineList {
            field: "qualifying_diagnosis_prefixes",
        });
    }
    if let Some(prefix) = refs
        .qualifying_diagnosis_prefixes
        .iter()
        .find(|prefix| !config.crosswalk.contains_key(prefix.as_str()))
    {
        return Err(CodeBookError::UnknownReference {
            kind: "crosswalk prefix",
            id: prefix.clone(),
        });
    }
    for id in [&refs.remission_rule, &refs.type_conflict_rule] {
        if !rule_ids.contains(id.as_str()) {
            return Err(CodeBookError::UnknownReference {
                kind: "conflict rule",
                id: id.clone(),
            });
        }
    }

    Ok(config)
}

fn normalize_crosswalk(
    crosswalk: BTreeMap<String, MappingEntry>,
    pattern: &Regex,
) -> Result<BTreeMap<String, MappingEntry>, CodeBookError> {
    if crosswalk.is_empty() {
        return Err(CodeBookError::EmptyCrosswalk);
    }
    let mut normalized = BTreeMap::new();
    for (raw_prefix, entry) in crosswalk {
        let prefix = normalize_code(&raw_prefix);
        let context = format!("crosswalk entry {prefix}");
        check_code(&prefix, &context, pattern)?;
        let description = entry.description.trim().to_string();
        if description.is_empty() {
            return Err(CodeBookError::MissingDescription { prefix });
        }
        let valid_drug_prefixes = normalize_list(&entry.valid_drug_prefixes, &context, pattern)?;
        if valid_drug_prefixes.is_empty() {
            return Err(CodeBookError::MissingDrugPrefixes { prefix });
        }
        let entry = MappingEntry {
            description,
            valid_drug_prefixes,
        };
        if normalized.insert(prefix.clone(), entry).is_some() {
            return Err(CodeBookError::DuplicateId {
                kind: "crosswalk",
                id: prefix,
            });
        }
    }
    Ok(normalized)
}

fn validate_conflict_rule(
    rule: &mut ConflictRule,
    pattern: &Regex,
    seen: &mut BTreeSet<String>,
) -> Result<(), CodeBookError> {
    rule.id = rule.id.trim().to_string();
    if rule.id.is_empty() {
        return Err(CodeBookError::EmptyId {
            kind: "conflict rule",
        });
    }
    if !seen.insert(rule.id.clone()) {
        return Err(CodeBookError::DuplicateId {
            kind: "conflict rule",
            id: rule.id.clone(),
        });
    }
    let context = format!("conflict rule {}", rule.id);
    rule.codes_a = normalize_list(&rule.codes_a, &context, pattern)?;
    rule.codes_b = normalize_list(&rule.codes_b, &context, pattern)?;
    for (group, codes) in [('A', &rule.codes_a), ('B', &rule.codes_b)] {
        if codes.is_empty() {
            return Err(CodeBookError::EmptyConflictGroup {
                rule_id: rule.id.clone(),
                group,
            });
        }
    }
    for prefix_a in &rule.codes_a {
        for prefix_b in &rule.codes_b {
            if prefix_a.starts_with(prefix_b.as_str()) || prefix_b.starts_with(prefix_a.as_str())
            {
                return Err(CodeBookError::OverlappingConflictGroups {
                    rule_id: rule.id.clone(),
                    prefix_a: prefix_a.clone(),
                    prefix_b: prefix_b.clone(),
                });
            }
        }
    }
    if rule.severity < Severity::Info {
        return Err(CodeBookError::InvalidSeverity {
            context,
            severity: rule.severity,
        });
    }
    Ok(())
}

fn validate_drug_class(
    class: &mut DrugClass,
    crosswalk: &BTreeMap<String, MappingEntry>,
    pattern: &Regex,
    seen: &mut BTreeSet<String>,
) -> Result<(), CodeBookError> {
    class.id = class.id.trim().to_string();
    if class.id.is_empty() {
        return Err(CodeBookError::EmptyId { kind: "drug class" });
    }
    if !seen.insert(class.id.clone()) {
        return Err(CodeBookError::DuplicateId {
            kind: "drug class",
            id: class.id.clone(),
        });
    }
    let context = format!("drug class {}", class.id);
    class.drug_prefixes = normalize_list(&class.drug_prefixes, &context, pattern)?;
    if class.drug_prefixes.is_empty() {
        return Err(CodeBookError::EmptyDrugClass {
            class_id: class.id.clone(),
        });
    }
    class.eligible_indications = normalize_list(&class.eligible_indications, &context, pattern)?;
    if class.eligible_indications.is_empty() {
        return Err(CodeBookError::NoEligibleIndications {
            class_id: class.id.clone(),
        });
    }
    class.excluded_indications = normalize_list(&class.excluded_indications, &context, pattern)?;
    if class.mismatch_severity < Severity::Warning {
        return Err(CodeBookError::InvalidSeverity {
            context,
            severity: class.mismatch_severity,
        });
    }
    for prefix in class
        .eligible_indications
        .iter()
        .chain(class.excluded_indications.iter())
    {
        if !crosswalk.contains_key(prefix) {
            return Err(CodeBookError::DanglingIndication {
                class_id: class.id.clone(),
                prefix: prefix.clone(),
            });
        }
    }
    Ok(())
}

fn normalize_list(
    raw: &[String],
    context: &str,
    pattern: &Regex,
) -> Result<Vec<String>, CodeBookError> {
    let mut codes = Vec::with_capacity(raw.len());
    for item in raw {
        let code = normalize_code(item);
        if code.is_empty() {
            continue;
        }
        check_code(&code, context, pattern)?;
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    Ok(codes)
}

fn check_code(code: &str, context: &str, pattern: &Regex) -> Result<(), CodeBookError> {
    if pattern.is_match(code) {
        return Ok(());
    }
    Err(CodeBookError::MalformedCode {
        context: context.to_string(),
        code: code.to_string(),
    })
}

#[cfg(test)]
#[path = "codebook_tests.rs"]
mod tests;
