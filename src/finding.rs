//! Findings emitted by rule evaluation.
//!
//! A finding is an immutable value produced by exactly one rule. Severities are
//! ordered so callers can fold a claim down to its worst finding.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Finding severity, ordered from least to most severe.
///
/// `Pass` means "explicitly verified clean", which is different from a claim
/// that simply produced no findings.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Pass,
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Return the stable string identifier used in JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Pass => "PASS",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Risk weight contributed by a single finding of this severity.
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Critical => 40,
            Severity::Warning => 15,
            Severity::Info | Severity::Pass => 0,
        }
    }

    /// Whether a finding at this severity flags the claim for review.
    pub fn is_flagging(&self) -> bool {
        *self >= Severity::Warning
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Ok(Severity::Pass),
            "INFO" => Ok(Severity::Info),
            "WARNING" => Ok(Severity::Warning),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(format!(
                "unknown severity {other:?} (expected PASS, INFO, WARNING or CRITICAL)"
            )),
        }
    }
}

/// Scalar value stored in a finding's details map.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum DetailValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl From<&str> for DetailValue {
    fn from(value: &str) -> Self {
        DetailValue::Text(value.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(value: String) -> Self {
        DetailValue::Text(value)
    }
}

impl From<bool> for DetailValue {
    fn from(value: bool) -> Self {
        DetailValue::Bool(value)
    }
}

impl From<i64> for DetailValue {
    fn from(value: i64) -> Self {
        DetailValue::Integer(value)
    }
}

impl From<usize> for DetailValue {
    fn from(value: usize) -> Self {
        DetailValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for DetailValue {
    fn from(value: f64) -> Self {
        DetailValue::Number(value)
    }
}

impl fmt::Display for DetailValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailValue::Bool(value) => write!(f, "{value}"),
            DetailValue::Integer(value) => write!(f, "{value}"),
            DetailValue::Number(value) => write!(f, "{value}"),
            DetailValue::Text(value) => f.write_str(value),
        }
    }
}

/// A single rule finding.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ValidationResult {
    pub rule_id: String,
    pub rule_name: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, DetailValue>,
}

impl ValidationResult {
    pub fn new(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        ValidationResult {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            severity,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// Attach a detail entry while the finding is being built.
    pub fn with_detail(mut self, key: &str, value: impl Into<DetailValue>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Worst severity across a set of findings, if any.
pub fn max_severity(findings: &[ValidationResult]) -> Option<Severity> {
    findings.iter().map(|finding| finding.severity).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_pass_below_critical() {
        assert!(Severity::Pass < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
        assert!(!Severity::Info.is_flagging());
        assert!(Severity::Warning.is_flagging());
    }

    #[test]
    fn severity_serializes_as_upper_case() {
        let value = serde_json::to_value(Severity::Critical).expect("serialize severity");
        assert_eq!(value, serde_json::json!("CRITICAL"));
        let parsed: Severity = "warning".parse().expect("parse severity");
        assert_eq!(parsed, Severity::Warning);
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn details_round_trip_as_plain_scalars() {
        let finding = ValidationResult::new("R1", "Rule", Severity::Warning, "msg")
            .with_detail("drug_code", "00002-1433-80")
            .with_detail("matches", 2usize)
            .with_detail("flagged", true);
        let value = serde_json::to_value(&finding).expect("serialize finding");
        assert_eq!(value["details"]["drug_code"], "00002-1433-80");
        assert_eq!(value["details"]["matches"], 2);
        assert_eq!(value["details"]["flagged"], true);
    }

    #[test]
    fn max_severity_of_empty_is_none() {
        assert_eq!(max_severity(&[]), None);
        let findings = vec![
            ValidationResult::new("A", "a", Severity::Info, ""),
            ValidationResult::new("B", "b", Severity::Warning, ""),
        ];
        assert_eq!(max_severity(&findings), Some(Severity::Warning));
    }
}
