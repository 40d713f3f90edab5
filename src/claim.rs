//! Claim records and code normalization.
//!
//! Code fields arrive either as one comma-joined string (`"E11.9, G62.9"`) or as an
//! already-split list. Both shapes normalize to the same ordered token list, so
//! downstream rules only ever see trimmed, upper-cased, non-empty codes.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Split, trim, and upper-case a sequence of raw code strings.
///
/// Each input element may itself be comma-joined; empty tokens are dropped and
/// the original order is kept.
pub fn normalize_codes<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .flat_map(|item| {
            item.as_ref()
                .split(',')
                .map(|token| token.trim().to_ascii_uppercase())
                .filter(|token| !token.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Normalize a single code or prefix.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Code field input shape accepted on the wire.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum CodeList {
    Joined(String),
    Split(Vec<String>),
}

impl Default for CodeList {
    fn default() -> Self {
        CodeList::Split(Vec::new())
    }
}

impl CodeList {
    pub fn normalized(&self) -> Vec<String> {
        match self {
            CodeList::Joined(text) => normalize_codes([text]),
            CodeList::Split(items) => normalize_codes(items),
        }
    }
}

impl From<&str> for CodeList {
    fn from(value: &str) -> Self {
        CodeList::Joined(value.to_string())
    }
}

impl From<String> for CodeList {
    fn from(value: String) -> Self {
        CodeList::Joined(value)
    }
}

impl From<Vec<String>> for CodeList {
    fn from(value: Vec<String>) -> Self {
        CodeList::Split(value)
    }
}

impl From<Vec<&str>> for CodeList {
    fn from(value: Vec<&str>) -> Self {
        CodeList::Split(value.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for CodeList {
    fn from(value: [&str; N]) -> Self {
        CodeList::Split(value.iter().map(|code| code.to_string()).collect())
    }
}

/// Wire shape of a claim before normalization.
#[derive(Debug, Deserialize)]
struct RawClaimRecord {
    claim_id: String,
    #[serde(default)]
    patient_id: Option<String>,
    #[serde(default)]
    icd_codes: Option<CodeList>,
    #[serde(default)]
    ndc_codes: Option<CodeList>,
    #[serde(default)]
    hcc_codes: Option<CodeList>,
    #[serde(default)]
    provider_id: Option<String>,
    #[serde(default)]
    claim_date: Option<NaiveDate>,
    #[serde(default)]
    claim_amount: Option<f64>,
    #[serde(default)]
    anomaly_type: Option<String>,
}

impl From<RawClaimRecord> for ClaimRecord {
    fn from(raw: RawClaimRecord) -> Self {
        ClaimRecord {
            claim_id: raw.claim_id,
            patient_id: non_blank(raw.patient_id),
            icd_codes: raw.icd_codes.unwrap_or_default().normalized(),
            ndc_codes: raw.ndc_codes.unwrap_or_default().normalized(),
            hcc_codes: raw.hcc_codes.unwrap_or_default().normalized(),
            provider_id: non_blank(raw.provider_id),
            claim_date: raw.claim_date,
            claim_amount: raw.claim_amount,
            anomaly_type: non_blank(raw.anomaly_type),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// One insurance claim, immutable once built.
///
/// Code lists are normalized at construction. `anomaly_type` is an optional
/// label injected by fixture generators and is only used for batch statistics.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(from = "RawClaimRecord")]
pub struct ClaimRecord {
    claim_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    patient_id: Option<String>,
    icd_codes: Vec<String>,
    ndc_codes: Vec<String>,
    hcc_codes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    claim_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    claim_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    anomaly_type: Option<String>,
}

impl ClaimRecord {
    pub fn new(claim_id: impl Into<String>) -> Self {
        ClaimRecord {
            claim_id: claim_id.into(),
            patient_id: None,
            icd_codes: Vec::new(),
            ndc_codes: Vec::new(),
            hcc_codes: Vec::new(),
            provider_id: None,
            claim_date: None,
            claim_amount: None,
            anomaly_type: None,
        }
    }

    pub fn with_icd_codes(mut self, codes: impl Into<CodeList>) -> Self {
        self.icd_codes = codes.into().normalized();
        self
    }

    pub fn with_ndc_codes(mut self, codes: impl Into<CodeList>) -> Self {
        self.ndc_codes = codes.into().normalized();
        self
    }

    pub fn with_hcc_codes(mut self, codes: impl Into<CodeList>) -> Self {
        self.hcc_codes = codes.into().normalized();
        self
    }

    pub fn with_patient_id(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = non_blank(Some(patient_id.into()));
        self
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = non_blank(Some(provider_id.into()));
        self
    }

    pub fn with_claim_date(mut self, claim_date: NaiveDate) -> Self {
        self.claim_date = Some(claim_date);
        self
    }

    pub fn with_claim_amount(mut self, amount: f64) -> Self {
        self.claim_amount = Some(amount);
        self
    }

    pub fn with_anomaly_type(mut self, label: impl Into<String>) -> Self {
        self.anomaly_type = non_blank(Some(label.into()));
        self
    }

    pub fn claim_id(&self) -> &str {
        &self.claim_id
    }

    pub fn patient_id(&self) -> Option<&str> {
        self.patient_id.as_deref()
    }

    pub fn icd_codes(&self) -> &[String] {
        &self.icd_codes
    }

    pub fn ndc_codes(&self) -> &[String] {
        &self.ndc_codes
    }

    pub fn hcc_codes(&self) -> &[String] {
        &self.hcc_codes
    }

    pub fn provider_id(&self) -> Option<&str> {
        self.provider_id.as_deref()
    }

    pub fn claim_date(&self) -> Option<NaiveDate> {
        self.claim_date
    }

    /// Billed amount; absent, negative, or non-finite amounts count as zero.
    pub fn claim_amount(&self) -> f64 {
        match self.claim_amount {
            Some(amount) if amount.is_finite() && amount >= 0.0 => amount,
            _ => 0.0,
        }
    }

    pub fn anomaly_type(&self) -> Option<&str> {
        self.anomaly_type.as_deref()
    }

    /// True when the claim carries neither diagnosis nor drug codes.
    pub fn lacks_clinical_codes(&self) -> bool {
        self.icd_codes.is_empty() && self.ndc_codes.is_empty()
    }

    /// True when any diagnosis code starts with any of `prefixes`.
    pub fn has_diagnosis_prefix<S: AsRef<str>>(&self, prefixes: &[S]) -> bool {
        any_code_matches(&self.icd_codes, prefixes)
    }
}

/// True when any of `codes` starts with any of `prefixes`.
pub fn any_code_matches<S: AsRef<str>>(codes: &[String], prefixes: &[S]) -> bool {
    codes
        .iter()
        .any(|code| prefixes.iter().any(|prefix| code.starts_with(prefix.as_ref())))
}

/// Codes from `codes` that start with any of `prefixes`, in claim order.
pub fn codes_matching<'a, S: AsRef<str>>(codes: &'a [String], prefixes: &[S]) -> Vec<&'a str> {
    codes
        .iter()
        .filter(|code| prefixes.iter().any(|prefix| code.starts_with(prefix.as_ref())))
        .map(String::as_str)
        .collect()
}
