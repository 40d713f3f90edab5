//! Batch evaluation and summary statistics.
//!
//! Claims are evaluated independently, so the sequential and parallel paths
//! produce identical, order-preserving output. Summaries tolerate missing
//! optional fields: no amount counts as zero, no provider or date simply
//! leaves the claim out of that breakdown.
use crate::claim::ClaimRecord;
use crate::codebook::CodeBook;
use crate::engine::{Evaluation, RiskLevel, RuleEngine};
use crate::finding::{Severity, ValidationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// A claim together with its findings and derived flags.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AnnotatedClaim {
    pub claim: ClaimRecord,
    pub results: Vec<ValidationResult>,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub max_severity: Severity,
    pub is_flagged: bool,
    pub n_critical: usize,
    pub n_warning: usize,
}

impl AnnotatedClaim {
    fn new(claim: &ClaimRecord, evaluation: Evaluation) -> Self {
        AnnotatedClaim {
            claim: claim.clone(),
            risk_score: evaluation.assessment.risk_score,
            risk_level: evaluation.assessment.risk_level,
            max_severity: evaluation.max_severity(),
            is_flagged: evaluation.is_flagged(),
            n_critical: evaluation.count(Severity::Critical),
            n_warning: evaluation.count(Severity::Warning),
            results: evaluation.findings,
        }
    }
}

/// Evaluate every claim in order.
pub fn validate_many(
    engine: &RuleEngine,
    codebook: &CodeBook,
    claims: &[ClaimRecord],
) -> Vec<AnnotatedClaim> {
    let started = Instant::now();
    let annotated: Vec<AnnotatedClaim> = claims
        .iter()
        .map(|claim| AnnotatedClaim::new(claim, engine.evaluate(claim, codebook)))
        .collect();
    tracing::info!(
        claims = annotated.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch evaluated"
    );
    annotated
}

/// Same as [`validate_many`], fanned out over the rayon thread pool.
#[cfg(feature = "parallel")]
pub fn validate_many_parallel(
    engine: &RuleEngine,
    codebook: &CodeBook,
    claims: &[ClaimRecord],
) -> Vec<AnnotatedClaim> {
    use rayon::prelude::*;

    let started = Instant::now();
    let annotated: Vec<AnnotatedClaim> = claims
        .par_iter()
        .map(|claim| AnnotatedClaim::new(claim, engine.evaluate(claim, codebook)))
        .collect();
    tracing::info!(
        claims = annotated.len(),
        threads = rayon::current_num_threads(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch evaluated in parallel"
    );
    annotated
}

/// Per-provider flag statistics.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProviderStats {
    pub provider_id: String,
    pub total_claims: usize,
    pub flagged_claims: usize,
    pub total_amount: f64,
    /// Percentage of flagged claims, one decimal.
    pub flag_rate: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthStats {
    pub total: usize,
    pub flagged: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BatchSummary {
    pub total_claims: usize,
    pub flagged_claims: usize,
    /// Percentage of unflagged claims, two decimals; zero for an empty batch.
    pub pass_rate: f64,
    pub total_amount_at_risk: f64,
    /// Claims counted by their maximum severity.
    pub severity_distribution: BTreeMap<Severity, usize>,
    pub anomaly_distribution: BTreeMap<String, usize>,
    /// Sorted by flag rate descending, then provider id.
    pub provider_breakdown: Vec<ProviderStats>,
    /// Keyed by `YYYY-MM`.
    pub monthly_trend: BTreeMap<String, MonthStats>,
}

pub fn summarize(annotated: &[AnnotatedClaim]) -> BatchSummary {
    let total_claims = annotated.len();
    let flagged_claims = annotated.iter().filter(|row| row.is_flagged).count();
    let total_amount_at_risk = annotated
        .iter()
        .filter(|row| row.is_flagged)
        .map(|row| row.claim.claim_amount())
        .sum();

    let mut severity_distribution = BTreeMap::new();
    let mut anomaly_distribution = BTreeMap::new();
    let mut providers: BTreeMap<&str, (usize, usize, f64)> = BTreeMap::new();
    let mut monthly_trend: BTreeMap<String, MonthStats> = BTreeMap::new();
    for row in annotated {
        *severity_distribution.entry(row.max_severity).or_insert(0) += 1;
        if let Some(label) = row.claim.anomaly_type() {
            *anomaly_distribution.entry(label.to_string()).or_insert(0) += 1;
        }
        if let Some(provider) = row.claim.provider_id() {
            let entry = providers.entry(provider).or_insert((0, 0, 0.0));
            entry.0 += 1;
            entry.1 += usize::from(row.is_flagged);
            entry.2 += row.claim.claim_amount();
        }
        if let Some(date) = row.claim.claim_date() {
            let month = monthly_trend
                .entry(date.format("%Y-%m").to_string())
                .or_default();
            month.total += 1;
            month.flagged += usize::from(row.is_flagged);
        }
    }

    let mut provider_breakdown: Vec<ProviderStats> = providers
        .into_iter()
        .map(|(provider_id, (total, flagged, amount))| ProviderStats {
            provider_id: provider_id.to_string(),
            total_claims: total,
            flagged_claims: flagged,
            total_amount: amount,
            flag_rate: round_to(percentage(flagged, total), 1),
        })
        .collect();
    provider_breakdown.sort_by(|a, b| {
        b.flag_rate
            .total_cmp(&a.flag_rate)
            .then_with(|| a.provider_id.cmp(&b.provider_id))
    });

    BatchSummary {
        total_claims,
        flagged_claims,
        pass_rate: round_to(percentage(total_claims - flagged_claims, total_claims), 2),
        total_amount_at_risk,
        severity_distribution,
        anomaly_distribution,
        provider_breakdown,
        monthly_trend,
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn sample_batch() -> Vec<ClaimRecord> {
        vec![
            ClaimRecord::new("C1")
                .with_icd_codes("E11.9")
                .with_ndc_codes("00002-1433-80")
                .with_provider_id("PRV-A")
                .with_claim_date(date(2026, 1, 5))
                .with_claim_amount(120.0),
            ClaimRecord::new("C2")
                .with_icd_codes("E10.9,E11.65")
                .with_provider_id("PRV-B")
                .with_claim_date(date(2026, 1, 20))
                .with_claim_amount(900.5)
                .with_anomaly_type("type_conflict"),
            ClaimRecord::new("C3")
                .with_icd_codes("I10")
                .with_ndc_codes("00169-4060-12")
                .with_provider_id("PRV-A")
                .with_claim_date(date(2026, 2, 2))
                .with_claim_amount(-50.0)
                .with_anomaly_type("glp1_misuse"),
            ClaimRecord::new("C4"),
        ]
    }

    fn annotate(claims: &[ClaimRecord]) -> Vec<AnnotatedClaim> {
        validate_many(&RuleEngine::standard(), &CodeBook::rxhcc_2026(), claims)
    }

    #[test]
    fn rows_keep_input_order_and_flags() {
        let rows = annotate(&sample_batch());
        let ids: Vec<&str> = rows.iter().map(|row| row.claim.claim_id()).collect();
        assert_eq!(ids, vec!["C1", "C2", "C3", "C4"]);
        assert!(!rows[0].is_flagged);
        assert_eq!(rows[1].n_critical, 2);
        assert_eq!(rows[2].n_critical, 2);
        assert_eq!(rows[2].n_warning, 0);
        assert_eq!(rows[3].max_severity, Severity::Info);
    }

    #[test]
    fn summary_counts_and_rates() {
        let summary = summarize(&annotate(&sample_batch()));
        assert_eq!(summary.total_claims, 4);
        assert_eq!(summary.flagged_claims, 2);
        assert_eq!(summary.pass_rate, 50.0);
        // The negative amount on C3 counts as zero.
        assert_eq!(summary.total_amount_at_risk, 900.5);
        assert_eq!(summary.severity_distribution.get(&Severity::Critical), Some(&2));
        assert_eq!(summary.severity_distribution.get(&Severity::Pass), Some(&1));
        assert_eq!(summary.severity_distribution.get(&Severity::Info), Some(&1));
        assert_eq!(summary.anomaly_distribution.get("type_conflict"), Some(&1));
        assert_eq!(summary.anomaly_distribution.len(), 2);
    }

    #[test]
    fn providers_sort_by_flag_rate() {
        let summary = summarize(&annotate(&sample_batch()));
        let providers: Vec<(&str, f64)> = summary
            .provider_breakdown
            .iter()
            .map(|stats| (stats.provider_id.as_str(), stats.flag_rate))
            .collect();
        assert_eq!(providers, vec![("PRV-B", 100.0), ("PRV-A", 50.0)]);
        assert_eq!(summary.provider_breakdown[1].total_amount, 120.0);
    }

    #[test]
    fn monthly_trend_groups_by_month() {
        let summary = summarize(&annotate(&sample_batch()));
        assert_eq!(
            summary.monthly_trend.get("2026-01"),
            Some(&MonthStats {
                total: 2,
                flagged: 1
            })
        );
        assert_eq!(
            summary.monthly_trend.get("2026-02"),
            Some(&MonthStats {
                total: 1,
                flagged: 1
            })
        );
    }

    #[test]
    fn empty_batch_summarizes_to_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_claims, 0);
        assert_eq!(summary.pass_rate, 0.0);
        assert!(summary.severity_distribution.is_empty());
        assert!(summary.provider_breakdown.is_empty());
    }

    #[test]
    fn pass_rate_rounds_to_two_decimals() {
        let claims = vec![
            ClaimRecord::new("A").with_icd_codes("E11.9"),
            ClaimRecord::new("B").with_icd_codes("E11.9"),
            ClaimRecord::new("C").with_icd_codes("E10.9,E11.9"),
        ];
        let summary = summarize(&annotate(&claims));
        assert_eq!(summary.pass_rate, 66.67);
    }

    #[test]
    fn summary_serializes_severity_keys_as_names() {
        let summary = summarize(&annotate(&sample_batch()));
        let value = serde_json::to_value(&summary).expect("serialize summary");
        assert_eq!(value["severity_distribution"]["CRITICAL"], 2);
        assert_eq!(value["monthly_trend"]["2026-01"]["total"], 2);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_matches_sequential() {
        let claims: Vec<ClaimRecord> = sample_batch().into_iter().cycle().take(64).collect();
        let codebook = CodeBook::rxhcc_2026();
        let engine = RuleEngine::standard();
        assert_eq!(
            validate_many_parallel(&engine, &codebook, &claims),
            validate_many(&engine, &codebook, &claims)
        );
    }
}
