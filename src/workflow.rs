use crate::cli::{
    BatchArgs, CheckArgs, ClaimInput, CodebookArgs, Command, PipelineArgs, RootArgs, RulesArgs,
    ScenariosArgs,
};
use anyhow::{anyhow, Context, Result};
use claim_integrity::batch::{self, AnnotatedClaim, BatchSummary};
use claim_integrity::codebook::{self, CodeBook, CodeBookSource};
use claim_integrity::engine::{ClaimReport, RuleEngine};
use claim_integrity::pipeline::ValidationPipeline;
use claim_integrity::scenarios;
use claim_integrity::util::{read_json, truncate_string, write_json};
use claim_integrity::{ClaimRecord, Severity};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

/// Exit status for `check --fail-on` when the threshold is reached.
const FAIL_ON_EXIT: u8 = 2;
const PROVIDER_PREVIEW_LIMIT: usize = 10;
const MESSAGE_PREVIEW_CHARS: usize = 96;

pub fn run(args: RootArgs) -> Result<ExitCode> {
    let codebook_path = args.codebook.as_deref();
    match args.command {
        Command::Check(args) => run_check(codebook_path, args),
        Command::Pipeline(args) => run_pipeline(codebook_path, args).map(|()| ExitCode::SUCCESS),
        Command::Batch(args) => run_batch(codebook_path, args).map(|()| ExitCode::SUCCESS),
        Command::Scenarios(args) => run_scenarios(codebook_path, args).map(|()| ExitCode::SUCCESS),
        Command::Rules(args) => run_rules(codebook_path, args).map(|()| ExitCode::SUCCESS),
        Command::Codebook(args) => run_codebook(codebook_path, args).map(|()| ExitCode::SUCCESS),
    }
}

fn load_active_codebook(explicit: Option<&Path>) -> Result<(CodeBookSource, CodeBook)> {
    let source = codebook::resolve_codebook_path(explicit);
    let codebook = source
        .load()
        .with_context(|| format!("load codebook from {}", source.describe()))?;
    tracing::debug!(source = %source.describe(), "codebook ready");
    Ok((source, codebook))
}

fn claim_from_input(input: ClaimInput) -> ClaimRecord {
    let mut claim = ClaimRecord::new(input.claim_id)
        .with_icd_codes(input.icd)
        .with_ndc_codes(input.ndc)
        .with_hcc_codes(input.hcc);
    if let Some(patient_id) = input.patient_id {
        claim = claim.with_patient_id(patient_id);
    }
    if let Some(provider_id) = input.provider_id {
        claim = claim.with_provider_id(provider_id);
    }
    if let Some(claim_date) = input.claim_date {
        claim = claim.with_claim_date(claim_date);
    }
    if let Some(amount) = input.claim_amount {
        claim = claim.with_claim_amount(amount);
    }
    claim
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{text}");
    Ok(())
}

pub fn run_check(codebook_path: Option<&Path>, args: CheckArgs) -> Result<ExitCode> {
    let (_, codebook) = load_active_codebook(codebook_path)?;
    let claim = claim_from_input(args.claim);
    let report = RuleEngine::standard().report(&claim, &codebook);

    if args.json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    match args.fail_on {
        Some(threshold) if report.metadata.max_severity >= threshold => {
            tracing::info!(
                claim_id = %report.claim_id,
                max_severity = report.metadata.max_severity.as_str(),
                threshold = threshold.as_str(),
                "fail-on threshold reached"
            );
            Ok(ExitCode::from(FAIL_ON_EXIT))
        }
        _ => Ok(ExitCode::SUCCESS),
    }
}

fn print_report(report: &ClaimReport) {
    println!(
        "claim {}: risk {} ({}), max severity {}",
        report.claim_id,
        report.metadata.risk_level,
        report.metadata.risk_score,
        report.metadata.max_severity
    );
    for finding in &report.results {
        println!(
            "  [{}] {} {}",
            finding.severity, finding.rule_id, finding.message
        );
    }
}

pub fn run_pipeline(codebook_path: Option<&Path>, args: PipelineArgs) -> Result<()> {
    let (_, codebook) = load_active_codebook(codebook_path)?;
    let claim = claim_from_input(args.claim);
    let state = ValidationPipeline::standard(&codebook).run(&claim);

    if args.json {
        return print_json(&state);
    }
    println!("claim {}: {}", state.claim_id, state.status);
    for message in &state.messages {
        println!("  [{}] {message}", message.stage);
    }
    Ok(())
}

#[derive(Serialize)]
struct BatchReport<'a> {
    summary: &'a BatchSummary,
    claims: &'a [AnnotatedClaim],
}

pub fn run_batch(codebook_path: Option<&Path>, args: BatchArgs) -> Result<()> {
    let (_, codebook) = load_active_codebook(codebook_path)?;
    let claims: Vec<ClaimRecord> = read_json(&args.input)
        .with_context(|| format!("load claims from {}", args.input.display()))?;
    let started = Instant::now();
    let engine = RuleEngine::standard();
    let annotated = evaluate_batch(&engine, &codebook, &claims, args.parallel);
    let summary = batch::summarize(&annotated);
    tracing::info!(
        claims = summary.total_claims,
        flagged = summary.flagged_claims,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch complete"
    );

    if let Some(out) = args.out.as_deref() {
        write_json(
            out,
            &BatchReport {
                summary: &summary,
                claims: &annotated,
            },
        )?;
        eprintln!("wrote {}", out.display());
    }

    if args.json {
        return print_json(&summary);
    }
    print_summary(&summary);
    for row in annotated.iter().filter(|row| row.is_flagged) {
        let headline = row
            .results
            .iter()
            .max_by_key(|finding| finding.severity)
            .map(|finding| truncate_string(&finding.message, MESSAGE_PREVIEW_CHARS))
            .unwrap_or_default();
        println!(
            "  {} [{}] {}",
            row.claim.claim_id(),
            row.max_severity,
            headline
        );
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn evaluate_batch(
    engine: &RuleEngine,
    codebook: &CodeBook,
    claims: &[ClaimRecord],
    parallel: bool,
) -> Vec<AnnotatedClaim> {
    if parallel {
        return batch::validate_many_parallel(engine, codebook, claims);
    }
    batch::validate_many(engine, codebook, claims)
}

#[cfg(not(feature = "parallel"))]
fn evaluate_batch(
    engine: &RuleEngine,
    codebook: &CodeBook,
    claims: &[ClaimRecord],
    parallel: bool,
) -> Vec<AnnotatedClaim> {
    if parallel {
        tracing::warn!("built without the `parallel` feature; evaluating sequentially");
    }
    batch::validate_many(engine, codebook, claims)
}

fn print_summary(summary: &BatchSummary) {
    println!("total claims:   {}", summary.total_claims);
    println!("flagged claims: {}", summary.flagged_claims);
    println!("pass rate:      {:.2}%", summary.pass_rate);
    println!("amount at risk: {:.2}", summary.total_amount_at_risk);
    let severities = summary
        .severity_distribution
        .iter()
        .map(|(severity, count)| format!("{severity}={count}"))
        .collect::<Vec<_>>();
    println!("severities:     {}", severities.join(" "));
    if !summary.anomaly_distribution.is_empty() {
        let anomalies = summary
            .anomaly_distribution
            .iter()
            .map(|(label, count)| format!("{label}={count}"))
            .collect::<Vec<_>>();
        println!("anomalies:      {}", anomalies.join(" "));
    }
    if !summary.provider_breakdown.is_empty() {
        println!("providers by flag rate:");
        for stats in summary.provider_breakdown.iter().take(PROVIDER_PREVIEW_LIMIT) {
            println!(
                "  {:<12} {:>5.1}% ({}/{}) amount {:.2}",
                stats.provider_id,
                stats.flag_rate,
                stats.flagged_claims,
                stats.total_claims,
                stats.total_amount
            );
        }
    }
    if !summary.monthly_trend.is_empty() {
        println!("monthly trend:");
        for (month, stats) in &summary.monthly_trend {
            println!("  {month} total {} flagged {}", stats.total, stats.flagged);
        }
    }
}

#[derive(Serialize)]
struct ScenarioOutcome {
    name: &'static str,
    description: &'static str,
    expected: Severity,
    matches_expected: bool,
    report: ClaimReport,
}

pub fn run_scenarios(codebook_path: Option<&Path>, args: ScenariosArgs) -> Result<()> {
    let (_, codebook) = load_active_codebook(codebook_path)?;
    let selected = match args.name.as_deref() {
        Some(key) => {
            vec![scenarios::find(key).ok_or_else(|| anyhow!("unknown scenario {key:?}"))?]
        }
        None => scenarios::builtin(),
    };
    let engine = RuleEngine::standard();
    let outcomes: Vec<ScenarioOutcome> = selected
        .into_iter()
        .map(|scenario| {
            let report = engine.report(&scenario.claim, &codebook);
            ScenarioOutcome {
                name: scenario.name,
                description: scenario.description,
                expected: scenario.expected,
                matches_expected: report.metadata.max_severity == scenario.expected,
                report,
            }
        })
        .collect();

    if args.json {
        return print_json(&outcomes);
    }
    for outcome in &outcomes {
        let verdict = if outcome.matches_expected {
            "ok"
        } else {
            "MISMATCH"
        };
        println!(
            "{:<8} {:<26} {:<8} expected {:<8} got {:<8} risk {} ({})",
            outcome.report.claim_id,
            outcome.name,
            verdict,
            outcome.expected.as_str(),
            outcome.report.metadata.max_severity.as_str(),
            outcome.report.metadata.risk_level,
            outcome.report.metadata.risk_score
        );
        println!("         {}", outcome.description);
    }
    Ok(())
}

pub fn run_rules(codebook_path: Option<&Path>, args: RulesArgs) -> Result<()> {
    let (source, codebook) = load_active_codebook(codebook_path)?;
    if args.json {
        return print_json(&codebook);
    }
    println!("codebook: {}", source.describe());
    if let Some(year) = codebook.model_year() {
        println!("model year: {year}");
    }
    println!("\ncrosswalk:");
    for (prefix, entry) in codebook.crosswalk() {
        println!(
            "  {prefix:<8} {} -> {}",
            entry.description,
            entry.valid_drug_prefixes.join(", ")
        );
    }
    println!("\nconflict rules:");
    for rule in codebook.conflict_rules() {
        println!(
            "  {:<26} {:<8} [{}] vs [{}]",
            rule.id,
            rule.severity.as_str(),
            rule.codes_a.join(", "),
            rule.codes_b.join(", ")
        );
    }
    println!("\ndrug classes:");
    for class in codebook.drug_classes() {
        println!(
            "  {:<12} {} eligible [{}] excluded [{}] mismatch {}",
            class.id,
            class.name,
            class.eligible_indications.join(", "),
            class.excluded_indications.join(", "),
            class.mismatch_severity
        );
    }
    println!("\nupcoding rules:");
    for rule in codebook.upcoding_rules() {
        println!(
            "  {:<8} {} requires [{}]",
            rule.risk_code,
            rule.description,
            rule.required_complication_prefixes.join(", ")
        );
    }
    if !codebook.specificity_gaps().is_empty() {
        println!("\nspecificity gaps:");
        for gap in codebook.specificity_gaps() {
            println!(
                "  {} + {} -> {}",
                gap.unspecified_code, gap.companion_code, gap.suggested_code
            );
        }
    }
    Ok(())
}

pub fn run_codebook(codebook_path: Option<&Path>, args: CodebookArgs) -> Result<()> {
    if let Some(target) = args.export.as_deref() {
        if target.exists() && !args.force {
            return Err(anyhow!(
                "{} already exists (use --force to overwrite)",
                target.display()
            ));
        }
        codebook::write_codebook(target, &CodeBook::rxhcc_2026())?;
        println!("wrote {}", target.display());
        return Ok(());
    }

    let source = codebook::resolve_codebook_path(codebook_path);
    match source.load() {
        Ok(codebook) => {
            println!("codebook: {}", source.describe());
            println!(
                "model year: {}",
                codebook.model_year().unwrap_or("unspecified")
            );
            println!(
                "tables: {} crosswalk entries, {} conflict rules, {} drug classes, {} upcoding rules",
                codebook.crosswalk().len(),
                codebook.conflict_rules().len(),
                codebook.drug_classes().len(),
                codebook.upcoding_rules().len()
            );
            Ok(())
        }
        Err(err) => Err(anyhow!(
            "codebook {} is invalid: {}",
            source.describe(),
            error_chain_message(&err)
        )),
    }
}

fn error_chain_message(err: &anyhow::Error) -> String {
    err.chain()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}
