//! CLI argument parsing for `claimcheck`.
//!
//! Commands are thin wrappers over the library; all policy lives in the
//! codebook and the rule engine.
use chrono::NaiveDate;
use claim_integrity::Severity;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "claimcheck",
    version,
    about = "Integrity checks for ICD / NDC / HCC coded claims",
    after_help = "Examples:\n  claimcheck check --icd E11.9 --ndc 00002-1433-80\n  claimcheck check --icd I10 --ndc 00169-4060-12 --json --fail-on warning\n  claimcheck pipeline --icd E11.9,G62.9 --ndc RX_METFORMIN\n  claimcheck batch --input claims.json --out report.json\n  claimcheck scenarios\n  claimcheck codebook --export ./codebook.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Codebook JSON file (overrides CLAIMCHECK_CODEBOOK and the user config file)
    #[arg(long, global = true, value_name = "FILE")]
    pub codebook: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Check(CheckArgs),
    Pipeline(PipelineArgs),
    Batch(BatchArgs),
    Scenarios(ScenariosArgs),
    Rules(RulesArgs),
    Codebook(CodebookArgs),
}

/// Claim fields given on the command line. Code lists are comma separated.
#[derive(Args, Debug, Clone)]
pub struct ClaimInput {
    /// Claim identifier
    #[arg(long, default_value = "CLI-0001")]
    pub claim_id: String,

    /// Diagnosis codes, e.g. "E11.9,G62.9"
    #[arg(long, default_value = "")]
    pub icd: String,

    /// Drug codes, e.g. "00002-1433-80"
    #[arg(long, default_value = "")]
    pub ndc: String,

    /// Risk-adjustment codes, e.g. "HCC18"
    #[arg(long, default_value = "")]
    pub hcc: String,

    #[arg(long)]
    pub patient_id: Option<String>,

    #[arg(long)]
    pub provider_id: Option<String>,

    /// Claim date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub claim_date: Option<NaiveDate>,

    #[arg(long, value_name = "AMOUNT")]
    pub claim_amount: Option<f64>,
}

#[derive(Parser, Debug)]
#[command(about = "Evaluate one claim with the rule engine")]
pub struct CheckArgs {
    #[command(flatten)]
    pub claim: ClaimInput,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Exit with status 2 when the worst finding reaches this severity
    #[arg(long, value_name = "SEVERITY")]
    pub fail_on: Option<Severity>,
}

#[derive(Parser, Debug)]
#[command(about = "Run the staged crosswalk/specificity audit on one claim")]
pub struct PipelineArgs {
    #[command(flatten)]
    pub claim: ClaimInput,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Evaluate a JSON array of claims and summarize")]
pub struct BatchArgs {
    /// JSON file holding an array of claims
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Write annotated rows and the summary to this file
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Evaluate claims on a thread pool (requires the `parallel` feature)
    #[arg(long)]
    pub parallel: bool,

    /// Emit the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Run the built-in demonstration claims")]
pub struct ScenariosArgs {
    /// Run only the scenario with this name or claim id
    pub name: Option<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Print the active codebook tables")]
pub struct RulesArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Show which codebook is active, or export the built-in tables")]
pub struct CodebookArgs {
    /// Write the built-in tables to FILE as an editable stub
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Overwrite an existing export target
    #[arg(long, requires = "export")]
    pub force: bool,
}
