//! Staged claim audit.
//!
//! A small finite-state machine: each claim starts `NEW`, the crosswalk stage
//! moves it to `PENDING_SPECIFICITY` or fails it, and the specificity stage
//! finishes it as `PASSED` or `FAILED`. The driver stops at the first stage
//! that halts, so a claim failed by the crosswalk stage never carries
//! specificity messages.
//!
//! ```text
//! NEW --crosswalk--> PENDING_SPECIFICITY --specificity--> PASSED
//!  |                          |
//!  +--------> FAILED <--------+
//! ```
use crate::claim::ClaimRecord;
use crate::codebook::CodeBook;
use crate::finding::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

mod stages;

pub use stages::{CrosswalkStage, SpecificityStage};

/// Lifecycle of one staged run.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    New,
    PendingSpecificity,
    Passed,
    Failed,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::New => "NEW",
            PipelineStatus::PendingSpecificity => "PENDING_SPECIFICITY",
            PipelineStatus::Passed => "PASSED",
            PipelineStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStatus::Failed)
    }

    /// Allowed edges. `FAILED` is reachable from every non-terminal state and
    /// has no way out.
    pub fn can_transition_to(&self, next: PipelineStatus) -> bool {
        use PipelineStatus::*;
        matches!(
            (self, next),
            (New, PendingSpecificity)
                | (New, Failed)
                | (PendingSpecificity, PendingSpecificity)
                | (PendingSpecificity, Passed)
                | (PendingSpecificity, Failed)
                | (Passed, Passed)
                | (Passed, Failed)
        )
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a run's append-only message log.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PipelineMessage {
    pub stage: String,
    pub severity: Severity,
    pub text: String,
}

impl PipelineMessage {
    pub fn new(stage: &str, severity: Severity, text: impl Into<String>) -> Self {
        PipelineMessage {
            stage: stage.to_string(),
            severity,
            text: text.into(),
        }
    }
}

impl fmt::Display for PipelineMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.text)
    }
}

/// Working record for one claim's run. Built per claim and never shared.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PipelineState {
    pub claim_id: String,
    pub icd_codes: Vec<String>,
    pub ndc_codes: Vec<String>,
    pub status: PipelineStatus,
    pub messages: Vec<PipelineMessage>,
}

impl PipelineState {
    pub fn new(claim: &ClaimRecord) -> Self {
        PipelineState {
            claim_id: claim.claim_id().to_string(),
            icd_codes: claim.icd_codes().to_vec(),
            ndc_codes: claim.ndc_codes().to_vec(),
            status: PipelineStatus::New,
            messages: Vec::new(),
        }
    }

    pub fn has_icd(&self, code: &str) -> bool {
        self.icd_codes.iter().any(|icd| icd == code)
    }

    /// Messages emitted by the named stage.
    pub fn messages_from<'a>(
        &'a self,
        stage: &'a str,
    ) -> impl Iterator<Item = &'a PipelineMessage> {
        self.messages
            .iter()
            .filter(move |message| message.stage == stage)
    }
}

/// Partial update returned by a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub status: PipelineStatus,
    pub messages: Vec<PipelineMessage>,
    pub halt: bool,
}

impl StageOutcome {
    /// Move to `status` and let later stages run.
    pub fn advance(status: PipelineStatus, messages: Vec<PipelineMessage>) -> Self {
        StageOutcome {
            status,
            messages,
            halt: false,
        }
    }

    /// Terminal failure; no later stage runs.
    pub fn fail(messages: Vec<PipelineMessage>) -> Self {
        StageOutcome {
            status: PipelineStatus::Failed,
            messages,
            halt: true,
        }
    }
}

/// A named step of the staged audit.
///
/// Stages read the state and return an update; the driver applies it. New
/// checks are added by appending a stage.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, state: &PipelineState) -> StageOutcome;
}

/// Ordered stages applied until one halts.
pub struct ValidationPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl ValidationPipeline {
    pub fn empty() -> Self {
        ValidationPipeline { stages: Vec::new() }
    }

    /// Crosswalk then specificity, both configured from `codebook`.
    pub fn standard(codebook: &CodeBook) -> Self {
        ValidationPipeline::empty()
            .with_stage(CrosswalkStage::from_codebook(codebook))
            .with_stage(SpecificityStage::from_codebook(codebook))
    }

    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run every stage in order against a fresh state for `claim`.
    pub fn run(&self, claim: &ClaimRecord) -> PipelineState {
        let mut state = PipelineState::new(claim);
        for stage in &self.stages {
            let outcome = stage.run(&state);
            let halt = apply_outcome(&mut state, stage.name(), outcome);
            tracing::debug!(
                claim_id = %state.claim_id,
                stage = stage.name(),
                status = state.status.as_str(),
                halt,
                "pipeline stage finished"
            );
            if halt {
                break;
            }
        }
        state
    }
}

fn apply_outcome(state: &mut PipelineState, stage: &str, outcome: StageOutcome) -> bool {
    state.messages.extend(outcome.messages);
    if !state.status.can_transition_to(outcome.status) {
        tracing::warn!(
            claim_id = %state.claim_id,
            stage,
            from = state.status.as_str(),
            to = outcome.status.as_str(),
            "stage requested an invalid transition"
        );
        state.messages.push(PipelineMessage::new(
            stage,
            Severity::Critical,
            format!(
                "invalid status transition {} -> {}",
                state.status, outcome.status
            ),
        ));
        state.status = PipelineStatus::Failed;
        return true;
    }
    state.status = outcome.status;
    outcome.halt || state.status.is_terminal()
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
