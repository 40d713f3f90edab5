use super::{PipelineMessage, PipelineState, PipelineStatus, Stage, StageOutcome};
use crate::claim::{any_code_matches, codes_matching};
use crate::codebook::{CodeBook, ConflictRule, SpecificityGap};
use crate::finding::Severity;

const CROSSWALK_STAGE: &str = "crosswalk";
const SPECIFICITY_STAGE: &str = "specificity";

/// Stage 1: an anti-diabetic drug needs a qualifying diabetes diagnosis.
#[derive(Debug, Clone)]
pub struct CrosswalkStage {
    drug_prefixes: Vec<String>,
    qualifying_prefixes: Vec<String>,
}

impl CrosswalkStage {
    pub fn new(drug_prefixes: Vec<String>, qualifying_prefixes: Vec<String>) -> Self {
        CrosswalkStage {
            drug_prefixes,
            qualifying_prefixes,
        }
    }

    pub fn from_codebook(codebook: &CodeBook) -> Self {
        let refs = codebook.pipeline_refs();
        CrosswalkStage::new(
            refs.antidiabetic_drug_prefixes.clone(),
            refs.qualifying_diagnosis_prefixes.clone(),
        )
    }
}

impl Stage for CrosswalkStage {
    fn name(&self) -> &str {
        CROSSWALK_STAGE
    }

    fn run(&self, state: &PipelineState) -> StageOutcome {
        let drugs = codes_matching(&state.ndc_codes, &self.drug_prefixes);
        if drugs.is_empty() || any_code_matches(&state.icd_codes, &self.qualifying_prefixes) {
            return StageOutcome::advance(PipelineStatus::PendingSpecificity, Vec::new());
        }
        StageOutcome::fail(vec![PipelineMessage::new(
            CROSSWALK_STAGE,
            Severity::Critical,
            format!(
                "Anti-diabetic drug {} dispensed without a {} diagnosis.",
                drugs.join(", "),
                self.qualifying_prefixes
                    .iter()
                    .map(|prefix| format!("{prefix}.x"))
                    .collect::<Vec<_>>()
                    .join("/")
            ),
        )])
    }
}

/// Stage 2: specificity gaps warn; remission and type conflicts fail.
#[derive(Debug, Clone, Default)]
pub struct SpecificityStage {
    gaps: Vec<SpecificityGap>,
    terminal_conflicts: Vec<ConflictRule>,
}

impl SpecificityStage {
    pub fn new(gaps: Vec<SpecificityGap>, terminal_conflicts: Vec<ConflictRule>) -> Self {
        SpecificityStage {
            gaps,
            terminal_conflicts,
        }
    }

    /// Gaps from the codebook, then the remission and type conflict rules in
    /// that order.
    pub fn from_codebook(codebook: &CodeBook) -> Self {
        let refs = codebook.pipeline_refs();
        let terminal_conflicts = [&refs.remission_rule, &refs.type_conflict_rule]
            .into_iter()
            .filter_map(|id| codebook.conflict_rule(id))
            .cloned()
            .collect();
        SpecificityStage::new(codebook.specificity_gaps().to_vec(), terminal_conflicts)
    }
}

fn gap_text(gap: &SpecificityGap) -> String {
    let note = gap.note.trim();
    let note = if note.is_empty() {
        String::new()
    } else {
        format!(" ({note})")
    };
    format!(
        "Specificity gap: {} + {} found; recommend {}{note}.",
        gap.unspecified_code, gap.companion_code, gap.suggested_code
    )
}

impl Stage for SpecificityStage {
    fn name(&self) -> &str {
        SPECIFICITY_STAGE
    }

    fn run(&self, state: &PipelineState) -> StageOutcome {
        let mut messages: Vec<PipelineMessage> = self
            .gaps
            .iter()
            .filter(|gap| {
                state.has_icd(&gap.unspecified_code) && state.has_icd(&gap.companion_code)
            })
            .map(|gap| PipelineMessage::new(SPECIFICITY_STAGE, Severity::Warning, gap_text(gap)))
            .collect();

        for rule in &self.terminal_conflicts {
            let in_a = codes_matching(&state.icd_codes, &rule.codes_a);
            let in_b = codes_matching(&state.icd_codes, &rule.codes_b);
            if in_a.is_empty() || in_b.is_empty() {
                continue;
            }
            messages.push(PipelineMessage::new(
                SPECIFICITY_STAGE,
                Severity::Critical,
                format!(
                    "{}: {} and {} cannot coexist.",
                    rule.name,
                    in_a.join(", "),
                    in_b.join(", ")
                ),
            ));
            return StageOutcome::fail(messages);
        }
        StageOutcome::advance(PipelineStatus::Passed, messages)
    }
}
