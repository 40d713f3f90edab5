//! Claim integrity checks for ICD / NDC / HCC coded health-insurance claims.
//!
//! The core is a validated [`CodeBook`] of reference tables, a [`RuleEngine`]
//! that maps one claim to ordered findings and a risk assessment, a staged
//! [`ValidationPipeline`], and batch aggregation in [`batch`]. Evaluation is
//! pure: clinical contradictions come back as findings, and only a malformed
//! codebook is an error.
pub mod batch;
pub mod claim;
pub mod codebook;
pub mod engine;
pub mod finding;
pub mod pipeline;
pub mod scenarios;
pub mod util;

pub use batch::{summarize, validate_many, AnnotatedClaim, BatchSummary};
pub use claim::ClaimRecord;
pub use codebook::{CodeBook, CodeBookConfig, CodeBookError};
pub use engine::{evaluate, ClaimReport, Evaluation, RiskAssessment, RiskLevel, Rule, RuleEngine};
pub use finding::{Severity, ValidationResult};
pub use pipeline::{PipelineState, PipelineStatus, Stage, ValidationPipeline};

#[cfg(feature = "parallel")]
pub use batch::validate_many_parallel;
