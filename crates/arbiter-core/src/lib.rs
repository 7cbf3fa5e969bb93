//! # arbiter-core
//!
//! Deterministic decision-validation core for multi-specialist AI agents.
//!
//! This crate decides two things for the surrounding platform:
//! - whether a single specialist's output may be trusted and persisted
//!   (lint → governance → trust), and
//! - which of several competing specialist proposals wins a decision task
//!   (consensus under a selectable strategy).
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **No I/O**: The core never touches network, disk or model APIs;
//!    persistence and model calls live behind collaborator traits
//! 3. **Traceable**: Every DENY and escalation cites violations and evidence
//! 4. **Input-immutable**: Caller records are never mutated; engines work on
//!    clones and only append an audit trail to their own copies
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use arbiter_core::{
//!     ConsensusEngine, ContradictionLinter, CoreConfig, EngineContext,
//!     GovernanceVerdictEngine, VerdictDecision,
//! };
//!
//! let ctx = Arc::new(EngineContext::new(CoreConfig::default()));
//! let linter = ContradictionLinter::new(ctx.clone());
//! let governance = GovernanceVerdictEngine::new(ctx.clone());
//!
//! let report = linter.lint(&output, None);
//! let verdict = governance.validate_with_lint(&output, &report);
//!
//! match verdict.decision {
//!     VerdictDecision::Allow => println!("OK: {}", verdict.reason),
//!     VerdictDecision::Deny => println!("DENIED: {}", verdict.reason),
//!     other => println!("{}: {}", other.as_str(), verdict.reason),
//! }
//! ```

pub mod checks;
pub mod config;
pub mod consensus;
pub mod context;
pub mod evidence;
pub mod governance;
pub mod integrator;
pub mod linter;
pub mod trust;
pub mod types;

// Re-export main types at crate root
pub use config::{
    ConfigError, ConsensusConfig, CoreConfig, GovernanceConfig, LinterConfig, TrustConfig,
};
pub use consensus::{ConsensusEngine, ConsensusError};
pub use context::EngineContext;
pub use evidence::{Evidence, EvidenceSource};
pub use governance::GovernanceVerdictEngine;
pub use integrator::{FeedbackError, FeedbackIntegrator, FeedbackSink};
pub use linter::ContradictionLinter;
pub use trust::{apply_time_decay, DecayCurve, TrustScorer};
pub use types::{
    Citation, ConsensusDecision, ConsensusStrategy, DecisionTask, FeedbackMetrics, LintContext,
    LintReport, MemoryReference, OutputKind, OutputRecord, Patch, PatchAction, PolicyStatus,
    PolicyTag, ResultField, ResultPayload, RiskLevel, Severity, SpecialistProposal, Verdict,
    VerdictDecision, Violation, ViolationKind, VotingSummary,
};

use std::sync::Arc;

/// Lint one output and validate it against the constitution in order.
///
/// This is the single-output entry point for callers that do not need the
/// full feedback pipeline: lint always completes first and its violations
/// are visible to the governance evaluation.
pub fn review(
    ctx: &Arc<EngineContext>,
    output: &OutputRecord,
    context: Option<&LintContext>,
) -> (LintReport, Verdict) {
    let linter = ContradictionLinter::new(Arc::clone(ctx));
    let governance = GovernanceVerdictEngine::new(Arc::clone(ctx));

    let report = linter.lint(output, context);
    let verdict = governance.validate_with_lint(output, &report);
    (report, verdict)
}
