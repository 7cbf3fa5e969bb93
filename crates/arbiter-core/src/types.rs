//! Shared value types for the decision-validation core.
//!
//! Everything a caller hands to an engine (outputs, decision tasks) or
//! receives back (lint reports, verdicts, consensus decisions) lives here.
//! All enum fields serialize as fixed string tags so these records can cross
//! a process boundary as plain JSON.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Clamp a score into [0, 1]. NaN collapses to 0.
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Normalize free text for equality and contradiction comparison:
/// lowercase, trimmed, inner whitespace collapsed.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Output records
// ============================================================================

/// What kind of cognition produced an output.
///
/// `Unrecognized` absorbs unknown wire tags: an unknown kind is never a
/// deserialization failure, it lints as a warning and can never be silently
/// allowed by governance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputKind {
    Observation,
    Insight,
    Decision,
    Action,
    Prediction,
    Reasoning,
    Generation,
    Reflection,
    Proposal,
    #[serde(other)]
    Unrecognized,
}

/// A named field inside a structured result payload. Field order is the
/// caller's and is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultField {
    pub name: String,
    pub value: String,
}

impl ResultField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The result payload of an output: free text or a small ordered mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultPayload {
    Text(String),
    Fields(Vec<ResultField>),
}

impl ResultPayload {
    /// Canonical form used for grouping and contradiction comparison.
    pub fn normalized(&self) -> String {
        match self {
            ResultPayload::Text(text) => normalize_text(text),
            ResultPayload::Fields(fields) => fields
                .iter()
                .map(|f| format!("{}={}", normalize_text(&f.name), normalize_text(&f.value)))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }

    /// All text fragments in the payload, for pattern scans.
    pub fn fragments(&self) -> Vec<&str> {
        match self {
            ResultPayload::Text(text) => vec![text.as_str()],
            ResultPayload::Fields(fields) => fields.iter().map(|f| f.value.as_str()).collect(),
        }
    }
}

/// A supporting source reference attached to an output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Identifier of the cited source (memory id, document id, URL).
    pub source: String,

    /// How much the citing component trusts this source, in [0, 1].
    pub confidence: f64,

    /// Optional quoted excerpt.
    #[serde(default)]
    pub excerpt: Option<String>,

    /// When the cited material was produced.
    pub timestamp: DateTime<Utc>,
}

impl Citation {
    pub fn new(source: impl Into<String>, confidence: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            source: source.into(),
            confidence: clamp01(confidence),
            excerpt: None,
            timestamp,
        }
    }
}

/// Compliance status of a policy tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Compliant,
    Violation,
}

/// A policy the output was checked against by its producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTag {
    /// Policy identifier (e.g. "no-pii", "budget-cap").
    pub policy: String,

    pub status: PolicyStatus,

    /// Optional detail on how the policy was satisfied or broken.
    #[serde(default)]
    pub detail: Option<String>,
}

impl PolicyTag {
    pub fn compliant(policy: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
            status: PolicyStatus::Compliant,
            detail: None,
        }
    }

    pub fn violation(policy: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
            status: PolicyStatus::Violation,
            detail: Some(detail.into()),
        }
    }
}

/// A single proposed output from one specialist component.
///
/// Records are immutable once handed to the core; engines work on clones and
/// only ever append to `audit_trail` on their own clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Unique identifier of this output.
    pub id: String,

    /// Task or loop this output belongs to.
    pub task_id: String,

    /// Name of the originating component (e.g. "hunter", "reflection").
    pub component: String,

    pub kind: OutputKind,

    pub result: ResultPayload,

    /// Ordered reasoning steps that led to the result.
    #[serde(default)]
    pub reasoning: Vec<String>,

    /// Producer's confidence in the result, in [0, 1].
    pub confidence: f64,

    #[serde(default)]
    pub citations: Vec<Citation>,

    #[serde(default)]
    pub policy_tags: Vec<PolicyTag>,

    #[serde(default)]
    pub errors: Vec<String>,

    #[serde(default)]
    pub warnings: Vec<String>,

    /// Tri-state constitutional flag: `None` means the producer never
    /// evaluated compliance.
    #[serde(default)]
    pub constitutional_compliance: Option<bool>,

    /// Whether a human must approve before this output is acted on.
    #[serde(default)]
    pub requires_approval: bool,

    /// Importance score in [0, 1].
    #[serde(default)]
    pub importance: f64,

    /// Quality score in [0, 1].
    #[serde(default)]
    pub quality: f64,

    /// After this instant the output should no longer drive decisions.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Violation/patch trail appended by the core for audit.
    #[serde(default)]
    pub audit_trail: Vec<String>,
}

impl OutputRecord {
    /// Create a record with neutral defaults; callers chain the `with_*`
    /// setters for everything else.
    pub fn new(
        id: impl Into<String>,
        task_id: impl Into<String>,
        component: impl Into<String>,
        kind: OutputKind,
        result: ResultPayload,
    ) -> Self {
        Self {
            id: id.into(),
            task_id: task_id.into(),
            component: component.into(),
            kind,
            result,
            reasoning: Vec::new(),
            confidence: 0.5,
            citations: Vec::new(),
            policy_tags: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            constitutional_compliance: None,
            requires_approval: false,
            importance: 0.5,
            quality: 0.5,
            expires_at: None,
            audit_trail: Vec::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp01(confidence);
        self
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }

    pub fn with_policy_tags(mut self, tags: Vec<PolicyTag>) -> Self {
        self.policy_tags = tags;
        self
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_compliance(mut self, compliant: bool) -> Self {
        self.constitutional_compliance = Some(compliant);
        self
    }

    pub fn with_requires_approval(mut self, required: bool) -> Self {
        self.requires_approval = required;
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Canonical form of the result payload.
    pub fn normalized_result(&self) -> String {
        self.result.normalized()
    }
}

// ============================================================================
// Lint reports
// ============================================================================

/// Severity of a lint violation. Declaration order gives the comparison
/// ordering: INFO < WARNING < ERROR < CRITICAL.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// The closed set of violation kinds the linter can report. Serialized tags
/// match the names collaborators key their dashboards on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    DirectConflict,
    PolicyDrift,
    TemporalInconsistency,
    MemoryConflict,
    ConstitutionalMisalignment,
    KnowledgeConflict,
    CausalMismatch,
    UnrecognizedKind,
}

/// A single lint finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,

    #[serde(default)]
    pub evidence: Vec<crate::evidence::Evidence>,
}

impl Violation {
    pub fn new(kind: ViolationKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            evidence: Vec::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: crate::evidence::Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }
}

/// Remediation action a patch performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchAction {
    Remove,
    Replace,
    Merge,
    Escalate,
}

/// A suggested fix for one violation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub action: PatchAction,

    /// The violation kind this patch addresses.
    pub target: ViolationKind,

    /// Confidence that applying the patch is the right call, in [0, 1].
    pub confidence: f64,

    /// Only patches with this flag may be applied without a human.
    pub safe_to_auto_apply: bool,

    pub description: String,
}

/// Outcome of linting one output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintReport {
    pub violations: Vec<Violation>,

    pub suggested_fixes: Vec<Patch>,

    /// True iff `violations` is empty.
    pub passed: bool,

    /// Maximum severity over all violations; INFO when there are none.
    pub severity: Severity,
}

impl LintReport {
    /// Assemble a report, deriving `passed` and `severity`.
    pub fn from_violations(violations: Vec<Violation>, suggested_fixes: Vec<Patch>) -> Self {
        let passed = violations.is_empty();
        let severity = violations
            .iter()
            .map(|v| v.severity)
            .max()
            .unwrap_or(Severity::Info);
        Self {
            violations,
            suggested_fixes,
            passed,
            severity,
        }
    }

    /// Count of violations at ERROR severity or above.
    pub fn error_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity >= Severity::Error)
            .count()
    }

    /// Count of violations below ERROR severity.
    pub fn warning_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity < Severity::Error)
            .count()
    }
}

/// Caller-side knowledge the record itself does not carry, passed to
/// `ContradictionLinter::lint`.
#[derive(Debug, Clone, Default)]
pub struct LintContext {
    /// Components whose outputs causally preceded this one.
    pub causal_chain: Vec<String>,

    /// Known trust per cited source, for knowledge-conflict detection.
    pub known_source_trust: HashMap<String, f64>,
}

// ============================================================================
// Governance verdicts
// ============================================================================

/// The four terminal governance outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictDecision {
    Allow,
    Deny,
    Escalate,
    Degrade,
}

impl VerdictDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictDecision::Allow => "ALLOW",
            VerdictDecision::Deny => "DENY",
            VerdictDecision::Escalate => "ESCALATE",
            VerdictDecision::Degrade => "DEGRADE",
        }
    }
}

/// Result of validating one output against the constitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub decision: VerdictDecision,

    /// Adherence to governance policy, in [0, 1].
    pub compliance_score: f64,

    /// Ordered set of annotation tags (e.g. "blocked", "degraded_trust").
    pub tags: BTreeSet<String>,

    /// Whether a persistence collaborator may store the output.
    pub safe_to_store: bool,

    pub reason: String,

    pub evaluated_at: DateTime<Utc>,
}

// ============================================================================
// Decision tasks and consensus
// ============================================================================

/// Strategy used to resolve competing proposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsensusStrategy {
    Majority,
    SoftmaxWeighted,
    MinRisk,
    Unanimous,
}

impl ConsensusStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusStrategy::Majority => "MAJORITY",
            ConsensusStrategy::SoftmaxWeighted => "SOFTMAX_WEIGHTED",
            ConsensusStrategy::MinRisk => "MIN_RISK",
            ConsensusStrategy::Unanimous => "UNANIMOUS",
        }
    }
}

/// How much is at stake if the decision is wrong.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// One specialist's entry in a decision task. The three weights are supplied
/// by the caller, which has already ranked its specialists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistProposal {
    pub specialist: String,

    pub output: OutputRecord,

    /// Running trust in this specialist, in [0, 1].
    pub trust_score: f64,

    /// Historical success fraction, in [0, 1].
    pub track_record: f64,

    /// Freshness weight, in [0, 1].
    pub recency_weight: f64,
}

impl SpecialistProposal {
    pub fn new(
        specialist: impl Into<String>,
        output: OutputRecord,
        trust_score: f64,
        track_record: f64,
        recency_weight: f64,
    ) -> Self {
        Self {
            specialist: specialist.into(),
            output,
            trust_score: clamp01(trust_score),
            track_record: clamp01(track_record),
            recency_weight: clamp01(recency_weight),
        }
    }
}

/// A unit of work with competing specialist proposals to resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTask {
    pub id: String,

    pub description: String,

    #[serde(default)]
    pub context: BTreeMap<String, String>,

    pub strategy: ConsensusStrategy,

    pub risk: RiskLevel,

    /// Policy identifiers every winning proposal must satisfy under MIN_RISK.
    #[serde(default)]
    pub constraints: Vec<String>,

    pub proposals: Vec<SpecialistProposal>,
}

/// Strategy-specific tallies attached to a consensus decision.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VotingSummary {
    /// True when every proposal's normalized result compared equal.
    pub unanimous: bool,

    /// True when the decision needs a human before it is acted on.
    pub requires_escalation: bool,

    /// Full probability distribution (SOFTMAX_WEIGHTED) or vote shares.
    #[serde(default)]
    pub distribution: BTreeMap<String, f64>,

    /// Specialists dropped by MIN_RISK constraint filtering.
    #[serde(default)]
    pub filtered_out: Vec<String>,
}

/// The resolved outcome of a decision task. Always names a chosen proposal;
/// escalation marks the chosen proposal `requires_approval` instead of
/// omitting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusDecision {
    pub task_id: String,

    pub strategy_used: ConsensusStrategy,

    pub chosen_proposal: SpecialistProposal,

    /// Per-specialist numeric score or probability.
    pub weights: BTreeMap<String, f64>,

    /// Overall confidence in the chosen proposal, in [0, 1].
    pub confidence: f64,

    pub rationale: String,

    /// Non-winning proposals.
    pub dissent: Vec<SpecialistProposal>,

    pub voting_summary: VotingSummary,

    /// False when governance requirements forced an escalation.
    pub governance_validated: bool,
}

// ============================================================================
// Feedback integration
// ============================================================================

/// Opaque token a persistence collaborator resolves into a durable record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryReference(String);

impl MemoryReference {
    /// Mint a reference from the stable identity of an output.
    pub fn for_output(output: &OutputRecord) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        output.id.hash(&mut hasher);
        output.task_id.hash(&mut hasher);
        output.component.hash(&mut hasher);
        Self(format!("mem-{:016x}", hasher.finish()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Storage-time metrics handed to the feedback sink alongside a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackMetrics {
    pub decision: VerdictDecision,
    pub compliance_score: f64,
    pub trust_score: f64,
    pub evidence_quality: f64,
    pub violation_count: usize,
}
