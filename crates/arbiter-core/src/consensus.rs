//! Consensus engine: resolves a decision task with competing specialist
//! proposals into one chosen proposal.
//!
//! Four strategies are supported (MAJORITY, SOFTMAX_WEIGHTED, MIN_RISK,
//! UNANIMOUS). Whatever happens, a decision always names a chosen proposal:
//! when a strategy cannot produce a clean winner it escalates by marking the
//! deterministic pick `requires_approval` instead of returning nothing.
//!
//! `deliberate` is read-only with respect to the specialist ledger. Trust
//! and track records move only through `update_specialist_trust`, called by
//! the owner of the task once the real-world outcome is known, so an
//! abandoned deliberation leaves no partial state behind.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::context::EngineContext;
use crate::types::{
    clamp01, ConsensusDecision, ConsensusStrategy, DecisionTask, PolicyStatus, RiskLevel,
    SpecialistProposal, VotingSummary,
};

/// Two floating weights closer than this are a tie and fall through to the
/// next tie-break criterion.
const WEIGHT_EPSILON: f64 = 1e-9;

/// Errors from consensus deliberation.
#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Invalid decision task: {0}")]
    InvalidTask(String),
}

pub struct ConsensusEngine {
    ctx: Arc<EngineContext>,
}

impl ConsensusEngine {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Record one known outcome for a specialist, moving its running trust
    /// by the configured EMA step and appending to its outcome window.
    pub fn update_specialist_trust(&self, name: &str, success: bool) {
        let config = &self.ctx.config().consensus;
        self.ctx
            .update_specialist(name, success, config.trust_alpha, config.outcome_window);
    }

    /// Running trust for a specialist; 0.5 when unknown.
    pub fn get_specialist_trust(&self, name: &str) -> f64 {
        self.ctx.specialist_trust(name)
    }

    /// Success fraction over the rolling outcome window; 0.5 with no history.
    pub fn get_specialist_track_record(&self, name: &str) -> f64 {
        self.ctx.specialist_track_record(name)
    }

    /// Resolve a task into one decision. Never updates specialist trust.
    pub fn deliberate(&self, task: &DecisionTask) -> Result<ConsensusDecision, ConsensusError> {
        if task.proposals.is_empty() {
            return Err(ConsensusError::InvalidTask(format!(
                "task \"{}\" carries no proposals",
                task.id
            )));
        }

        let decision = if task.proposals.len() == 1 {
            self.single_proposal(task)
        } else {
            match task.strategy {
                ConsensusStrategy::Majority => self.majority(task),
                ConsensusStrategy::SoftmaxWeighted => self.softmax_weighted(task),
                ConsensusStrategy::MinRisk => self.min_risk(task),
                ConsensusStrategy::Unanimous => self.unanimous(task),
            }
        };

        debug!(
            task_id = %task.id,
            strategy = task.strategy.as_str(),
            winner = %decision.chosen_proposal.specialist,
            confidence = decision.confidence,
            "consensus reached"
        );
        Ok(decision)
    }

    /// Structured audit record for a decision.
    pub fn explain(&self, decision: &ConsensusDecision) -> serde_json::Value {
        json!({
            "task_id": decision.task_id,
            "strategy": decision.strategy_used.as_str(),
            "winner": decision.chosen_proposal.specialist,
            "weights": decision.weights,
            "rationale": decision.rationale,
            "confidence": decision.confidence,
            "governance_validated": decision.governance_validated,
            "requires_escalation": decision.voting_summary.requires_escalation,
        })
    }

    fn single_proposal(&self, task: &DecisionTask) -> ConsensusDecision {
        let proposal = task.proposals[0].clone();
        let mut weights = BTreeMap::new();
        weights.insert(proposal.specialist.clone(), 1.0);

        ConsensusDecision {
            task_id: task.id.clone(),
            strategy_used: task.strategy,
            confidence: clamp01(proposal.output.confidence),
            rationale: format!(
                "single proposal from \"{}\" wins by default",
                proposal.specialist
            ),
            dissent: Vec::new(),
            voting_summary: VotingSummary {
                unanimous: true,
                requires_escalation: false,
                distribution: weights.clone(),
                filtered_out: Vec::new(),
            },
            governance_validated: true,
            weights,
            chosen_proposal: proposal,
        }
    }

    // ------------------------------------------------------------------
    // MAJORITY
    // ------------------------------------------------------------------

    fn majority(&self, task: &DecisionTask) -> ConsensusDecision {
        // Group proposals by normalized result, preserving first-seen order.
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for (index, proposal) in task.proposals.iter().enumerate() {
            let key = proposal.output.normalized_result();
            match groups.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, members)) => members.push(index),
                None => groups.push((key, vec![index])),
            }
        }

        let total_weight: f64 = task.proposals.iter().map(vote_weight).sum();

        // Winner group: summed weight, then aggregate confidence, then the
        // lexicographically earliest specialist name.
        let group_rank = |members: &[usize]| {
            let weight: f64 = members.iter().map(|&i| vote_weight(&task.proposals[i])).sum();
            let confidence: f64 = members
                .iter()
                .map(|&i| task.proposals[i].output.confidence)
                .sum();
            let earliest = members
                .iter()
                .map(|&i| task.proposals[i].specialist.as_str())
                .min()
                .unwrap_or("");
            (weight, confidence, earliest.to_string())
        };

        let mut winner_index = 0usize;
        let mut winner_rank = group_rank(&groups[0].1);
        for (index, (_, members)) in groups.iter().enumerate().skip(1) {
            let rank = group_rank(members);
            if rank_beats(&rank, &winner_rank) {
                winner_index = index;
                winner_rank = rank;
            }
        }

        let (winning_key, winning_members) = &groups[winner_index];
        let share = if total_weight > WEIGHT_EPSILON {
            winner_rank.0 / total_weight
        } else {
            0.0
        };

        // Representative of the winning group: heaviest vote, ties by name.
        let chosen_index = *winning_members
            .iter()
            .min_by(|&&a, &&b| {
                let (wa, wb) = (vote_weight(&task.proposals[a]), vote_weight(&task.proposals[b]));
                wb.partial_cmp(&wa)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| {
                        task.proposals[a]
                            .specialist
                            .cmp(&task.proposals[b].specialist)
                    })
            })
            .unwrap_or(&winning_members[0]);

        let mut weights = BTreeMap::new();
        let mut distribution = BTreeMap::new();
        for proposal in &task.proposals {
            let weight = vote_weight(proposal);
            weights.insert(proposal.specialist.clone(), weight);
            distribution.insert(
                proposal.specialist.clone(),
                if total_weight > WEIGHT_EPSILON {
                    weight / total_weight
                } else {
                    0.0
                },
            );
        }

        let dissent: Vec<SpecialistProposal> = task
            .proposals
            .iter()
            .enumerate()
            .filter(|(index, _)| !winning_members.contains(index))
            .map(|(_, proposal)| proposal.clone())
            .collect();

        ConsensusDecision {
            task_id: task.id.clone(),
            strategy_used: ConsensusStrategy::Majority,
            chosen_proposal: task.proposals[chosen_index].clone(),
            weights,
            confidence: clamp01(share),
            rationale: format!(
                "result \"{}\" won {:.1}% of the vote weight with {} of {} proposals",
                truncated(winning_key),
                share * 100.0,
                winning_members.len(),
                task.proposals.len()
            ),
            dissent,
            voting_summary: VotingSummary {
                unanimous: groups.len() == 1,
                requires_escalation: false,
                distribution,
                filtered_out: Vec::new(),
            },
            governance_validated: true,
        }
    }

    // ------------------------------------------------------------------
    // SOFTMAX_WEIGHTED
    // ------------------------------------------------------------------

    fn softmax_weighted(&self, task: &DecisionTask) -> ConsensusDecision {
        let config = &self.ctx.config().consensus;

        let scores: Vec<f64> = task
            .proposals
            .iter()
            .map(|proposal| {
                let mut score = proposal.output.confidence
                    * proposal.trust_score
                    * proposal.track_record
                    * proposal.recency_weight;
                if proposal.output.constitutional_compliance == Some(true) {
                    score *= config.compliance_bonus;
                }
                score
            })
            .collect();

        // Subtract the max before exponentiating. This is a correctness
        // requirement: unmitigated scores can overflow for large spreads.
        let max_score = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scores.iter().map(|score| (score - max_score).exp()).collect();
        let exp_sum: f64 = exps.iter().sum();
        let probabilities: Vec<f64> = exps.iter().map(|exp| exp / exp_sum).collect();

        let mut winner = 0usize;
        for index in 1..task.proposals.len() {
            let delta = probabilities[index] - probabilities[winner];
            if delta > WEIGHT_EPSILON
                || (delta.abs() <= WEIGHT_EPSILON
                    && task.proposals[index].specialist < task.proposals[winner].specialist)
            {
                winner = index;
            }
        }

        let distribution: BTreeMap<String, f64> = task
            .proposals
            .iter()
            .zip(&probabilities)
            .map(|(proposal, probability)| (proposal.specialist.clone(), *probability))
            .collect();

        let dissent: Vec<SpecialistProposal> = task
            .proposals
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != winner)
            .map(|(_, proposal)| proposal.clone())
            .collect();

        ConsensusDecision {
            task_id: task.id.clone(),
            strategy_used: ConsensusStrategy::SoftmaxWeighted,
            chosen_proposal: task.proposals[winner].clone(),
            weights: distribution.clone(),
            confidence: clamp01(probabilities[winner]),
            rationale: format!(
                "\"{}\" selected with probability {:.3} over {} competitor(s)",
                task.proposals[winner].specialist,
                probabilities[winner],
                task.proposals.len() - 1
            ),
            dissent,
            voting_summary: VotingSummary {
                unanimous: false,
                requires_escalation: false,
                distribution,
                filtered_out: Vec::new(),
            },
            governance_validated: true,
        }
    }

    // ------------------------------------------------------------------
    // MIN_RISK
    // ------------------------------------------------------------------

    fn min_risk(&self, task: &DecisionTask) -> ConsensusDecision {
        let satisfies_constraints = |proposal: &SpecialistProposal| {
            task.constraints.iter().all(|constraint| {
                proposal.output.policy_tags.iter().any(|tag| {
                    tag.policy == *constraint && tag.status == PolicyStatus::Compliant
                })
            })
        };

        let (survivors, filtered): (Vec<usize>, Vec<usize>) =
            (0..task.proposals.len()).partition(|&i| satisfies_constraints(&task.proposals[i]));
        let filtered_out: Vec<String> = filtered
            .iter()
            .map(|&i| task.proposals[i].specialist.clone())
            .collect();

        let risk_rank = |i: usize| {
            let proposal = &task.proposals[i];
            proposal.output.confidence * proposal.trust_score
        };
        let best_of = |candidates: &[usize]| {
            candidates
                .iter()
                .copied()
                .min_by(|&a, &b| {
                    risk_rank(b)
                        .partial_cmp(&risk_rank(a))
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| {
                            task.proposals[a]
                                .specialist
                                .cmp(&task.proposals[b].specialist)
                        })
                })
                .unwrap_or(0)
        };

        let mut weights = BTreeMap::new();
        for &index in &survivors {
            weights.insert(task.proposals[index].specialist.clone(), risk_rank(index));
        }

        if survivors.is_empty() {
            // Nothing satisfies the constraints; surface the least risky
            // proposal for a human instead of failing the task.
            warn!(task_id = %task.id, "every proposal violates a constraint; escalating");
            let all: Vec<usize> = (0..task.proposals.len()).collect();
            let fallback = best_of(&all);
            return self.escalated_min_risk(
                task,
                fallback,
                weights,
                filtered_out,
                0.0,
                format!(
                    "no proposal satisfied constraints [{}]; \"{}\" escalated for approval",
                    task.constraints.join(", "),
                    task.proposals[fallback].specialist
                ),
            );
        }

        let winner = best_of(&survivors);
        let winner_rank = risk_rank(winner);

        // CRITICAL tasks additionally demand explicit constitutional
        // compliance from the winner.
        let compliant = task.proposals[winner].output.constitutional_compliance == Some(true);
        if task.risk == RiskLevel::Critical && !compliant {
            warn!(
                task_id = %task.id,
                winner = %task.proposals[winner].specialist,
                "critical-risk winner lacks constitutional compliance; escalating"
            );
            return self.escalated_min_risk(
                task,
                winner,
                weights,
                filtered_out,
                winner_rank,
                format!(
                    "\"{}\" won but lacks constitutional compliance on a critical-risk task",
                    task.proposals[winner].specialist
                ),
            );
        }

        ConsensusDecision {
            task_id: task.id.clone(),
            strategy_used: ConsensusStrategy::MinRisk,
            chosen_proposal: task.proposals[winner].clone(),
            weights,
            confidence: clamp01(winner_rank),
            rationale: format!(
                "\"{}\" carries the highest confidence-weighted trust among {} constraint-satisfying proposal(s)",
                task.proposals[winner].specialist,
                survivors.len()
            ),
            dissent: dissent_except(task, winner),
            voting_summary: VotingSummary {
                unanimous: false,
                requires_escalation: false,
                distribution: BTreeMap::new(),
                filtered_out,
            },
            governance_validated: true,
        }
    }

    fn escalated_min_risk(
        &self,
        task: &DecisionTask,
        chosen: usize,
        weights: BTreeMap<String, f64>,
        filtered_out: Vec<String>,
        confidence: f64,
        rationale: String,
    ) -> ConsensusDecision {
        ConsensusDecision {
            task_id: task.id.clone(),
            strategy_used: ConsensusStrategy::MinRisk,
            chosen_proposal: mark_requires_approval(&task.proposals[chosen]),
            weights,
            confidence: clamp01(confidence),
            rationale,
            dissent: dissent_except(task, chosen),
            voting_summary: VotingSummary {
                unanimous: false,
                requires_escalation: true,
                distribution: BTreeMap::new(),
                filtered_out,
            },
            governance_validated: false,
        }
    }

    // ------------------------------------------------------------------
    // UNANIMOUS
    // ------------------------------------------------------------------

    fn unanimous(&self, task: &DecisionTask) -> ConsensusDecision {
        let reference = task.proposals[0].output.normalized_result();
        let all_agree = task
            .proposals
            .iter()
            .all(|proposal| proposal.output.normalized_result() == reference);

        // Deterministic pick either way: highest trust, ties by name.
        let pick = (0..task.proposals.len())
            .min_by(|&a, &b| {
                task.proposals[b]
                    .trust_score
                    .partial_cmp(&task.proposals[a].trust_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| {
                        task.proposals[a]
                            .specialist
                            .cmp(&task.proposals[b].specialist)
                    })
            })
            .unwrap_or(0);

        let weights: BTreeMap<String, f64> = task
            .proposals
            .iter()
            .map(|proposal| (proposal.specialist.clone(), proposal.trust_score))
            .collect();

        if all_agree {
            return ConsensusDecision {
                task_id: task.id.clone(),
                strategy_used: ConsensusStrategy::Unanimous,
                chosen_proposal: task.proposals[pick].clone(),
                weights,
                confidence: 1.0,
                rationale: format!(
                    "all {} proposals agree on \"{}\"",
                    task.proposals.len(),
                    truncated(&reference)
                ),
                dissent: Vec::new(),
                voting_summary: VotingSummary {
                    unanimous: true,
                    requires_escalation: false,
                    distribution: BTreeMap::new(),
                    filtered_out: Vec::new(),
                },
                governance_validated: true,
            };
        }

        // Disagreement: escalate with the largest agreeing share as the
        // decision confidence.
        let chosen_key = task.proposals[pick].output.normalized_result();
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for proposal in &task.proposals {
            *counts.entry(proposal.output.normalized_result()).or_insert(0) += 1;
        }
        let largest = counts.values().copied().max().unwrap_or(0);
        let share = largest as f64 / task.proposals.len() as f64;

        let dissent: Vec<SpecialistProposal> = task
            .proposals
            .iter()
            .enumerate()
            .filter(|(index, proposal)| {
                *index != pick && proposal.output.normalized_result() != chosen_key
            })
            .map(|(_, proposal)| proposal.clone())
            .collect();

        warn!(task_id = %task.id, "unanimity required but proposals disagree; escalating");
        ConsensusDecision {
            task_id: task.id.clone(),
            strategy_used: ConsensusStrategy::Unanimous,
            chosen_proposal: mark_requires_approval(&task.proposals[pick]),
            weights,
            confidence: clamp01(share),
            rationale: format!(
                "unanimity required but {} distinct results were proposed; \"{}\" escalated for approval",
                counts.len(),
                task.proposals[pick].specialist
            ),
            dissent,
            voting_summary: VotingSummary {
                unanimous: false,
                requires_escalation: true,
                distribution: BTreeMap::new(),
                filtered_out: Vec::new(),
            },
            governance_validated: true,
        }
    }
}

/// A proposal's vote weight under MAJORITY.
fn vote_weight(proposal: &SpecialistProposal) -> f64 {
    proposal.trust_score * proposal.track_record * proposal.recency_weight
}

/// True when `candidate` outranks `incumbent` on (weight, confidence, name).
fn rank_beats(candidate: &(f64, f64, String), incumbent: &(f64, f64, String)) -> bool {
    if candidate.0 > incumbent.0 + WEIGHT_EPSILON {
        return true;
    }
    if (candidate.0 - incumbent.0).abs() <= WEIGHT_EPSILON {
        if candidate.1 > incumbent.1 + WEIGHT_EPSILON {
            return true;
        }
        if (candidate.1 - incumbent.1).abs() <= WEIGHT_EPSILON {
            return candidate.2 < incumbent.2;
        }
    }
    false
}

fn mark_requires_approval(proposal: &SpecialistProposal) -> SpecialistProposal {
    let mut marked = proposal.clone();
    marked.output.requires_approval = true;
    marked
}

fn dissent_except(task: &DecisionTask, chosen: usize) -> Vec<SpecialistProposal> {
    task.proposals
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != chosen)
        .map(|(_, proposal)| proposal.clone())
        .collect()
}

fn truncated(text: &str) -> String {
    const LIMIT: usize = 48;
    if text.chars().count() <= LIMIT {
        text.to_string()
    } else {
        let head: String = text.chars().take(LIMIT).collect();
        format!("{}...", head)
    }
}
