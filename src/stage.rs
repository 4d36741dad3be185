//! Per-axis stage controller.
//!
//! Exploration -> Discrimination -> Confirmation -> Completed, forward only.
//! A stage exits once its minimum question count is met and either
//!
//! - the last `stability_window` confidence measurements all strictly
//!   exceed the stage's confidence threshold, and (after Exploration) the convergence
//!   score meets the stage's convergence threshold, or
//! - the stage's maximum question count is reached.
//!
//! The confidence history spans the whole axis, so measurements taken at
//! the end of one stage count toward the stability of the next.

use serde::{Deserialize, Serialize};

use crate::archetype::Stage;
use crate::belief::BeliefDistribution;
use crate::config::{StageConfig, StageThresholds};
use crate::information::{convergence_score, entropy};

/// Snapshot of a distribution's convergence signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageMetrics {
    pub confidence: f64,
    pub convergence: f64,
    pub max_probability: f64,
    pub entropy: f64,
}

impl StageMetrics {
    pub fn measure(distribution: &BeliefDistribution) -> Self {
        Self {
            confidence: distribution.confidence(),
            convergence: convergence_score(distribution),
            max_probability: distribution.top().1,
            entropy: entropy(distribution),
        }
    }
}

/// Why a stage (or the whole axis) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// Confidence was stable and convergence met the threshold.
    Converged,
    /// The stage's question budget ran out.
    MaxQuestions,
    /// No unused item remained for the axis.
    PoolExhausted,
}

/// Reason attached to a completed axis.
pub type CompletionReason = TransitionCause;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: Stage,
    pub to: Stage,
    pub cause: TransitionCause,
    /// Answers recorded in `from` before leaving it.
    pub questions_in_stage: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageController {
    stage: Stage,
    questions_in_stage: usize,
    total_questions: usize,
    confidence_history: Vec<f64>,
    completion: Option<CompletionReason>,
}

impl Default for StageController {
    fn default() -> Self {
        Self::new()
    }
}

impl StageController {
    pub fn new() -> Self {
        Self {
            stage: Stage::Exploration,
            questions_in_stage: 0,
            total_questions: 0,
            confidence_history: Vec::new(),
            completion: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn questions_in_stage(&self) -> usize {
        self.questions_in_stage
    }

    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    pub fn confidence_history(&self) -> &[f64] {
        &self.confidence_history
    }

    pub fn is_completed(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn completion(&self) -> Option<CompletionReason> {
        self.completion
    }

    /// Count one answer on this axis and advance if the stage may exit.
    pub fn record_answer(
        &mut self,
        metrics: StageMetrics,
        stages: &StageConfig,
        stability_window: usize,
    ) -> Option<StageTransition> {
        let thresholds = stages.thresholds(self.stage)?.clone();

        self.questions_in_stage += 1;
        self.total_questions += 1;
        self.confidence_history.push(metrics.confidence);

        let cause = self.exit_cause(&metrics, &thresholds, stability_window)?;
        Some(self.advance(cause))
    }

    /// End the axis early because its item pool ran dry.
    pub fn exhaust(&mut self) -> Option<StageTransition> {
        if self.is_completed() {
            return None;
        }
        let from = self.stage;
        let questions_in_stage = self.questions_in_stage;
        self.stage = Stage::Completed;
        self.questions_in_stage = 0;
        self.completion = Some(TransitionCause::PoolExhausted);
        Some(StageTransition {
            from,
            to: Stage::Completed,
            cause: TransitionCause::PoolExhausted,
            questions_in_stage,
        })
    }

    fn exit_cause(
        &self,
        metrics: &StageMetrics,
        t: &StageThresholds,
        stability_window: usize,
    ) -> Option<TransitionCause> {
        if self.questions_in_stage < t.min_questions {
            return None;
        }

        let converged = self.confidence_is_stable(t.confidence_threshold, stability_window)
            && self.convergence_met(metrics, t);
        if converged {
            return Some(TransitionCause::Converged);
        }
        if self.questions_in_stage >= t.max_questions {
            return Some(TransitionCause::MaxQuestions);
        }
        None
    }

    fn confidence_is_stable(&self, threshold: f64, window: usize) -> bool {
        let window = window.max(1);
        let n = self.confidence_history.len();
        n >= window
            && self.confidence_history[n - window..]
                .iter()
                .all(|c| *c > threshold)
    }

    fn convergence_met(&self, metrics: &StageMetrics, t: &StageThresholds) -> bool {
        if self.stage == Stage::Exploration {
            return true;
        }
        match t.convergence_threshold {
            Some(threshold) => metrics.convergence >= threshold,
            None => true,
        }
    }

    fn advance(&mut self, cause: TransitionCause) -> StageTransition {
        let from = self.stage;
        let questions_in_stage = self.questions_in_stage;
        self.stage = from.next();
        self.questions_in_stage = 0;
        if self.stage.is_terminal() {
            self.completion = Some(cause);
        }
        StageTransition {
            from,
            to: self.stage,
            cause,
            questions_in_stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(confidence: f64, convergence: f64) -> StageMetrics {
        StageMetrics {
            confidence,
            convergence,
            max_probability: 0.5,
            entropy: 1.0,
        }
    }

    #[test]
    fn stays_until_minimum_even_when_confident() {
        let stages = StageConfig::default();
        let mut c = StageController::new();
        assert!(c.record_answer(metrics(0.9, 0.9), &stages, 1).is_none());
        let t = c.record_answer(metrics(0.9, 0.9), &stages, 1).unwrap();
        assert_eq!(t.from, Stage::Exploration);
        assert_eq!(t.to, Stage::Discrimination);
        assert_eq!(t.cause, TransitionCause::Converged);
        assert_eq!(t.questions_in_stage, 2);
        assert_eq!(c.questions_in_stage(), 0);
    }

    #[test]
    fn one_lucky_answer_is_not_stable() {
        let stages = StageConfig::default();
        let mut c = StageController::new();
        assert!(c.record_answer(metrics(0.0, 0.0), &stages, 3).is_none());
        assert!(c.record_answer(metrics(0.0, 0.0), &stages, 3).is_none());
        assert!(c.record_answer(metrics(0.9, 0.9), &stages, 3).is_none());
        // Fourth answer hits exploration's max of 4.
        let t = c.record_answer(metrics(0.9, 0.9), &stages, 3).unwrap();
        assert_eq!(t.cause, TransitionCause::MaxQuestions);
    }

    #[test]
    fn zero_threshold_still_needs_some_separation() {
        let mut stages = StageConfig::default();
        stages.exploration.confidence_threshold = 0.0;
        let mut c = StageController::new();
        // A flat distribution has zero gap; it never clears a zero threshold.
        assert!(c.record_answer(metrics(0.0, 0.0), &stages, 1).is_none());
        assert!(c.record_answer(metrics(0.0, 0.0), &stages, 1).is_none());
        assert!(c.record_answer(metrics(0.0, 0.0), &stages, 1).is_none());
        let t = c.record_answer(metrics(0.0, 0.0), &stages, 1).unwrap();
        assert_eq!(t.cause, TransitionCause::MaxQuestions);

        let mut c = StageController::new();
        c.record_answer(metrics(0.01, 0.0), &stages, 1);
        let t = c.record_answer(metrics(0.01, 0.0), &stages, 1).unwrap();
        assert_eq!(t.cause, TransitionCause::Converged);
    }

    #[test]
    fn max_questions_forces_transition_without_confidence() {
        let stages = StageConfig::default();
        let mut c = StageController::new();
        let mut seen = vec![c.stage()];
        for _ in 0..50 {
            if c.is_completed() {
                break;
            }
            c.record_answer(metrics(0.0, 0.0), &stages, 3);
            seen.push(c.stage());
        }
        assert!(c.is_completed());
        assert_eq!(c.completion(), Some(TransitionCause::MaxQuestions));
        assert_eq!(c.total_questions(), 4 + 5 + 5);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn convergence_gates_later_stages() {
        let stages = StageConfig::default();
        let mut c = StageController::new();
        c.record_answer(metrics(0.9, 0.9), &stages, 1);
        c.record_answer(metrics(0.9, 0.9), &stages, 1);
        assert_eq!(c.stage(), Stage::Discrimination);

        // Confident but not converged: no exit before max.
        assert!(c.record_answer(metrics(0.9, 0.1), &stages, 1).is_none());
        assert!(c.record_answer(metrics(0.9, 0.1), &stages, 1).is_none());
        let t = c.record_answer(metrics(0.9, 0.5), &stages, 1).unwrap();
        assert_eq!(t.cause, TransitionCause::Converged);
        assert_eq!(c.stage(), Stage::Confirmation);
    }

    #[test]
    fn exhaust_completes_once() {
        let mut c = StageController::new();
        let t = c.exhaust().unwrap();
        assert_eq!(t.to, Stage::Completed);
        assert_eq!(c.completion(), Some(CompletionReason::PoolExhausted));
        assert!(c.exhaust().is_none());
        assert!(c
            .record_answer(metrics(1.0, 1.0), &StageConfig::default(), 3)
            .is_none());
        assert_eq!(c.total_questions(), 0);
    }
}
