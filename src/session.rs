//! One adaptive classification run.
//!
//! A [`Session`] owns both axes' belief states and stage controllers, the
//! set of items already asked, the pending item and the answer log. The
//! conversation is strictly request/response: [`Session::next_item`] issues
//! one item, [`Session::record_answer`] consumes it, and only then is the
//! next item chosen. The catalog is shared read-only across sessions.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::archetype::{Archetype, Axis, Stage};
use crate::belief::{update_weight, BeliefDistribution, BeliefState, UpdateOutcome};
use crate::catalog::{Catalog, Item, LocalizedText, OptionKey};
use crate::config::{AxisSchedule, ConfigError, EngineConfig};
use crate::events::{NoopObserver, SessionEvent, SessionObserver};
use crate::information::{convergence_score, Evaluator};
use crate::selection::{candidate_pool, SelectionContext, Strategies};
use crate::stage::{CompletionReason, StageController, StageMetrics, StageTransition};
use crate::stats::ItemStats;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("answer for '{got}' but the pending item is '{expected}'")]
    StaleAnswer { expected: String, got: String },
    #[error("no item is awaiting an answer")]
    NoPendingItem,
    #[error("unknown item '{0}'")]
    UnknownItem(String),
    #[error("item '{item_id}' has no option '{option}'")]
    UnknownOption { item_id: String, option: String },
    #[error("session is not complete")]
    NotComplete,
    #[error("item catalog is still loading")]
    CatalogNotReady,
}

// ---------------------------------------------------------------------
//  Public views
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionView {
    pub key: OptionKey,
    pub text: LocalizedText,
}

/// What the presentation layer sees of an item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub item_id: String,
    pub prompt: LocalizedText,
    pub options: Vec<OptionView>,
}

impl ItemView {
    fn of(item: &Item) -> Self {
        Self {
            item_id: item.id.clone(),
            prompt: item.prompt.clone(),
            options: item
                .options
                .iter()
                .map(|o| OptionView {
                    key: o.key,
                    text: o.text.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NextItem {
    Item(ItemView),
    /// No axis can produce another item.
    Complete,
}

impl NextItem {
    pub fn is_complete(&self) -> bool {
        matches!(self, NextItem::Complete)
    }

    pub fn into_item(self) -> Option<ItemView> {
        match self {
            NextItem::Item(view) => Some(view),
            NextItem::Complete => None,
        }
    }
}

/// Immutable audit entry appended for every accepted answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRecord {
    pub item_id: String,
    pub option: OptionKey,
    pub axis: Axis,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerReceipt {
    pub axis: Axis,
    pub outcome: UpdateOutcome,
    pub transition: Option<StageTransition>,
    /// Stage of the axis after this answer.
    pub stage: Stage,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisResult {
    pub axis: Axis,
    pub archetype: Archetype,
    pub probability: f64,
    pub confidence: f64,
    pub convergence: f64,
    pub distribution: BeliefDistribution,
    pub stage: Stage,
    pub questions: usize,
    pub completion: Option<CompletionReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResult {
    pub session_id: Uuid,
    pub intrinsic: AxisResult,
    pub external: AxisResult,
    /// Mean of the two top probabilities.
    pub overall_confidence: f64,
    pub answered: usize,
    pub started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------
//  Session
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct AxisState {
    belief: BeliefState,
    controller: StageController,
}

#[derive(Debug, Clone)]
struct Pending {
    item_id: String,
    axis: Axis,
}

pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    catalog: Arc<Catalog>,
    stats: Arc<ItemStats>,
    config: EngineConfig,
    strategies: Strategies,
    observer: Arc<dyn SessionObserver>,
    axes: [AxisState; 2],
    used: HashSet<String>,
    pending: Option<Pending>,
    answers: Vec<AnswerRecord>,
    last_axis: Option<Axis>,
}

impl Session {
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let stats = Arc::new(ItemStats::for_catalog(&catalog));
        Ok(Self::assemble(catalog, stats, config))
    }

    /// Caller guarantees `config` has been validated.
    pub(crate) fn assemble(
        catalog: Arc<Catalog>,
        stats: Arc<ItemStats>,
        config: EngineConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            catalog,
            stats,
            config,
            strategies: Strategies::default(),
            observer: Arc::new(NoopObserver),
            axes: [AxisState::default(), AxisState::default()],
            used: HashSet::new(),
            pending: None,
            answers: Vec::new(),
            last_axis: None,
        }
    }

    /// Share usage counters with other sessions on the same catalog.
    pub fn with_stats(mut self, stats: Arc<ItemStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_strategies(mut self, strategies: Strategies) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn distribution(&self, axis: Axis) -> &BeliefDistribution {
        self.axes[axis.index()].belief.distribution()
    }

    pub fn stage(&self, axis: Axis) -> Stage {
        self.axes[axis.index()].controller.stage()
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    /// Id of the item awaiting an answer, if any.
    pub fn pending_item(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.item_id.as_str())
    }

    pub fn is_used(&self, item_id: &str) -> bool {
        self.used.contains(item_id)
    }

    pub fn is_complete(&self) -> bool {
        self.axes.iter().all(|a| a.controller.is_completed())
    }

    // -- Protocol ------------------------------------------------------------

    /// Issue the next item, or `Complete` once no axis can produce one.
    ///
    /// While an answer is outstanding the pending item is issued again.
    pub fn next_item(&mut self) -> NextItem {
        if let Some(pending) = &self.pending {
            if let Some(item) = self.catalog.get(&pending.item_id) {
                return NextItem::Item(ItemView::of(item));
            }
        }

        let catalog = Arc::clone(&self.catalog);
        while let Some(axis) = self.schedule_axis() {
            let stage = self.stage(axis);
            let candidates = candidate_pool(&catalog, axis, stage, &self.used);

            let picked = self.strategies.for_stage(stage).and_then(|strategy| {
                let ctx = SelectionContext {
                    axis,
                    stage,
                    state: &self.axes[axis.index()].belief,
                    evaluator: Evaluator::new(&self.config.update)
                        .with_weighting(self.config.option_weighting)
                        .with_stats(&self.stats),
                };
                strategy
                    .select(&candidates, &ctx)
                    .map(|best| (best.item, best.score))
            });

            let Some((item, score)) = picked else {
                self.exhaust_axis(axis);
                continue;
            };

            self.used.insert(item.id.clone());
            self.stats.record_issued(&item.id);
            self.pending = Some(Pending {
                item_id: item.id.clone(),
                axis,
            });
            self.last_axis = Some(axis);
            self.emit(SessionEvent::ItemSelected {
                session_id: self.id,
                at: Utc::now(),
                axis,
                stage,
                item_id: item.id.clone(),
                score: score.score,
                information_gain: score.information_gain,
            });
            return NextItem::Item(ItemView::of(item));
        }
        NextItem::Complete
    }

    /// Apply the answer to the pending item.
    ///
    /// On error nothing changes. On success the owning axis is updated,
    /// the answer is logged and the stage controller is evaluated.
    pub fn record_answer(
        &mut self,
        item_id: &str,
        option: OptionKey,
    ) -> Result<AnswerReceipt, SessionError> {
        let catalog = Arc::clone(&self.catalog);
        let item = catalog
            .get(item_id)
            .ok_or_else(|| SessionError::UnknownItem(item_id.to_string()))?;
        let pending = self.pending.as_ref().ok_or(SessionError::NoPendingItem)?;
        if pending.item_id != item_id {
            return Err(SessionError::StaleAnswer {
                expected: pending.item_id.clone(),
                got: item_id.to_string(),
            });
        }
        let axis = pending.axis;

        // Compute everything first, then commit.
        let weight = update_weight(item.information_value, item.difficulty, &self.config.update);
        let current = &self.axes[axis.index()];
        let (belief, outcome) =
            current
                .belief
                .updated(&item.option(option).impacts, weight, &self.config.update);
        let metrics = StageMetrics::measure(belief.distribution());
        let mut controller = current.controller.clone();
        let transition =
            controller.record_answer(metrics, &self.config.stages, self.config.stability_window);

        let stage = controller.stage();
        self.axes[axis.index()] = AxisState { belief, controller };
        self.pending = None;
        self.answers.push(AnswerRecord {
            item_id: item.id.clone(),
            option,
            axis,
            at: Utc::now(),
        });
        self.stats.record_pick(&item.id, option);

        match outcome {
            UpdateOutcome::Applied => self.emit(SessionEvent::DistributionUpdated {
                session_id: self.id,
                at: Utc::now(),
                axis,
                item_id: item.id.clone(),
                option,
                weight,
                probabilities: *belief.distribution().probabilities(),
                confidence: metrics.confidence,
                convergence: metrics.convergence,
            }),
            UpdateOutcome::Reset { reason } => self.emit(SessionEvent::DegenerateReset {
                session_id: self.id,
                at: Utc::now(),
                axis,
                item_id: item.id.clone(),
                reason,
            }),
        }
        if let Some(t) = transition {
            self.emit_transition(axis, t);
        }

        Ok(AnswerReceipt {
            axis,
            outcome,
            transition,
            stage,
            confidence: metrics.confidence,
        })
    }

    /// [`Session::record_answer`] with the option given as text (`"A"`..`"D"`).
    pub fn record_answer_str(
        &mut self,
        item_id: &str,
        option: &str,
    ) -> Result<AnswerReceipt, SessionError> {
        if self.catalog.get(item_id).is_none() {
            return Err(SessionError::UnknownItem(item_id.to_string()));
        }
        let key: OptionKey = option.parse().map_err(|_| SessionError::UnknownOption {
            item_id: item_id.to_string(),
            option: option.to_string(),
        })?;
        self.record_answer(item_id, key)
    }

    /// Final classification; both axes must be completed.
    pub fn result(&self) -> Result<SessionResult, SessionError> {
        if !self.is_complete() {
            return Err(SessionError::NotComplete);
        }
        let intrinsic = self.axis_summary(Axis::Intrinsic);
        let external = self.axis_summary(Axis::External);
        let overall_confidence = (intrinsic.probability + external.probability) / 2.0;
        Ok(SessionResult {
            session_id: self.id,
            intrinsic,
            external,
            overall_confidence,
            answered: self.answers.len(),
            started_at: self.started_at,
        })
    }

    /// Current standing of one axis; valid at any point in the session.
    pub fn axis_summary(&self, axis: Axis) -> AxisResult {
        let state = &self.axes[axis.index()];
        let distribution = *state.belief.distribution();
        let (archetype, probability) = distribution.top();
        AxisResult {
            axis,
            archetype,
            probability,
            confidence: distribution.confidence(),
            convergence: convergence_score(&distribution),
            distribution,
            stage: state.controller.stage(),
            questions: state.controller.total_questions(),
            completion: state.controller.completion(),
        }
    }

    // -- Internals -----------------------------------------------------------

    fn schedule_axis(&self) -> Option<Axis> {
        let active: Vec<Axis> = Axis::ALL
            .iter()
            .copied()
            .filter(|a| !self.axes[a.index()].controller.is_completed())
            .collect();
        match (self.config.schedule, active.as_slice()) {
            (_, []) => None,
            (_, [only]) => Some(*only),
            (AxisSchedule::Sequential, [first, ..]) => Some(*first),
            (AxisSchedule::Alternating, [first, ..]) => match self.last_axis {
                Some(last) => Some(last.other()),
                None => Some(*first),
            },
        }
    }

    fn exhaust_axis(&mut self, axis: Axis) {
        if let Some(t) = self.axes[axis.index()].controller.exhaust() {
            self.emit_transition(axis, t);
        }
    }

    fn emit_transition(&self, axis: Axis, t: StageTransition) {
        self.emit(SessionEvent::StageTransitioned {
            session_id: self.id,
            at: Utc::now(),
            axis,
            from: t.from,
            to: t.to,
            cause: t.cause,
            questions_in_stage: t.questions_in_stage,
        });
        if t.to.is_terminal() {
            let summary = self.axis_summary(axis);
            self.emit(SessionEvent::AxisCompleted {
                session_id: self.id,
                at: Utc::now(),
                axis,
                archetype: summary.archetype,
                probability: summary.probability,
                reason: t.cause,
                total_questions: summary.questions,
            });
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(err) = self.observer.on_event(&event) {
            tracing::warn!(
                session_id = %self.id,
                event = event.kind(),
                error = %err,
                "session observer failed"
            );
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("started_at", &self.started_at)
            .field("intrinsic", &self.stage(Axis::Intrinsic))
            .field("external", &self.stage(Axis::External))
            .field("answers", &self.answers.len())
            .field("pending", &self.pending_item())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::defaults::default_catalog;

    fn session() -> Session {
        Session::new(Arc::new(default_catalog()), EngineConfig::default()).unwrap()
    }

    #[test]
    fn pending_item_is_reissued_until_answered() {
        let mut s = session();
        let first = s.next_item().into_item().unwrap();
        let again = s.next_item().into_item().unwrap();
        assert_eq!(first.item_id, again.item_id);
        assert_eq!(first.options.len(), 4);
        assert_eq!(s.pending_item(), Some(first.item_id.as_str()));
    }

    #[test]
    fn rejected_answers_leave_state_untouched() {
        let mut s = session();
        assert_eq!(
            s.record_answer("in-x1", OptionKey::A),
            Err(SessionError::NoPendingItem)
        );

        let issued = s.next_item().into_item().unwrap();
        let other = if issued.item_id == "ex-x1" { "in-x1" } else { "ex-x1" };
        let before = *s.distribution(Axis::Intrinsic);

        assert!(matches!(
            s.record_answer(other, OptionKey::A),
            Err(SessionError::StaleAnswer { .. })
        ));
        assert_eq!(
            s.record_answer("missing", OptionKey::A),
            Err(SessionError::UnknownItem("missing".to_string()))
        );
        assert!(matches!(
            s.record_answer_str(&issued.item_id, "E"),
            Err(SessionError::UnknownOption { .. })
        ));
        assert_eq!(*s.distribution(Axis::Intrinsic), before);
        assert!(s.answers().is_empty());
        assert_eq!(s.pending_item(), Some(issued.item_id.as_str()));

        s.record_answer_str(&issued.item_id, "b").unwrap();
        assert_eq!(s.answers().len(), 1);
        assert_eq!(s.answers()[0].option, OptionKey::B);
        assert!(s.pending_item().is_none());
    }

    #[test]
    fn alternating_schedule_switches_axes() {
        let catalog = Arc::new(default_catalog());
        let mut s = Session::new(Arc::clone(&catalog), EngineConfig::default()).unwrap();
        let mut axes = Vec::new();
        for _ in 0..4 {
            let view = s.next_item().into_item().unwrap();
            axes.push(catalog.get(&view.item_id).unwrap().axis);
            s.record_answer(&view.item_id, OptionKey::A).unwrap();
        }
        assert_eq!(
            axes,
            vec![Axis::Intrinsic, Axis::External, Axis::Intrinsic, Axis::External]
        );
    }

    #[test]
    fn result_requires_completion() {
        let s = session();
        assert_eq!(s.result().unwrap_err(), SessionError::NotComplete);
        let summary = s.axis_summary(Axis::External);
        assert_eq!(summary.stage, Stage::Exploration);
        assert_eq!(summary.archetype, Archetype::Qian);
    }
}
