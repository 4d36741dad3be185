//! Item selection: one strategy per questioning stage.
//!
//! - Exploration: information gain plus coverage of all archetypes
//! - Discrimination: separation of the current top three
//! - Confirmation: evidence for or against the current leader
//!
//! Every strategy picks the highest score; ties go to the smallest item id
//! so selection sequences are reproducible.

mod confirmation;
mod discrimination;
mod exploration;

use std::collections::HashSet;

use serde::Serialize;

pub use confirmation::ConfirmationStrategy;
pub use discrimination::DiscriminationStrategy;
pub use exploration::ExplorationStrategy;

use crate::archetype::{Axis, Stage};
use crate::belief::BeliefState;
use crate::catalog::{Catalog, Item};
use crate::information::Evaluator;

/// Inputs shared by every strategy for one selection.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub axis: Axis,
    pub stage: Stage,
    pub state: &'a BeliefState,
    pub evaluator: Evaluator<'a>,
}

impl SelectionContext<'_> {
    /// Information gain with small negatives (momentum, regularization)
    /// and reset-inducing items floored at zero.
    pub fn information_gain(&self, item: &Item) -> f64 {
        let gain = self.evaluator.information_gain(item, self.state);
        if gain.is_finite() {
            gain.max(0.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ItemScore {
    pub score: f64,
    pub information_gain: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoredItem<'c> {
    pub item: &'c Item,
    pub score: ItemScore,
}

pub trait SelectionStrategy: Send + Sync {
    fn stage(&self) -> Stage;

    fn score(&self, item: &Item, ctx: &SelectionContext<'_>) -> ItemScore;

    /// Restrict the candidates before scoring. Default keeps them all.
    fn narrow<'c>(&self, candidates: &[&'c Item], _ctx: &SelectionContext<'_>) -> Vec<&'c Item> {
        candidates.to_vec()
    }

    /// Best candidate, or `None` when there are no candidates.
    fn select<'c>(
        &self,
        candidates: &[&'c Item],
        ctx: &SelectionContext<'_>,
    ) -> Option<ScoredItem<'c>> {
        let narrowed = self.narrow(candidates, ctx);
        pick_best(narrowed.into_iter().map(|item| ScoredItem {
            item,
            score: self.score(item, ctx),
        }))
    }
}

/// Highest score wins; equal scores go to the smaller id. NaN never wins.
pub fn pick_best<'c>(scored: impl IntoIterator<Item = ScoredItem<'c>>) -> Option<ScoredItem<'c>> {
    let mut best: Option<ScoredItem<'c>> = None;
    for candidate in scored {
        let s = sanitize(candidate.score.score);
        best = match best {
            None => Some(candidate),
            Some(current) => {
                let b = sanitize(current.score.score);
                if s > b || (s == b && candidate.item.id < current.item.id) {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}

fn sanitize(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}

/// Unused items on `axis` tagged for `stage`, or every unused item on the
/// axis when none carry that tag.
pub fn candidate_pool<'c>(
    catalog: &'c Catalog,
    axis: Axis,
    stage: Stage,
    used: &HashSet<String>,
) -> Vec<&'c Item> {
    let unused: Vec<&Item> = catalog
        .for_axis(axis)
        .filter(|item| !used.contains(&item.id))
        .collect();
    let tagged: Vec<&Item> = unused
        .iter()
        .copied()
        .filter(|item| item.stage == Some(stage))
        .collect();
    if tagged.is_empty() {
        unused
    } else {
        tagged
    }
}

/// The three stage strategies.
#[derive(Debug, Clone, Default)]
pub struct Strategies {
    pub exploration: ExplorationStrategy,
    pub discrimination: DiscriminationStrategy,
    pub confirmation: ConfirmationStrategy,
}

impl Strategies {
    /// Strategy for a questioning stage; `None` for `Completed`.
    pub fn for_stage(&self, stage: Stage) -> Option<&dyn SelectionStrategy> {
        match stage {
            Stage::Exploration => Some(&self.exploration),
            Stage::Discrimination => Some(&self.discrimination),
            Stage::Confirmation => Some(&self.confirmation),
            Stage::Completed => None,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::item;
    use super::*;
    use crate::config::UpdateConfig;

    #[test]
    fn pool_prefers_stage_tag_and_falls_back() {
        let catalog = Catalog::new(vec![
            item("a", Some(Stage::Exploration), [[0.5; 8]; 4]),
            item("b", Some(Stage::Discrimination), [[0.5; 8]; 4]),
            item("c", None, [[0.5; 8]; 4]),
        ]);
        let mut used = HashSet::new();

        let pool = candidate_pool(&catalog, Axis::Intrinsic, Stage::Exploration, &used);
        assert_eq!(pool.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), ["a"]);

        used.insert("a".to_string());
        let pool = candidate_pool(&catalog, Axis::Intrinsic, Stage::Exploration, &used);
        assert_eq!(pool.len(), 2);

        assert!(candidate_pool(&catalog, Axis::External, Stage::Exploration, &used).is_empty());
    }

    #[test]
    fn ties_go_to_smallest_id() {
        let cfg = UpdateConfig::default();
        let state = BeliefState::initialize();
        let ctx = SelectionContext {
            axis: Axis::Intrinsic,
            stage: Stage::Exploration,
            state: &state,
            evaluator: Evaluator::new(&cfg),
        };
        let z = item("z", None, [[0.5; 8]; 4]);
        let m = item("m", None, [[0.5; 8]; 4]);
        let candidates = [&z, &m];
        let best = ExplorationStrategy::default()
            .select(&candidates, &ctx)
            .unwrap();
        assert_eq!(best.item.id, "m");
        assert!(ExplorationStrategy::default().select(&[], &ctx).is_none());
    }
}
