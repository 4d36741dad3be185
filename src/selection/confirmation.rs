use crate::archetype::{Archetype, Stage};
use crate::catalog::Item;

use super::{ItemScore, SelectionContext, SelectionStrategy};

/// Test the current leader: `gain * P(top) + 0.5 * power(top)`.
///
/// Items whose declared targets include the leader are preferred; the full
/// pool is used when none do.
#[derive(Debug, Clone)]
pub struct ConfirmationStrategy {
    pub power_weight: f64,
}

impl Default for ConfirmationStrategy {
    fn default() -> Self {
        Self { power_weight: 0.5 }
    }
}

/// Mean impact on `archetype` across the item's options.
pub fn confirmation_power(item: &Item, archetype: Archetype) -> f64 {
    let sum: f64 = item
        .options
        .iter()
        .map(|o| o.impact(archetype))
        .filter(|c| c.is_finite())
        .sum();
    sum / item.options.len() as f64
}

impl SelectionStrategy for ConfirmationStrategy {
    fn stage(&self) -> Stage {
        Stage::Confirmation
    }

    fn score(&self, item: &Item, ctx: &SelectionContext<'_>) -> ItemScore {
        let (top, p_top) = ctx.state.distribution().top();
        let information_gain = ctx.information_gain(item);
        ItemScore {
            score: information_gain * p_top + self.power_weight * confirmation_power(item, top),
            information_gain,
        }
    }

    fn narrow<'c>(&self, candidates: &[&'c Item], ctx: &SelectionContext<'_>) -> Vec<&'c Item> {
        let (top, _) = ctx.state.distribution().top();
        let targeted: Vec<&Item> = candidates
            .iter()
            .copied()
            .filter(|item| item.targets_archetype(top))
            .collect();
        if targeted.is_empty() {
            candidates.to_vec()
        } else {
            targeted
        }
    }
}
