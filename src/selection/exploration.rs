use crate::archetype::{Stage, ARCHETYPE_COUNT};
use crate::catalog::Item;
use crate::information::{peak_profile, shannon_entropy, MAX_ENTROPY};

use super::{ItemScore, SelectionContext, SelectionStrategy};

/// Broad early questions: `0.6 * gain + 0.4 * diversity`.
#[derive(Debug, Clone)]
pub struct ExplorationStrategy {
    pub gain_weight: f64,
    pub diversity_weight: f64,
}

impl Default for ExplorationStrategy {
    fn default() -> Self {
        Self {
            gain_weight: 0.6,
            diversity_weight: 0.4,
        }
    }
}

/// How broadly an item's options spread across the archetypes, in [0, 1].
///
/// Coverage is the share of archetypes that some option favours (impact
/// above that option's own mean). Balance is the normalised entropy of the
/// per-archetype peak impacts. An item whose options each single out a
/// different pair of archetypes scores 1; a flat item scores 0.
pub fn diversity_score(item: &Item) -> f64 {
    let mut favoured = [false; ARCHETYPE_COUNT];
    for option in &item.options {
        let finite: Vec<f64> = option
            .impacts
            .iter()
            .map(|c| if c.is_finite() { *c } else { 0.0 })
            .collect();
        let mean = finite.iter().sum::<f64>() / ARCHETYPE_COUNT as f64;
        for (flag, c) in favoured.iter_mut().zip(finite.iter()) {
            if *c > mean + 1e-12 {
                *flag = true;
            }
        }
    }
    let coverage = favoured.iter().filter(|f| **f).count() as f64 / ARCHETYPE_COUNT as f64;

    let peaks = peak_profile(item);
    let total: f64 = peaks.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let shares: Vec<f64> = peaks.iter().map(|p| p / total).collect();
    let balance = (shannon_entropy(&shares) / MAX_ENTROPY).clamp(0.0, 1.0);

    coverage * balance
}

impl SelectionStrategy for ExplorationStrategy {
    fn stage(&self) -> Stage {
        Stage::Exploration
    }

    fn score(&self, item: &Item, ctx: &SelectionContext<'_>) -> ItemScore {
        let information_gain = ctx.information_gain(item);
        ItemScore {
            score: self.gain_weight * information_gain + self.diversity_weight * diversity_score(item),
            information_gain,
        }
    }
}
