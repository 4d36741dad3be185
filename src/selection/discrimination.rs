use crate::archetype::{Archetype, Stage};
use crate::catalog::Item;

use super::{ItemScore, SelectionContext, SelectionStrategy};

/// Separate the leading archetypes: `0.7 * power(top3) + 0.3 * gain`.
#[derive(Debug, Clone)]
pub struct DiscriminationStrategy {
    pub power_weight: f64,
    pub gain_weight: f64,
    /// How many leading archetypes to separate.
    pub contenders: usize,
}

impl Default for DiscriminationStrategy {
    fn default() -> Self {
        Self {
            power_weight: 0.7,
            gain_weight: 0.3,
            contenders: 3,
        }
    }
}

/// Mean over options of the population variance of the option's impacts
/// restricted to `archetypes`.
pub fn discrimination_power(item: &Item, archetypes: &[Archetype]) -> f64 {
    if archetypes.len() < 2 {
        return 0.0;
    }
    let n = archetypes.len() as f64;
    let total: f64 = item
        .options
        .iter()
        .map(|option| {
            let values: Vec<f64> = archetypes.iter().map(|&a| option.impact(a)).collect();
            if values.iter().any(|v| !v.is_finite()) {
                return 0.0;
            }
            let mean = values.iter().sum::<f64>() / n;
            values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
        })
        .sum();
    total / item.options.len() as f64
}

impl SelectionStrategy for DiscriminationStrategy {
    fn stage(&self) -> Stage {
        Stage::Discrimination
    }

    fn score(&self, item: &Item, ctx: &SelectionContext<'_>) -> ItemScore {
        let top = ctx.state.distribution().top_n(self.contenders);
        let information_gain = ctx.information_gain(item);
        ItemScore {
            score: self.power_weight * discrimination_power(item, &top)
                + self.gain_weight * information_gain,
            information_gain,
        }
    }
}
