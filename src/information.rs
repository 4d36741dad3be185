//! Entropy and information-gain scoring.
//!
//! Everything here is side-effect free: expected posterior entropy is
//! computed by simulating the update on copies of the belief state.

use crate::archetype::{Archetype, ARCHETYPE_COUNT};
use crate::belief::{update_weight, BeliefDistribution, BeliefState};
use crate::catalog::{Item, OPTION_COUNT};
use crate::config::{OptionWeighting, UpdateConfig};
use crate::stats::ItemStats;

/// `log2(8)`: entropy of the uniform distribution over the archetypes.
pub const MAX_ENTROPY: f64 = 3.0;

const UNIFORM_OPTION: f64 = 1.0 / OPTION_COUNT as f64;

/// Shannon entropy in bits; zero and non-finite terms contribute nothing.
pub fn shannon_entropy(probs: &[f64]) -> f64 {
    probs
        .iter()
        .filter(|p| p.is_finite() && **p > 0.0)
        .map(|p| -p * p.log2())
        .sum()
}

pub fn entropy(distribution: &BeliefDistribution) -> f64 {
    shannon_entropy(distribution.probabilities())
}

/// Entropy scaled into [0, 1] by [`MAX_ENTROPY`].
pub fn normalized_entropy(distribution: &BeliefDistribution) -> f64 {
    (entropy(distribution) / MAX_ENTROPY).clamp(0.0, 1.0)
}

/// `max_p * (1 - H / log2(8))`.
pub fn convergence_score(distribution: &BeliefDistribution) -> f64 {
    let (_, max_p) = distribution.top();
    max_p * (1.0 - normalized_entropy(distribution))
}

/// Scores items against a belief state.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    update: &'a UpdateConfig,
    weighting: OptionWeighting,
    stats: Option<&'a ItemStats>,
}

impl<'a> Evaluator<'a> {
    pub fn new(update: &'a UpdateConfig) -> Self {
        Self {
            update,
            weighting: OptionWeighting::Uniform,
            stats: None,
        }
    }

    pub fn with_weighting(mut self, weighting: OptionWeighting) -> Self {
        self.weighting = weighting;
        self
    }

    /// Pick counts for [`OptionWeighting::Historical`]. Without them the
    /// historical mode degrades to uniform.
    pub fn with_stats(mut self, stats: &'a ItemStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn weighting(&self) -> OptionWeighting {
        self.weighting
    }

    /// Estimated P(option chosen) for each of the item's options.
    pub fn option_probabilities(&self, item: &Item, state: &BeliefState) -> [f64; OPTION_COUNT] {
        match self.weighting {
            OptionWeighting::Uniform => [UNIFORM_OPTION; OPTION_COUNT],
            OptionWeighting::Historical => match self.stats {
                Some(stats) => stats.smoothed_pick_rates(&item.id),
                None => [UNIFORM_OPTION; OPTION_COUNT],
            },
            OptionWeighting::Adaptive => predictive(item, state.distribution()),
        }
    }

    /// Probability-weighted entropy after each possible answer.
    pub fn expected_post_entropy(&self, item: &Item, state: &BeliefState) -> f64 {
        let weight = update_weight(item.information_value, item.difficulty, self.update);
        let probs = self.option_probabilities(item, state);

        item.options
            .iter()
            .zip(probs.iter())
            .map(|(option, p)| {
                let (next, _) = state.updated(&option.impacts, weight, self.update);
                p * entropy(next.distribution())
            })
            .sum()
    }

    /// Current entropy minus expected posterior entropy.
    ///
    /// May be slightly negative under momentum or regularization, and is
    /// clearly negative for items whose answers would reset the axis.
    pub fn information_gain(&self, item: &Item, state: &BeliefState) -> f64 {
        entropy(state.distribution()) - self.expected_post_entropy(item, state)
    }
}

/// `P(o) ∝ Σ_A p(A) * impact(o, A)`, uniform if that mass is not positive.
fn predictive(item: &Item, distribution: &BeliefDistribution) -> [f64; OPTION_COUNT] {
    let mut out = [0.0; OPTION_COUNT];
    for (slot, option) in out.iter_mut().zip(item.options.iter()) {
        *slot = Archetype::ALL
            .iter()
            .map(|&a| {
                let c = option.impact(a);
                let c = if c.is_finite() { c.max(0.0) } else { 0.0 };
                distribution.get(a) * c
            })
            .sum();
    }
    let total: f64 = out.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return [UNIFORM_OPTION; OPTION_COUNT];
    }
    for p in out.iter_mut() {
        *p /= total;
    }
    out
}

/// Per-archetype peak coefficient across the item's options.
pub(crate) fn peak_profile(item: &Item) -> [f64; ARCHETYPE_COUNT] {
    let mut peaks = [0.0f64; ARCHETYPE_COUNT];
    for option in &item.options {
        for (peak, c) in peaks.iter_mut().zip(option.impacts.iter()) {
            if c.is_finite() {
                *peak = peak.max(*c);
            }
        }
    }
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::Axis;
    use crate::catalog::{ItemOption, LocalizedText, OptionKey};

    fn item(impacts: [[f64; 8]; 4]) -> Item {
        Item {
            id: "t".to_string(),
            axis: Axis::Intrinsic,
            prompt: LocalizedText::default(),
            options: OptionKey::ALL.map(|key| ItemOption {
                key,
                text: LocalizedText::default(),
                impacts: impacts[key.index()],
            }),
            difficulty: 0.5,
            information_value: 0.5,
            stage: None,
            targets: Vec::new(),
        }
    }

    fn splitting_item() -> Item {
        let mut rows = [[0.2; 8]; 4];
        for (o, row) in rows.iter_mut().enumerate() {
            row[2 * o] = 0.9;
            row[2 * o + 1] = 0.9;
        }
        item(rows)
    }

    #[test]
    fn uniform_entropy_is_three_bits() {
        let d = BeliefDistribution::uniform();
        assert!((entropy(&d) - MAX_ENTROPY).abs() < 1e-12);
        assert!(convergence_score(&d).abs() < 1e-12);
        assert_eq!(shannon_entropy(&[1.0, 0.0]), 0.0);
    }

    #[test]
    fn informative_item_has_positive_gain() {
        let cfg = UpdateConfig::plain();
        let state = BeliefState::initialize();
        let gain = Evaluator::new(&cfg).information_gain(&splitting_item(), &state);
        assert!(gain > 0.1, "gain={gain}");
    }

    #[test]
    fn flat_item_has_no_gain() {
        let cfg = UpdateConfig::plain();
        let state = BeliefState::initialize();
        let gain = Evaluator::new(&cfg).information_gain(&item([[0.5; 8]; 4]), &state);
        assert!(gain.abs() < 1e-9, "gain={gain}");
    }

    #[test]
    fn evaluation_leaves_state_untouched() {
        let cfg = UpdateConfig::default();
        let mut state = BeliefState::initialize();
        state.update(&[0.9, 0.1, 0.7, 0.3, 0.5, 0.6, 0.2, 0.4], 1.0, &cfg);
        let snapshot = state;

        for weighting in [
            OptionWeighting::Uniform,
            OptionWeighting::Historical,
            OptionWeighting::Adaptive,
        ] {
            let eval = Evaluator::new(&cfg).with_weighting(weighting);
            let _ = eval.information_gain(&splitting_item(), &state);
            assert_eq!(state, snapshot);
        }
    }

    #[test]
    fn adaptive_weighting_follows_belief() {
        let cfg = UpdateConfig::plain();
        let mut state = BeliefState::initialize();
        let mut favour_qian = [0.1; 8];
        favour_qian[0] = 0.9;
        for _ in 0..3 {
            state.update(&favour_qian, 1.0, &cfg);
        }
        let probs = Evaluator::new(&cfg)
            .with_weighting(OptionWeighting::Adaptive)
            .option_probabilities(&splitting_item(), &state);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(probs[0] > probs[1] && probs[0] > probs[3]);
    }

    #[test]
    fn degenerate_item_scores_no_gain() {
        let cfg = UpdateConfig::default();
        let mut state = BeliefState::initialize();
        state.update(&[0.9, 0.1, 0.7, 0.3, 0.5, 0.6, 0.2, 0.4], 1.0, &cfg);
        let mut rows = [[0.5; 8]; 4];
        for row in rows.iter_mut() {
            row[5] = 0.0;
        }
        let gain = Evaluator::new(&cfg).information_gain(&item(rows), &state);
        assert!(gain < 0.0);
    }
}
