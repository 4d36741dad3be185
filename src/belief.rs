//! Belief state over the eight archetypes of one axis, and the Bayesian
//! update that moves it.
//!
//! The update multiplies every archetype by the chosen option's impact
//! coefficient raised to an item-dependent weight, renormalises, and then
//! blends the raw posterior into the prior through a momentum step:
//!
//! ```text
//! raw[A]      = prior[A] * impact[A]^w / Z
//! velocity[A] = momentum * velocity[A] + learning_rate * (raw[A] - prior[A])
//! next[A]     = prior[A] + velocity[A] + regularization * (1/8 - prior[A])
//! next        = renormalise(clamp(next, floor, 1 - floor))
//! ```
//!
//! Collapses (non-positive coefficients, vanishing mass) reset the axis to
//! uniform instead of producing zeros or NaN.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::archetype::{Archetype, ARCHETYPE_COUNT};
use crate::config::UpdateConfig;

const UNIFORM: f64 = 1.0 / ARCHETYPE_COUNT as f64;

// ---------------------------------------------------------------------
//  Distribution
// ---------------------------------------------------------------------

/// Categorical distribution over the eight archetypes.
///
/// Values sum to 1 and stay strictly inside (0, 1) for every reachable
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeliefDistribution {
    probs: [f64; ARCHETYPE_COUNT],
}

impl Default for BeliefDistribution {
    fn default() -> Self {
        Self::uniform()
    }
}

impl BeliefDistribution {
    pub fn uniform() -> Self {
        Self {
            probs: [UNIFORM; ARCHETYPE_COUNT],
        }
    }

    /// Normalise non-negative weights into a distribution.
    ///
    /// Returns `None` when any weight is negative or non-finite, or when the
    /// total is not positive.
    pub fn from_weights(weights: [f64; ARCHETYPE_COUNT]) -> Option<Self> {
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return None;
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return None;
        }
        let mut probs = weights;
        for p in probs.iter_mut() {
            *p /= total;
        }
        Some(Self { probs })
    }

    pub fn probabilities(&self) -> &[f64; ARCHETYPE_COUNT] {
        &self.probs
    }

    pub fn get(&self, archetype: Archetype) -> f64 {
        self.probs[archetype.index()]
    }

    pub fn sum(&self) -> f64 {
        self.probs.iter().sum()
    }

    /// Archetypes sorted by descending probability, ties by canonical order.
    pub fn ranked(&self) -> Vec<(Archetype, f64)> {
        let mut out: Vec<(Archetype, f64)> = Archetype::ALL
            .iter()
            .map(|&a| (a, self.probs[a.index()]))
            .collect();
        out.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        out
    }

    /// The arg-max archetype and its probability.
    pub fn top(&self) -> (Archetype, f64) {
        let mut best = 0usize;
        for i in 1..ARCHETYPE_COUNT {
            if self.probs[i] > self.probs[best] {
                best = i;
            }
        }
        (Archetype::ALL[best], self.probs[best])
    }

    /// The `n` most probable archetypes.
    pub fn top_n(&self, n: usize) -> Vec<Archetype> {
        self.ranked().into_iter().take(n).map(|(a, _)| a).collect()
    }

    /// Top probability minus the runner-up.
    pub fn confidence(&self) -> f64 {
        let ranked = self.ranked();
        (ranked[0].1 - ranked[1].1).max(0.0)
    }

    fn is_well_formed(&self) -> bool {
        (self.sum() - 1.0).abs() <= 1e-9
            && self
                .probs
                .iter()
                .all(|p| p.is_finite() && *p > 0.0 && *p < 1.0)
    }
}

// ---------------------------------------------------------------------
//  Update
// ---------------------------------------------------------------------

/// Why an update fell back to uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollapseReason {
    /// The option carries a zero, negative or non-finite coefficient.
    InvalidCoefficient,
    /// The tempered posterior mass vanished.
    VanishingMass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdateOutcome {
    Applied,
    Reset { reason: CollapseReason },
}

/// Likelihood tempering exponent for an item.
///
/// A neutral item (information value 0.5, difficulty 0.5) yields 1.
pub fn update_weight(information_value: f64, difficulty: f64, cfg: &UpdateConfig) -> f64 {
    let iv = sanitize_unit(information_value);
    let d = sanitize_unit(difficulty);
    let w = 1.0 + cfg.information_value_gain * (iv - 0.5) + cfg.difficulty_gain * (d - 0.5);
    w.clamp(cfg.min_weight, cfg.max_weight)
}

fn sanitize_unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Tempered Bayes step without momentum, or the reason it collapses.
pub fn raw_posterior(
    prior: &BeliefDistribution,
    coefficients: &[f64; ARCHETYPE_COUNT],
    weight: f64,
    cfg: &UpdateConfig,
) -> Result<BeliefDistribution, CollapseReason> {
    if coefficients.iter().any(|c| !c.is_finite() || *c <= 0.0) {
        return Err(CollapseReason::InvalidCoefficient);
    }
    let mut unnorm = [0.0; ARCHETYPE_COUNT];
    for (i, u) in unnorm.iter_mut().enumerate() {
        *u = prior.probs[i] * coefficients[i].powf(weight);
    }
    let total: f64 = unnorm.iter().sum();
    if !total.is_finite() || total <= cfg.collapse_epsilon {
        return Err(CollapseReason::VanishingMass);
    }
    BeliefDistribution::from_weights(unnorm).ok_or(CollapseReason::VanishingMass)
}

/// Distribution plus the per-archetype velocity carried by the momentum step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeliefState {
    distribution: BeliefDistribution,
    velocity: [f64; ARCHETYPE_COUNT],
}

impl Default for BeliefState {
    fn default() -> Self {
        Self::initialize()
    }
}

impl BeliefState {
    /// Uniform belief with zero velocity.
    pub fn initialize() -> Self {
        Self {
            distribution: BeliefDistribution::uniform(),
            velocity: [0.0; ARCHETYPE_COUNT],
        }
    }

    pub fn distribution(&self) -> &BeliefDistribution {
        &self.distribution
    }

    pub fn velocity(&self) -> &[f64; ARCHETYPE_COUNT] {
        &self.velocity
    }

    /// Compute the state after observing an option, leaving `self` untouched.
    pub fn updated(
        &self,
        coefficients: &[f64; ARCHETYPE_COUNT],
        weight: f64,
        cfg: &UpdateConfig,
    ) -> (BeliefState, UpdateOutcome) {
        let raw = match raw_posterior(&self.distribution, coefficients, weight, cfg) {
            Ok(raw) => raw,
            Err(reason) => {
                return (BeliefState::initialize(), UpdateOutcome::Reset { reason });
            }
        };

        let prior = &self.distribution.probs;
        let floor = cfg.probability_floor;
        let mut velocity = [0.0; ARCHETYPE_COUNT];
        let mut next = [0.0; ARCHETYPE_COUNT];
        for i in 0..ARCHETYPE_COUNT {
            velocity[i] =
                cfg.momentum * self.velocity[i] + cfg.learning_rate * (raw.probs[i] - prior[i]);
            let v = prior[i] + velocity[i] + cfg.regularization * (UNIFORM - prior[i]);
            next[i] = v.clamp(floor, 1.0 - floor);
        }

        match BeliefDistribution::from_weights(next) {
            Some(distribution) if distribution.is_well_formed() => (
                BeliefState {
                    distribution,
                    velocity,
                },
                UpdateOutcome::Applied,
            ),
            _ => (
                BeliefState::initialize(),
                UpdateOutcome::Reset {
                    reason: CollapseReason::VanishingMass,
                },
            ),
        }
    }

    /// In-place variant of [`BeliefState::updated`].
    pub fn update(
        &mut self,
        coefficients: &[f64; ARCHETYPE_COUNT],
        weight: f64,
        cfg: &UpdateConfig,
    ) -> UpdateOutcome {
        let (next, outcome) = self.updated(coefficients, weight, cfg);
        *self = next;
        outcome
    }
}
