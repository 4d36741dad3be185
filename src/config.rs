//! Engine configuration: stage bounds, convergence thresholds, update
//! constants, option-probability estimation and axis scheduling.
//!
//! All sections deserialize with defaults, so a config file only needs the
//! keys it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::archetype::Stage;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------
//  Stages
// ---------------------------------------------------------------------

/// Exit conditions for one stage on one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageThresholds {
    /// Questions that must be answered in this stage before it can exit.
    pub min_questions: usize,
    /// Questions after which the stage exits regardless of confidence.
    pub max_questions: usize,
    /// Gap between the top and second probability that recent answers
    /// must strictly exceed.
    pub confidence_threshold: f64,
    /// Required `max_p * (1 - H / log2(8))`. `None` skips the check.
    /// Exploration never checks convergence.
    #[serde(default)]
    pub convergence_threshold: Option<f64>,
}

impl StageThresholds {
    pub fn new(
        min_questions: usize,
        max_questions: usize,
        confidence_threshold: f64,
        convergence_threshold: Option<f64>,
    ) -> Self {
        Self {
            min_questions,
            max_questions,
            confidence_threshold,
            convergence_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub exploration: StageThresholds,
    pub discrimination: StageThresholds,
    pub confirmation: StageThresholds,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            exploration: StageThresholds::new(2, 4, 0.15, None),
            discrimination: StageThresholds::new(2, 5, 0.3, Some(0.35)),
            confirmation: StageThresholds::new(2, 5, 0.5, Some(0.7)),
        }
    }
}

impl StageConfig {
    /// Thresholds for a questioning stage; `None` for `Completed`.
    pub fn thresholds(&self, stage: Stage) -> Option<&StageThresholds> {
        match stage {
            Stage::Exploration => Some(&self.exploration),
            Stage::Discrimination => Some(&self.discrimination),
            Stage::Confirmation => Some(&self.confirmation),
            Stage::Completed => None,
        }
    }
}

// ---------------------------------------------------------------------
//  Bayesian update
// ---------------------------------------------------------------------

/// Constants of the belief update.
///
/// `learning_rate = 1`, `momentum = 0`, `regularization = 0` recovers the
/// plain multiply-and-renormalise update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Fraction of the raw posterior step applied per answer.
    pub learning_rate: f64,
    /// Carry-over of the previous step (per archetype).
    pub momentum: f64,
    /// Pull toward uniform applied on every update.
    pub regularization: f64,
    /// Every probability is clamped into `[floor, 1 - floor]`.
    pub probability_floor: f64,
    /// Raw posterior mass at or below this is treated as a collapse.
    pub collapse_epsilon: f64,

    // -- Likelihood tempering ------------------------------------------------
    /// Weight added per unit of information value above 0.5.
    pub information_value_gain: f64,
    /// Weight added per unit of difficulty above 0.5.
    pub difficulty_gain: f64,
    pub min_weight: f64,
    pub max_weight: f64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.8,
            momentum: 0.2,
            regularization: 0.02,
            probability_floor: 1e-4,
            collapse_epsilon: 1e-12,
            information_value_gain: 0.5,
            difficulty_gain: 0.5,
            min_weight: 0.5,
            max_weight: 2.0,
        }
    }
}

impl UpdateConfig {
    /// Plain Bayesian update: no momentum, no regularization.
    pub fn plain() -> Self {
        Self {
            learning_rate: 1.0,
            momentum: 0.0,
            regularization: 0.0,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------
//  Policies
// ---------------------------------------------------------------------

/// How the evaluator estimates P(option chosen) when computing expected
/// posterior entropy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionWeighting {
    /// 1/4 per option.
    #[default]
    Uniform,
    /// Smoothed pick frequencies observed for the item across sessions.
    Historical,
    /// Predictive probability under the current belief.
    Adaptive,
}

/// Which axis asks the next question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisSchedule {
    /// Alternate item by item between the axes that are still active.
    #[default]
    Alternating,
    /// Finish every stage of the intrinsic axis before the external axis starts.
    Sequential,
}

// ---------------------------------------------------------------------
//  Engine
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub stages: StageConfig,
    /// Consecutive confidence measurements that must clear the threshold.
    pub stability_window: usize,
    pub update: UpdateConfig,
    pub option_weighting: OptionWeighting,
    pub schedule: AxisSchedule,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stages: StageConfig::default(),
            stability_window: 3,
            update: UpdateConfig::default(),
            option_weighting: OptionWeighting::Uniform,
            schedule: AxisSchedule::Alternating,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for stage in Stage::ACTIVE {
            // ACTIVE stages always have thresholds.
            let Some(t) = self.stages.thresholds(stage) else {
                continue;
            };
            if t.max_questions == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{stage}.max_questions must be >= 1"
                )));
            }
            if t.min_questions > t.max_questions {
                return Err(ConfigError::Invalid(format!(
                    "{stage}.min_questions ({}) exceeds max_questions ({})",
                    t.min_questions, t.max_questions
                )));
            }
            if !(0.0..=1.0).contains(&t.confidence_threshold) {
                return Err(ConfigError::Invalid(format!(
                    "{stage}.confidence_threshold must be in [0,1]"
                )));
            }
            if let Some(c) = t.convergence_threshold {
                if !(0.0..=1.0).contains(&c) {
                    return Err(ConfigError::Invalid(format!(
                        "{stage}.convergence_threshold must be in [0,1]"
                    )));
                }
            }
        }
        if self.stability_window == 0 {
            return Err(ConfigError::Invalid(
                "stability_window must be >= 1".to_string(),
            ));
        }

        let u = &self.update;
        if !(u.learning_rate > 0.0 && u.learning_rate <= 1.0) {
            return Err(ConfigError::Invalid(
                "update.learning_rate must be in (0,1]".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&u.momentum) {
            return Err(ConfigError::Invalid(
                "update.momentum must be in [0,1)".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&u.regularization) {
            return Err(ConfigError::Invalid(
                "update.regularization must be in [0,1)".to_string(),
            ));
        }
        // Eight values at the floor must still fit under a total of 1.
        if !(u.probability_floor > 0.0 && u.probability_floor < 0.125) {
            return Err(ConfigError::Invalid(
                "update.probability_floor must be in (0, 1/8)".to_string(),
            ));
        }
        if !(u.collapse_epsilon >= 0.0 && u.collapse_epsilon.is_finite()) {
            return Err(ConfigError::Invalid(
                "update.collapse_epsilon must be a finite value >= 0".to_string(),
            ));
        }
        if !(u.min_weight > 0.0 && u.min_weight <= u.max_weight && u.max_weight.is_finite()) {
            return Err(ConfigError::Invalid(
                "update weights must satisfy 0 < min_weight <= max_weight".to_string(),
            ));
        }
        Ok(())
    }
}
