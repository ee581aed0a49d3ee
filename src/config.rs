//! Model configuration with TOML persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{SlimError, SlimResult};

/// Complete model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SlimConfig {
    /// Time decay of interaction weights
    pub decay: DecayConfig,

    /// Coefficient learner configuration
    pub learner: LearnerConfig,

    /// Interaction store configuration
    pub store: StoreConfig,

    /// Snapshot publication configuration
    pub coordinator: CoordinatorConfig,
}

/// How interaction weights decay with age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecayConfig {
    /// Weights never decay.
    #[default]
    None,
    /// `exp(-per_second * age_seconds)`.
    Rate { per_second: f64 },
    /// Weight halves every `seconds`.
    HalfLife { seconds: f64 },
}

/// Coefficient update rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    /// FTRL-Proximal with per-coordinate adaptive learning rates.
    Ftrl { alpha: f32, beta: f32 },
    /// Proximal gradient step with a global learning-rate schedule.
    Sgd { learning_rate: LearningRate },
}

/// Learning-rate schedule for the proximal SGD rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LearningRate {
    /// Fixed step size.
    Constant { eta: f32 },
    /// `initial / (1 + step)^power`.
    InverseScaling { initial: f32, power: f32 },
}

impl LearningRate {
    /// Step size at the given learner step.
    pub fn at(&self, step: u64) -> f32 {
        match *self {
            LearningRate::Constant { eta } => eta,
            LearningRate::InverseScaling { initial, power } => {
                initial / (1.0 + step as f32).powf(power)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// L1 (sparsity) regularization strength
    pub l1: f32,

    /// L2 (ridge) regularization strength
    pub l2: f32,

    /// Update rule
    pub optimizer: OptimizerConfig,

    /// Updates producing |w| above this are discarded
    pub max_coefficient: f32,

    /// Only the N most recently touched items of a user take part in an
    /// update; 0 means the whole interaction set
    pub neighborhood_limit: usize,

    /// Also update the triggering item's row, not only its column
    pub symmetric_updates: bool,

    /// Gradients with magnitude at or below this are skipped
    pub gradient_epsilon: f32,
}

/// How a new event combines with an existing aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Re-base the aggregate and add the new weight.
    #[default]
    Accumulate,
    /// Overwrite the aggregate with the new weight.
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Ceiling applied to every aggregated weight
    pub max_weight: f32,

    /// Accumulate or replace on repeat interactions
    pub aggregation: AggregationMode,

    /// Late events within this window are accepted without rewinding time
    pub skew_tolerance_micros: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Publish a fresh snapshot after this many applied events
    pub publish_interval: usize,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            l1: 0.0002,
            l2: 0.0001,
            optimizer: OptimizerConfig::Ftrl {
                alpha: 0.5,
                beta: 1.0,
            },
            max_coefficient: 1_000.0,
            neighborhood_limit: 20,
            symmetric_updates: true,
            gradient_epsilon: 1e-6,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_weight: 10.0,
            aggregation: AggregationMode::Accumulate,
            skew_tolerance_micros: 1_000_000,
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            publish_interval: 1,
        }
    }
}

impl SlimConfig {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> SlimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> SlimResult<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> SlimResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty TOML.
    pub fn to_toml_string(&self) -> SlimResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject configurations the model cannot run with.
    pub fn validate(&self) -> SlimResult<()> {
        match self.decay {
            DecayConfig::None => {}
            DecayConfig::Rate { per_second } => {
                ensure(per_second.is_finite() && per_second >= 0.0, || {
                    format!("decay rate must be finite and >= 0, got {per_second}")
                })?;
            }
            DecayConfig::HalfLife { seconds } => {
                ensure(seconds.is_finite() && seconds > 0.0, || {
                    format!("decay half-life must be finite and > 0, got {seconds}")
                })?;
            }
        }

        let l = &self.learner;
        ensure(non_negative(l.l1), || format!("l1 must be >= 0, got {}", l.l1))?;
        ensure(non_negative(l.l2), || format!("l2 must be >= 0, got {}", l.l2))?;
        ensure(l.max_coefficient.is_finite() && l.max_coefficient > 0.0, || {
            format!("max_coefficient must be > 0, got {}", l.max_coefficient)
        })?;
        ensure(non_negative(l.gradient_epsilon), || {
            format!("gradient_epsilon must be >= 0, got {}", l.gradient_epsilon)
        })?;
        match l.optimizer {
            OptimizerConfig::Ftrl { alpha, beta } => {
                ensure(alpha.is_finite() && alpha > 0.0, || {
                    format!("ftrl alpha must be > 0, got {alpha}")
                })?;
                ensure(beta.is_finite() && beta > 0.0, || {
                    format!("ftrl beta must be > 0, got {beta}")
                })?;
            }
            OptimizerConfig::Sgd { learning_rate } => match learning_rate {
                LearningRate::Constant { eta } => {
                    ensure(eta.is_finite() && eta > 0.0, || {
                        format!("learning rate must be > 0, got {eta}")
                    })?;
                }
                LearningRate::InverseScaling { initial, power } => {
                    ensure(initial.is_finite() && initial > 0.0, || {
                        format!("initial learning rate must be > 0, got {initial}")
                    })?;
                    ensure(non_negative(power), || {
                        format!("learning rate power must be >= 0, got {power}")
                    })?;
                }
            },
        }

        let s = &self.store;
        ensure(s.max_weight.is_finite() && s.max_weight > 0.0, || {
            format!("max_weight must be > 0, got {}", s.max_weight)
        })?;

        ensure(self.coordinator.publish_interval >= 1, || {
            "publish_interval must be at least 1".to_string()
        })?;

        Ok(())
    }
}

fn non_negative(v: f32) -> bool {
    v.is_finite() && v >= 0.0
}

fn ensure(ok: bool, message: impl FnOnce() -> String) -> SlimResult<()> {
    if ok {
        Ok(())
    } else {
        Err(SlimError::InvalidConfig(message()))
    }
}
