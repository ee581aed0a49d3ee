//! Time decay of interaction weights.

use crate::config::DecayConfig;
use crate::types::{SlimError, SlimResult, MICROS_PER_SECOND};

/// Exponential decay `exp(-λ * age)`.
///
/// - `λ = 0` disables decay: every age maps to 1.0.
/// - The factor is continuous and non-increasing in age, equal to 1.0 at age 0.
/// - Ages are Unix-epoch microsecond differences; λ is configured per second.
/// - Results are floored at `f32::MIN_POSITIVE` so the factor stays in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decay {
    rate_per_micro: f64,
}

impl Decay {
    /// No decay.
    pub fn none() -> Self {
        Self {
            rate_per_micro: 0.0,
        }
    }

    /// Decay with an explicit rate λ per second.
    pub fn with_rate(per_second: f64) -> SlimResult<Self> {
        if !per_second.is_finite() || per_second < 0.0 {
            return Err(SlimError::InvalidConfig(format!(
                "decay rate must be finite and >= 0, got {per_second}"
            )));
        }
        Ok(Self {
            rate_per_micro: per_second / MICROS_PER_SECOND,
        })
    }

    /// Decay that halves a weight every `seconds`.
    pub fn with_half_life(seconds: f64) -> SlimResult<Self> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(SlimError::InvalidConfig(format!(
                "decay half-life must be finite and > 0, got {seconds}"
            )));
        }
        Self::with_rate(std::f64::consts::LN_2 / seconds)
    }

    /// Build from the configuration section.
    pub fn from_config(config: &DecayConfig) -> SlimResult<Self> {
        match *config {
            DecayConfig::None => Ok(Self::none()),
            DecayConfig::Rate { per_second } => Self::with_rate(per_second),
            DecayConfig::HalfLife { seconds } => Self::with_half_life(seconds),
        }
    }

    /// λ per second.
    pub fn rate_per_second(&self) -> f64 {
        self.rate_per_micro * MICROS_PER_SECOND
    }

    /// Whether any decay is applied.
    pub fn is_enabled(&self) -> bool {
        self.rate_per_micro > 0.0
    }

    /// Weight multiplier for an event of the given age. Negative ages are invalid input.
    pub fn factor(&self, age_micros: i64) -> SlimResult<f32> {
        if age_micros < 0 {
            return Err(SlimError::NegativeAge(age_micros));
        }
        Ok(self.factor_for(age_micros as u64))
    }

    /// Multiplier for moving a weight stamped at `from` forward to `to`.
    pub fn between(&self, from: u64, to: u64) -> SlimResult<f32> {
        match to.checked_sub(from) {
            Some(age) => Ok(self.factor_for(age)),
            None => Err(SlimError::NegativeAge(-((from - to).min(i64::MAX as u64) as i64))),
        }
    }

    /// Read-time projection of `value` stamped at `from` to the clock `to`.
    /// A clock behind the stamp counts as age zero.
    pub fn project(&self, value: f32, from: u64, to: u64) -> f32 {
        value * self.factor_for(to.saturating_sub(from))
    }

    fn factor_for(&self, age_micros: u64) -> f32 {
        if !self.is_enabled() || age_micros == 0 {
            return 1.0;
        }
        let f = (-self.rate_per_micro * age_micros as f64).exp() as f32;
        f.max(f32::MIN_POSITIVE)
    }
}

impl Default for Decay {
    fn default() -> Self {
        Self::none()
    }
}
