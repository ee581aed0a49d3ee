//! Per-coefficient update rules with L1/L2 regularization.

use crate::config::{LearnerConfig, LearningRate, OptimizerConfig};
use crate::index::SparseRow;
use crate::types::ItemIdx;

/// FTRL accumulators for one coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FtrlSlot {
    /// Sum of adjusted gradients.
    pub z: f32,
    /// Sum of squared gradients.
    pub n: f32,
}

/// A computed but not yet committed coefficient update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proposal {
    pub row: ItemIdx,
    pub col: ItemIdx,
    /// The new coefficient value.
    pub value: f32,
    slot: Option<FtrlSlot>,
}

/// Update rule for a single coefficient, selected by configuration.
#[derive(Debug, Clone)]
pub enum Optimizer {
    Ftrl(Ftrl),
    Sgd(ProximalSgd),
}

impl Optimizer {
    /// Build the configured rule.
    pub fn from_config(config: &LearnerConfig) -> Self {
        match config.optimizer {
            OptimizerConfig::Ftrl { alpha, beta } => Optimizer::Ftrl(Ftrl {
                alpha,
                beta,
                l1: config.l1,
                l2: config.l2,
                slots: Vec::new(),
            }),
            OptimizerConfig::Sgd { learning_rate } => Optimizer::Sgd(ProximalSgd {
                learning_rate,
                l1: config.l1,
                l2: config.l2,
            }),
        }
    }

    /// Compute the update for `W[row][col]` given its current value and gradient.
    /// Nothing changes until `commit` is called.
    pub fn propose(
        &self,
        row: ItemIdx,
        col: ItemIdx,
        current: f32,
        grad: f32,
        step: u64,
    ) -> Proposal {
        match self {
            Optimizer::Ftrl(ftrl) => ftrl.propose(row, col, current, grad),
            Optimizer::Sgd(sgd) => Proposal {
                row,
                col,
                value: sgd.step(current, grad, step),
                slot: None,
            },
        }
    }

    /// Keep the optimizer state of an accepted proposal.
    pub fn commit(&mut self, proposal: &Proposal) {
        if let (Optimizer::Ftrl(ftrl), Some(slot)) = (self, proposal.slot) {
            ftrl.store(proposal.row, proposal.col, slot);
        }
    }
}

/// FTRL-Proximal (McMahan et al.) with per-coordinate learning rates.
///
/// The coefficient is a closed-form function of the accumulators:
/// `w = 0` when `|z| <= l1`, else `-(z - sgn(z)·l1) / ((beta + sqrt(n)) / alpha + l2)`.
#[derive(Debug, Clone)]
pub struct Ftrl {
    alpha: f32,
    beta: f32,
    l1: f32,
    l2: f32,
    /// Kept after a coefficient is thresholded to zero; grows with the
    /// co-occurring pairs ever updated.
    slots: Vec<SparseRow<FtrlSlot>>,
}

impl Ftrl {
    fn propose(&self, row: ItemIdx, col: ItemIdx, current: f32, grad: f32) -> Proposal {
        let slot = self
            .slot(row, col)
            .unwrap_or_else(|| self.warm_start(current));
        let n = slot.n + grad * grad;
        let sigma = (n.sqrt() - slot.n.sqrt()) / self.alpha;
        let z = slot.z + grad - sigma * current;
        let next = FtrlSlot { z, n };
        Proposal {
            row,
            col,
            value: self.weight(next),
            slot: Some(next),
        }
    }

    /// Accumulators that reproduce `w` exactly, for coefficients without
    /// state (fresh entries and imported models).
    fn warm_start(&self, w: f32) -> FtrlSlot {
        if w == 0.0 {
            return FtrlSlot::default();
        }
        let denom = self.beta / self.alpha + self.l2;
        FtrlSlot {
            z: -w * denom - w.signum() * self.l1,
            n: 0.0,
        }
    }

    fn weight(&self, slot: FtrlSlot) -> f32 {
        if slot.z.abs() <= self.l1 {
            return 0.0;
        }
        let denom = (self.beta + slot.n.sqrt()) / self.alpha + self.l2;
        -(slot.z - slot.z.signum() * self.l1) / denom
    }

    fn slot(&self, row: ItemIdx, col: ItemIdx) -> Option<FtrlSlot> {
        self.slots.get(row as usize).and_then(|r| r.get(col))
    }

    fn store(&mut self, row: ItemIdx, col: ItemIdx, slot: FtrlSlot) {
        let needed = row as usize + 1;
        if self.slots.len() < needed {
            self.slots.resize_with(needed, SparseRow::new);
        }
        self.slots[row as usize].upsert(col, slot);
    }
}

/// Proximal gradient step: `soft(w - η(g + l2·w), η·l1)`.
#[derive(Debug, Clone)]
pub struct ProximalSgd {
    learning_rate: LearningRate,
    l1: f32,
    l2: f32,
}

impl ProximalSgd {
    fn step(&self, current: f32, grad: f32, step: u64) -> f32 {
        let eta = self.learning_rate.at(step);
        soft_threshold(current - eta * (grad + self.l2 * current), eta * self.l1)
    }
}

/// `sgn(x) · max(|x| - t, 0)`; drives small values to exactly zero.
pub fn soft_threshold(x: f32, t: f32) -> f32 {
    if x > t {
        x - t
    } else if x < -t {
        x + t
    } else {
        0.0
    }
}
