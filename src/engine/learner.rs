//! Incremental SLIM learner with bounded-cost coordinate updates per event.

use serde::Serialize;

use crate::config::LearnerConfig;
use crate::index::InteractionStore;
use crate::model::CoefficientMatrix;
use crate::types::{ItemIdx, UserIdx};

use super::optimizer::Optimizer;

/// What one learning step did to the matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StepReport {
    /// Reconstruction residual of the event item's column, if a step ran.
    pub residual: Option<f32>,
    /// Coefficients written with a nonzero value.
    pub updated: usize,
    /// Coefficients driven to exactly zero and removed.
    pub removed: usize,
    /// Coordinates skipped for a negligible gradient.
    pub skipped_gradients: usize,
    /// Updates discarded as numerically unstable.
    pub dropped: usize,
}

/// Running learner counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LearnerStats {
    /// Learning steps taken (events with at least one co-occurring item).
    pub steps: u64,
    /// Sum of absolute column residuals since the last reset.
    pub cumulative_loss: f64,
    /// Steps counted in `cumulative_loss`.
    pub loss_steps: u64,
    /// Coefficient updates discarded as unstable.
    pub dropped_updates: u64,
    /// Events whose residual was not finite.
    pub skipped_events: u64,
}

/// Online approximation of the SLIM objective.
///
/// For an event on item `j` by user `u` with weights `r`:
///
/// - column step: `e_j = Σ_{k≠j} W[k][j]·r_k − r_j`, and each `W[k][j]` takes
///   an optimizer step on gradient `e_j·r_k`;
/// - row step (symmetric updates): for each `k ≠ j`,
///   `e_k = Σ_{m≠k} W[m][k]·r_m − r_k`, and `W[j][k]` steps on `e_k·r_j`.
///
/// Only items of `u` take part, capped at the neighbourhood limit, so the
/// cost per event is independent of the catalogue size.
#[derive(Debug, Clone)]
pub struct Learner {
    config: LearnerConfig,
    optimizer: Optimizer,
    stats: LearnerStats,
}

impl Learner {
    /// Create a learner for the given configuration.
    pub fn new(config: LearnerConfig) -> Self {
        Self {
            optimizer: Optimizer::from_config(&config),
            config,
            stats: LearnerStats::default(),
        }
    }

    /// Update the coefficients touched by `user`'s interaction with `item`.
    ///
    /// `now` is the event time; the store must already contain the event.
    pub fn learn(
        &mut self,
        store: &InteractionStore,
        matrix: &mut CoefficientMatrix,
        user: UserIdx,
        item: ItemIdx,
        now: u64,
    ) -> StepReport {
        let mut report = StepReport::default();

        let target = store.weight_at(user, item, now);
        let neighbors: Vec<(ItemIdx, f32)> = self
            .neighborhood(store, user, item)
            .into_iter()
            .map(|k| (k, store.weight_at(user, k, now)))
            .filter(|(_, r)| *r != 0.0)
            .collect();
        if neighbors.is_empty() {
            return report;
        }

        let predicted: f32 = neighbors
            .iter()
            .map(|&(k, r)| matrix.get(k, item) * r)
            .sum();
        let residual = predicted - target;
        if !residual.is_finite() {
            log::warn!(
                "Skipping update for user {} item {}: residual {} (predicted {}, actual {})",
                user,
                item,
                residual,
                predicted,
                target
            );
            self.stats.skipped_events += 1;
            return report;
        }
        report.residual = Some(residual);
        self.stats.steps += 1;
        self.stats.loss_steps += 1;
        self.stats.cumulative_loss += residual.abs() as f64;

        for &(k, r) in &neighbors {
            self.apply(matrix, k, item, residual * r, &mut report);
        }

        if self.config.symmetric_updates && target != 0.0 {
            for &(k, r_k) in &neighbors {
                let predicted_k: f32 = matrix.get(item, k) * target
                    + neighbors
                        .iter()
                        .filter(|(m, _)| *m != k)
                        .map(|&(m, r_m)| matrix.get(m, k) * r_m)
                        .sum::<f32>();
                let residual_k = predicted_k - r_k;
                if !residual_k.is_finite() {
                    log::warn!(
                        "Skipping row update W[{}][{}]: residual {}",
                        item,
                        k,
                        residual_k
                    );
                    report.dropped += 1;
                    self.stats.dropped_updates += 1;
                    continue;
                }
                self.apply(matrix, item, k, residual_k * target, &mut report);
            }
        }

        report
    }

    /// The user's items other than `item`, most recent first, capped at the limit.
    fn neighborhood(&self, store: &InteractionStore, user: UserIdx, item: ItemIdx) -> Vec<ItemIdx> {
        let limit = self.config.neighborhood_limit;
        // One extra slot covers `item` itself.
        let fetch = if limit == 0 { 0 } else { limit.saturating_add(1) };
        let mut others: Vec<ItemIdx> = store
            .recent_items(user, fetch)
            .into_iter()
            .filter(|&k| k != item)
            .collect();
        if limit > 0 {
            others.truncate(limit);
        }
        others
    }

    fn apply(
        &mut self,
        matrix: &mut CoefficientMatrix,
        row: ItemIdx,
        col: ItemIdx,
        grad: f32,
        report: &mut StepReport,
    ) {
        if grad.abs() <= self.config.gradient_epsilon {
            report.skipped_gradients += 1;
            return;
        }

        let current = matrix.get(row, col);
        let proposal = self
            .optimizer
            .propose(row, col, current, grad, self.stats.steps);
        let value = proposal.value;
        if !value.is_finite() || value.abs() > self.config.max_coefficient {
            log::warn!(
                "Dropping unstable update W[{}][{}]: {} -> {} (gradient {})",
                row,
                col,
                current,
                value,
                grad
            );
            report.dropped += 1;
            self.stats.dropped_updates += 1;
            return;
        }

        match matrix.set(row, col, value) {
            Ok(()) => {
                self.optimizer.commit(&proposal);
                if value != 0.0 {
                    report.updated += 1;
                } else if current != 0.0 {
                    report.removed += 1;
                }
            }
            Err(e) => {
                log::warn!("Dropping update W[{}][{}]: {}", row, col, e);
                report.dropped += 1;
                self.stats.dropped_updates += 1;
            }
        }
    }

    /// Running counters.
    pub fn stats(&self) -> LearnerStats {
        self.stats
    }

    /// Mean absolute residual since the last reset; optionally reset it.
    pub fn empirical_error(&mut self, reset: bool) -> f32 {
        let error = if self.stats.loss_steps == 0 {
            0.0
        } else {
            (self.stats.cumulative_loss / self.stats.loss_steps as f64) as f32
        };
        if reset {
            self.stats.cumulative_loss = 0.0;
            self.stats.loss_steps = 0;
        }
        error
    }

    /// The learner configuration.
    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }
}
