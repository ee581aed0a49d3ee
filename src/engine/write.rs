//! Event application pipeline — the write engine.

use serde::Serialize;

use crate::model::ModelState;
use crate::types::{InteractionEvent, ItemIdx, SlimError, SlimResult, UserIdx};

use super::learner::{Learner, StepReport};

/// Result of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitReport {
    /// Interned user index.
    pub user: UserIdx,
    /// Interned item index.
    pub item: ItemIdx,
    /// Aggregated weight of the pair after the event.
    pub weight: f32,
    /// Whether the pair was new.
    pub created: bool,
    /// What the learner did.
    pub learning: StepReport,
}

/// Result of applying a batch of events.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Events applied.
    pub applied: usize,
    /// Rejected events by position in the batch.
    pub rejected: Vec<(usize, SlimError)>,
    /// Coefficient updates discarded as unstable.
    pub dropped_updates: usize,
    /// Snapshots published while processing the batch.
    pub snapshots_published: usize,
}

impl BatchReport {
    /// Fold one event outcome into the report.
    pub fn record(&mut self, index: usize, outcome: SlimResult<FitReport>) {
        match outcome {
            Ok(report) => {
                self.applied += 1;
                self.dropped_updates += report.learning.dropped;
            }
            Err(e) => self.rejected.push((index, e)),
        }
    }
}

/// Applies events to a model state: validate, aggregate, learn.
pub struct WriteEngine;

impl WriteEngine {
    /// Create a new write engine.
    pub fn new() -> Self {
        Self
    }

    /// Apply one event as a unit.
    ///
    /// All validation (identifiers, weight, ordering) happens before the
    /// first mutation, so a rejected event leaves the state untouched.
    pub fn apply(
        &self,
        state: &mut ModelState,
        learner: &mut Learner,
        event: &InteractionEvent,
    ) -> SlimResult<FitReport> {
        if let Err(e) = event.validate() {
            log::debug!("Rejecting malformed event: {}", e);
            return Err(e);
        }

        if let (Some(user), Some(item)) = (
            state.users().get(&event.user_id),
            state.items().get(&event.item_id),
        ) {
            if let Some(stored) = state.store().check_order(user, item, event.timestamp) {
                log::warn!(
                    "Rejecting out-of-order event for ({}, {}): {} < {}",
                    event.user_id,
                    event.item_id,
                    event.timestamp,
                    stored
                );
                return Err(SlimError::OutOfOrder {
                    user: event.user_id.clone(),
                    item: event.item_id.clone(),
                    timestamp: event.timestamp,
                    stored,
                });
            }
        }

        let user = state.intern_user(&event.user_id);
        let item = state.intern_item(&event.item_id);
        let outcome = state
            .store
            .record(user, item, event.raw_weight, event.timestamp)?;

        let learning = learner.learn(
            &state.store,
            &mut state.matrix,
            user,
            item,
            event.timestamp,
        );

        Ok(FitReport {
            user,
            item,
            weight: outcome.weight,
            created: outcome.created,
            learning,
        })
    }
}

impl Default for WriteEngine {
    fn default() -> Self {
        Self::new()
    }
}
