//! Capability interface over recommendation algorithm families.

use crate::engine::query::{RecommendOptions, Recommendation};
use crate::engine::write::FitReport;
use crate::types::{InteractionEvent, SlimResult};

/// Read side of a published model view.
pub trait Scorer {
    /// Ranked items for a user; empty for unknown or cold users.
    fn recommend(
        &self,
        user_id: &str,
        top_n: usize,
        options: &RecommendOptions,
    ) -> Vec<Recommendation>;
}

/// An online-trainable recommender the update coordinator can drive.
pub trait Recommender {
    /// Immutable view published to readers.
    type Snapshot: Scorer + Send + Sync;

    /// Apply one event atomically. On error nothing was applied.
    fn fit_event(&mut self, event: &InteractionEvent) -> SlimResult<FitReport>;

    /// Rank items for a user against the live (writer-side) state.
    fn score(&self, user_id: &str, top_n: usize, options: &RecommendOptions)
        -> Vec<Recommendation>;

    /// Freeze the current state as snapshot number `version`.
    fn snapshot(&self, version: u64) -> Self::Snapshot;
}
