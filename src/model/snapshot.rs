//! Immutable, point-in-time model views served to readers.

use serde::Serialize;

use crate::engine::query::{QueryEngine, RecommendOptions, Recommendation};
use crate::format::ModelExport;

use super::{ModelState, Scorer};

/// Size counters for a model view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    pub users: usize,
    pub items: usize,
    pub interactions: usize,
    pub coefficients: usize,
    pub latest_timestamp: u64,
}

/// A frozen model state. Never mutated after creation; readers hold it
/// through an `Arc` and it is freed when the last holder drops it.
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    state: ModelState,
    version: u64,
}

impl ModelSnapshot {
    pub(crate) fn new(state: ModelState, version: u64) -> Self {
        Self { state, version }
    }

    /// Publication sequence number (0 = the initial snapshot).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Latest event time included in this view.
    pub fn as_of(&self) -> u64 {
        self.state.store().latest_timestamp()
    }

    /// The frozen state.
    pub fn state(&self) -> &ModelState {
        &self.state
    }

    /// Score of one (user, item) pair at the snapshot clock.
    pub fn predict(&self, user_id: &str, item_id: &str) -> f32 {
        QueryEngine::new().predict(&self.state, user_id, item_id, None)
    }

    /// Items whose coefficient onto each query item is highest.
    pub fn similar_items(
        &self,
        query_items: &[&str],
        top_k: usize,
        exclude_query: bool,
    ) -> Vec<Vec<Recommendation>> {
        QueryEngine::new().similar_items(&self.state, query_items, top_k, exclude_query)
    }

    /// The user's decayed interaction vector at `now` as (item id, weight).
    pub fn user_vector(&self, user_id: &str, now: u64) -> Vec<(String, f32)> {
        let Some(user) = self.state.users().get(user_id) else {
            return Vec::new();
        };
        self.state
            .store()
            .user_vector(user, now)
            .into_iter()
            .filter_map(|(item, w)| self.state.items().name(item).map(|n| (n.to_string(), w)))
            .collect()
    }

    /// Size counters.
    pub fn stats(&self) -> ModelStats {
        stats_of(&self.state)
    }

    /// Export coefficients and aggregates as id-keyed records.
    pub fn export(&self) -> ModelExport {
        ModelExport::from_state(&self.state)
    }
}

impl Scorer for ModelSnapshot {
    fn recommend(
        &self,
        user_id: &str,
        top_n: usize,
        options: &RecommendOptions,
    ) -> Vec<Recommendation> {
        QueryEngine::new().recommend(&self.state, user_id, top_n, options)
    }
}

pub(crate) fn stats_of(state: &ModelState) -> ModelStats {
    ModelStats {
        users: state.users().len(),
        items: state.items().len(),
        interactions: state.store().entry_count(),
        coefficients: state.matrix().nnz(),
        latest_timestamp: state.store().latest_timestamp(),
    }
}
