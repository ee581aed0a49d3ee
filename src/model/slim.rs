//! The online SLIM model, writer-side owner of state and learner.

use crate::config::SlimConfig;
use crate::engine::decay::Decay;
use crate::engine::learner::{Learner, LearnerStats};
use crate::engine::query::{QueryEngine, RecommendOptions, Recommendation};
use crate::engine::write::{BatchReport, FitReport, WriteEngine};
use crate::format::ModelExport;
use crate::types::{InteractionEvent, SlimResult};

use super::snapshot::{stats_of, ModelStats};
use super::{ModelSnapshot, ModelState, Recommender};

/// Sparse Linear Method recommender trained one event at a time.
pub struct SlimModel {
    config: SlimConfig,
    state: ModelState,
    learner: Learner,
}

impl SlimModel {
    /// Create an empty model. Invalid configuration is rejected here.
    pub fn new(config: SlimConfig) -> SlimResult<Self> {
        config.validate()?;
        let decay = Decay::from_config(&config.decay)?;
        Ok(Self {
            state: ModelState::new(decay, config.store),
            learner: Learner::new(config.learner),
            config,
        })
    }

    /// Rebuild a model from an export. Optimizer state starts fresh and is
    /// warm-started from the imported coefficients on their next update.
    pub fn from_export(config: SlimConfig, export: &ModelExport) -> SlimResult<Self> {
        config.validate()?;
        let decay = Decay::from_config(&config.decay)?;
        let state = export.to_state(decay, config.store)?;
        log::info!(
            "Imported model: {} users, {} items, {} coefficients",
            state.users().len(),
            state.items().len(),
            state.matrix().nnz()
        );
        Ok(Self {
            state,
            learner: Learner::new(config.learner),
            config,
        })
    }

    /// Apply a sequence of events; failures are reported per event and do
    /// not stop the rest.
    pub fn fit<I>(&mut self, events: I) -> BatchReport
    where
        I: IntoIterator<Item = InteractionEvent>,
    {
        let mut report = BatchReport::default();
        for (index, event) in events.into_iter().enumerate() {
            let outcome = self.fit_event(&event);
            report.record(index, outcome);
        }
        report
    }

    /// Rank items for a user against the live state.
    pub fn recommend(
        &self,
        user_id: &str,
        top_n: usize,
        options: &RecommendOptions,
    ) -> Vec<Recommendation> {
        QueryEngine::new().recommend(&self.state, user_id, top_n, options)
    }

    /// Score of one (user, item) pair at the latest event time.
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

    /// Mean absolute residual since the last reset.
    pub fn empirical_error(&mut self, reset: bool) -> f32 {
        self.learner.empirical_error(reset)
    }

    /// Learner counters.
    pub fn learner_stats(&self) -> LearnerStats {
        self.learner.stats()
    }

    /// Size counters.
    pub fn stats(&self) -> ModelStats {
        stats_of(&self.state)
    }

    /// Export coefficients and aggregates.
    pub fn export(&self) -> ModelExport {
        ModelExport::from_state(&self.state)
    }

    /// The live state.
    pub fn state(&self) -> &ModelState {
        &self.state
    }

    /// The configuration the model was built with.
    pub fn config(&self) -> &SlimConfig {
        &self.config
    }
}

impl Recommender for SlimModel {
    type Snapshot = ModelSnapshot;

    fn fit_event(&mut self, event: &InteractionEvent) -> SlimResult<FitReport> {
        WriteEngine::new().apply(&mut self.state, &mut self.learner, event)
    }

    fn score(
        &self,
        user_id: &str,
        top_n: usize,
        options: &RecommendOptions,
    ) -> Vec<Recommendation> {
        self.recommend(user_id, top_n, options)
    }

    fn snapshot(&self, version: u64) -> ModelSnapshot {
        ModelSnapshot::new(self.state.clone(), version)
    }
}
