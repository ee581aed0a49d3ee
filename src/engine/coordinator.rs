//! Update coordinator: one serialized writer, lock-free snapshot readers.

use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;

use crate::config::SlimConfig;
use crate::format::ModelExport;
use crate::model::{ModelStats, Recommender, Scorer, SlimModel};
use crate::types::{InteractionEvent, SlimError, SlimResult};

use super::learner::LearnerStats;
use super::query::{RecommendOptions, Recommendation};
use super::write::{BatchReport, FitReport};

struct WriterState<M> {
    model: M,
    pending: usize,
    version: u64,
}

/// Serializes model updates and publishes immutable snapshots.
///
/// Writers queue on a mutex and apply events one at a time. Readers load
/// the current snapshot from an [`ArcSwap`] and never touch the mutex; a
/// snapshot stays valid for as long as a reader holds its `Arc`.
pub struct UpdateCoordinator<M: Recommender = SlimModel> {
    writer: Mutex<WriterState<M>>,
    current: ArcSwap<M::Snapshot>,
    publish_interval: usize,
}

impl<M: Recommender> UpdateCoordinator<M> {
    /// Wrap a model, publishing its current state as snapshot 0.
    ///
    /// A snapshot is published after every `publish_interval` applied
    /// events (clamped to at least 1).
    pub fn with_model(model: M, publish_interval: usize) -> Self {
        let initial = model.snapshot(0);
        Self {
            writer: Mutex::new(WriterState {
                model,
                pending: 0,
                version: 0,
            }),
            current: ArcSwap::from_pointee(initial),
            publish_interval: publish_interval.max(1),
        }
    }

    /// Apply one event. On error the model is unchanged and nothing is
    /// published.
    pub fn ingest(&self, event: &InteractionEvent) -> SlimResult<FitReport> {
        let mut writer = self.lock()?;
        let report = writer.model.fit_event(event)?;
        writer.pending += 1;
        if writer.pending >= self.publish_interval {
            self.publish_locked(&mut writer);
        }
        Ok(report)
    }

    /// Apply a sequence of events under one lock acquisition. Failed events
    /// are reported by position and do not affect the others.
    pub fn ingest_batch<I>(&self, events: I) -> SlimResult<BatchReport>
    where
        I: IntoIterator<Item = InteractionEvent>,
    {
        let mut writer = self.lock()?;
        let mut report = BatchReport::default();
        for (index, event) in events.into_iter().enumerate() {
            let outcome = writer.model.fit_event(&event);
            let applied = outcome.is_ok();
            report.record(index, outcome);
            if applied {
                writer.pending += 1;
                if writer.pending >= self.publish_interval {
                    self.publish_locked(&mut writer);
                    report.snapshots_published += 1;
                }
            }
        }
        if !report.rejected.is_empty() {
            log::warn!(
                "Batch applied {} events, rejected {}",
                report.applied,
                report.rejected.len()
            );
        }
        Ok(report)
    }

    /// Publish the current state now, returning the new version.
    pub fn publish(&self) -> SlimResult<u64> {
        let mut writer = self.lock()?;
        Ok(self.publish_locked(&mut writer))
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<M::Snapshot> {
        self.current.load_full()
    }

    /// Events applied since the last publication.
    pub fn pending(&self) -> SlimResult<usize> {
        Ok(self.lock()?.pending)
    }

    /// Version of the latest published snapshot.
    pub fn version(&self) -> SlimResult<u64> {
        Ok(self.lock()?.version)
    }

    /// Rank items for a user against the latest published snapshot.
    pub fn recommend(
        &self,
        user_id: &str,
        top_n: usize,
        options: &RecommendOptions,
    ) -> Vec<Recommendation> {
        self.current.load().recommend(user_id, top_n, options)
    }

    /// Run `f` against the live model while holding the writer lock.
    pub fn with_writer<R>(&self, f: impl FnOnce(&M) -> R) -> SlimResult<R> {
        let writer = self.lock()?;
        Ok(f(&writer.model))
    }

    fn lock(&self) -> SlimResult<MutexGuard<'_, WriterState<M>>> {
        self.writer.lock().map_err(|_| SlimError::WriterPoisoned)
    }

    fn publish_locked(&self, writer: &mut WriterState<M>) -> u64 {
        writer.version += 1;
        let snapshot = writer.model.snapshot(writer.version);
        self.current.store(Arc::new(snapshot));
        log::debug!(
            "Published snapshot {} after {} events",
            writer.version,
            writer.pending
        );
        writer.pending = 0;
        writer.version
    }
}

impl UpdateCoordinator<SlimModel> {
    /// Build an empty SLIM model from configuration.
    pub fn new(config: SlimConfig) -> SlimResult<Self> {
        let interval = config.coordinator.publish_interval;
        Ok(Self::with_model(SlimModel::new(config)?, interval))
    }

    /// Build from a previously exported model.
    pub fn from_export(config: SlimConfig, export: &ModelExport) -> SlimResult<Self> {
        let interval = config.coordinator.publish_interval;
        Ok(Self::with_model(
            SlimModel::from_export(config, export)?,
            interval,
        ))
    }

    /// Score of one (user, item) pair on the latest snapshot.
    pub fn predict(&self, user_id: &str, item_id: &str) -> f32 {
        self.current.load().predict(user_id, item_id)
    }

    /// Similar items on the latest snapshot.
    pub fn similar_items(
        &self,
        query_items: &[&str],
        top_k: usize,
        exclude_query: bool,
    ) -> Vec<Vec<Recommendation>> {
        self.current
            .load()
            .similar_items(query_items, top_k, exclude_query)
    }

    /// Export the live model, including events not yet published.
    ///
    /// Only a cheap state clone happens under the lock.
    pub fn export(&self) -> SlimResult<ModelExport> {
        let state = self.lock()?.model.state().clone();
        Ok(ModelExport::from_state(&state))
    }

    /// Mean absolute residual since the last reset.
    pub fn empirical_error(&self, reset: bool) -> SlimResult<f32> {
        Ok(self.lock()?.model.empirical_error(reset))
    }

    /// Learner counters.
    pub fn learner_stats(&self) -> SlimResult<LearnerStats> {
        Ok(self.lock()?.model.learner_stats())
    }

    /// Size counters of the live model.
    pub fn stats(&self) -> SlimResult<ModelStats> {
        Ok(self.lock()?.model.stats())
    }
}
