//! Interaction store: decay-aware (user, item) aggregates with a reverse item index.

use std::sync::Arc;

use serde::Serialize;

use crate::config::{AggregationMode, StoreConfig};
use crate::engine::decay::Decay;
use crate::types::{ItemIdx, SlimError, SlimResult, UserIdx};

use super::SparseRow;

/// Aggregated, decay-aware weight of one (user, item) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InteractionEntry {
    /// Aggregate as of `timestamp`.
    pub weight: f32,
    /// Timestamp of the most recent contributing event.
    pub timestamp: u64,
}

/// What a `record` call did to the stored aggregate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordOutcome {
    /// The aggregate after the update.
    pub weight: f32,
    /// Whether the (user, item) pair was seen for the first time.
    pub created: bool,
}

/// Sparse user × item aggregates.
///
/// Rows are `Arc`-shared so cloning the store for a read snapshot copies
/// pointers; a write only clones the row it touches.
#[derive(Debug, Clone)]
pub struct InteractionStore {
    decay: Decay,
    config: StoreConfig,
    user_rows: Arc<Vec<Arc<SparseRow<InteractionEntry>>>>,
    /// item -> users who interacted with it, in first-interaction order.
    item_users: Arc<Vec<Arc<Vec<UserIdx>>>>,
    entry_count: usize,
    latest_timestamp: u64,
}

impl InteractionStore {
    /// Create an empty store.
    pub fn new(decay: Decay, config: StoreConfig) -> Self {
        Self {
            decay,
            config,
            user_rows: Arc::new(Vec::new()),
            item_users: Arc::new(Vec::new()),
            entry_count: 0,
            latest_timestamp: 0,
        }
    }

    /// Aggregate an event weight into (user, item).
    ///
    /// The stored aggregate is re-based to the event time before the new
    /// weight is added: `old * decay(Δt) + weight`, capped at `max_weight`.
    /// Events older than the stored timestamp by more than the skew
    /// tolerance are rejected; late events inside the tolerance use Δt = 0
    /// and leave the stored timestamp in place.
    pub fn record(
        &mut self,
        user: UserIdx,
        item: ItemIdx,
        weight: f32,
        timestamp: u64,
    ) -> SlimResult<RecordOutcome> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(SlimError::InvalidWeight(weight));
        }
        let existing = self.entry(user, item);
        if let Some(stored) = existing.and_then(|e| self.late_beyond_tolerance(e, timestamp)) {
            return Err(SlimError::OutOfOrder {
                user: format!("#{user}"),
                item: format!("#{item}"),
                timestamp,
                stored,
            });
        }

        let max_weight = self.config.max_weight;
        let (entry, created) = match existing {
            None => (
                InteractionEntry {
                    weight: weight.min(max_weight),
                    timestamp,
                },
                true,
            ),
            Some(old) => {
                let at = old.timestamp.max(timestamp);
                let aggregated = match self.config.aggregation {
                    AggregationMode::Accumulate => {
                        old.weight * self.decay.between(old.timestamp, at)? + weight
                    }
                    AggregationMode::Replace => weight,
                };
                (
                    InteractionEntry {
                        weight: aggregated.min(max_weight),
                        timestamp: at,
                    },
                    false,
                )
            }
        };

        self.ensure_user(user);
        let rows = Arc::make_mut(&mut self.user_rows);
        Arc::make_mut(&mut rows[user as usize]).upsert(item, entry);

        if created {
            self.ensure_item(item);
            let index = Arc::make_mut(&mut self.item_users);
            Arc::make_mut(&mut index[item as usize]).push(user);
            self.entry_count += 1;
        }
        self.latest_timestamp = self.latest_timestamp.max(timestamp);

        Ok(RecordOutcome {
            weight: entry.weight,
            created,
        })
    }

    /// Stored timestamp when `timestamp` is too far behind it, without mutating.
    pub fn check_order(&self, user: UserIdx, item: ItemIdx, timestamp: u64) -> Option<u64> {
        self.entry(user, item)
            .and_then(|e| self.late_beyond_tolerance(e, timestamp))
    }

    fn late_beyond_tolerance(&self, entry: InteractionEntry, timestamp: u64) -> Option<u64> {
        if timestamp.saturating_add(self.config.skew_tolerance_micros) < entry.timestamp {
            Some(entry.timestamp)
        } else {
            None
        }
    }

    /// Insert an aggregate verbatim (import path, no decay or capping).
    pub fn insert_entry(&mut self, user: UserIdx, item: ItemIdx, entry: InteractionEntry) {
        self.ensure_user(user);
        let rows = Arc::make_mut(&mut self.user_rows);
        let created = Arc::make_mut(&mut rows[user as usize]).upsert(item, entry);
        if created {
            self.ensure_item(item);
            let index = Arc::make_mut(&mut self.item_users);
            Arc::make_mut(&mut index[item as usize]).push(user);
            self.entry_count += 1;
        }
        self.latest_timestamp = self.latest_timestamp.max(entry.timestamp);
    }

    fn ensure_user(&mut self, user: UserIdx) {
        let needed = user as usize + 1;
        if self.user_rows.len() < needed {
            Arc::make_mut(&mut self.user_rows).resize_with(needed, Default::default);
        }
    }

    fn ensure_item(&mut self, item: ItemIdx) {
        let needed = item as usize + 1;
        if self.item_users.len() < needed {
            Arc::make_mut(&mut self.item_users).resize_with(needed, Default::default);
        }
    }

    /// The stored aggregate for (user, item).
    pub fn entry(&self, user: UserIdx, item: ItemIdx) -> Option<InteractionEntry> {
        self.user_rows
            .get(user as usize)
            .and_then(|row| row.get(item))
    }

    /// The aggregate projected to the clock `now`.
    pub fn weight_at(&self, user: UserIdx, item: ItemIdx, now: u64) -> f32 {
        self.entry(user, item)
            .map(|e| self.decay.project(e.weight, e.timestamp, now))
            .unwrap_or(0.0)
    }

    /// The user's nonzero weights projected to `now`, in item order.
    ///
    /// This is a pure read: stored aggregates are not re-based.
    pub fn user_vector(&self, user: UserIdx, now: u64) -> Vec<(ItemIdx, f32)> {
        let Some(row) = self.user_rows.get(user as usize) else {
            return Vec::new();
        };
        row.entries()
            .iter()
            .map(|(item, e)| (*item, self.decay.project(e.weight, e.timestamp, now)))
            .filter(|(_, w)| *w != 0.0)
            .collect()
    }

    /// The user's items, most recently touched first (ties by item index).
    /// `limit == 0` returns all of them.
    pub fn recent_items(&self, user: UserIdx, limit: usize) -> Vec<ItemIdx> {
        let Some(row) = self.user_rows.get(user as usize) else {
            return Vec::new();
        };
        let mut items: Vec<(ItemIdx, u64)> = row
            .entries()
            .iter()
            .map(|(item, e)| (*item, e.timestamp))
            .collect();
        let order = |a: &(ItemIdx, u64), b: &(ItemIdx, u64)| b.1.cmp(&a.1).then(a.0.cmp(&b.0));
        if limit > 0 && limit < items.len() {
            items.select_nth_unstable_by(limit - 1, order);
            items.truncate(limit);
        }
        items.sort_unstable_by(order);
        items.into_iter().map(|(item, _)| item).collect()
    }

    /// Number of items the user has interacted with.
    pub fn user_degree(&self, user: UserIdx) -> usize {
        self.user_rows
            .get(user as usize)
            .map(|row| row.len())
            .unwrap_or(0)
    }

    /// Users who interacted with `item`, in first-interaction order.
    ///
    /// For offline consumers and diagnostics. The online learner never reads
    /// it and only walks the triggering user's items.
    pub fn users_of(&self, item: ItemIdx) -> &[UserIdx] {
        self.item_users
            .get(item as usize)
            .map(|users| users.as_slice())
            .unwrap_or(&[])
    }

    /// All aggregates as (user, item, entry), user-major.
    pub fn entries(&self) -> impl Iterator<Item = (UserIdx, ItemIdx, InteractionEntry)> + '_ {
        self.user_rows.iter().enumerate().flat_map(|(user, row)| {
            row.entries()
                .iter()
                .map(move |(item, e)| (user as UserIdx, *item, *e))
        })
    }

    /// Number of stored (user, item) aggregates.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Latest event timestamp seen (the stream high-water mark).
    pub fn latest_timestamp(&self) -> u64 {
        self.latest_timestamp
    }

    /// The decay applied by this store.
    pub fn decay(&self) -> &Decay {
        &self.decay
    }

    /// The store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}
