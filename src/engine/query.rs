//! Scorer: sparse scoring and top-N ranking.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::index::IdTable;
use crate::model::ModelState;
use crate::types::ItemIdx;

/// Options for a recommendation query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendOptions {
    /// Drop items the user has already interacted with.
    pub exclude_seen: bool,
    /// Use at most this many of the user's items (highest weight first) as seeds.
    pub candidate_pool_limit: Option<usize>,
    /// Read clock for decay projection. Defaults to the model's latest event time.
    pub as_of: Option<u64>,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            exclude_seen: true,
            candidate_pool_limit: None,
            as_of: None,
        }
    }
}

impl RecommendOptions {
    /// Options with `exclude_seen` set.
    pub fn exclude_seen(exclude_seen: bool) -> Self {
        Self {
            exclude_seen,
            ..Self::default()
        }
    }
}

/// One ranked item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// External item id.
    pub item: String,
    /// `Σ_k r_k · W[k][item]`.
    pub score: f32,
}

/// Read-only query executor over a model state.
pub struct QueryEngine;

impl QueryEngine {
    /// Create a new query engine.
    pub fn new() -> Self {
        Self
    }

    /// Rank items reachable from the user's interactions through nonzero
    /// coefficients. Unknown users and users with no weight get an empty list.
    pub fn recommend(
        &self,
        state: &ModelState,
        user_id: &str,
        top_n: usize,
        options: &RecommendOptions,
    ) -> Vec<Recommendation> {
        if top_n == 0 {
            return Vec::new();
        }
        let Some(user) = state.users().get(user_id) else {
            return Vec::new();
        };
        let now = options
            .as_of
            .unwrap_or_else(|| state.store().latest_timestamp());
        let vector = state.store().user_vector(user, now);
        if vector.is_empty() {
            return Vec::new();
        }

        let mut seeds = vector.clone();
        if let Some(limit) = options.candidate_pool_limit {
            if seeds.len() > limit {
                seeds.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
                seeds.truncate(limit);
            }
        }

        let mut scores: HashMap<ItemIdx, f32> = HashMap::new();
        for &(k, r) in &seeds {
            for &(i, w) in state.matrix().row(k) {
                *scores.entry(i).or_insert(0.0) += r * w;
            }
        }

        if options.exclude_seen {
            for (seen, _) in &vector {
                scores.remove(seen);
            }
        }

        rank(scores.into_iter(), state.items(), top_n)
    }

    /// Score of a single (user, item) pair; 0 for unknown ids.
    pub fn predict(
        &self,
        state: &ModelState,
        user_id: &str,
        item_id: &str,
        as_of: Option<u64>,
    ) -> f32 {
        let (Some(user), Some(item)) = (state.users().get(user_id), state.items().get(item_id))
        else {
            return 0.0;
        };
        let now = as_of.unwrap_or_else(|| state.store().latest_timestamp());
        state
            .store()
            .user_vector(user, now)
            .into_iter()
            .filter(|(k, _)| *k != item)
            .map(|(k, r)| r * state.matrix().get(k, item))
            .sum()
    }

    /// For each query item `q`, the items `k` with the highest `W[k][q]`,
    /// i.e. the items whose interaction best reconstructs `q`.
    ///
    /// With `exclude_query`, every query item is removed from every list.
    /// Unknown query items yield an empty list.
    pub fn similar_items(
        &self,
        state: &ModelState,
        query_items: &[&str],
        top_k: usize,
        exclude_query: bool,
    ) -> Vec<Vec<Recommendation>> {
        let query_idx: Vec<Option<ItemIdx>> = query_items
            .iter()
            .map(|id| state.items().get(id))
            .collect();
        let excluded: HashSet<ItemIdx> = if exclude_query {
            query_idx.iter().flatten().copied().collect()
        } else {
            HashSet::new()
        };

        query_idx
            .iter()
            .map(|q| match q {
                Some(q) if top_k > 0 => rank(
                    state
                        .matrix()
                        .column(*q)
                        .into_iter()
                        .filter(|(i, _)| !excluded.contains(i)),
                    state.items(),
                    top_k,
                ),
                _ => Vec::new(),
            })
            .collect()
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Top `n` by score descending, ties by ascending external id.
fn rank(
    candidates: impl Iterator<Item = (ItemIdx, f32)>,
    items: &IdTable,
    n: usize,
) -> Vec<Recommendation> {
    if n == 0 {
        return Vec::new();
    }
    let mut ranked: Vec<(&str, f32)> = candidates
        .filter_map(|(idx, score)| items.name(idx).map(|name| (name, score)))
        .collect();

    let order = |a: &(&str, f32), b: &(&str, f32)| -> Ordering {
        b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
    };
    if ranked.len() > n {
        ranked.select_nth_unstable_by(n - 1, order);
        ranked.truncate(n);
    }
    ranked.sort_unstable_by(order);

    ranked
        .into_iter()
        .map(|(item, score)| Recommendation {
            item: item.to_string(),
            score,
        })
        .collect()
}
