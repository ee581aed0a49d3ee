//! Id-keyed model export, the interchange form for JSON and .slim files.

use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::engine::decay::Decay;
use crate::index::{IdTable, InteractionEntry, InteractionStore};
use crate::model::{CoefficientMatrix, ModelState};
use crate::types::{SlimError, SlimResult};

/// One nonzero coefficient `W[row][col]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRecord {
    pub row: String,
    pub col: String,
    pub value: f32,
}

/// One aggregated (user, item) interaction as of its last update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user: String,
    pub item: String,
    pub weight: f32,
    pub timestamp: u64,
}

/// Complete model contents keyed by external ids.
///
/// `items` and `users` list every interned id in index order, so importing
/// reproduces the same indices (and therefore the same tie-free rankings).
/// Optimizer accumulators are not part of the export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelExport {
    pub items: Vec<String>,
    pub users: Vec<String>,
    pub coefficients: Vec<CoefficientRecord>,
    pub interactions: Vec<InteractionRecord>,
}

impl ModelExport {
    /// Capture a model state.
    pub fn from_state(state: &ModelState) -> Self {
        let items = state.items();
        let users = state.users();
        let name = |table: &IdTable, idx: u32| table.name(idx).unwrap_or_default().to_string();

        let coefficients = state
            .matrix()
            .triples()
            .map(|(row, col, value)| CoefficientRecord {
                row: name(items, row),
                col: name(items, col),
                value,
            })
            .collect();

        let interactions = state
            .store()
            .entries()
            .map(|(user, item, entry)| InteractionRecord {
                user: name(users, user),
                item: name(items, item),
                weight: entry.weight,
                timestamp: entry.timestamp,
            })
            .collect();

        Self {
            items: items.names().map(str::to_string).collect(),
            users: users.names().map(str::to_string).collect(),
            coefficients,
            interactions,
        }
    }

    /// Rebuild a model state. Every record must reference a listed id.
    pub fn to_state(&self, decay: Decay, store_config: StoreConfig) -> SlimResult<ModelState> {
        let items = IdTable::from_names("item", &self.items)?;
        let users = IdTable::from_names("user", &self.users)?;

        let item_idx = |id: &str| items.get(id).ok_or_else(|| SlimError::UnknownItem(id.into()));
        let user_idx = |id: &str| users.get(id).ok_or_else(|| SlimError::UnknownUser(id.into()));

        let mut triples = Vec::with_capacity(self.coefficients.len());
        for record in &self.coefficients {
            triples.push((item_idx(&record.row)?, item_idx(&record.col)?, record.value));
        }
        let matrix = CoefficientMatrix::from_triples(triples)?;

        let mut store = InteractionStore::new(decay, store_config);
        for record in &self.interactions {
            if !record.weight.is_finite() || record.weight < 0.0 {
                return Err(SlimError::InvalidWeight(record.weight));
            }
            store.insert_entry(
                user_idx(&record.user)?,
                item_idx(&record.item)?,
                InteractionEntry {
                    weight: record.weight,
                    timestamp: record.timestamp,
                },
            );
        }

        Ok(ModelState::from_parts(items, users, store, matrix))
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> SlimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> SlimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// True when nothing was learned or recorded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.users.is_empty()
    }
}
