//! The mutable model state shared (copy-on-write) with snapshots.

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::engine::decay::Decay;
use crate::index::{IdTable, InteractionStore};

use super::CoefficientMatrix;

/// Interned ids, interaction aggregates and coefficients.
///
/// Cloning is cheap: every component shares its storage through `Arc`s and
/// copies only what a later write touches.
#[derive(Debug, Clone)]
pub struct ModelState {
    pub(crate) items: Arc<IdTable>,
    pub(crate) users: Arc<IdTable>,
    pub(crate) store: InteractionStore,
    pub(crate) matrix: CoefficientMatrix,
}

impl ModelState {
    /// Create an empty state.
    pub fn new(decay: Decay, store_config: StoreConfig) -> Self {
        Self {
            items: Arc::new(IdTable::new("item")),
            users: Arc::new(IdTable::new("user")),
            store: InteractionStore::new(decay, store_config),
            matrix: CoefficientMatrix::new(),
        }
    }

    /// Create from pre-existing parts (used by import).
    pub fn from_parts(
        items: IdTable,
        users: IdTable,
        store: InteractionStore,
        matrix: CoefficientMatrix,
    ) -> Self {
        Self {
            items: Arc::new(items),
            users: Arc::new(users),
            store,
            matrix,
        }
    }

    /// Item id table.
    pub fn items(&self) -> &IdTable {
        &self.items
    }

    /// User id table.
    pub fn users(&self) -> &IdTable {
        &self.users
    }

    /// Interaction aggregates.
    pub fn store(&self) -> &InteractionStore {
        &self.store
    }

    /// Learned coefficients.
    pub fn matrix(&self) -> &CoefficientMatrix {
        &self.matrix
    }

    /// Index of `id`, interning it if unseen. Shared tables are only copied
    /// when a new id actually arrives.
    pub(crate) fn intern_user(&mut self, id: &str) -> u32 {
        match self.users.get(id) {
            Some(idx) => idx,
            None => Arc::make_mut(&mut self.users).intern(id),
        }
    }

    pub(crate) fn intern_item(&mut self, id: &str) -> u32 {
        match self.items.get(id) {
            Some(idx) => idx,
            None => Arc::make_mut(&mut self.items).intern(id),
        }
    }
}
