//! Identifier interning of external string ids to dense indices.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{validate_identifier, SlimError, SlimResult};

/// Append-only table mapping external ids to dense `u32` indices.
///
/// Indices are assigned in first-seen order and never change, so storage
/// elsewhere can be plain vectors indexed by them.
#[derive(Debug, Clone)]
pub struct IdTable {
    kind: &'static str,
    names: Vec<Arc<str>>,
    lookup: HashMap<Arc<str>, u32>,
}

impl IdTable {
    /// Create an empty table. `kind` ("user" / "item") is used in errors.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            names: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Rebuild a table from names in index order (used by import).
    pub fn from_names<I, S>(kind: &'static str, names: I) -> SlimResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new(kind);
        for name in names {
            let name = name.as_ref();
            validate_identifier(kind, name)?;
            if table.lookup.contains_key(name) {
                return Err(SlimError::InvalidIdentifier {
                    kind,
                    reason: format!("duplicate id {name:?}"),
                });
            }
            table.push(name);
        }
        Ok(table)
    }

    /// Index of `id`, assigning a new one if unseen.
    pub fn intern(&mut self, id: &str) -> u32 {
        match self.lookup.get(id) {
            Some(&idx) => idx,
            None => self.push(id),
        }
    }

    fn push(&mut self, id: &str) -> u32 {
        let idx = self.names.len() as u32;
        let name: Arc<str> = Arc::from(id);
        self.names.push(Arc::clone(&name));
        self.lookup.insert(name, idx);
        idx
    }

    /// Index of `id`, if interned.
    pub fn get(&self, id: &str) -> Option<u32> {
        self.lookup.get(id).copied()
    }

    /// External id at `idx`.
    pub fn name(&self, idx: u32) -> Option<&str> {
        self.names.get(idx as usize).map(|n| n.as_ref())
    }

    /// All external ids in index order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| n.as_ref())
    }

    /// The table's entity kind.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Number of interned ids.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no ids are interned.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
