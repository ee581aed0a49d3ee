//! Interaction events and their builder.

use serde::{Deserialize, Serialize};

use super::{now_micros, MAX_ID_LEN};
use crate::types::error::{SlimError, SlimResult};

/// A single user–item interaction, the input unit of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// External user identifier.
    pub user_id: String,
    /// External item identifier.
    pub item_id: String,
    /// When the interaction happened (Unix epoch microseconds).
    pub timestamp: u64,
    /// Implicit feedback strength (1.0) or an explicit rating.
    pub raw_weight: f32,
}

impl InteractionEvent {
    /// Create an implicit-feedback event (weight 1.0).
    pub fn new(user_id: impl Into<String>, item_id: impl Into<String>, timestamp: u64) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            timestamp,
            raw_weight: 1.0,
        }
    }

    /// Validate identifiers and weight. Nothing is applied for an invalid event.
    pub fn validate(&self) -> SlimResult<()> {
        validate_identifier("user", &self.user_id)?;
        validate_identifier("item", &self.item_id)?;
        if !self.raw_weight.is_finite() || self.raw_weight < 0.0 {
            return Err(SlimError::InvalidWeight(self.raw_weight));
        }
        Ok(())
    }
}

/// Check that an external identifier is usable as an interning key.
pub fn validate_identifier(kind: &'static str, id: &str) -> SlimResult<()> {
    if id.is_empty() {
        return Err(SlimError::InvalidIdentifier {
            kind,
            reason: "empty".to_string(),
        });
    }
    if id.len() > MAX_ID_LEN {
        return Err(SlimError::InvalidIdentifier {
            kind,
            reason: format!("length {} > {}", id.len(), MAX_ID_LEN),
        });
    }
    if id.chars().any(char::is_control) {
        return Err(SlimError::InvalidIdentifier {
            kind,
            reason: "contains control characters".to_string(),
        });
    }
    Ok(())
}

/// Builder for constructing InteractionEvent instances ergonomically.
pub struct InteractionEventBuilder {
    user_id: String,
    item_id: String,
    timestamp: Option<u64>,
    raw_weight: f32,
}

impl InteractionEventBuilder {
    /// Create a new builder with the required fields.
    pub fn new(user_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            timestamp: None,
            raw_weight: 1.0,
        }
    }

    /// Set the event timestamp.
    pub fn timestamp(mut self, ts: u64) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Set an explicit rating. Not clamped; validation rejects bad values.
    pub fn weight(mut self, weight: f32) -> Self {
        self.raw_weight = weight;
        self
    }

    /// Build the event, stamping it with the current time if none was given.
    pub fn build(self) -> InteractionEvent {
        InteractionEvent {
            user_id: self.user_id,
            item_id: self.item_id,
            timestamp: self.timestamp.unwrap_or_else(now_micros),
            raw_weight: self.raw_weight,
        }
    }
}
