//! Work items and their per-type results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::MessageId;
use crate::error::HandlerError;

/// Outcome of one type for one work item.
///
/// Serialized as the array `[error | null, value | null, elapsedMs]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "(Option<HandlerError>, Option<serde_json::Value>, f64)",
    into = "(Option<HandlerError>, Option<serde_json::Value>, u64)"
)]
pub struct TypeOutcome {
    pub error: Option<HandlerError>,
    pub value: Option<serde_json::Value>,
    pub elapsed_ms: u64,
}

impl TypeOutcome {
    pub fn ok(value: serde_json::Value, elapsed_ms: u64) -> Self {
        Self {
            error: None,
            value: Some(value),
            elapsed_ms,
        }
    }

    pub fn failed(error: HandlerError, elapsed_ms: u64) -> Self {
        Self {
            error: Some(error),
            value: None,
            elapsed_ms,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

// Stored elapsed times may be fractional; negative or non-finite ones read as 0.
impl From<(Option<HandlerError>, Option<serde_json::Value>, f64)> for TypeOutcome {
    fn from((error, value, elapsed_ms): (Option<HandlerError>, Option<serde_json::Value>, f64)) -> Self {
        Self {
            error,
            value,
            elapsed_ms: if elapsed_ms.is_finite() { elapsed_ms.max(0.0) as u64 } else { 0 },
        }
    }
}

impl From<TypeOutcome> for (Option<HandlerError>, Option<serde_json::Value>, u64) {
    fn from(outcome: TypeOutcome) -> Self {
        (outcome.error, outcome.value, outcome.elapsed_ms)
    }
}

/// Type name -> outcome.
pub type ResultMap = BTreeMap<String, TypeOutcome>;

/// Invoked once with the full result map after an item's dispatch finishes.
pub type Callback = Box<dyn FnOnce(&ResultMap) + Send + Sync + 'static>;

/// One published occurrence of a message.
pub struct WorkItem {
    pub id: MessageId,
    pub name: String,
    pub data: serde_json::Value,
    pub result: ResultMap,
    pub callback: Option<Callback>,
}

impl WorkItem {
    pub fn new(
        id: MessageId,
        name: impl Into<String>,
        data: serde_json::Value,
        callback: Option<Callback>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            data,
            result: ResultMap::new(),
            callback,
        }
    }

    /// The storable part of the item. The callback cannot be persisted.
    pub fn to_record(&self) -> PersistedRecord {
        PersistedRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            data: self.data.clone(),
            result: self.result.clone(),
        }
    }
}

impl From<PersistedRecord> for WorkItem {
    fn from(record: PersistedRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            data: record.data,
            result: record.result,
            callback: None,
        }
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("data", &self.data)
            .field("result", &self.result)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// What the store keeps for an item interrupted by shutdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub id: MessageId,
    pub name: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub result: ResultMap,
}

impl PersistedRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
