//! Work item identifiers.
//!
//! A [`MessageId`] is an opaque string. Ids minted by this crate are always the
//! 36-character hyphenated UUID form, but records read back from a store keep
//! whatever id they were persisted with.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.hyphenated().to_string())
    }

    /// Renders a ULID in UUID textual form, so time-sortable ids keep the
    /// 36-character shape.
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self::from_uuid(Uuid::from_u128(ulid.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for MessageId {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl From<Ulid> for MessageId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}
