//! IdGenerator port - one id per published work item.
//!
//! # Implementations
//! - **UuidGenerator**: random v4 UUIDs (default)
//! - **UlidGenerator**: time-sortable ULIDs driven by a [`Clock`], rendered in
//!   UUID textual form so ids stay 36 characters long

use ulid::Ulid;
use uuid::Uuid;

use crate::domain::MessageId;
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> MessageId;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> MessageId {
        MessageId::from(Uuid::new_v4())
    }
}

/// ULID generator. With a `FixedClock` the timestamp part is deterministic
/// and only the random part varies.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate(&self) -> MessageId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        MessageId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
