//! Domain model: message definitions, work items, results, ids.

pub mod ids;
pub mod item;
pub mod message;
pub mod state;
pub mod stats;

pub use ids::MessageId;
pub use item::{Callback, PersistedRecord, ResultMap, TypeOutcome, WorkItem};
pub use message::{MessageDefinition, RegisteredType, TypeSpec};
pub use state::Phase;
pub use stats::{TypeStats, TypeStatsSnapshot};
