//! App - the message center built from the ports.
//!
//! # Components
//! - **MessageCenter**: public surface (register, subscribe, publish, shutdown)
//! - **MessageCenterBuilder**: wiring of store, id source, registrar, runtime
//! - **MessageRegistry**: registered messages, subscription table, readiness
//! - **DispatchQueue** / **WorkerPool**: pausable FIFO drained by N workers
//! - **Dispatcher**: sequential per-type execution of one work item
//! - **Lifecycle**: Running -> Exiting -> Exited
//! - **RecoveryManager**: re-enqueues items parked by a previous shutdown
//! - **Notifiers**: `error` and `timeout` hooks

pub mod builder;
pub mod center;
pub mod dispatcher;
pub mod lifecycle;
pub mod notifier;
pub mod queue;
pub mod recovery;
pub mod registry;
pub mod worker_pool;

pub use self::builder::{BuildError, MessageCenterBuilder};
pub use self::center::MessageCenter;
pub use self::lifecycle::Lifecycle;
pub use self::notifier::{Notification, NotifierKind, NotifyFn};
pub use self::recovery::{RecoveryManager, RecoveryReport};
pub use self::registry::{MessageRegistry, Stats};
