//! mcenter-core
//!
//! In-process message center: named messages fan out to a fixed, ordered set
//! of handler types, run by a bounded worker pool. Work interrupted by a
//! graceful shutdown is parked in a store and resumed on the next start.
//!
//! # Modules
//! - **domain**: message definitions, work items, results, ids, counters
//! - **ports**: collaborator traits (StoreClient, ShutdownRegistrar, IdGenerator, Clock, Validator)
//! - **app**: MessageCenter, builder, registry, queue, dispatcher, lifecycle, recovery
//! - **typed**: Listener trait, closure and typed-handler adapters
//! - **impls**: stores (memory, file, redis) and shutdown registrars
//! - **config**: settings loaded from file and `MCENTER_*` environment

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod typed;

pub use self::app::{BuildError, MessageCenter, MessageCenterBuilder, Notification, NotifierKind, Stats};
pub use self::config::{Config, PublishPolicy};
pub use self::domain::{Callback, MessageId, Phase, ResultMap, TypeOutcome, TypeSpec};
pub use self::error::{HandlerError, McenterError, ValidationError};
pub use self::typed::{Handler, Listener, Message, listener_fn, typed};
