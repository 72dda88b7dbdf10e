//! Impls - adapters for the ports.
//!
//! # Stores
//! - **InMemoryStore**: tests, single-process use
//! - **FileStore**: JSON documents on disk, survives restarts
//! - **RedisStore** (feature `redis`): redis hashes, shared between processes
//!
//! # Shutdown
//! - **OsSignalRegistrar**: SIGINT / SIGTERM / SIGQUIT
//! - **ManualShutdown**: explicit trigger

pub mod file_store;
pub mod inmem_store;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod shutdown;

pub use self::file_store::FileStore;
pub use self::inmem_store::InMemoryStore;
#[cfg(feature = "redis")]
pub use self::redis_store::RedisStore;
pub use self::shutdown::{ManualShutdown, OsSignalRegistrar, wait_for_shutdown_signal};
