//! MessageCenterBuilder - wiring of the center's collaborators.
//!
//! Every collaborator has a default so `MessageCenter::builder().build()` is
//! enough for tests; production code at least sets a durable store and a
//! shutdown registrar.

use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::warn;

use super::center::MessageCenter;
use crate::config::Config;
use crate::impls::InMemoryStore;
use crate::ports::{IdGenerator, ShutdownRegistrar, StoreClient, UuidGenerator};

/// # Example
/// ```ignore
/// let shutdown = OsSignalRegistrar::new(Handle::current());
/// let center = MessageCenter::builder()
///     .config(Config::load(None)?)
///     .store(Arc::new(FileStore::open("./parked").await?))
///     .shutdown(&shutdown)
///     .build()?;
/// ```
pub struct MessageCenterBuilder<'a> {
    config: Config,
    store: Option<Arc<dyn StoreClient>>,
    id_generator: Option<Arc<dyn IdGenerator>>,
    shutdown: Option<&'a dyn ShutdownRegistrar>,
    runtime: Option<Handle>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no tokio runtime: build() must run inside a runtime or be given one with .runtime()")]
    NoRuntime,
}

impl<'a> MessageCenterBuilder<'a> {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            store: None,
            id_generator: None,
            shutdown: None,
            runtime: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Where interrupted items are parked. Defaults to an [`InMemoryStore`].
    pub fn store(mut self, store: Arc<dyn StoreClient>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to [`UuidGenerator`].
    pub fn id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = Some(id_generator);
        self
    }

    /// The registrar receives the center's shutdown handler during `build()`.
    pub fn shutdown(mut self, registrar: &'a dyn ShutdownRegistrar) -> Self {
        self.shutdown = Some(registrar);
        self
    }

    /// Runtime the workers and recovery run on. Defaults to the current one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Spawns the workers; the queue stays paused until the center is ready.
    pub fn build(self) -> Result<MessageCenter, BuildError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| BuildError::NoRuntime)?,
        };
        let store = self.store.unwrap_or_else(|| {
            warn!("no store configured; interrupted items will not survive a restart");
            Arc::new(InMemoryStore::new())
        });
        let id_generator = self.id_generator.unwrap_or_else(|| Arc::new(UuidGenerator));

        let center = MessageCenter::start(self.config, store, id_generator, runtime);
        if let Some(registrar) = self.shutdown {
            registrar.on_shutdown(center.shutdown_handler());
        }
        Ok(center)
    }
}

impl Default for MessageCenterBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageId;
    use crate::impls::ManualShutdown;

    struct Fixed;

    impl IdGenerator for Fixed {
        fn generate(&self) -> MessageId {
            MessageId::new("fixed")
        }
    }

    #[test]
    fn build_outside_runtime_fails() {
        let result = MessageCenter::builder().build();
        assert!(matches!(result, Err(BuildError::NoRuntime)));
    }

    #[test]
    fn explicit_runtime_handle_is_enough() {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let center = MessageCenter::builder().runtime(rt.handle().clone()).build().unwrap();
        assert!(!center.is_exiting());
    }

    #[tokio::test]
    async fn build_registers_one_shutdown_handler() {
        let shutdown = ManualShutdown::new();
        let center = MessageCenter::builder()
            .config(Config::default().with_max_concurrency(2))
            .id_generator(Arc::new(Fixed))
            .shutdown(&shutdown)
            .build()
            .unwrap();

        assert_eq!(shutdown.registrations(), 1);
        assert_eq!(center.config().max_concurrency, 2);

        shutdown.trigger().await;
        assert!(center.is_exited());
    }
}
