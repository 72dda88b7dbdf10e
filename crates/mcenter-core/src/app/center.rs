//! MessageCenter - the public surface.
//!
//! # Lifecycle
//! 1. `register` every message, `subscribe` every `(message, type)` pair
//! 2. the last subscription makes the center ready: registration closes, the
//!    queue starts and parked items are recovered
//! 3. `publish` at any time; items published before readiness are buffered
//! 4. shutdown (through the registrar) drains in-flight work and parks
//!    whatever did not finish

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::dispatcher::Dispatcher;
use super::lifecycle::Lifecycle;
use super::notifier::{Notification, NotifierKind, Notifiers};
use super::queue::DispatchQueue;
use super::recovery::RecoveryManager;
use super::registry::{MessageRegistry, Stats};
use super::worker_pool::{Work, WorkerPool};
use crate::config::{Config, PublishPolicy};
use crate::domain::{Callback, MessageDefinition, MessageId, Phase, ResultMap, TypeSpec, WorkItem};
use crate::error::McenterError;
use crate::ports::{IdGenerator, ShutdownHandler, StoreClient, Validator};
use crate::typed::{Listener, Message};

struct Inner {
    config: Config,
    registry: Arc<RwLock<MessageRegistry>>,
    queue: Arc<DispatchQueue>,
    lifecycle: Arc<Lifecycle>,
    notifiers: Arc<Notifiers>,
    recovery: RecoveryManager,
    id_generator: Arc<dyn IdGenerator>,
    runtime: Handle,
    work: Arc<dyn Work>,
    workers: Mutex<Option<WorkerPool>>,
}

/// Cheap to clone; every clone drives the same center.
#[derive(Clone)]
pub struct MessageCenter {
    inner: Arc<Inner>,
}

impl MessageCenter {
    pub fn builder<'a>() -> super::MessageCenterBuilder<'a> {
        super::MessageCenterBuilder::new()
    }

    pub(crate) fn start(
        config: Config,
        store: Arc<dyn StoreClient>,
        id_generator: Arc<dyn IdGenerator>,
        runtime: Handle,
    ) -> Self {
        let registry = Arc::new(RwLock::new(MessageRegistry::new()));
        let queue = Arc::new(DispatchQueue::new());
        let lifecycle = Arc::new(Lifecycle::new());
        let notifiers = Arc::new(Notifiers::new());

        let work: Arc<dyn Work> = Arc::new(Dispatcher::new(
            registry.clone(),
            lifecycle.clone(),
            notifiers.clone(),
            store.clone(),
            config.store_key.clone(),
        ));
        let workers = WorkerPool::spawn(config.concurrency(), queue.clone(), work.clone(), &runtime);
        let recovery = RecoveryManager::new(store, config.store_key.clone(), config.dead_letter_key.clone());

        info!(
            max_concurrency = workers.size(),
            store_key = %config.store_key,
            "mcenter.start"
        );

        Self {
            inner: Arc::new(Inner {
                config,
                registry,
                queue,
                lifecycle,
                notifiers,
                recovery,
                id_generator,
                runtime,
                work,
                workers: Mutex::new(Some(workers)),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Declares a message and the types that must handle it.
    ///
    /// Returns how many messages are registered, this one included.
    pub fn register(
        &self,
        name: &str,
        validator: Option<Arc<dyn Validator>>,
        types: Vec<TypeSpec>,
    ) -> Result<usize, McenterError> {
        let type_count = types.len();
        let ordinal = self.inner.registry.write().register(name, validator, types)?;
        info!(name, types = type_count, ordinal, "mcenter.register");
        Ok(ordinal)
    }

    /// Binds the listener for one `(message, type)` pair, then re-evaluates
    /// readiness.
    pub fn subscribe(&self, name: &str, type_name: &str, listener: Arc<dyn Listener>) -> Result<(), McenterError> {
        self.inner.registry.write().subscribe(name, type_name, listener)?;
        debug!(name, type_name, "mcenter.subscribe");
        self.check_ready();
        Ok(())
    }

    /// `true` once every registered type has a listener.
    ///
    /// The first `true` closes registration, starts the queue and kicks off
    /// recovery in the background.
    pub fn check_ready(&self) -> bool {
        let (ready, became_ready) = {
            let mut registry = self.inner.registry.write();
            let became_ready = registry.mark_ready();
            (registry.is_ready(), became_ready)
        };

        if became_ready {
            info!(buffered = self.inner.queue.len(), "mcenter.ready");
            self.inner.queue.resume();
            let center = self.clone();
            self.inner.runtime.spawn(async move { center.recover().await });
        }
        ready
    }

    /// Queues `data` for every type of `name`.
    ///
    /// `callback` receives the result map once all types ran (or were
    /// skipped by shutdown). An unregistered `name` is handled per
    /// [`PublishPolicy`]; a payload rejected by the message validator is
    /// always an error.
    pub fn publish(&self, name: &str, data: Value, callback: Option<Callback>) -> Result<(), McenterError> {
        match self.submit(name, data, callback) {
            Err(err @ McenterError::UnregisteredOnPublish { .. })
                if self.inner.config.publish_policy == PublishPolicy::LogAndDrop =>
            {
                warn!(name, error = %err, "publish dropped");
                Ok(())
            }
            other => other.map(|_| ()),
        }
    }

    /// Publishes a typed payload under [`Message::NAME`].
    pub fn publish_typed<M: Message>(&self, message: &M, callback: Option<Callback>) -> Result<(), McenterError> {
        let data = serde_json::to_value(message).map_err(|source| McenterError::Encode {
            name: M::NAME.to_string(),
            source,
        })?;
        self.publish(M::NAME, data, callback)
    }

    /// Publishes and waits for the result map.
    ///
    /// Unregistered names are always an error here, whatever the policy.
    pub async fn publish_and_wait(&self, name: &str, data: Value) -> Result<ResultMap, McenterError> {
        let (tx, rx) = oneshot::channel();
        let callback: Callback = Box::new(move |result: &ResultMap| {
            // the waiter may have given up
            let _ = tx.send(result.clone());
        });

        let id = self.submit(name, data, Some(callback))?;
        rx.await.map_err(|_| McenterError::Abandoned { id: id.to_string() })
    }

    fn submit(&self, name: &str, data: Value, callback: Option<Callback>) -> Result<MessageId, McenterError> {
        let definition = self.inner.registry.read().message(name);
        let Some(definition) = definition else {
            return Err(McenterError::UnregisteredOnPublish { name: name.to_string() });
        };
        definition
            .validate_payload(&data)
            .map_err(|source| McenterError::InvalidPayload {
                name: name.to_string(),
                source,
            })?;

        let id = self.inner.id_generator.generate();
        if self.inner.lifecycle.is_shutting_down() {
            warn!(%id, name, "published while shutting down; item will be parked");
        }
        info!(%id, name, "mcenter.publish");
        self.enqueue(&definition, WorkItem::new(id.clone(), name, data, callback));
        Ok(id)
    }

    // Once `close` took the workers, items are dispatched straight on the
    // runtime so they still reach their callback and get parked.
    fn enqueue(&self, definition: &MessageDefinition, item: WorkItem) {
        definition.mark_pending(&item.result);
        self.inner.lifecycle.track();

        let workers = self.inner.workers.lock();
        if workers.is_some() {
            self.inner.queue.push(item);
            return;
        }
        drop(workers);

        debug!(id = %item.id, name = %item.name, "workers closed, dispatching on the runtime");
        let work = Arc::clone(&self.inner.work);
        self.inner.runtime.spawn(async move { work.run(item).await });
    }

    async fn recover(&self) {
        let result = self
            .inner
            .recovery
            .run(|item| {
                let definition = self.inner.registry.read().message(&item.name);
                match definition {
                    Some(definition) => {
                        self.enqueue(&definition, item);
                        true
                    }
                    None => false,
                }
            })
            .await;

        if let Err(e) = result {
            error!(error = %e, "recovery failed");
        }
    }

    /// Replaces the `error` or `timeout` notifier.
    ///
    /// A panic inside `f` is caught and logged; dispatch carries on.
    pub fn set_notifier<F>(&self, kind: &str, f: F) -> Result<(), McenterError>
    where
        F: Fn(&Notification<'_>) + Send + Sync + 'static,
    {
        let kind: NotifierKind = kind.parse()?;
        self.inner.notifiers.set(kind, Arc::new(f));
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.inner.lifecycle.phase()
    }

    pub fn is_exiting(&self) -> bool {
        self.inner.lifecycle.is_exiting()
    }

    pub fn is_exited(&self) -> bool {
        self.inner.lifecycle.is_exited()
    }

    pub fn get_stats(&self) -> Stats {
        self.inner.registry.read().stats()
    }

    /// `(name, type)` pairs still waiting for a listener.
    pub fn get_unlinked(&self) -> Vec<(String, String)> {
        self.inner.registry.read().unlinked()
    }

    /// Items waiting for a worker.
    pub fn queue_len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Items a worker is currently dispatching.
    pub fn in_flight(&self) -> usize {
        self.inner.queue.running()
    }

    /// Starts a graceful shutdown.
    ///
    /// The center is `Exiting` (or already `Exited`) when this returns; the
    /// future resolves once every accepted item has settled. Items still
    /// buffered on a center that never became ready flow through the
    /// dispatcher, skip every type and are parked.
    pub fn shutdown(&self) -> BoxFuture<'static, ()> {
        begin_shutdown(&self.inner.lifecycle, &self.inner.queue)
    }

    /// The handler handed to a [`ShutdownRegistrar`](crate::ports::ShutdownRegistrar).
    pub(crate) fn shutdown_handler(&self) -> ShutdownHandler {
        let lifecycle = Arc::clone(&self.inner.lifecycle);
        let queue = Arc::clone(&self.inner.queue);
        Box::new(move || begin_shutdown(&lifecycle, &queue))
    }

    /// Stops the workers after their current item. Call after shutdown has
    /// drained.
    pub async fn close(&self) {
        let workers = self.inner.workers.lock().take();
        if let Some(workers) = workers {
            workers.shutdown_and_join().await;
            debug!("mcenter.closed");
        }
    }
}

fn begin_shutdown(lifecycle: &Lifecycle, queue: &DispatchQueue) -> BoxFuture<'static, ()> {
    let drained = lifecycle.begin_shutdown();
    queue.resume();
    async move {
        if let Some(drained) = drained {
            // the sender is dropped only after firing
            let _ = drained.await;
        }
    }
    .boxed()
}
