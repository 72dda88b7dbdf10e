//! ShutdownRegistrar port - the host process's graceful-exit hook.

use futures::future::BoxFuture;

/// Called once when the host starts shutting down.
///
/// Calling it flips the center into `Exiting` synchronously; the returned
/// future resolves once in-flight work has drained.
pub type ShutdownHandler = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Accepts the single shutdown handler of a message center.
///
/// The host must not terminate before the handler's future resolves.
pub trait ShutdownRegistrar: Send + Sync {
    fn on_shutdown(&self, handler: ShutdownHandler);
}
