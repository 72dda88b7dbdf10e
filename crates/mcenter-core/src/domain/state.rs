//! Lifecycle phase of a message center.

/// `Running -> Exiting -> Exited`. `Exited` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Dispatching normally.
    Running,
    /// Shutdown requested; no new type runs start, in-flight items drain.
    Exiting,
    /// Drain finished.
    Exited,
}

impl Phase {
    /// Whether a shutdown has been requested, finished or not.
    pub fn is_shutting_down(self) -> bool {
        !matches!(self, Phase::Running)
    }
}
