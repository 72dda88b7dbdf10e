//! Lifecycle - exiting/exited flags and the outstanding-work counter.
//!
//! State transitions:
//! - Running -> Exiting (shutdown requested, work still outstanding)
//! - Running -> Exited  (shutdown requested on an idle center)
//! - Exiting -> Exited  (the last outstanding item settled)
//!
//! The counter covers every accepted item, queued or running, so the center
//! cannot report `Exited` while an item still sits in the queue.

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::domain::Phase;

struct LifecycleState {
    phase: Phase,
    outstanding: usize,
    drained: Vec<oneshot::Sender<()>>,
}

pub struct Lifecycle {
    state: Mutex<LifecycleState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState {
                phase: Phase::Running,
                outstanding: 0,
                drained: Vec::new(),
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn is_exiting(&self) -> bool {
        self.phase() == Phase::Exiting
    }

    pub fn is_exited(&self) -> bool {
        self.phase() == Phase::Exited
    }

    pub fn is_shutting_down(&self) -> bool {
        self.phase().is_shutting_down()
    }

    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }

    /// An item was accepted into the queue.
    pub fn track(&self) {
        self.state.lock().outstanding += 1;
    }

    /// An item finished dispatch (including any persistence).
    ///
    /// Returns `true` when this call completed a pending shutdown.
    pub fn settle(&self) -> bool {
        let waiters = {
            let mut state = self.state.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
            if state.outstanding != 0 || state.phase != Phase::Exiting {
                return false;
            }
            state.phase = Phase::Exited;
            std::mem::take(&mut state.drained)
        };

        for tx in waiters {
            let _ = tx.send(());
        }
        tracing::info!("mcenter.exited");
        true
    }

    /// Requests shutdown.
    ///
    /// Returns `None` when nothing is outstanding: the center is `Exited`
    /// before this returns. Otherwise the receiver resolves when the last
    /// outstanding item settles.
    pub fn begin_shutdown(&self) -> Option<oneshot::Receiver<()>> {
        let mut state = self.state.lock();
        let outstanding = state.outstanding;
        match state.phase {
            Phase::Exited => None,
            Phase::Running | Phase::Exiting if outstanding == 0 => {
                state.phase = Phase::Exited;
                tracing::info!("mcenter.exited (idle)");
                None
            }
            Phase::Running | Phase::Exiting => {
                state.phase = Phase::Exiting;
                let (tx, rx) = oneshot::channel();
                state.drained.push(tx);
                tracing::info!(outstanding, "mcenter.exiting");
                Some(rx)
            }
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
