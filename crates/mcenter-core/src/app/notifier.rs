//! Notifiers - the `error` and `timeout` hooks of the dispatcher.
//!
//! Both are replaceable at runtime. Whatever is installed runs behind
//! `catch_unwind`, so a misbehaving notifier is logged and the dispatch loop
//! carries on.

use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::MessageId;
use crate::error::{HandlerError, McenterError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifierKind {
    Error,
    Timeout,
}

impl NotifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotifierKind::Error => "error",
            NotifierKind::Timeout => "timeout",
        }
    }
}

impl FromStr for NotifierKind {
    type Err = McenterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(NotifierKind::Error),
            "timeout" => Ok(NotifierKind::Timeout),
            other => Err(McenterError::UnknownNotifierKind {
                kind: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for NotifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a notifier is told about.
#[derive(Debug)]
pub enum Notification<'a> {
    /// A type handler failed (or its result was rejected).
    Error {
        error: &'a HandlerError,
        id: &'a MessageId,
        name: &'a str,
        type_name: &'a str,
        data: &'a Value,
    },
    /// A type handler ran longer than its configured timeout. Purely
    /// observational: the handler was not cancelled.
    Timeout {
        elapsed_ms: u64,
        id: &'a MessageId,
        name: &'a str,
        type_name: &'a str,
    },
}

impl Notification<'_> {
    pub fn kind(&self) -> NotifierKind {
        match self {
            Notification::Error { .. } => NotifierKind::Error,
            Notification::Timeout { .. } => NotifierKind::Timeout,
        }
    }
}

pub type NotifyFn = Arc<dyn Fn(&Notification<'_>) + Send + Sync>;

pub struct Notifiers {
    error: RwLock<NotifyFn>,
    timeout: RwLock<NotifyFn>,
}

impl Notifiers {
    pub fn new() -> Self {
        Self {
            error: RwLock::new(Arc::new(log_error)),
            timeout: RwLock::new(Arc::new(log_timeout)),
        }
    }

    pub fn set(&self, kind: NotifierKind, f: NotifyFn) {
        match kind {
            NotifierKind::Error => *self.error.write() = f,
            NotifierKind::Timeout => *self.timeout.write() = f,
        }
    }

    pub fn notify(&self, notification: &Notification<'_>) {
        let kind = notification.kind();
        let f = match kind {
            NotifierKind::Error => Arc::clone(&self.error.read()),
            NotifierKind::Timeout => Arc::clone(&self.timeout.read()),
        };
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| f(notification))) {
            tracing::error!(
                notifier = %kind,
                panic = %panic_message(panic.as_ref()),
                "notifier panicked"
            );
        }
    }
}

impl Default for Notifiers {
    fn default() -> Self {
        Self::new()
    }
}

fn log_error(notification: &Notification<'_>) {
    if let Notification::Error {
        error,
        id,
        name,
        type_name,
        data,
    } = notification
    {
        tracing::error!(%id, name, type_name, %data, error = %error, "mcenter.error");
    }
}

fn log_timeout(notification: &Notification<'_>) {
    if let Notification::Timeout {
        elapsed_ms,
        id,
        name,
        type_name,
    } = notification
    {
        tracing::info!(%id, name, type_name, elapsed_ms, "mcenter.timeout");
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
