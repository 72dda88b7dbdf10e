//! MessageRegistry - registered messages, the subscription table and the
//! readiness counter.
//!
//! Built during setup (`register` / `subscribe`), read by publish and dispatch.
//! The registry itself holds no lock; the center wraps it in one.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::{MessageDefinition, TypeSpec, TypeStatsSnapshot};
use crate::error::McenterError;
use crate::ports::Validator;
use crate::typed::Listener;

/// Per message, per type counters.
pub type Stats = BTreeMap<String, BTreeMap<String, TypeStatsSnapshot>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ListenerKey {
    name: String,
    type_name: String,
}

impl ListenerKey {
    fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
        }
    }
}

#[derive(Default)]
pub struct MessageRegistry {
    messages: HashMap<String, Arc<MessageDefinition>>,
    /// Registration order, for reports.
    order: Vec<String>,
    listeners: HashMap<ListenerKey, Arc<dyn Listener>>,
    /// `(name, type)` pairs still lacking a listener.
    unlinked: usize,
    ready: bool,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of messages registered so far (1-based).
    pub fn register(
        &mut self,
        name: &str,
        validator: Option<Arc<dyn Validator>>,
        types: Vec<TypeSpec>,
    ) -> Result<usize, McenterError> {
        if self.ready {
            return Err(McenterError::RegisterAfterReady {
                name: name.to_string(),
            });
        }
        if self.messages.contains_key(name) {
            return Err(McenterError::DuplicateRegistration {
                name: name.to_string(),
            });
        }

        let definition = MessageDefinition::new(name, validator, types);
        self.unlinked += definition.type_count();
        self.messages.insert(name.to_string(), Arc::new(definition));
        self.order.push(name.to_string());

        Ok(self.messages.len())
    }

    /// Binds `listener` to `(name, type_name)`. Leaves the registry untouched on error.
    pub fn subscribe(
        &mut self,
        name: &str,
        type_name: &str,
        listener: Arc<dyn Listener>,
    ) -> Result<(), McenterError> {
        let Some(definition) = self.messages.get(name) else {
            return Err(McenterError::UnregisteredMessage {
                name: name.to_string(),
            });
        };
        if !definition.has_type(type_name) {
            return Err(McenterError::UnknownType {
                name: name.to_string(),
                type_name: type_name.to_string(),
            });
        }

        let key = ListenerKey::new(name, type_name);
        if self.listeners.contains_key(&key) {
            return Err(McenterError::DuplicateSubscription {
                name: name.to_string(),
                type_name: type_name.to_string(),
            });
        }

        self.listeners.insert(key, listener);
        self.unlinked -= 1;
        Ok(())
    }

    pub fn message(&self, name: &str) -> Option<Arc<MessageDefinition>> {
        self.messages.get(name).cloned()
    }

    pub fn listener(&self, name: &str, type_name: &str) -> Option<Arc<dyn Listener>> {
        self.listeners.get(&ListenerKey::new(name, type_name)).cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn unlinked_count(&self) -> usize {
        self.unlinked
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Closes registration once nothing is unlinked.
    ///
    /// Returns `true` only for the call that performs the transition.
    pub fn mark_ready(&mut self) -> bool {
        if self.ready || self.unlinked != 0 {
            return false;
        }
        self.ready = true;
        true
    }

    /// `(name, type)` pairs without a listener, in registration order.
    pub fn unlinked(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|name| self.messages.get(name))
            .flat_map(|def| {
                def.types()
                    .iter()
                    .filter(move |t| !self.listeners.contains_key(&ListenerKey::new(def.name(), t.spec.name())))
                    .map(move |t| (def.name().to_string(), t.spec.name().to_string()))
            })
            .collect()
    }

    pub fn stats(&self) -> Stats {
        self.messages
            .iter()
            .map(|(name, def)| {
                let per_type = def
                    .types()
                    .iter()
                    .map(|t| (t.spec.name().to_string(), t.stats.snapshot()))
                    .collect();
                (name.clone(), per_type)
            })
            .collect()
    }
}
