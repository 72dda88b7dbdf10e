//! Message definitions: what a message name requires before it counts as handled.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::stats::TypeStats;
use super::item::ResultMap;
use crate::error::ValidationError;
use crate::ports::Validator;

/// One processing step a message needs.
///
/// ```ignore
/// TypeSpec::new("save")
///     .timeout(Duration::from_millis(30))
///     .validator(|v: &serde_json::Value| ...);
/// ```
#[derive(Clone)]
pub struct TypeSpec {
    name: String,
    timeout: Option<Duration>,
    validator: Option<Arc<dyn Validator>>,
}

impl TypeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: None,
            validator: None,
        }
    }

    /// Threshold for the `timeout` notifier. Zero means unlimited.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn timeout_ms(self, ms: u64) -> Self {
        self.timeout(Duration::from_millis(ms))
    }

    /// Validator applied to the handler's return value.
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout_limit(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn validate_result(&self, value: &serde_json::Value) -> Result<(), ValidationError> {
        match &self.validator {
            Some(v) => v.validate(value),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSpec")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// A type spec plus the counters kept for it.
#[derive(Debug)]
pub struct RegisteredType {
    pub spec: TypeSpec,
    pub stats: TypeStats,
}

/// A registered message: payload validator and the ordered type list.
pub struct MessageDefinition {
    name: String,
    validator: Option<Arc<dyn Validator>>,
    types: Vec<RegisteredType>,
    type_names: HashSet<String>,
}

impl MessageDefinition {
    /// A type named more than once is kept at its first position; its listener
    /// slot is shared, so a second `subscribe` for it fails.
    pub fn new(name: impl Into<String>, validator: Option<Arc<dyn Validator>>, types: Vec<TypeSpec>) -> Self {
        let mut type_names = HashSet::with_capacity(types.len());
        let types = types
            .into_iter()
            .filter(|spec| type_names.insert(spec.name().to_string()))
            .map(|spec| RegisteredType {
                spec,
                stats: TypeStats::default(),
            })
            .collect();

        Self {
            name: name.into(),
            validator,
            types,
            type_names,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &[RegisteredType] {
        &self.types
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.type_names.contains(type_name)
    }

    pub fn validate_payload(&self, data: &serde_json::Value) -> Result<(), ValidationError> {
        match &self.validator {
            Some(v) => v.validate(data),
            None => Ok(()),
        }
    }

    /// Counts one more pending run for every type not already in `result`.
    pub fn mark_pending(&self, result: &ResultMap) {
        for t in &self.types {
            if !result.contains_key(t.spec.name()) {
                t.stats.enqueued();
            }
        }
    }
}

impl fmt::Debug for MessageDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDefinition")
            .field("name", &self.name)
            .field("validator", &self.validator.is_some())
            .field("types", &self.types)
            .finish()
    }
}
