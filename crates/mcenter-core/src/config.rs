//! Config - message center settings.
//!
//! Layering, lowest first:
//! 1. built-in defaults
//! 2. an optional file (TOML / JSON / YAML, by extension)
//! 3. `MCENTER_*` environment variables, e.g. `MCENTER_MAX_CONCURRENCY=4`

use serde::Deserialize;
use std::path::Path;

use crate::error::McenterError;

pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_STORE_KEY: &str = "mcenter";
pub const ENV_PREFIX: &str = "MCENTER";

/// What `publish` does with an unregistered name. A payload rejected by the
/// message validator is always returned as an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishPolicy {
    /// Log the problem and drop the message; `publish` returns `Ok`.
    #[default]
    LogAndDrop,
    /// Return the error to the caller.
    Raise,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker count. Values below 1 are treated as 1.
    pub max_concurrency: usize,
    /// Store bucket for items interrupted by shutdown.
    pub store_key: String,
    pub publish_policy: PublishPolicy,
    /// Store bucket for parked records that fail to parse, or name an
    /// unregistered message, during recovery. Unset means such records are
    /// logged and dropped.
    pub dead_letter_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            store_key: DEFAULT_STORE_KEY.to_string(),
            publish_policy: PublishPolicy::default(),
            dead_letter_key: None,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self, McenterError> {
        Self::load_with(path, config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with(path: Option<&Path>, env: config::Environment) -> Result<Self, McenterError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let loaded = builder
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(loaded)
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    pub fn with_store_key(mut self, key: impl Into<String>) -> Self {
        self.store_key = key.into();
        self
    }

    pub fn with_publish_policy(mut self, policy: PublishPolicy) -> Self {
        self.publish_policy = policy;
        self
    }

    pub fn with_dead_letter_key(mut self, key: impl Into<String>) -> Self {
        self.dead_letter_key = Some(key.into());
        self
    }

    /// Worker count actually used.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(source))
    }

    #[test]
    fn defaults_without_sources() {
        let cfg = Config::load_with(None, env(&[])).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.max_concurrency, 10);
        assert_eq!(cfg.store_key, "mcenter");
        assert_eq!(cfg.publish_policy, PublishPolicy::LogAndDrop);
    }

    #[test]
    fn file_then_environment() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_concurrency = 4\nstore_key = \"from-file\"\npublish_policy = \"raise\"").unwrap();

        let cfg = Config::load_with(Some(file.path()), env(&[("MCENTER_STORE_KEY", "from-env")])).unwrap();
        assert_eq!(cfg.max_concurrency, 4);
        assert_eq!(cfg.store_key, "from-env");
        assert_eq!(cfg.publish_policy, PublishPolicy::Raise);
        assert_eq!(cfg.dead_letter_key, None);
    }

    #[test]
    fn environment_values_are_parsed() {
        let cfg = Config::load_with(
            None,
            env(&[("MCENTER_MAX_CONCURRENCY", "3"), ("MCENTER_DEAD_LETTER_KEY", "mcenter:dead")]),
        )
        .unwrap();
        assert_eq!(cfg.max_concurrency, 3);
        assert_eq!(cfg.dead_letter_key.as_deref(), Some("mcenter:dead"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load_with(Some(Path::new("/nonexistent/mcenter.toml")), env(&[])).unwrap_err();
        assert!(matches!(err, McenterError::Config(_)));
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(16, 16)]
    fn concurrency_has_a_floor_of_one(#[case] configured: usize, #[case] used: usize) {
        assert_eq!(Config::default().with_max_concurrency(configured).concurrency(), used);
    }
}
