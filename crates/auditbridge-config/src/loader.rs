//! Loading, overriding, and validating a `BridgeConfig`.
//!
//! Order of precedence: built-in defaults, then the TOML document, then
//! environment overrides. `validate` runs last and rejects settings the
//! submission pipeline cannot work with.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use auditbridge_contracts::error::{BridgeError, BridgeResult};
use auditbridge_core::{RetryPolicy, SubmitterSettings, MAX_BACKOFF};

use crate::model::BridgeConfig;

/// Environment variable that replaces `source.topic`.
pub const TOPIC_ENV: &str = "BRIDGE_TOPIC";

/// Topic variable read by existing consumer deployments. Used when
/// `TOPIC_ENV` is unset or empty.
pub const KAFKA_TOPIC_ENV: &str = "KAFKA_TOPIC";

impl BridgeConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `BridgeError::Config` if the TOML is malformed or a field has
    /// the wrong type. Missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> BridgeResult<Self> {
        toml::from_str(s).map_err(|e| BridgeError::Config {
            reason: format!("failed to parse bridge TOML: {}", e),
        })
    }

    /// Read the file at `path` and parse it as TOML.
    pub fn from_file(path: &Path) -> BridgeResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| BridgeError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let config = Self::from_toml_str(&contents)?;
        info!(path = %path.display(), "loaded bridge configuration");
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let topic = [TOPIC_ENV, KAFKA_TOPIC_ENV].into_iter().find_map(|variable| {
            lookup(variable)
                .filter(|t| !t.trim().is_empty())
                .map(|t| (variable, t))
        });
        if let Some((variable, topic)) = topic {
            debug!(variable, topic = %topic, "overriding source topic");
            self.source.topic = topic;
        }
    }

    /// Reject settings the bridge cannot run with.
    pub fn validate(&self) -> BridgeResult<()> {
        let fail = |reason: &str| {
            Err(BridgeError::Config {
                reason: reason.to_string(),
            })
        };

        if self.network.peers.is_empty() {
            return fail("network.peers must list at least one peer");
        }
        if self.network.channel.is_empty() || self.network.chaincode_id.is_empty() {
            return fail("network.channel and network.chaincode_id must be set");
        }
        if self.submit.commit_timeout_secs == 0 {
            return fail("submit.commit_timeout_secs must be greater than zero");
        }
        if self.submit.send_timeout_secs == 0 {
            return fail("submit.send_timeout_secs must be greater than zero");
        }
        if self.submit.max_attempts == 0 {
            return fail("submit.max_attempts must be at least 1");
        }
        if self.submit.retry_backoff_ms > MAX_BACKOFF.as_millis() as u64 {
            return Err(BridgeError::Config {
                reason: format!(
                    "submit.retry_backoff_ms must not exceed {}",
                    MAX_BACKOFF.as_millis()
                ),
            });
        }
        if self.source.topic.is_empty() {
            return fail("source.topic must be set");
        }
        Ok(())
    }

    pub fn submitter_settings(&self) -> SubmitterSettings {
        SubmitterSettings {
            channel: self.network.channel.clone(),
            chaincode_id: self.network.chaincode_id.clone(),
            commit_timeout: Duration::from_secs(self.submit.commit_timeout_secs),
            send_timeout: Duration::from_secs(self.submit.send_timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.submit.max_attempts,
            Duration::from_millis(self.submit.retry_backoff_ms),
        )
    }
}
