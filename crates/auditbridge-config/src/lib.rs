//! # auditbridge-config
//!
//! TOML configuration for the audit ledger bridge.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use auditbridge_config::BridgeConfig;
//!
//! let mut config = BridgeConfig::from_file(Path::new("bridge.toml"))?;
//! config.apply_env_overrides();
//! config.validate()?;
//! let settings = config.submitter_settings();
//! ```

pub mod loader;
pub mod model;

pub use loader::{KAFKA_TOPIC_ENV, TOPIC_ENV};
pub use model::{BridgeConfig, IdentitySection, NetworkSection, SourceSection, SubmitSection};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use auditbridge_contracts::error::BridgeError;

    use crate::{BridgeConfig, KAFKA_TOPIC_ENV, TOPIC_ENV};

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = BridgeConfig::from_toml_str("").unwrap();

        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.network.channel, "mychannel");
        assert_eq!(config.network.chaincode_id, "clause");
        assert_eq!(config.network.peers, vec!["grpc://localhost:7051"]);
        assert_eq!(config.identity.user, "user1");
        assert_eq!(config.identity.key_store, PathBuf::from("hfc-key-store"));
        assert_eq!(config.source.topic, "clause-events");
        assert_eq!(config.source.group_id, "clause-hlf");
        assert_eq!(config.submit.max_attempts, 1);
        assert!(config.submit.event_schema.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let toml = r#"
            [network]
            peers = ["grpc://peer0:7051", "grpc://peer1:7051"]

            [submit]
            commit_timeout_secs = 5
            max_attempts = 3
            event_schema = "schemas/audit-event.json"
        "#;

        let config = BridgeConfig::from_toml_str(toml).unwrap();

        assert_eq!(config.network.peers.len(), 2);
        assert_eq!(config.network.orderer, "grpc://localhost:7050");
        assert_eq!(config.submit.commit_timeout_secs, 5);
        assert_eq!(config.submit.send_timeout_secs, 10);
        assert_eq!(
            config.submit.event_schema,
            Some(PathBuf::from("schemas/audit-event.json"))
        );
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = BridgeConfig::from_toml_str("[network\npeers = 3").unwrap_err();
        match err {
            BridgeError::Config { reason } => assert!(reason.contains("failed to parse bridge TOML")),
            other => panic!("expected Config, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_field_type_is_config_error() {
        let result = BridgeConfig::from_toml_str("[submit]\nmax_attempts = \"many\"");
        assert!(matches!(result, Err(BridgeError::Config { .. })));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = BridgeConfig::from_file(std::path::Path::new("/nonexistent/bridge.toml"));
        assert!(matches!(result, Err(BridgeError::Config { .. })));
    }

    #[test]
    fn test_from_file_reads_document() {
        let path = std::env::temp_dir().join(format!("auditbridge-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[source]\ntopic = \"replayed\"\n").unwrap();

        let config = BridgeConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.source.topic, "replayed");
    }

    // ── Overrides ─────────────────────────────────────────────────────────────

    #[test]
    fn test_topic_override() {
        let mut config = BridgeConfig::default();
        config.apply_overrides(|name| (name == TOPIC_ENV).then(|| "audit-replay".to_string()));
        assert_eq!(config.source.topic, "audit-replay");
    }

    #[test]
    fn test_kafka_topic_is_honoured() {
        let mut config = BridgeConfig::default();
        config.apply_overrides(|name| (name == KAFKA_TOPIC_ENV).then(|| "clause-legacy".to_string()));
        assert_eq!(config.source.topic, "clause-legacy");
    }

    #[test]
    fn test_bridge_topic_wins_over_kafka_topic() {
        let mut config = BridgeConfig::default();
        config.apply_overrides(|name| match name {
            TOPIC_ENV => Some("audit-replay".to_string()),
            KAFKA_TOPIC_ENV => Some("clause-legacy".to_string()),
            _ => None,
        });
        assert_eq!(config.source.topic, "audit-replay");

        let mut config = BridgeConfig::default();
        config.apply_overrides(|name| match name {
            TOPIC_ENV => Some(String::new()),
            KAFKA_TOPIC_ENV => Some("clause-legacy".to_string()),
            _ => None,
        });
        assert_eq!(config.source.topic, "clause-legacy");
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let mut config = BridgeConfig::default();
        config.apply_overrides(|_| Some("  ".to_string()));
        assert_eq!(config.source.topic, "clause-events");
    }

    // ── Validation ────────────────────────────────────────────────────────────

    fn assert_rejected(field: &str, mutate: impl Fn(&mut BridgeConfig)) {
        let mut config = BridgeConfig::default();
        mutate(&mut config);
        match config.validate() {
            Err(BridgeError::Config { reason }) => {
                assert!(reason.contains(field), "reason '{}' should name {}", reason, field)
            }
            other => panic!("expected Config error for {}, got {:?}", field, other),
        }
    }

    #[test]
    fn test_validate_rejects_unusable_settings() {
        assert_rejected("peers", |c| c.network.peers.clear());
        assert_rejected("commit_timeout_secs", |c| c.submit.commit_timeout_secs = 0);
        assert_rejected("send_timeout_secs", |c| c.submit.send_timeout_secs = 0);
        assert_rejected("max_attempts", |c| c.submit.max_attempts = 0);
        assert_rejected("topic", |c| c.source.topic.clear());
        assert_rejected("retry_backoff_ms", |c| c.submit.retry_backoff_ms = u64::MAX);
    }

    #[test]
    fn test_largest_backoff_is_accepted() {
        let mut config = BridgeConfig::default();
        config.submit.retry_backoff_ms = 300_000;
        assert!(config.validate().is_ok());
    }

    // ── Conversions ───────────────────────────────────────────────────────────

    #[test]
    fn test_submitter_settings_and_retry_policy() {
        let config = BridgeConfig::from_toml_str(
            "[submit]\ncommit_timeout_secs = 7\nsend_timeout_secs = 2\nmax_attempts = 4\nretry_backoff_ms = 250",
        )
        .unwrap();

        let settings = config.submitter_settings();
        assert_eq!(settings.channel, "mychannel");
        assert_eq!(settings.chaincode_id, "clause");
        assert_eq!(settings.commit_timeout, Duration::from_secs(7));
        assert_eq!(settings.send_timeout, Duration::from_secs(2));

        let retry = config.retry_policy();
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.backoff, Duration::from_millis(250));
    }
}
