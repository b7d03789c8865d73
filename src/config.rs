//! Registry configuration.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// What happens to entries and event names left empty by `unregister`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Drop entries without callbacks, then drop the event name once its
    /// subscription set is empty.
    #[default]
    Prune,
    /// Keep empty entries and empty subscription sets in place.
    ///
    /// Only the global clear removes event names under this policy.
    Retain,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Cleanup behavior after removals.
    pub removal_policy: RemovalPolicy,
    /// Buffer capacity for channel subscriptions.
    pub stream_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            removal_policy: RemovalPolicy::Prune,
            stream_capacity: 1024,
        }
    }
}

impl RegistryConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ValidationError> {
        let cfg: Self = serde_json::from_str(raw).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })?;

        if cfg.stream_capacity == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "stream_capacity must be at least 1".to_string(),
            });
        }

        Ok(cfg)
    }

    /// Set the removal policy.
    #[must_use]
    pub const fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    /// Set the channel subscription capacity (clamped to at least 1).
    #[must_use]
    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_prune_with_buffered_streams() {
        let cfg = RegistryConfig::default();
        assert_eq!(cfg.removal_policy, RemovalPolicy::Prune);
        assert_eq!(cfg.stream_capacity, 1024);
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let cfg = RegistryConfig::from_json(r#"{"removal_policy":"retain"}"#).unwrap();
        assert_eq!(cfg.removal_policy, RemovalPolicy::Retain);
        assert_eq!(cfg.stream_capacity, 1024);

        let cfg = RegistryConfig::from_json("{}").unwrap();
        assert_eq!(cfg, RegistryConfig::default());
    }

    #[test]
    fn from_json_rejects_bad_input() {
        let err = RegistryConfig::from_json(r#"{"removal_policy":"sometimes"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidConfig { .. }));

        let err = RegistryConfig::from_json(r#"{"stream_capacity":0}"#).unwrap_err();
        assert!(format!("{err}").contains("stream_capacity"));
    }

    #[test]
    fn builder_methods_clamp_capacity() {
        let cfg = RegistryConfig::default()
            .with_removal_policy(RemovalPolicy::Retain)
            .with_stream_capacity(0);
        assert_eq!(cfg.removal_policy, RemovalPolicy::Retain);
        assert_eq!(cfg.stream_capacity, 1);
    }
}
