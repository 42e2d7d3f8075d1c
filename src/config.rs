//! Balancer configuration
//!
//! Where the statistics daemon lives, how long to wait for it, and the scoring
//! constants. Loadable from YAML:
//!
//! ```yaml
//! host: localhost
//! port: 44444
//! timeout_ms: 1000
//! policy:
//!   high_cpu_threshold: 75.0
//!   cpu_margin: 2.0
//!   margin_adjustment: 0.0
//! ```
//!
//! or from the environment (`CFBALANCE_HOST`, `CFBALANCE_PORT`, `CFBALANCE_TIMEOUT_MS`).
//! Running the daemon on a remote machine is possible but its "local" record will
//! then describe the wrong node.

use crate::error::ErrorContext;
use crate::scoring::ScoringPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 44444;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

pub const ENV_HOST: &str = "CFBALANCE_HOST";
pub const ENV_PORT: &str = "CFBALANCE_PORT";
pub const ENV_TIMEOUT_MS: &str = "CFBALANCE_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    pub host: String,
    pub port: u16,
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
    pub policy: ScoringPolicy,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            policy: ScoringPolicy::default(),
        }
    }
}

impl BalancerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `host:port` of the statistics daemon.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "daemon host must not be empty",
                ErrorContext::new()
                    .with_field_path("host")
                    .with_source("config_loader"),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::configuration_with_context(
                "timeout must be greater than zero",
                ErrorContext::new()
                    .with_field_path("timeout_ms")
                    .with_source("config_loader"),
            ));
        }
        self.policy.validate()
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(content).map_err(|e| {
            Error::configuration_with_context(
                format!("Failed to parse config: {}", e),
                ErrorContext::new().with_source("config_loader"),
            )
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("Failed to read config: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("config_loader"),
            )
        })?;
        Self::from_yaml_str(&content)
    }

    /// Defaults overlaid with `CFBALANCE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup. Unparsable values are errors, not ignored.
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = parse_env(ENV_PORT, &port)?;
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS) {
            self.timeout = Duration::from_millis(parse_env(ENV_TIMEOUT_MS, &ms)?);
        }
        self.validate()?;
        Ok(self)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        Error::configuration_with_context(
            format!("invalid value '{}'", value),
            ErrorContext::new()
                .with_field_path(format!("env.{}", key))
                .with_source("config_loader"),
        )
    })
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let cfg = BalancerConfig::default();
        assert_eq!(cfg.addr(), "localhost:44444");
        assert_eq!(cfg.timeout, Duration::from_secs(1));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_partial() {
        let cfg = BalancerConfig::from_yaml_str(
            "host: stats.internal\ntimeout_ms: 250\npolicy:\n  cpu_margin: 5.0\n",
        )
        .unwrap();
        assert_eq!(cfg.host, "stats.internal");
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.timeout, Duration::from_millis(250));
        assert_eq!(cfg.policy.cpu_margin, 5.0);
        assert_eq!(cfg.policy.net_margin, 10.0);
        assert_eq!(cfg.policy.margin_adjustment, 0.0);
    }

    #[test]
    fn test_from_yaml_margin_adjustment() {
        let cfg = BalancerConfig::from_yaml_str("policy:\n  margin_adjustment: 6.5\n").unwrap();
        assert_eq!(cfg.policy.margin_adjustment, 6.5);
        assert_eq!(cfg.policy.cpu_margin, 2.0);

        let err = BalancerConfig::from_yaml_str("policy:\n  margin_adjustment: -1.0\n")
            .unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("policy.margin_adjustment")
        );
    }

    #[test]
    fn test_from_yaml_rejects_zero_timeout() {
        let err = BalancerConfig::from_yaml_str("timeout_ms: 0\n").unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("timeout_ms")
        );
    }

    #[test]
    fn test_from_yaml_syntax_error() {
        assert!(BalancerConfig::from_yaml_str("port: [not a port").is_err());
    }

    #[test]
    fn test_overlay_applies_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_HOST, "10.0.0.5"),
            (ENV_PORT, "5555"),
            (ENV_TIMEOUT_MS, "300"),
        ]
        .into_iter()
        .collect();
        let cfg = BalancerConfig::default()
            .overlay(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.addr(), "10.0.0.5:5555");
        assert_eq!(cfg.timeout, Duration::from_millis(300));
    }

    #[test]
    fn test_overlay_rejects_bad_port() {
        let err = BalancerConfig::default()
            .overlay(|k| (k == ENV_PORT).then(|| "99999".to_string()))
            .unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("env.CFBALANCE_PORT")
        );
    }

    #[test]
    fn test_yaml_roundtrip_keeps_timeout_in_ms() {
        let cfg = BalancerConfig::new().with_timeout(Duration::from_millis(1500));
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        assert!(yaml.contains("timeout_ms: 1500"));
    }
}
