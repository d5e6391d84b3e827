// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::MonitorError;
use forwarder_metrics::datadog::{DdDdUrl, MetricsIntakeUrlPrefix, Site};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SITE: &str = "datadoghq.com";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_METRIC_NAME: &str = "fluentd-kinesis-forwarder-monitor.delay";
pub const DEFAULT_METADATA_URL: &str = "http://169.254.169.254/latest/meta-data/local-ipv4";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Process configuration, resolved once before the first poll.
#[derive(Clone)]
pub struct MonitorConfig {
    /// Forwarder position file to watch (`LOG_FILE_POS`)
    pub checkpoint_path: PathBuf,
    /// Deployment scope reported with every gauge (`ENV_SCOPE`)
    pub scope: String,
    /// Datadog API key (`DD_API_KEY`)
    pub api_key: String,
    /// Datadog site (e.g., datadoghq.com, datadoghq.eu)
    pub site: String,
    /// Intake URL override (`DD_DD_URL`)
    pub dd_url: Option<String>,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub metric_name: String,
    /// Instance metadata endpoint returning the private IPv4 address
    pub metadata_url: String,
    /// Explicit identity (`DD_HOSTNAME`), skipping metadata lookup
    pub hostname: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: PathBuf::new(),
            scope: String::new(),
            api_key: String::new(),
            site: DEFAULT_SITE.to_string(),
            dd_url: None,
            https_proxy: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            metric_name: DEFAULT_METRIC_NAME.to_string(),
            metadata_url: DEFAULT_METADATA_URL.to_string(),
            hostname: None,
        }
    }
}

impl fmt::Debug for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorConfig")
            .field("checkpoint_path", &self.checkpoint_path)
            .field("scope", &self.scope)
            .field("api_key", &"<redacted>")
            .field("site", &self.site)
            .field("dd_url", &self.dd_url)
            .field("https_proxy", &self.https_proxy)
            .field("log_level", &self.log_level)
            .field("poll_interval", &self.poll_interval)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("metric_name", &self.metric_name)
            .field("metadata_url", &self.metadata_url)
            .field("hostname", &self.hostname)
            .finish()
    }
}

impl MonitorConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, MonitorError> {
        let config = Self {
            checkpoint_path: PathBuf::from(required_env("LOG_FILE_POS")?),
            scope: required_env("ENV_SCOPE")?,
            api_key: required_env("DD_API_KEY")?,
            site: env::var("DD_SITE").unwrap_or_else(|_| DEFAULT_SITE.to_string()),
            dd_url: optional_env("DD_DD_URL"),
            https_proxy: optional_env("DD_PROXY_HTTPS").or_else(|| optional_env("HTTPS_PROXY")),
            log_level: env::var("DD_LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
            poll_interval: interval_env("MONITOR_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            heartbeat_interval: interval_env(
                "MONITOR_HEARTBEAT_INTERVAL_SECS",
                DEFAULT_HEARTBEAT_INTERVAL_SECS,
            )?,
            metric_name: optional_env("MONITOR_METRIC_NAME")
                .unwrap_or_else(|| DEFAULT_METRIC_NAME.to_string()),
            metadata_url: optional_env("MONITOR_METADATA_URL")
                .unwrap_or_else(|| DEFAULT_METADATA_URL.to_string()),
            hostname: optional_env("DD_HOSTNAME"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.checkpoint_path.as_os_str().is_empty() {
            return Err(MonitorError::MissingEnv("LOG_FILE_POS"));
        }
        if self.scope.trim().is_empty() {
            return Err(MonitorError::MissingEnv("ENV_SCOPE"));
        }
        if self.api_key.trim().is_empty() {
            return Err(MonitorError::MissingEnv("DD_API_KEY"));
        }

        if self.site.trim().is_empty() {
            return Err(MonitorError::InvalidConfig(
                "DD_SITE cannot be empty".to_string(),
            ));
        }

        if self.poll_interval.is_zero() || self.heartbeat_interval.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "Poll and heartbeat intervals must be greater than 0".to_string(),
            ));
        }

        if self.metric_name.trim().is_empty() {
            return Err(MonitorError::InvalidConfig(
                "MONITOR_METRIC_NAME cannot be empty".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(MonitorError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Where gauges are shipped: `DD_DD_URL` if set, otherwise the site's API host.
    pub fn intake_url_prefix(&self) -> Result<MetricsIntakeUrlPrefix, MonitorError> {
        let site = Site::new(self.site.clone())?;
        let dd_url = self.dd_url.clone().map(DdDdUrl::new).transpose()?;
        Ok(MetricsIntakeUrlPrefix::new(Some(site), dd_url)?)
    }
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|val| !val.trim().is_empty())
}

fn required_env(name: &'static str) -> Result<String, MonitorError> {
    optional_env(name).ok_or(MonitorError::MissingEnv(name))
}

fn interval_env(name: &str, default_secs: u64) -> Result<Duration, MonitorError> {
    match optional_env(name) {
        None => Ok(Duration::from_secs(default_secs)),
        Some(val) => val
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| MonitorError::InvalidConfig(format!("{name}={val:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: [&str; 13] = [
        "LOG_FILE_POS",
        "ENV_SCOPE",
        "DD_API_KEY",
        "DD_SITE",
        "DD_DD_URL",
        "DD_PROXY_HTTPS",
        "HTTPS_PROXY",
        "DD_LOG_LEVEL",
        "MONITOR_POLL_INTERVAL_SECS",
        "MONITOR_HEARTBEAT_INTERVAL_SECS",
        "MONITOR_METRIC_NAME",
        "MONITOR_METADATA_URL",
        "DD_HOSTNAME",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    fn set_required_env() {
        env::set_var("LOG_FILE_POS", "/var/log/td-agent/messages.pos");
        env::set_var("ENV_SCOPE", "production");
        env::set_var("DD_API_KEY", "mock-api-key");
    }

    fn valid_config() -> MonitorConfig {
        MonitorConfig {
            checkpoint_path: PathBuf::from("/var/log/td-agent/messages.pos"),
            scope: "production".to_string(),
            api_key: "mock-api-key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        set_required_env();

        let config = MonitorConfig::from_env().unwrap();
        assert_eq!(
            config.checkpoint_path,
            PathBuf::from("/var/log/td-agent/messages.pos")
        );
        assert_eq!(config.scope, "production");
        assert_eq!(config.api_key, "mock-api-key");
        assert_eq!(config.site, DEFAULT_SITE);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(config.metric_name, DEFAULT_METRIC_NAME);
        assert_eq!(config.metadata_url, DEFAULT_METADATA_URL);
        assert_eq!(config.dd_url, None);
        assert_eq!(config.https_proxy, None);
        assert_eq!(config.hostname, None);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        set_required_env();
        env::set_var("DD_SITE", "datadoghq.eu");
        env::set_var("DD_LOG_LEVEL", "DEBUG");
        env::set_var("MONITOR_POLL_INTERVAL_SECS", "10");
        env::set_var("HTTPS_PROXY", "http://proxy:3128");
        env::set_var("DD_HOSTNAME", "forwarder-1");

        let config = MonitorConfig::from_env().unwrap();
        assert_eq!(config.site, "datadoghq.eu");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.https_proxy.as_deref(), Some("http://proxy:3128"));
        assert_eq!(config.hostname.as_deref(), Some("forwarder-1"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_missing_required() {
        clear_env();
        env::set_var("ENV_SCOPE", "production");
        env::set_var("DD_API_KEY", "mock-api-key");

        let err = MonitorConfig::from_env().unwrap_err();
        assert!(matches!(err, MonitorError::MissingEnv("LOG_FILE_POS")));

        env::set_var("LOG_FILE_POS", "");
        let err = MonitorConfig::from_env().unwrap_err();
        assert!(matches!(err, MonitorError::MissingEnv("LOG_FILE_POS")));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_interval() {
        clear_env();
        set_required_env();
        env::set_var("MONITOR_POLL_INTERVAL_SECS", "soon");
        assert!(matches!(
            MonitorConfig::from_env(),
            Err(MonitorError::InvalidConfig(_))
        ));

        env::set_var("MONITOR_POLL_INTERVAL_SECS", "0");
        assert!(matches!(
            MonitorConfig::from_env(),
            Err(MonitorError::InvalidConfig(_))
        ));
        clear_env();
    }

    #[test]
    fn test_default_config_requires_checkpoint() {
        assert!(matches!(
            MonitorConfig::default().validate(),
            Err(MonitorError::MissingEnv("LOG_FILE_POS"))
        ));
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = MonitorConfig {
            log_level: "invalid".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_site() {
        let config = MonitorConfig {
            site: "   ".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_intake_url_prefix() {
        let prefix = valid_config().intake_url_prefix().unwrap();
        assert_eq!(
            prefix.series_url(),
            "https://api.datadoghq.com/api/v2/series"
        );

        let config = MonitorConfig {
            dd_url: Some("http://127.0.0.1:9000/".to_string()),
            ..valid_config()
        };
        assert_eq!(
            config.intake_url_prefix().unwrap().series_url(),
            "http://127.0.0.1:9000/api/v2/series"
        );

        let config = MonitorConfig {
            dd_url: Some("127.0.0.1:9000".to_string()),
            ..valid_config()
        };
        assert!(matches!(
            config.intake_url_prefix(),
            Err(MonitorError::Intake(_))
        ));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let rendered = format!("{:?}", valid_config());
        assert!(!rendered.contains("mock-api-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
