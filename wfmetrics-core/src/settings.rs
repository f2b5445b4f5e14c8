use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::time::Duration;

/// Server value which routes every request summary to the local log instead
/// of sending points to Wavefront.
pub const DEBUG_SERVER_NAME: &str = "debug";

pub type Tags = BTreeMap<String, String>;

/// Configures the direct ingestion sender to Wavefront and the naming of the
/// emitted metrics.
#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
#[readonly::make]
pub struct MetricsConfig {
    /// Wavefront URL of the form https://<INSTANCE>.wavefront.com, or
    /// [`DEBUG_SERVER_NAME`].
    #[serde(alias = "endpoint", default = "default_server")]
    pub server: String,
    /// Wavefront API token with direct data ingestion permission.
    #[serde(
        alias = "credential",
        default = "default_token",
        deserialize_with = "deserialize_token"
    )]
    pub token: SecretString,
    /// Max number of points sent per flush.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Max number of points buffered before new points are dropped.
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,
    /// Interval (in seconds) at which to flush data to Wavefront.
    #[serde(default = "default_flush_interval")]
    pub flush_interval: u64,
    /// Name of the app that emits metrics.
    #[serde(default)]
    pub source: String,
    /// Prefix added to all metric names.
    #[serde(default)]
    pub metric_prefix: String,
    /// Tags attached to every point.
    #[serde(default)]
    pub point_tags: Tags,
}

fn default_server() -> String {
    DEBUG_SERVER_NAME.to_string()
}

fn default_token() -> SecretString {
    SecretString::from(String::new())
}

fn deserialize_token<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    let token = String::deserialize(deserializer)?;
    Ok(SecretString::from(token))
}

fn default_batch_size() -> usize {
    10_000
}

fn default_max_buffer_size() -> usize {
    50_000
}

fn default_flush_interval() -> u64 {
    1
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            token: default_token(),
            batch_size: default_batch_size(),
            max_buffer_size: default_max_buffer_size(),
            flush_interval: default_flush_interval(),
            source: String::new(),
            metric_prefix: String::new(),
            point_tags: Tags::new(),
        }
    }
}

impl MetricsConfig {
    pub fn new(server: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            token: SecretString::from(token.into()),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_metric_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metric_prefix = prefix.into();
        self
    }

    pub fn with_point_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.point_tags.insert(key.into(), value.into());
        self
    }

    pub fn with_batching(mut self, batch_size: usize, max_buffer_size: usize) -> Self {
        self.batch_size = batch_size;
        self.max_buffer_size = max_buffer_size;
        self
    }

    pub fn with_flush_interval(mut self, seconds: u64) -> Self {
        self.flush_interval = seconds;
        self
    }

    /// True when the server is the debug sentinel (case-insensitive).
    pub fn is_debug(&self) -> bool {
        self.server.trim().eq_ignore_ascii_case(DEBUG_SERVER_NAME)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval)
    }

    pub fn expose_token(&self) -> &str {
        self.token.expose_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_select_debug_mode() {
        let config = MetricsConfig::default();
        assert!(config.is_debug());
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.max_buffer_size, 50_000);
        assert_eq!(config.flush_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_debug_sentinel_is_case_insensitive() {
        assert!(MetricsConfig::new("DEBUG", "").is_debug());
        assert!(MetricsConfig::new(" debug ", "").is_debug());
        assert!(!MetricsConfig::new("https://try.wavefront.com", "t").is_debug());
    }

    #[test]
    fn test_token_is_not_printed() {
        let config = MetricsConfig::new("https://try.wavefront.com", "super-secret-token");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret-token"));
        assert_eq!(config.expose_token(), "super-secret-token");
    }

    #[test]
    fn test_builder_helpers() {
        let config = MetricsConfig::new("debug", "")
            .with_source("my-app")
            .with_metric_prefix("my.awesome.app")
            .with_point_tag("env", "dev")
            .with_batching(10, 100)
            .with_flush_interval(5);

        assert_eq!(config.source, "my-app");
        assert_eq!(config.metric_prefix, "my.awesome.app");
        assert_eq!(config.point_tags.get("env").map(String::as_str), Some("dev"));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_buffer_size, 100);
        assert_eq!(config.flush_interval(), Duration::from_secs(5));
    }
}
