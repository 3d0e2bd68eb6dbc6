use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogShipperConfig {
    /// When false, records are only written to the local log.
    pub enabled: bool,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub index: String,
    pub timeout_ms: u64,
    /// Records waiting for delivery; further records are dropped.
    pub queue_capacity: usize,
    /// How long shutdown keeps delivering queued records before dropping
    /// the rest.
    pub drain_timeout_ms: u64,
}

impl Default for LogShipperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scheme: "http".to_string(),
            host: "elasticsearch".to_string(),
            port: 9200,
            index: "python-logs".to_string(),
            timeout_ms: 2000,
            queue_capacity: 1024,
            drain_timeout_ms: 5000,
        }
    }
}

impl LogShipperConfig {
    /// Document ingestion endpoint of the configured index.
    pub fn endpoint(&self) -> String {
        format!(
            "{}://{}:{}/{}/_doc",
            self.scheme, self.host, self.port, self.index
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let config = LogShipperConfig::default();
        assert_eq!(
            config.endpoint(),
            "http://elasticsearch:9200/python-logs/_doc"
        );
        assert_eq!(config.timeout(), Duration::from_secs(2));
        assert_eq!(config.drain_timeout(), Duration::from_secs(5));
    }
}
