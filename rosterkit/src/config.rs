use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::ConsistencyLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub hosts: Vec<String>,
    pub port: u16,
    pub keyspace: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connection_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub pool_size: u32,
    pub consistency: ConsistencyLevel,
    pub speculative_execution: bool,
    pub speculative_delay_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["localhost".to_string()],
            port: 9042,
            keyspace: "roster".to_string(),
            username: None,
            password: None,
            connection_timeout_secs: 5,
            request_timeout_secs: 10,
            pool_size: 4,
            consistency: ConsistencyLevel::Quorum,
            speculative_execution: false,
            speculative_delay_ms: 50,
        }
    }
}

impl DatabaseConfig {
    /// Contact points in `host:port` form. Hosts that already carry a port are kept as-is.
    pub fn contact_points(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|host| {
                if host.contains(':') {
                    host.clone()
                } else {
                    format!("{}:{}", host, self.port)
                }
            })
            .collect()
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) if !username.is_empty() => {
                Some((username.as_str(), password.as_str()))
            }
            _ => None,
        }
    }
}

/// Startup connection retries. `max_attempts = 0` keeps trying forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectRetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff: f64,
}

impl Default for ConnectRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            delay_ms: 1000,
            max_delay_ms: 1000,
            backoff: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
