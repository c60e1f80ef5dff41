use anyhow::{Context, Result};
use config::{Config, File};
use serde::{Deserialize, Serialize};

use rosterkit::config::{ConnectRetryConfig, DatabaseConfig, ObservabilityConfig};
use rosterkit::types::PageSize;
use rosterkit::RosterError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterTourConfig {
    pub database: DatabaseConfig,
    pub connect_retry: ConnectRetryConfig,
    pub schema: SchemaConfig,
    pub tour: TourConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub create: bool,
    pub replication_factor: u32,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            create: true,
            replication_factor: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TourConfig {
    /// Rows per page for the message walk. Kept tiny so page boundaries show up.
    pub page_size: usize,
    /// Rows per page for every other read.
    pub default_page_size: usize,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            page_size: 2,
            default_page_size: PageSize::DEFAULT.get() as usize,
        }
    }
}

impl TourConfig {
    pub fn page_size(&self) -> Result<PageSize, RosterError> {
        PageSize::new(self.page_size)
    }

    pub fn default_page_size(&self) -> Result<PageSize, RosterError> {
        PageSize::new(self.default_page_size)
    }
}

impl RosterTourConfig {
    pub fn validate(&self) -> Result<(), RosterError> {
        if self.database.hosts.iter().all(|h| h.trim().is_empty()) {
            return Err(RosterError::ConfigError(
                "database.hosts must name at least one contact point".to_string(),
            ));
        }
        if self.database.keyspace.is_empty() {
            return Err(RosterError::ConfigError("database.keyspace is empty".to_string()));
        }
        self.tour.page_size()?;
        self.tour.default_page_size()?;
        Ok(())
    }
}

/// Load settings from `path` (optional), `ROSTER__*` variables, then the
/// `CASSANDRA_HOST` / `CASSANDRA_USER` / `CASSANDRA_PASSWORD` variables.
pub fn load_config(path: &str) -> Result<RosterTourConfig> {
    let hosts = std::env::var("CASSANDRA_HOST").ok().map(|hosts| {
        hosts
            .split(',')
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect::<Vec<_>>()
    });

    let config = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(config::Environment::with_prefix("ROSTER").separator("__"))
        .set_override_option("database.hosts", hosts)?
        .set_override_option("database.username", std::env::var("CASSANDRA_USER").ok())?
        .set_override_option("database.password", std::env::var("CASSANDRA_PASSWORD").ok())?
        .build()
        .with_context(|| format!("failed to read configuration from {}", path))?;

    let config: RosterTourConfig = config.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(yaml: &str) -> RosterTourConfig {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let config = parse("database:\n  hosts: [\"10.1.0.5\"]\n");
        assert_eq!(config.database.hosts, vec!["10.1.0.5".to_string()]);
        assert_eq!(config.database.keyspace, "roster");
        assert_eq!(config.tour.page_size, 2);
        assert!(config.schema.create);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let config = parse("tour:\n  page_size: 0\n");
        assert!(matches!(
            config.validate(),
            Err(RosterError::ValidationError(_))
        ));
    }

    #[test]
    fn test_empty_hosts_are_rejected() {
        let config = parse("database:\n  hosts: []\n");
        assert!(matches!(config.validate(), Err(RosterError::ConfigError(_))));
    }

    #[test]
    fn test_consistency_is_read_from_yaml() {
        let config = parse("database:\n  consistency: local_one\n");
        assert_eq!(
            config.database.consistency,
            rosterkit::types::ConsistencyLevel::LocalOne
        );
    }
}
