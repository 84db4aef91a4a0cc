use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub queue: QueueConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    Redis,
    Memory,
}

impl std::str::FromStr for QueueBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(QueueBackend::Redis),
            "memory" => Ok(QueueBackend::Memory),
            other => bail!("unknown QUEUE_BACKEND '{}' (expected 'redis' or 'memory')", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    pub redis_url: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub results_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (environment, test map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            server: ServerConfig {
                port: get("PORT", "5000")
                    .parse()
                    .context("PORT must be a port number")?,
                host: get("HOST", "0.0.0.0"),
                max_upload_bytes: get("MAX_UPLOAD_BYTES", "26214400")
                    .parse()
                    .context("MAX_UPLOAD_BYTES must be a byte count")?,
            },
            queue: QueueConfig {
                backend: get("QUEUE_BACKEND", "redis").parse()?,
                redis_url: get("REDIS_URL", "redis://localhost:6379"),
                name: get("QUEUE_NAME", "queue"),
            },
            storage: StorageConfig {
                results_dir: PathBuf::from(get("RESULTS_DIR", "./results")),
            },
            logging: LoggingConfig {
                log_dir: lookup("LOG_DIR").filter(|d| !d.is_empty()).map(PathBuf::from),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.queue.backend, QueueBackend::Redis);
        assert_eq!(config.queue.name, "queue");
        assert_eq!(config.storage.results_dir, PathBuf::from("./results"));
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("QUEUE_BACKEND", "Memory"),
            ("QUEUE_NAME", "work"),
            ("LOG_DIR", "/tmp/logs"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.queue.backend, QueueBackend::Memory);
        assert_eq!(config.queue.name, "work");
        assert_eq!(config.logging.log_dir, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(Config::from_lookup(lookup(&[("PORT", "not-a-port")])).is_err());
        assert!(Config::from_lookup(lookup(&[("QUEUE_BACKEND", "kafka")])).is_err());
    }
}
