//! Server configuration file handling
//!
//! Reads and writes `<data_dir>/config.yaml` for persistent server
//! settings. CLI flags override file values, which override defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persistent server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port the HTTP server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Directory for the instance registry and this config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Allowed CORS origins; empty means permissive (development)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Bounded wait for a store lock before LockTimeout
    #[serde(default = "default_lock_acquire_timeout_ms")]
    pub lock_acquire_timeout_ms: u64,

    /// Age after which a foreign lock file is considered abandoned
    #[serde(default = "default_lock_stale_after_ms")]
    pub lock_stale_after_ms: u64,
}

fn default_port() -> u16 {
    4680
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_lock_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_lock_stale_after_ms() -> u64 {
    30_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            data_dir: None,
            cors_origins: Vec::new(),
            lock_acquire_timeout_ms: default_lock_acquire_timeout_ms(),
            lock_stale_after_ms: default_lock_stale_after_ms(),
        }
    }
}

/// Configuration file manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager rooted at the server data dir
    pub fn new(data_dir: &Path) -> Self {
        Self::with_path(data_dir.join("config.yaml"))
    }

    /// Create a config manager for an explicit config file path
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Check if config file exists
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    /// Read config from file, returning defaults if not found
    pub fn read(&self) -> Result<ServerConfig, String> {
        if !self.config_path.exists() {
            return Ok(ServerConfig::default());
        }

        let content = std::fs::read_to_string(&self.config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        serde_yaml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Write config to file
    pub fn write(&self, config: &ServerConfig) -> Result<(), String> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(&self.config_path, content)
            .map_err(|e| format!("Failed to write config file: {}", e))
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

/// Merge file config with CLI overrides; CLI values win when present
pub fn merge_config(
    file_config: &ServerConfig,
    port: Option<u16>,
    bind: Option<&str>,
    data_dir: Option<&Path>,
    cors_origins: &[String],
) -> ServerConfig {
    ServerConfig {
        port: port.unwrap_or(file_config.port),
        bind: bind
            .map(|s| s.to_string())
            .unwrap_or_else(|| file_config.bind.clone()),
        data_dir: data_dir
            .map(|p| p.to_path_buf())
            .or_else(|| file_config.data_dir.clone()),
        cors_origins: if cors_origins.is_empty() {
            file_config.cors_origins.clone()
        } else {
            cors_origins.to_vec()
        },
        lock_acquire_timeout_ms: file_config.lock_acquire_timeout_ms,
        lock_stale_after_ms: file_config.lock_stale_after_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_read_defaults_when_missing() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp_dir.path());

        let config = manager.read().unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 4680);
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.lock_acquire_timeout_ms, 5_000);
    }

    #[test]
    fn test_with_path_uses_exact_file() {
        let temp_dir = TempDir::new().unwrap();
        let custom = temp_dir.path().join("custom-config.yaml");
        std::fs::write(&custom, "port: 7100\n").unwrap();

        let manager = ConfigManager::with_path(custom.clone());
        assert_eq!(manager.path(), custom.as_path());
        assert_eq!(manager.read().unwrap().port, 7100);
    }

    #[test]
    fn test_config_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp_dir.path());

        let mut config = ServerConfig::default();
        config.port = 9000;
        config.cors_origins = vec!["http://localhost:5173".to_string()];

        manager.write(&config).unwrap();

        let read_config = manager.read().unwrap();
        assert_eq!(read_config.port, 9000);
        assert_eq!(
            read_config.cors_origins,
            vec!["http://localhost:5173".to_string()]
        );
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp_dir.path());
        std::fs::write(manager.path(), "port: 8088\n").unwrap();

        let config = manager.read().unwrap();
        assert_eq!(config.port, 8088);
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.lock_stale_after_ms, 30_000);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp_dir.path());
        std::fs::write(manager.path(), "port: [not a number\n").unwrap();

        assert!(manager.read().is_err());
    }

    #[test]
    fn test_merge_config_cli_wins() {
        let file_config = ServerConfig {
            port: 9000,
            bind: "0.0.0.0".to_string(),
            cors_origins: vec!["http://file.example".to_string()],
            ..Default::default()
        };

        let merged = merge_config(&file_config, Some(4700), None, None, &[]);

        assert_eq!(merged.port, 4700); // overridden
        assert_eq!(merged.bind, "0.0.0.0"); // from file
        assert_eq!(
            merged.cors_origins,
            vec!["http://file.example".to_string()]
        ); // from file

        let cli_origins = vec!["http://cli.example".to_string()];
        let merged = merge_config(&file_config, None, Some("127.0.0.1"), None, &cli_origins);
        assert_eq!(merged.port, 9000);
        assert_eq!(merged.bind, "127.0.0.1");
        assert_eq!(merged.cors_origins, cli_origins);
    }
}
