//! Configuration schema for the IntelliSphere client.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// File name of the local key/value store when no explicit path is set.
const DEFAULT_STORAGE_FILE: &str = "local-storage.json";

/// Root config for the terminal client.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct IntelliSphereConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl IntelliSphereConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> IntelliSphereConfigBuilder {
        IntelliSphereConfigBuilder::new()
    }
}

/// Builder for assembling an `IntelliSphereConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct IntelliSphereConfigBuilder {
    config: IntelliSphereConfig,
}

impl IntelliSphereConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: IntelliSphereConfig::default(),
        }
    }

    /// Replace the backend connection settings.
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Replace the domain selection settings.
    pub fn client(mut self, client: ClientConfig) -> Self {
        self.config.client = client;
        self
    }

    /// Replace the local storage settings.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Replace the logging settings.
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Finalize and return the built `IntelliSphereConfig`.
    pub fn build(self) -> IntelliSphereConfig {
        self.config
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds; zero disables the timeout.
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: 0,
        }
    }
}

impl ServerConfig {
    /// Per-request timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Default backend address (the Flask development server).
fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

/// Domain selection inputs.
///
/// `domain` plays the role of an injected value; `page_url` is consulted only
/// when no domain is injected.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
}

/// Local key/value store location.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageConfig {
    /// Resolve the store file, defaulting to the platform data directory.
    pub fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("", "", "intellisphere")
            .map(|dirs| dirs.data_dir().join(DEFAULT_STORAGE_FILE))
    }
}

/// Logging settings for the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file; when unset logs go to stderr.
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log levels accepted by `logging.level`.
pub const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn timeout_zero_means_disabled() {
        let server = ServerConfig::default();
        assert_eq!(server.timeout(), None);
        let server = ServerConfig {
            timeout_secs: 15,
            ..ServerConfig::default()
        };
        assert_eq!(server.timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn explicit_storage_path_wins() {
        let storage = StorageConfig {
            path: Some("/tmp/store.json".to_string()),
        };
        assert_eq!(
            storage.resolve_path(),
            Some(PathBuf::from("/tmp/store.json"))
        );
    }

    #[test]
    fn builder_replaces_sections() {
        let config = IntelliSphereConfig::builder()
            .client(ClientConfig {
                domain: Some("law".to_string()),
                page_url: None,
            })
            .build();
        assert_eq!(config.client.domain.as_deref(), Some("law"));
        assert_eq!(config.server, ServerConfig::default());
    }
}
