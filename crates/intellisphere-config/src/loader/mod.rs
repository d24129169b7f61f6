//! Layered configuration loader with locked requirements.
//!
//! Discovers configuration layers (requirements/system/user/project/cwd and
//! runtime overrides), validates each against the schema, merges them, and
//! produces a final `IntelliSphereConfig`.

mod layers;
mod merge;
mod schema;

#[cfg(test)]
mod tests;

use crate::{ConfigError, IntelliSphereConfig, LOG_LEVELS};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "intellisphere.json5";
/// Default config directory under the user's home.
const DEFAULT_CONFIG_DIR: &str = ".intellisphere";
/// Marker files/dirs that identify a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

#[cfg(unix)]
/// Default system config path on Unix.
const SYSTEM_CONFIG_PATH: &str = "/etc/intellisphere/intellisphere.json5";
#[cfg(unix)]
/// Default requirements path on Unix.
const SYSTEM_REQUIREMENTS_PATH: &str = "/etc/intellisphere/requirements.json5";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: IntelliSphereConfig,
    /// Metadata for each layer that contributed to the result.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// Locked values that later layers cannot override.
    Requirements,
    /// System-wide configuration.
    System,
    /// User-specific configuration.
    User,
    /// Project root configuration.
    Project,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides (highest precedence).
    Runtime,
}

impl ConfigLayerSource {
    /// Short label used in logs and validation errors.
    pub fn label(&self) -> &'static str {
        match self {
            ConfigLayerSource::Requirements => "requirements",
            ConfigLayerSource::System => "system",
            ConfigLayerSource::User => "user",
            ConfigLayerSource::Project => "project",
            ConfigLayerSource::Cwd => "cwd",
            ConfigLayerSource::Runtime => "runtime",
        }
    }
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk.
    pub path: PathBuf,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to find project and cwd layers.
    pub cwd: PathBuf,
    /// Optional system config path.
    pub system_config_path: Option<PathBuf>,
    /// Optional user config path (defaults to `~/.intellisphere/intellisphere.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Optional requirements path holding locked settings.
    pub requirements_path: Option<PathBuf>,
    /// Runtime override config paths applied last; they must exist.
    pub runtime_paths: Vec<PathBuf>,
    /// Marker files/dirs used to detect the project root.
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: layers::default_system_config_path(),
            user_config_path: layers::default_user_config_path(),
            requirements_path: layers::default_requirements_path(),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl IntelliSphereConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations and overrides.
    ///
    /// Layer precedence (low -> high): system, user, project, cwd, runtime.
    /// Keys present in the requirements layer win over every other layer.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = layers::normalize_path(&options.cwd)?;
        debug!("normalized cwd for config load: {}", cwd.display());
        let mut loaded = Vec::new();
        let mut seen = HashSet::new();

        let requirements = match options.requirements_path.as_deref() {
            Some(path) => layers::load_if_present(ConfigLayerSource::Requirements, path)?,
            None => None,
        };

        let mut candidates: Vec<(ConfigLayerSource, PathBuf)> = Vec::new();
        if let Some(path) = options.system_config_path.clone() {
            candidates.push((ConfigLayerSource::System, path));
        }
        if let Some(path) = options.user_config_path.clone() {
            candidates.push((ConfigLayerSource::User, path));
        }
        match layers::find_project_root(&cwd, &options.project_root_markers) {
            Some(root) => {
                debug!("resolved project root: {}", root.display());
                candidates.push((ConfigLayerSource::Project, root.join(DEFAULT_CONFIG_FILE)));
            }
            None => debug!("project root not found; skipping project layer"),
        }
        candidates.push((ConfigLayerSource::Cwd, cwd.join(DEFAULT_CONFIG_FILE)));

        for (source, path) in candidates {
            if !seen.insert(layers::unique_path(&path)) {
                debug!(
                    "skipping duplicate layer (source={}, path={})",
                    source.label(),
                    path.display()
                );
                continue;
            }
            if let Some(layer) = layers::load_if_present(source, &path)? {
                loaded.push(layer);
            }
        }

        for path in &options.runtime_paths {
            loaded.push(layers::load_required(ConfigLayerSource::Runtime, path)?);
        }

        let mut merged = Value::Object(serde_json::Map::new());
        let constraints = requirements.as_ref().map(|layer| &layer.value);
        if let Some(locked) = constraints {
            merge::overlay(&mut merged, locked);
        }
        for layer in &loaded {
            merge::overlay_unlocked(&mut merged, &layer.value, constraints);
        }

        let config = config_from_value(merged, "effective")?;
        let mut metas: Vec<ConfigLayer> = requirements.into_iter().map(|layer| layer.meta).collect();
        metas.extend(loaded.into_iter().map(|layer| layer.meta));
        info!("layered config loaded (layers={})", metas.len());
        Ok(LayeredConfig {
            config,
            layers: metas,
        })
    }

    /// Validate invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.server.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidField {
                path: "server.base_url".to_string(),
                message: "expected an http:// or https:// url".to_string(),
            });
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidField {
                path: "logging.level".to_string(),
                message: format!("expected one of {}", LOG_LEVELS.join(", ")),
            });
        }
        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<IntelliSphereConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: IntelliSphereConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
