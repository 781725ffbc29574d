//! Configuration loader with tier-based merging.
//!
//! Loads configuration from multiple tiers and merges them field-by-field.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the configuration file in each tier directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Embedded defaults (lowest priority)
    Defaults = 0,
    /// Project-level config ($CWD/task-roles/)
    Project = 1,
    /// User-level config (~/.task-roles/)
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories for each configuration tier.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // User dir: TASK_ROLES_USER_DIR or ~/.task-roles
        let user_dir = std::env::var("TASK_ROLES_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".task-roles")));

        // Project dir: TASK_ROLES_PROJECT_DIR or $CWD/task-roles
        let project_dir = std::env::var("TASK_ROLES_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("task-roles")));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }

    fn config_file(&self, tier: ConfigTier) -> Option<PathBuf> {
        let dir = match tier {
            ConfigTier::Project => self.project_dir.as_ref(),
            ConfigTier::User => self.user_dir.as_ref(),
            ConfigTier::Defaults | ConfigTier::Environment => None,
        }?;
        Some(dir.join(CONFIG_FILE_NAME))
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Config files that contributed, lowest tier first.
    sources: Vec<(ConfigTier, PathBuf)>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        // Explicit config path short-circuits tier merging
        if let Ok(explicit_path) = std::env::var("TASK_ROLES_CONFIG_PATH") {
            return Self::load_file(explicit_path, paths);
        }

        let mut configs: Vec<Value> = Vec::new();
        let mut sources = Vec::new();

        // Tier 1: Defaults (embedded)
        configs.push(serde_json::to_value(Config::default())?);

        // Tiers 2 and 3: project, then user
        for tier in [ConfigTier::Project, ConfigTier::User] {
            let Some(file) = paths.config_file(tier) else {
                continue;
            };
            if let Some(value) = read_yaml_value(&file) {
                debug!(tier = %tier, path = %file.display(), "Loaded config tier");
                configs.push(value);
                sources.push((tier, file));
            }
        }

        let merged = deep_merge_all(configs);
        let mut config: Config = serde_json::from_value(merged)?;

        // Tier 4: Environment variable overrides
        Self::apply_env_overrides(&mut config);
        config.validate()?;

        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    /// Load one explicit config file instead of merging tiers.
    /// Environment overrides still apply.
    pub fn load_file(path: impl Into<PathBuf>, paths: ConfigPaths) -> Result<Self> {
        let path = path.into();
        let mut config = Config::load(&path)?;
        Self::apply_env_overrides(&mut config);
        config.validate()?;
        Ok(Self {
            paths,
            config,
            sources: vec![(ConfigTier::Environment, path)],
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config) {
        if let Ok(vault) = std::env::var("TASK_ROLES_VAULT") {
            config.vault.root = PathBuf::from(vault);
        }

        if let Ok(snapshot) = std::env::var("TASK_ROLES_SNAPSHOT") {
            config.index.snapshot_path = snapshot;
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Config files that were merged, lowest tier first.
    pub fn sources(&self) -> &[(ConfigTier, PathBuf)] {
        &self.sources
    }
}

/// Read a YAML file into a JSON value, logging and skipping unreadable files.
fn read_yaml_value(path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), "Failed to read config file: {}", e);
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), "Ignoring malformed config file: {}", e);
            None
        }
    }
}
