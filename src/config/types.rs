//! Configuration types and structures.

use crate::types::AssigneeKind;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default vault-relative location of the persisted task index.
pub const DEFAULT_SNAPSHOT_PATH: &str = ".task-roles/task-index.json";

/// Document collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Root directory of the document collection.
    #[serde(default = "default_vault_root")]
    pub root: PathBuf,

    /// Extension of managed documents, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: default_vault_root(),
            extension: default_extension(),
        }
    }
}

fn default_vault_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_extension() -> String {
    "md".to_string()
}

/// Task index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Snapshot location, relative to the vault root.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// Quiet interval before a pending snapshot write is issued (default: 1000).
    #[serde(default = "default_index_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            debounce_ms: default_index_debounce_ms(),
        }
    }
}

impl IndexConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_snapshot_path() -> String {
    DEFAULT_SNAPSHOT_PATH.to_string()
}

fn default_index_debounce_ms() -> u64 {
    1_000
}

/// File watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce window for coalescing file system events (default: 500).
    #[serde(default = "default_watch_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_watch_debounce_ms(),
        }
    }
}

fn default_watch_debounce_ms() -> u64 {
    500
}

/// Assignee marker symbols and the directories their notes live in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssigneeConfig {
    #[serde(default = "default_person_symbol")]
    pub person_symbol: String,

    #[serde(default = "default_organization_symbol")]
    pub organization_symbol: String,

    #[serde(default = "default_person_directory")]
    pub person_directory: String,

    #[serde(default = "default_organization_directory")]
    pub organization_directory: String,
}

impl Default for AssigneeConfig {
    fn default() -> Self {
        Self {
            person_symbol: default_person_symbol(),
            organization_symbol: default_organization_symbol(),
            person_directory: default_person_directory(),
            organization_directory: default_organization_directory(),
        }
    }
}

impl AssigneeConfig {
    /// Which kind of entity a marker-prefixed token names, if any.
    pub fn kind_of(&self, token: &str) -> Option<AssigneeKind> {
        let name_follows = |symbol: &str| token.len() > symbol.len() && token.starts_with(symbol);
        if name_follows(&self.person_symbol) {
            Some(AssigneeKind::Person)
        } else if name_follows(&self.organization_symbol) {
            Some(AssigneeKind::Organization)
        } else {
            None
        }
    }

    pub fn is_token(&self, token: &str) -> bool {
        self.kind_of(token).is_some()
    }

    /// Note path a token links to: `<directory>/<name>`.
    ///
    /// Tokens without a known marker link to themselves under the person directory.
    pub fn link_target(&self, token: &str) -> String {
        let (directory, name) = match self.kind_of(token) {
            Some(AssigneeKind::Person) => (&self.person_directory, &token[self.person_symbol.len()..]),
            Some(AssigneeKind::Organization) => (
                &self.organization_directory,
                &token[self.organization_symbol.len()..],
            ),
            None => (&self.person_directory, token),
        };
        let directory = directory.trim_matches('/');
        if directory.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", directory, name)
        }
    }
}

fn default_person_symbol() -> String {
    "@".to_string()
}

fn default_organization_symbol() -> String {
    "+".to_string()
}

fn default_person_directory() -> String {
    "People".to_string()
}

fn default_organization_directory() -> String {
    "Organizations".to_string()
}

/// A user-defined role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub id: String,
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub shortcut: Option<char>,
    pub order: i32,
}

/// Role table customization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolesConfig {
    /// Ids of roles (built-in or custom) that are hidden.
    #[serde(default)]
    pub hidden: Vec<String>,

    /// Additional roles. A custom role with a built-in id replaces that role.
    #[serde(default)]
    pub custom: Vec<RoleDefinition>,
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub vault: VaultConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub watcher: WatchConfig,

    #[serde(default)]
    pub assignees: AssigneeConfig,

    #[serde(default)]
    pub roles: RolesConfig,
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let a = &self.assignees;
        if a.person_symbol.is_empty() || a.organization_symbol.is_empty() {
            return Err(anyhow!("assignee symbols must not be empty"));
        }
        if a.person_symbol == a.organization_symbol {
            return Err(anyhow!(
                "person and organization symbols must differ (both are '{}')",
                a.person_symbol
            ));
        }

        let mut ids = HashSet::new();
        for role in &self.roles.custom {
            if role.id.trim().is_empty() {
                return Err(anyhow!("custom role id must not be empty"));
            }
            if role.icon.trim().is_empty() {
                return Err(anyhow!("custom role '{}' has no icon", role.id));
            }
            if !ids.insert(role.id.as_str()) {
                return Err(anyhow!("duplicate custom role id '{}'", role.id));
            }
        }

        if self.vault.extension.starts_with('.') {
            return Err(anyhow!(
                "vault extension should not start with a dot: '{}'",
                self.vault.extension
            ));
        }
        Ok(())
    }

    /// Absolute-or-relative path of the snapshot file on disk.
    pub fn snapshot_file(&self) -> PathBuf {
        self.vault.root.join(&self.index.snapshot_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.vault.extension, "md");
        assert_eq!(config.index.debounce_ms, 1000);
        assert_eq!(config.assignees.person_symbol, "@");
        assert_eq!(config.assignees.organization_directory, "Organizations");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
index:
  debounce_ms: 250
roles:
  hidden: [informed]
  custom:
    - id: reviewers
      name: Reviewers
      icon: "🔍"
      shortcut: r
      order: 5
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.index.debounce(), Duration::from_millis(250));
        assert_eq!(config.index.snapshot_path, DEFAULT_SNAPSHOT_PATH);
        assert_eq!(config.roles.hidden, vec!["informed"]);
        assert_eq!(config.roles.custom[0].shortcut, Some('r'));
    }

    #[test]
    fn test_assignee_link_targets() {
        let a = AssigneeConfig::default();
        assert_eq!(a.kind_of("@John"), Some(AssigneeKind::Person));
        assert_eq!(a.kind_of("+Acme"), Some(AssigneeKind::Organization));
        assert_eq!(a.kind_of("@"), None);
        assert_eq!(a.kind_of("John"), None);
        assert_eq!(a.link_target("@John"), "People/John");
        assert_eq!(a.link_target("+Acme Corp"), "Organizations/Acme Corp");

        let flat = AssigneeConfig {
            person_directory: String::new(),
            ..AssigneeConfig::default()
        };
        assert_eq!(flat.link_target("@John"), "John");
    }

    #[test]
    fn test_validate_rejects_same_symbols() {
        let mut config = Config::default();
        config.assignees.organization_symbol = "@".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_custom_roles() {
        let mut config = Config::default();
        let role = RoleDefinition {
            id: "qa".to_string(),
            name: "QA".to_string(),
            icon: "🧪".to_string(),
            shortcut: None,
            order: 9,
        };
        config.roles.custom = vec![role.clone(), role];
        assert!(config.validate().is_err());
    }
}
