//! Layered configuration.
//!
//! Configuration is merged field-by-field from four tiers:
//! 1. **Defaults** - compiled in
//! 2. **Project** - `$CWD/task-roles/config.yaml`
//! 3. **User** - `~/.task-roles/config.yaml`
//! 4. **Environment** - variables listed below
//!
//! ## Environment Variables
//! - `TASK_ROLES_CONFIG_PATH` - Explicit config file (skips tier merging)
//! - `TASK_ROLES_VAULT` - Document collection root
//! - `TASK_ROLES_SNAPSHOT` - Snapshot path relative to the vault root
//! - `TASK_ROLES_USER_DIR` - User config dir (default: `~/.task-roles`)
//! - `TASK_ROLES_PROJECT_DIR` - Project config dir (default: `./task-roles`)

mod loader;
mod merge;
mod types;

pub use loader::{CONFIG_FILE_NAME, ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::deep_merge;
pub use types::*;
