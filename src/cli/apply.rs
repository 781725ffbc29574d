//! Apply subcommand: rewrite a line with new role assignments.

use crate::roles::RoleTable;
use crate::types::RoleAssignment;
use anyhow::{Result, anyhow};
use clap::Args;

/// Arguments for the apply subcommand
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// The line to rewrite
    pub line: String,

    /// Assignment in the form ROLE=TOKEN[,TOKEN...]; ROLE is an id, name or shortcut.
    /// Repeat for several roles. With no assignments the line is only cleaned.
    #[arg(short, long = "assign", value_name = "ROLE=TOKENS")]
    pub assign: Vec<String>,
}

impl ApplyArgs {
    /// Resolve every `--assign` value against the role table.
    pub fn assignments(&self, roles: &RoleTable) -> Result<Vec<RoleAssignment>> {
        self.assign
            .iter()
            .map(|value| parse_assignment(value, roles))
            .collect()
    }
}

/// Parse `ROLE=TOKEN[,TOKEN...]`.
pub fn parse_assignment(value: &str, roles: &RoleTable) -> Result<RoleAssignment> {
    let (key, tokens) = value
        .split_once('=')
        .ok_or_else(|| anyhow!("expected ROLE=TOKEN[,TOKEN...], got '{}'", value))?;
    let role = roles
        .resolve(key.trim())
        .ok_or_else(|| anyhow!("unknown role '{}'", key.trim()))?;
    Ok(RoleAssignment::new(role.id.clone(), tokens.split(',')))
}
