//! Status subcommand.

use crate::types::TaskStatus;
use anyhow::{Result, anyhow};
use clap::Args;

/// Arguments for the status subcommand
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Task id, `<path>:<line>`
    pub id: String,

    /// New status: todo, in-progress, done or cancelled
    pub status: String,
}

impl StatusArgs {
    pub fn task_status(&self) -> Result<TaskStatus> {
        TaskStatus::parse(&self.status).ok_or_else(|| anyhow!("unknown status '{}'", self.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status() {
        let args = StatusArgs {
            id: "a.md:0".to_string(),
            status: "In-Progress".to_string(),
        };
        assert_eq!(args.task_status().unwrap(), TaskStatus::InProgress);

        let args = StatusArgs {
            id: "a.md:0".to_string(),
            status: "blocked".to_string(),
        };
        assert!(args.task_status().is_err());
    }
}
