//! List subcommand.

use crate::format::OutputFormat;
use crate::types::TaskRecord;
use clap::Args;

/// Arguments for the list subcommand
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output format: json or markdown
    #[arg(short, long, default_value = "markdown")]
    pub format: String,

    /// Only tasks with assignees in this role (id, name or shortcut)
    #[arg(long)]
    pub role: Option<String>,

    /// Only tasks naming this assignee, e.g. @John
    #[arg(long)]
    pub assignee: Option<String>,
}

impl ListArgs {
    pub fn output_format(&self) -> Option<OutputFormat> {
        OutputFormat::from_str(&self.format)
    }

    /// Apply the assignee filter. The role filter is resolved by the caller,
    /// which knows the role table.
    pub fn keep(&self, task: &TaskRecord) -> bool {
        match &self.assignee {
            Some(token) => task.assignees().any(|a| a == token),
            None => true,
        }
    }
}
