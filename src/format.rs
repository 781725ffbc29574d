//! Output formatting utilities for markdown and JSON.

use crate::roles::RoleTable;
use crate::types::{DateKind, Priority, TaskRecord, TaskStatus};

/// Output format for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// Statuses in listing order: active work first, finished work last.
const STATUS_ORDER: [TaskStatus; 4] = [
    TaskStatus::InProgress,
    TaskStatus::Todo,
    TaskStatus::Done,
    TaskStatus::Cancelled,
];

/// Format a single task as markdown.
pub fn format_task_markdown(task: &TaskRecord, roles: &RoleTable) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", task.description));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!("- **status**: {}\n", task.status));
    if task.priority != Priority::None {
        md.push_str(&format!("- **priority**: {}\n", task.priority.as_str()));
    }

    for assignment in task.resolved_assignments(roles) {
        md.push_str(&format!(
            "- **{}** {}: {}\n",
            assignment.role.name,
            assignment.role.icon,
            assignment.assignees.join(", ")
        ));
    }

    for kind in DateKind::ALL {
        if let Some(date) = task.dates.get(&kind) {
            md.push_str(&format!("- **{}**: {}\n", kind.as_str(), date));
        }
    }

    if !task.tags.is_empty() {
        let tags: Vec<&str> = task.tags.iter().map(String::as_str).collect();
        md.push_str(&format!("- **tags**: {}\n", tags.join(" ")));
    }

    md
}

/// Format a list of tasks as markdown, grouped by status.
pub fn format_tasks_markdown(tasks: &[TaskRecord], roles: &RoleTable) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Tasks ({})\n\n", tasks.len()));

    for status in STATUS_ORDER {
        let group: Vec<&TaskRecord> = tasks.iter().filter(|t| t.status == status).collect();
        if group.is_empty() {
            continue;
        }
        md.push_str(&format!("## {}\n\n", format_status_name(status)));
        for task in group {
            md.push_str(&format_task_short(task, roles));
        }
        md.push('\n');
    }

    md
}

/// Format a list of tasks as pretty JSON.
pub fn format_tasks_json(tasks: &[TaskRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(tasks)
}

/// One-line form: `- [x] description (`id`) 🚗 @John`.
fn format_task_short(task: &TaskRecord, roles: &RoleTable) -> String {
    let mut line = format!(
        "- [{}] {} (`{}`)",
        task.status.checkbox_char(),
        task.description,
        task.id
    );
    for assignment in task.resolved_assignments(roles) {
        line.push_str(&format!(
            " {} {}",
            assignment.role.icon,
            assignment.assignees.join(", ")
        ));
    }
    line.push('\n');
    line
}

/// `in-progress` → `In Progress`.
fn format_status_name(status: TaskStatus) -> String {
    status
        .as_str()
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
