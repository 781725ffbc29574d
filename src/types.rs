//! Core types for role assignments and indexed task records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A named responsibility category with a unique glyph used as its textual marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<char>,
    #[serde(default)]
    pub built_in: bool,
    pub order: i32,
}

impl Role {
    pub fn new(id: impl Into<String>, name: impl Into<String>, icon: impl Into<String>, order: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: icon.into(),
            shortcut: None,
            built_in: false,
            order,
        }
    }

    pub fn with_shortcut(mut self, shortcut: char) -> Self {
        self.shortcut = Some(shortcut);
        self
    }

    pub fn built_in(mut self) -> Self {
        self.built_in = true;
        self
    }
}

/// Kind of entity an assignee token refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeKind {
    Person,
    Organization,
}

/// Role assignment as produced by an edit: role referenced by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role_id: String,
    pub assignees: Vec<String>,
}

impl RoleAssignment {
    /// Build an assignment, dropping blank tokens and duplicates while keeping order.
    pub fn new<I, S>(role_id: impl Into<String>, assignees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for token in assignees {
            let token = token.into().trim().to_string();
            if !token.is_empty() && !unique.contains(&token) {
                unique.push(token);
            }
        }
        Self {
            role_id: role_id.into(),
            assignees: unique,
        }
    }
}

/// Role assignment as read back from text, with the role resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRoleAssignment {
    pub role: Role,
    pub assignees: Vec<String>,
}

impl From<ParsedRoleAssignment> for RoleAssignment {
    fn from(parsed: ParsedRoleAssignment) -> Self {
        Self {
            role_id: parsed.role.id,
            assignees: parsed.assignees,
        }
    }
}

impl From<&ParsedRoleAssignment> for RoleAssignment {
    fn from(parsed: &ParsedRoleAssignment) -> Self {
        Self {
            role_id: parsed.role.id.clone(),
            assignees: parsed.assignees.clone(),
        }
    }
}

/// Checkbox state of a task line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Cancelled,
}

impl TaskStatus {
    /// Map a checkbox character to a status. Unknown characters read as todo.
    pub fn from_checkbox(c: char) -> Self {
        match c {
            'x' | 'X' => TaskStatus::Done,
            '/' => TaskStatus::InProgress,
            '-' => TaskStatus::Cancelled,
            _ => TaskStatus::Todo,
        }
    }

    pub fn checkbox_char(&self) -> char {
        match self {
            TaskStatus::Todo => ' ',
            TaskStatus::InProgress => '/',
            TaskStatus::Done => 'x',
            TaskStatus::Cancelled => '-',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "todo" | "open" => Some(TaskStatus::Todo),
            "in-progress" | "in_progress" | "doing" => Some(TaskStatus::InProgress),
            "done" | "completed" => Some(TaskStatus::Done),
            "cancelled" | "canceled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority, ordered from least to most important.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

/// Kinds of dates a task line can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateKind {
    Created,
    Due,
    Scheduled,
    Completed,
    Start,
    Cancelled,
    Happens,
}

impl DateKind {
    pub const ALL: [DateKind; 7] = [
        DateKind::Created,
        DateKind::Due,
        DateKind::Scheduled,
        DateKind::Completed,
        DateKind::Start,
        DateKind::Cancelled,
        DateKind::Happens,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateKind::Created => "created",
            DateKind::Due => "due",
            DateKind::Scheduled => "scheduled",
            DateKind::Completed => "completed",
            DateKind::Start => "start",
            DateKind::Cancelled => "cancelled",
            DateKind::Happens => "happens",
        }
    }

    /// Parse a field label such as `due` or `completion`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "created" => Some(DateKind::Created),
            "due" => Some(DateKind::Due),
            "scheduled" => Some(DateKind::Scheduled),
            "completed" | "completion" | "done" => Some(DateKind::Completed),
            "start" => Some(DateKind::Start),
            "cancelled" | "canceled" => Some(DateKind::Cancelled),
            "happens" => Some(DateKind::Happens),
            _ => None,
        }
    }
}

/// One indexed checklist line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// `<path>:<line>`, line numbers zero-based.
    pub id: String,
    pub path: String,
    pub line: usize,
    pub raw_line: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub role_assignments: Vec<RoleAssignment>,
    #[serde(default)]
    pub dates: BTreeMap<DateKind, NaiveDate>,
    pub search_text: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn make_id(path: &str, line: usize) -> String {
        format!("{}:{}", path, line)
    }

    /// Split an id into its document path and line number.
    pub fn split_id(id: &str) -> Option<(&str, usize)> {
        let (path, line) = id.rsplit_once(':')?;
        Some((path, line.parse().ok()?))
    }

    pub fn assignees(&self) -> impl Iterator<Item = &str> {
        self.role_assignments
            .iter()
            .flat_map(|a| a.assignees.iter().map(String::as_str))
    }

    /// Resolve stored role ids against the current role table.
    /// Assignments whose role is no longer visible are skipped.
    pub fn resolved_assignments(&self, roles: &crate::roles::RoleTable) -> Vec<ParsedRoleAssignment> {
        self.role_assignments
            .iter()
            .filter_map(|a| {
                roles.get(&a.role_id).map(|role| ParsedRoleAssignment {
                    role: role.clone(),
                    assignees: a.assignees.clone(),
                })
            })
            .collect()
    }

    /// Rebuild the lowercase search text from the record's own fields.
    pub fn refresh_search_text(&mut self) {
        let mut parts: Vec<&str> = vec![self.description.as_str(), self.path.as_str()];
        parts.extend(self.tags.iter().map(String::as_str));
        let assignees: Vec<&str> = self
            .role_assignments
            .iter()
            .flat_map(|a| a.assignees.iter().map(String::as_str))
            .collect();
        parts.extend(assignees);
        self.search_text = parts.join(" ").to_lowercase();
    }
}
