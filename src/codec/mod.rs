//! Role assignment codec.
//!
//! Reads and writes role assignment blocks embedded in a line of text:
//!
//! - current format: `[🚗:: [[People/John|@John]], [[People/Jane|@Jane]]]`
//!   (bare `[🚗:: @John, @Jane]` bodies are read too)
//! - legacy format: `<!--TR 🚗 [[People/John|@John]] -->`, read only when the
//!   line has no current-format block at all
//!
//! Icons come from user configuration, so matching is plain substring search
//! plus bracket-depth counting; no pattern is ever built from an icon.

pub mod legacy;
mod scan;

use crate::config::AssigneeConfig;
use crate::extract::parse_task_line;
use crate::metadata;
use crate::roles::RoleTable;
use crate::types::{ParsedRoleAssignment, Role, RoleAssignment};
use scan::{Blocks, link_alias, normalize_spacing, split_indent, wiki_links};

/// Codec bound to a role table and assignee settings.
#[derive(Debug, Clone, Copy)]
pub struct RoleCodec<'a> {
    roles: &'a RoleTable,
    assignees: &'a AssigneeConfig,
}

impl<'a> RoleCodec<'a> {
    pub fn new(roles: &'a RoleTable, assignees: &'a AssigneeConfig) -> Self {
        Self { roles, assignees }
    }

    /// Extract the role assignments written on `text`.
    pub fn parse(&self, text: &str) -> Vec<ParsedRoleAssignment> {
        let primary = self.parse_primary(text);
        if !primary.is_empty() {
            return primary;
        }
        legacy::parse(text, self.roles.visible())
    }

    fn parse_primary(&self, text: &str) -> Vec<ParsedRoleAssignment> {
        let mut result = Vec::new();
        for role in self.roles.visible() {
            let found = Blocks::new(text, &role.icon)
                .map(|block| self.body_assignees(&text[block.body]))
                .find(|assignees| !assignees.is_empty());
            if let Some(assignees) = found {
                result.push(ParsedRoleAssignment {
                    role: role.clone(),
                    assignees,
                });
            }
        }
        result
    }

    /// Link aliases when the body has links, otherwise comma-separated tokens.
    fn body_assignees(&self, body: &str) -> Vec<String> {
        let links = wiki_links(body);
        let candidates: Vec<&str> = if links.is_empty() {
            body.split(',')
                .map(str::trim)
                .filter(|t| self.assignees.is_token(t))
                .collect()
        } else {
            links.into_iter().filter_map(link_alias).collect()
        };

        let mut assignees: Vec<String> = Vec::new();
        for token in candidates {
            if !assignees.iter().any(|a| a == token) {
                assignees.push(token.to_string());
            }
        }
        assignees
    }

    /// Serialize assignments in role order, one `[icon:: ...]` block per role.
    ///
    /// Entries naming the same role are merged in first-seen order.
    /// Assignments without assignees or with a role that is not visible are dropped.
    pub fn format(&self, assignments: &[RoleAssignment]) -> String {
        let mut merged: Vec<(&Role, usize, Vec<&str>)> = Vec::new();
        for (position, assignment) in assignments.iter().enumerate() {
            if assignment.assignees.is_empty() {
                continue;
            }
            let Some(role) = self.roles.get(&assignment.role_id) else {
                continue;
            };
            let index = match merged.iter().position(|(r, _, _)| r.id == role.id) {
                Some(index) => index,
                None => {
                    merged.push((role, position, Vec::new()));
                    merged.len() - 1
                }
            };
            let tokens = &mut merged[index].2;
            for token in &assignment.assignees {
                if !tokens.contains(&token.as_str()) {
                    tokens.push(token);
                }
            }
        }
        merged.sort_by_key(|(role, position, _)| (role.order, *position));

        merged
            .into_iter()
            .map(|(role, _, tokens)| {
                let body = tokens
                    .iter()
                    .map(|token| format!("[[{}|{}]]", self.assignees.link_target(token), token))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{}:: {}]", role.icon, body)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Remove every assignment block (both formats) for visible roles.
    ///
    /// Whitespace runs collapse to one space; leading indentation survives.
    pub fn strip(&self, line: &str) -> String {
        let (indent, _) = split_indent(line);
        let mut out = line.to_string();
        for role in self.roles.visible() {
            loop {
                let Some(block) = Blocks::new(&out, &role.icon).next() else {
                    break;
                };
                out.replace_range(block.span, " ");
            }
        }
        let body = normalize_spacing(&legacy::strip(&out, self.roles.visible(), self.assignees));
        if body.is_empty() {
            body
        } else {
            format!("{}{}", indent, body)
        }
    }

    /// Replace the line's assignments with `assignments`.
    ///
    /// The new text goes in front of the line's trailing metadata, or at the
    /// end when it has none.
    pub fn apply(&self, line: &str, assignments: &[RoleAssignment]) -> String {
        let cleaned = self.strip(line);
        let formatted = self.format(assignments);
        if formatted.is_empty() {
            return cleaned;
        }

        // a checklist prefix is never searched, so an odd checkbox character
        // cannot pull the block inside `[ ]`
        let (head, content, separator) = match parse_task_line(&cleaned) {
            Some(task) => (&cleaned[..task.content_start], task.content, " "),
            None => {
                let (indent, content) = split_indent(&cleaned);
                (indent, content, "")
            }
        };
        let body = match metadata::metadata_start(content) {
            Some(offset) => {
                let before = content[..offset].trim_end();
                let after = content[offset..].trim_start();
                if before.is_empty() {
                    format!("{} {}", formatted, after)
                } else {
                    format!("{} {} {}", before, formatted, after)
                }
            }
            None if content.is_empty() => formatted,
            None => format!("{} {}", content, formatted),
        };
        format!("{}{}{}", head, separator, body)
    }
}
