//! Deprecated comment-delimited assignment format.
//!
//! Older lines carry assignments as `<icon> [[dir/name|@name]], ...`, usually
//! wrapped in `<!--TR ... -->`. Bodies never nest brackets, so a bounded scan to
//! the next role icon (or end of line) is enough.

use super::scan::{link_alias, wiki_links};
use crate::config::AssigneeConfig;
use crate::types::{ParsedRoleAssignment, Role};

pub const LEGACY_START: &str = "<!--TR";
pub const LEGACY_END: &str = "-->";

/// Parse legacy assignments for `roles` (already in role order).
pub(crate) fn parse(text: &str, roles: &[Role]) -> Vec<ParsedRoleAssignment> {
    let stripped = text.replace(LEGACY_START, " ").replace(LEGACY_END, " ");
    let mut result = Vec::new();

    for role in roles {
        let mut from = 0;
        while let Some(rel) = stripped[from..].find(&role.icon) {
            let icon_end = from + rel + role.icon.len();
            from = icon_end;

            let rest = &stripped[icon_end..];
            if !rest.starts_with(char::is_whitespace) {
                continue;
            }
            let body_start = icon_end + (rest.len() - rest.trim_start().len());
            let body_end = next_icon(&stripped, body_start, roles).unwrap_or(stripped.len());

            let assignees = link_assignees(&stripped[body_start..body_end]);
            if !assignees.is_empty() {
                result.push(ParsedRoleAssignment {
                    role: role.clone(),
                    assignees,
                });
                break;
            }
        }
    }
    result
}

/// Remove legacy blocks of any of `roles` from `line`.
///
/// Outside `<!--TR ... -->` a block only counts when its links point at
/// assignees, so an ordinary note link after an icon is left alone.
pub(crate) fn strip(line: &str, roles: &[Role], assignees: &AssigneeConfig) -> String {
    let mut out = strip_comments(line, roles);
    for role in roles {
        let mut from = 0;
        while let Some(rel) = out[from..].find(&role.icon) {
            let start = from + rel;
            match bare_block_end(&out, start + role.icon.len(), assignees) {
                Some(end) => out.replace_range(start..end, " "),
                None => from = start + role.icon.len(),
            }
        }
    }
    out
}

/// Remove `<!--TR ... -->` regions that mention at least one role icon.
fn strip_comments(line: &str, roles: &[Role]) -> String {
    let mut out = line.to_string();
    let mut from = 0;
    while let Some(rel) = out[from..].find(LEGACY_START) {
        let start = from + rel;
        let Some(end_rel) = out[start..].find(LEGACY_END) else {
            break;
        };
        let end = start + end_rel + LEGACY_END.len();
        if roles.iter().any(|r| out[start..end].contains(&r.icon)) {
            out.replace_range(start..end, " ");
            from = start + 1;
        } else {
            from = end;
        }
    }
    out
}

/// End of an uncommented legacy body starting after an icon at `after_icon`:
/// whitespace, then one or more assignee links separated by commas/spaces.
/// The body ends before the first link whose alias is not a marker token.
fn bare_block_end(text: &str, after_icon: usize, assignees: &AssigneeConfig) -> Option<usize> {
    let rest = &text[after_icon..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let mut pos = after_icon + (rest.len() - rest.trim_start().len());
    let mut end = None;
    while text[pos..].starts_with("[[") {
        let close = text[pos..].find("]]")?;
        let is_assignee = link_alias(&text[pos + 2..pos + close])
            .is_some_and(|a| assignees.is_token(a));
        if !is_assignee {
            break;
        }
        pos += close + 2;
        end = Some(pos);
        let tail = &text[pos..];
        let skipped = tail.len() - tail.trim_start_matches([',', ' ', '\t']).len();
        if !text[pos + skipped..].starts_with("[[") {
            break;
        }
        pos += skipped;
    }
    end
}

fn next_icon(text: &str, from: usize, roles: &[Role]) -> Option<usize> {
    roles
        .iter()
        .filter_map(|r| text[from..].find(&r.icon).map(|i| from + i))
        .min()
}

fn link_assignees(body: &str) -> Vec<String> {
    let mut assignees: Vec<String> = Vec::new();
    for alias in wiki_links(body).into_iter().filter_map(link_alias) {
        if !assignees.iter().any(|a| a == alias) {
            assignees.push(alias.to_string());
        }
    }
    assignees
}
