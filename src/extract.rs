//! Task line recognition and field extraction.
//!
//! Turns one checklist line into a [`TaskRecord`]: status from the checkbox,
//! role assignments through the codec, then priority, tags and dates from
//! the remaining metadata.

use crate::codec::RoleCodec;
use crate::metadata::{self, DATE_GLYPHS, DATE_LABELS, PRIORITY_GLYPHS, RECURRENCE_GLYPH};
use crate::types::{DateKind, Priority, RoleAssignment, TaskRecord, TaskStatus};
use chrono::{DateTime, NaiveDate, Utc};
use regex_lite::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::LazyLock;

static TASK_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(?:[-*+]|\d+[.)])\s+\[(.)\](?:\s|$)").expect("task line pattern")
});

static GLYPH_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let glyphs: Vec<String> = DATE_GLYPHS.iter().map(|(g, _)| regex_lite::escape(g)).collect();
    Regex::new(&format!(r"({})\s*(\d{{4}}-\d{{2}}-\d{{2}})", glyphs.join("|")))
        .expect("glyph date pattern")
});

static FIELD_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\[?\b({})\s*::?\s*(\d{{4}}-\d{{2}}-\d{{2}})\s*\]?",
        DATE_LABELS
    ))
    .expect("field date pattern")
});

static INLINE_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\[\]\s][^\[\]]*::[^\[\]]*\]").expect("inline field pattern"));

static PRIORITY_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[(urgent|high|medium|low)\]").expect("priority marker pattern"));

static RECURRENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let stops: String = DATE_GLYPHS
        .iter()
        .map(|(g, _)| *g)
        .chain(PRIORITY_GLYPHS.iter().map(|(g, _)| *g))
        .collect();
    Regex::new(&format!(
        r"{}[^{}#\[]*",
        regex_lite::escape(RECURRENCE_GLYPH),
        stops
    ))
    .expect("recurrence pattern")
});

/// Position of the parts of a checklist line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLine<'a> {
    pub indent: &'a str,
    pub checkbox: char,
    /// Byte range of the checkbox character.
    pub checkbox_range: Range<usize>,
    /// Byte offset just past the closing `]` of the checkbox.
    pub content_start: usize,
    /// Everything after the checkbox, trimmed.
    pub content: &'a str,
}

/// Recognize `- [ ]`, `* [x]`, `1. [/]` style lines.
pub fn parse_task_line(line: &str) -> Option<TaskLine<'_>> {
    let caps = TASK_LINE_RE.captures(line)?;
    let indent = caps.get(1).map_or("", |m| m.as_str());
    let mark = caps.get(2)?;
    let checkbox = mark.as_str().chars().next()?;
    let content_start = (mark.end() + 1).min(line.len());
    Some(TaskLine {
        indent,
        checkbox,
        checkbox_range: mark.range(),
        content_start,
        content: line[content_start..].trim(),
    })
}

pub fn is_task_line(line: &str) -> bool {
    parse_task_line(line).is_some()
}

/// Rewrite only the checkbox character of a task line.
pub fn set_checkbox(line: &str, status: TaskStatus) -> Option<String> {
    let task = parse_task_line(line)?;
    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..task.checkbox_range.start]);
    out.push(status.checkbox_char());
    out.push_str(&line[task.checkbox_range.end..]);
    Some(out)
}

pub fn extract_priority(text: &str) -> Priority {
    let glyph = PRIORITY_GLYPHS
        .iter()
        .filter_map(|(g, p)| text.find(g).map(|at| (at, *p)))
        .min_by_key(|(at, _)| *at);
    if let Some((_, priority)) = glyph {
        return priority;
    }
    PRIORITY_MARKER_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| match m.as_str().to_lowercase().as_str() {
            "urgent" => Priority::Urgent,
            "high" => Priority::High,
            "medium" => Priority::Medium,
            _ => Priority::Low,
        })
        .unwrap_or_default()
}

/// Dates written on the line; the first occurrence of each kind wins.
pub fn extract_dates(text: &str) -> BTreeMap<DateKind, NaiveDate> {
    let mut found: Vec<(usize, DateKind, NaiveDate)> = Vec::new();

    for caps in GLYPH_DATE_RE.captures_iter(text) {
        let (Some(glyph), Some(date)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let kind = DATE_GLYPHS
            .iter()
            .find(|(g, _)| *g == glyph.as_str())
            .map(|(_, k)| *k);
        if let (Some(kind), Some(date)) = (kind, parse_date(date.as_str())) {
            found.push((glyph.start(), kind, date));
        }
    }

    for caps in FIELD_DATE_RE.captures_iter(text) {
        let (Some(label), Some(date)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if let (Some(kind), Some(date)) = (DateKind::from_label(label.as_str()), parse_date(date.as_str())) {
            found.push((label.start(), kind, date));
        }
    }

    found.sort_by_key(|(at, _, _)| *at);
    let mut dates = BTreeMap::new();
    for (_, kind, date) in found {
        dates.entry(kind).or_insert(date);
    }

    if !dates.contains_key(&DateKind::Happens) {
        let happens = [DateKind::Start, DateKind::Scheduled, DateKind::Due]
            .iter()
            .filter_map(|k| dates.get(k).copied())
            .min();
        if let Some(date) = happens {
            dates.insert(DateKind::Happens, date);
        }
    }
    dates
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

pub fn extract_tags(text: &str) -> BTreeSet<String> {
    metadata::find_tags(text)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Task text with every kind of metadata removed. Expects assignment blocks
/// to be stripped already.
pub fn clean_description(text: &str) -> String {
    let mut out = GLYPH_DATE_RE.replace_all(text, " ").into_owned();
    for re in [&*INLINE_FIELD_RE, &*FIELD_DATE_RE, &*PRIORITY_MARKER_RE, &*RECURRENCE_RE] {
        out = re.replace_all(&out, " ").into_owned();
    }
    for (glyph, _) in PRIORITY_GLYPHS {
        out = out.replace(glyph, " ");
    }
    metadata::strip_tags(&out)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the record for one line, or `None` when it is not a task line.
pub fn extract_task(
    codec: &RoleCodec<'_>,
    path: &str,
    line_number: usize,
    line: &str,
    now: DateTime<Utc>,
) -> Option<TaskRecord> {
    let task = parse_task_line(line)?;
    let role_assignments: Vec<RoleAssignment> =
        codec.parse(task.content).iter().map(RoleAssignment::from).collect();
    let metadata_text = codec.strip(task.content);

    let mut record = TaskRecord {
        id: TaskRecord::make_id(path, line_number),
        path: path.to_string(),
        line: line_number,
        raw_line: line.to_string(),
        description: clean_description(&metadata_text),
        status: TaskStatus::from_checkbox(task.checkbox),
        priority: extract_priority(&metadata_text),
        tags: extract_tags(&metadata_text),
        role_assignments,
        dates: extract_dates(&metadata_text),
        search_text: String::new(),
        created_at: now,
        modified_at: now,
    };
    record.refresh_search_text();
    Some(record)
}

/// Records for every task line of a document, in line order.
pub fn extract_document(
    codec: &RoleCodec<'_>,
    path: &str,
    content: &str,
    now: DateTime<Utc>,
) -> Vec<TaskRecord> {
    content
        .lines()
        .enumerate()
        .filter_map(|(n, line)| extract_task(codec, path, n, line, now))
        .collect()
}
