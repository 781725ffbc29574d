//! Locating trailing metadata on a task line.
//!
//! New role assignment blocks are spliced in front of whatever metadata a
//! line already carries (priority marks, dates, recurrence, inline fields,
//! tags). Each kind of metadata has its own probe; the resolver reports the
//! smallest offset any probe matched. When two probes match at the same
//! offset the one listed first in [`PROBES`] is reported.

use crate::types::{DateKind, Priority};
use regex_lite::Regex;
use std::sync::LazyLock;

/// Priority glyphs and the priority they denote.
pub const PRIORITY_GLYPHS: &[(&str, Priority)] = &[
    ("🔴", Priority::Urgent),
    ("🔺", Priority::Urgent),
    ("🟠", Priority::High),
    ("⏫", Priority::High),
    ("🟡", Priority::Medium),
    ("🔼", Priority::Medium),
    ("🟢", Priority::Low),
    ("🔽", Priority::Low),
    ("⏬", Priority::Low),
];

/// Date glyphs and the date kind they introduce.
pub const DATE_GLYPHS: &[(&str, DateKind)] = &[
    ("➕", DateKind::Created),
    ("📅", DateKind::Due),
    ("🗓\u{FE0F}", DateKind::Due),
    ("🗓", DateKind::Due),
    ("⏳", DateKind::Scheduled),
    ("✅", DateKind::Completed),
    ("🛫", DateKind::Start),
    ("❌", DateKind::Cancelled),
];

pub const RECURRENCE_GLYPH: &str = "🔁";

/// Field labels accepted in `label: YYYY-MM-DD` and `[label:: YYYY-MM-DD]` forms.
pub const DATE_LABELS: &str = "created|due|scheduled|start|completed|completion|done|cancelled|canceled";

/// Kind of metadata a probe recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    PriorityGlyph,
    PriorityMarker,
    Recurrence,
    GlyphDate,
    LabelDate,
    InlineField,
    Tag,
}

/// A metadata cluster found on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataMatch {
    pub kind: MetadataKind,
    pub offset: usize,
}

/// Probe order, which is also the tie-break precedence.
pub const PROBES: [MetadataKind; 7] = [
    MetadataKind::PriorityGlyph,
    MetadataKind::PriorityMarker,
    MetadataKind::Recurrence,
    MetadataKind::GlyphDate,
    MetadataKind::LabelDate,
    MetadataKind::InlineField,
    MetadataKind::Tag,
];

fn alternation(glyphs: impl Iterator<Item = &'static str>) -> String {
    glyphs.map(regex_lite::escape).collect::<Vec<_>>().join("|")
}

static PRIORITY_GLYPH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&alternation(PRIORITY_GLYPHS.iter().map(|(g, _)| *g)))
        .expect("priority glyph pattern")
});

static PRIORITY_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[(?:urgent|high|medium|low)\]").expect("priority marker pattern"));

static GLYPH_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let glyphs = alternation(DATE_GLYPHS.iter().map(|(g, _)| *g));
    Regex::new(&format!(r"(?:{})\s*\d{{4}}-\d{{2}}-\d{{2}}", glyphs)).expect("glyph date pattern")
});

static LABEL_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:{})\s*::?\s*\d{{4}}-\d{{2}}-\d{{2}}",
        DATE_LABELS
    ))
    .expect("label date pattern")
});

static INLINE_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\[\]\s][^\[\]]*::").expect("inline field pattern"));

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(#[^\s#\[\],]+)").expect("tag pattern"));

/// Hashtags made only of digits (`#12`) are issue references, not tags.
pub fn is_tag(candidate: &str) -> bool {
    let body = candidate.trim_start_matches('#');
    !body.is_empty() && !body.chars().all(|c| c.is_ascii_digit())
}

impl MetadataKind {
    /// Offset of the first match of this probe in `line`.
    pub fn find(self, line: &str) -> Option<usize> {
        match self {
            MetadataKind::PriorityGlyph => PRIORITY_GLYPH_RE.find(line).map(|m| m.start()),
            MetadataKind::PriorityMarker => PRIORITY_MARKER_RE.find(line).map(|m| m.start()),
            MetadataKind::Recurrence => line.find(RECURRENCE_GLYPH),
            MetadataKind::GlyphDate => GLYPH_DATE_RE.find(line).map(|m| m.start()),
            MetadataKind::LabelDate => LABEL_DATE_RE.find(line).map(|m| m.start()),
            MetadataKind::InlineField => INLINE_FIELD_RE.find(line).map(|m| m.start()),
            MetadataKind::Tag => TAG_RE
                .captures_iter(line)
                .filter_map(|c| c.get(1))
                .find(|m| is_tag(m.as_str()))
                .map(|m| m.start()),
        }
    }
}

/// Hashtags on the line, in order of appearance.
pub fn find_tags(line: &str) -> Vec<&str> {
    TAG_RE
        .captures_iter(line)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|t| is_tag(t))
        .collect()
}

/// The line with its hashtags removed; issue references like `#12` stay.
pub fn strip_tags(line: &str) -> String {
    TAG_RE
        .replace_all(line, |caps: &regex_lite::Captures<'_>| {
            let whole = &caps[0];
            match caps.get(1) {
                Some(tag) if is_tag(tag.as_str()) => whole[..whole.len() - tag.len()].to_string(),
                _ => whole.to_string(),
            }
        })
        .into_owned()
}

/// Earliest metadata cluster on the line, if any.
pub fn first_metadata(line: &str) -> Option<MetadataMatch> {
    let mut best: Option<MetadataMatch> = None;
    for kind in PROBES {
        if let Some(offset) = kind.find(line)
            && best.is_none_or(|b| offset < b.offset)
        {
            best = Some(MetadataMatch { kind, offset });
        }
    }
    best
}

/// Byte offset where trailing metadata begins, or `None` when the line has none.
pub fn metadata_start(line: &str) -> Option<usize> {
    first_metadata(line).map(|m| m.offset)
}
