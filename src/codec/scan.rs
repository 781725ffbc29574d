//! Bracket-depth scanning shared by the parser and the block remover.

use std::ops::Range;

/// A terminated `[<icon>:: <body>]` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
    /// Whole block, from the opening `[` through the matching `]`.
    pub span: Range<usize>,
    /// Text between `::` and the closing `]`.
    pub body: Range<usize>,
}

/// Byte offset of the `]` that balances the `[` at `open`.
///
/// Returns `None` when the line ends before depth returns to zero.
pub(crate) fn matching_bracket(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Iterator over the terminated blocks opened by `needle` (`[` + icon + `::`).
///
/// An unterminated candidate yields nothing; scanning resumes one byte after
/// its opening `[`, so a later well-formed block on the same line is still found.
pub(crate) struct Blocks<'a> {
    text: &'a str,
    needle: String,
    pos: usize,
}

impl<'a> Blocks<'a> {
    pub fn new(text: &'a str, icon: &str) -> Self {
        Self {
            text,
            needle: format!("[{}::", icon),
            pos: 0,
        }
    }
}

impl Iterator for Blocks<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        while self.pos < self.text.len() {
            let start = self.pos + self.text[self.pos..].find(&self.needle)?;
            match matching_bracket(self.text, start) {
                Some(close) => {
                    self.pos = close + 1;
                    return Some(Block {
                        span: start..close + 1,
                        body: start + self.needle.len()..close,
                    });
                }
                // `[` is one byte, so start + 1 is a char boundary
                None => self.pos = start + 1,
            }
        }
        None
    }
}

/// Contents of every `[[...]]` link in `text`, in order.
pub(crate) fn wiki_links(text: &str) -> Vec<&str> {
    let mut links = Vec::new();
    let mut pos = 0;
    while let Some(rel) = text[pos..].find("[[") {
        let inner_start = pos + rel + 2;
        let Some(close) = text[inner_start..].find("]]") else {
            break;
        };
        links.push(&text[inner_start..inner_start + close]);
        pos = inner_start + close + 2;
    }
    links
}

/// Alias part of a `path|alias` link body.
pub(crate) fn link_alias(link: &str) -> Option<&str> {
    let (_, alias) = link.rsplit_once('|')?;
    let alias = alias.trim();
    (!alias.is_empty()).then_some(alias)
}

/// Collapse whitespace runs to one space and trim both ends.
pub(crate) fn normalize_spacing(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Leading indentation of `line` and the rest.
pub(crate) fn split_indent(line: &str) -> (&str, &str) {
    let content = line.trim_start();
    line.split_at(line.len() - content.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_bracket_nested() {
        let text = "[🚗:: [[People/John|@John]]] tail";
        let close = matching_bracket(text, 0).unwrap();
        assert_eq!(&text[..=close], "[🚗:: [[People/John|@John]]]");
    }

    #[test]
    fn test_matching_bracket_unterminated() {
        assert_eq!(matching_bracket("[🚗:: [[People/John|@John]]", 0), None);
    }

    #[test]
    fn test_blocks_skip_unterminated_candidate() {
        let text = "[🚗:: [[a|@A] [🚗:: @B]";
        // the first candidate never closes at depth 0 and must not swallow the line
        let bodies: Vec<&str> = Blocks::new(text, "🚗")
            .map(|b| text[b.body].trim())
            .collect();
        assert_eq!(bodies, vec!["@B"]);
    }

    #[test]
    fn test_blocks_finds_all() {
        let text = "a [🚗:: @A] b [🚗:: @B]";
        let bodies: Vec<&str> = Blocks::new(text, "🚗")
            .map(|b| text[b.body].trim())
            .collect();
        assert_eq!(bodies, vec!["@A", "@B"]);
    }

    #[test]
    fn test_wiki_links_and_alias() {
        let links = wiki_links(" [[People/John|@John]], [[People/Jane|@Jane]] [[broken");
        assert_eq!(links, vec!["People/John|@John", "People/Jane|@Jane"]);
        assert_eq!(link_alias(links[0]), Some("@John"));
        assert_eq!(link_alias("People/John"), None);
        assert_eq!(link_alias("People/John| "), None);
    }

    #[test]
    fn test_normalize_spacing() {
        assert_eq!(normalize_spacing("  - [ ] a \t  b  "), "- [ ] a b");
        assert_eq!(normalize_spacing("   "), "");
    }

    #[test]
    fn test_split_indent() {
        assert_eq!(split_indent("    - [ ] a"), ("    ", "- [ ] a"));
        assert_eq!(split_indent("x"), ("", "x"));
    }
}
