//! Line-based rendering of recommendation replies
//!
//! Replies are plain text with a small markdown subset: numbered lists
//! (optionally with a `**Title**: description` shape), `Heading:` lines, and
//! inline `**bold**` spans. [`render`] turns such text into structural
//! [`Block`]s carrying no styling; the front end decides how they look.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// A run of text that is either emphasized or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub text: String,
    pub emphasized: bool,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasized: false,
        }
    }

    pub fn emphasized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasized: true,
        }
    }
}

pub type ListItem = Vec<Segment>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Block {
    Heading(String),
    Paragraph(Vec<Segment>),
    /// Consecutive numbered lines, in the order they appeared
    OrderedList(Vec<ListItem>),
    LineBreak,
}

impl Block {
    /// Flatten the block to unstyled text, one line per list item.
    pub fn plain_text(&self) -> String {
        match self {
            Block::Heading(text) => text.clone(),
            Block::Paragraph(segments) => join_segments(segments),
            Block::OrderedList(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| format!("{}. {}", i + 1, join_segments(item)))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::LineBreak => String::new(),
        }
    }
}

fn join_segments(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}

fn titled_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9]+)\.\s*\*\*(.*?)\*\*:\s*(.*)$").expect("titled item pattern is valid")
    })
}

fn numbered_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9]+)\.\s*(.*)$").expect("numbered item pattern is valid"))
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"))
}

/// Incremental renderer. Feed lines with [`Renderer::push_line`], then call
/// [`Renderer::finish`] to flush any open list.
#[derive(Debug, Default)]
pub struct Renderer {
    blocks: Vec<Block>,
    // Non-empty while we are inside a numbered list
    pending_list: Vec<ListItem>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, raw: &str) {
        let line = raw.trim();

        if line.is_empty() {
            self.flush_list();
            self.blocks.push(Block::LineBreak);
            return;
        }

        if let Some(caps) = titled_item_re().captures(line) {
            let title = caps.get(2).map_or("", |m| m.as_str());
            let description = caps.get(3).map_or("", |m| m.as_str());
            self.pending_list.push(vec![
                Segment::emphasized(title),
                Segment::plain(format!(": {}", description)),
            ]);
            return;
        }

        if let Some(caps) = numbered_item_re().captures(line) {
            let content = caps.get(2).map_or("", |m| m.as_str());
            self.pending_list.push(vec![Segment::plain(content)]);
            return;
        }

        self.flush_list();

        if let Some(heading) = line.strip_suffix(':') {
            if !line.contains("**") {
                self.blocks.push(Block::Heading(heading.to_string()));
                return;
            }
        }

        if bold_re().is_match(line) {
            self.blocks.push(Block::Paragraph(split_bold(line)));
        } else {
            self.blocks.push(Block::Paragraph(vec![Segment::plain(line)]));
        }
    }

    pub fn finish(mut self) -> Vec<Block> {
        self.flush_list();
        self.blocks
    }

    fn flush_list(&mut self) {
        if !self.pending_list.is_empty() {
            let items = std::mem::take(&mut self.pending_list);
            self.blocks.push(Block::OrderedList(items));
        }
    }
}

/// Split a line on `**...**` spans. Text between matched pairs is
/// emphasized; an unmatched `**` is left in the surrounding plain text.
fn split_bold(line: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for caps in bold_re().captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last_end {
            segments.push(Segment::plain(&line[last_end..whole.start()]));
        }
        if !inner.as_str().is_empty() {
            segments.push(Segment::emphasized(inner.as_str()));
        }
        last_end = whole.end();
    }

    if last_end < line.len() {
        segments.push(Segment::plain(&line[last_end..]));
    }

    segments
}

/// Render a reply into display blocks.
///
/// The input is split on `\n`, so a trailing newline yields a trailing
/// [`Block::LineBreak`].
pub fn render(text: &str) -> Vec<Block> {
    let mut renderer = Renderer::new();
    for line in text.split('\n') {
        renderer.push_line(line);
    }
    renderer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titled_list_item() {
        let blocks = render("1. **A**: b");
        assert_eq!(
            blocks,
            vec![Block::OrderedList(vec![vec![
                Segment::emphasized("A"),
                Segment::plain(": b"),
            ]])]
        );
    }

    #[test]
    fn test_heading_strips_colon() {
        assert_eq!(render("Summary:"), vec![Block::Heading("Summary".to_string())]);
    }

    #[test]
    fn test_bold_paragraph() {
        assert_eq!(
            render("**bold** and plain"),
            vec![Block::Paragraph(vec![
                Segment::emphasized("bold"),
                Segment::plain(" and plain"),
            ])]
        );
    }

    #[test]
    fn test_line_with_bold_and_colon_is_not_heading() {
        assert_eq!(
            render("See **these**:"),
            vec![Block::Paragraph(vec![
                Segment::plain("See "),
                Segment::emphasized("these"),
                Segment::plain(":"),
            ])]
        );
    }

    #[test]
    fn test_consecutive_numbered_lines_form_one_list() {
        let text = "Top picks:\n1. **City Hospital**: Cardiology centre\n2. General Clinic\n3. **Mercy**: 24h ER";
        let blocks = render(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], Block::Heading("Top picks".to_string()));
        match &blocks[1] {
            Block::OrderedList(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[1], vec![Segment::plain("General Clinic")]);
                assert_eq!(items[2][0], Segment::emphasized("Mercy"));
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_line_closes_list_then_breaks() {
        let blocks = render("1. one\n\n2. two");
        assert_eq!(
            blocks,
            vec![
                Block::OrderedList(vec![vec![Segment::plain("one")]]),
                Block::LineBreak,
                Block::OrderedList(vec![vec![Segment::plain("two")]]),
            ]
        );
    }

    #[test]
    fn test_paragraph_closes_list() {
        let blocks = render("1. one\nplain text\n2. two");
        assert_eq!(blocks.len(), 3);
        assert!(matches!(blocks[0], Block::OrderedList(_)));
        assert_eq!(blocks[1], Block::Paragraph(vec![Segment::plain("plain text")]));
        assert!(matches!(blocks[2], Block::OrderedList(_)));
    }

    #[test]
    fn test_unbalanced_bold_stays_literal() {
        let blocks = render("**open and **closed** then **dangling");
        assert_eq!(
            blocks,
            vec![Block::Paragraph(vec![
                Segment::emphasized("open and "),
                Segment::plain("closed"),
                Segment::emphasized(" then "),
                Segment::plain("dangling"),
            ])]
        );

        let lone = render("just ** one marker");
        assert_eq!(
            lone,
            vec![Block::Paragraph(vec![Segment::plain("just ** one marker")])]
        );
    }

    #[test]
    fn test_lines_are_trimmed() {
        assert_eq!(
            render("   Results:  \r"),
            vec![Block::Heading("Results".to_string())]
        );
    }

    #[test]
    fn test_numbered_without_space() {
        assert_eq!(
            render("7.Seven"),
            vec![Block::OrderedList(vec![vec![Segment::plain("Seven")]])]
        );
    }

    #[test]
    fn test_every_non_blank_line_is_represented() {
        let text = "Intro\n1. a\n2. **b**: c\n\nNotes:\n**x** y\nlast";
        let blocks = render(text);
        let non_blank = text.split('\n').filter(|l| !l.trim().is_empty()).count();
        let represented: usize = blocks
            .iter()
            .map(|b| match b {
                Block::OrderedList(items) => items.len(),
                Block::LineBreak => 0,
                _ => 1,
            })
            .sum();
        assert_eq!(represented, non_blank);
    }

    #[test]
    fn test_trailing_newline_yields_break() {
        assert_eq!(
            render("hello\n"),
            vec![
                Block::Paragraph(vec![Segment::plain("hello")]),
                Block::LineBreak,
            ]
        );
    }

    #[test]
    fn test_odd_inputs_do_not_panic() {
        for text in ["", "**", "****", "1.", "1. ****:", ":", "\n\n\n", "ünïcødé **ß**"] {
            let _ = render(text);
        }
        assert_eq!(render("1."), vec![Block::OrderedList(vec![vec![Segment::plain("")]])]);
    }

    #[test]
    fn test_only_ascii_digits_start_list_items() {
        assert_eq!(
            render("\u{0661}. foo"),
            vec![Block::Paragraph(vec![Segment::plain("\u{0661}. foo")])]
        );
        assert_eq!(
            render("\u{FF11}. **A**: b"),
            vec![Block::Paragraph(vec![
                Segment::plain("\u{FF11}. "),
                Segment::emphasized("A"),
                Segment::plain(": b"),
            ])]
        );
    }

    #[test]
    fn test_plain_text_numbers_items() {
        let blocks = render("1. **A**: b\n2. c");
        assert_eq!(blocks[0].plain_text(), "1. A: b\n2. c");
    }
}
