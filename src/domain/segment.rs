//! Splits a response into prose and fenced code.
//!
//! A fence opens with three backticks, an optional tag of ASCII word characters written
//! directly after them, and a newline. It closes at the nearest following three backticks.
//! Everything else is kept verbatim as text.

use std::ops::Range;

pub const DEFAULT_CODE_LANGUAGE: &str = "txt";

const FENCE: &str = "```";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Segment {
    Text { content: String },
    Code { content: String, language: String },
}

impl Segment {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn code(content: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Code {
            content: content.into(),
            language: language.into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SpanKind {
    Text,
    /// Ranges are absolute byte offsets into the scanned text.
    Code {
        language: Option<Range<usize>>,
        content: Range<usize>,
    },
}

/// A contiguous byte range of the input. Code spans include their fences, so the spans of
/// one scan tile the input exactly.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SegmentSpan {
    pub offset: usize,
    pub len: usize,
    pub kind: SpanKind,
}

impl SegmentSpan {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    fn text(range: Range<usize>) -> Self {
        Self {
            offset: range.start,
            len: range.end - range.start,
            kind: SpanKind::Text,
        }
    }
}

enum FenceMatch {
    NotOpener,
    Unterminated,
    Closed {
        language: Option<Range<usize>>,
        content: Range<usize>,
        end: usize,
    },
}

/// Single forward pass; each fence candidate is inspected once.
pub fn scan_spans(text: &str) -> Vec<SegmentSpan> {
    let mut spans = Vec::new();
    let mut emitted_to = 0usize;
    let mut cursor = 0usize;

    while let Some(found) = text[cursor..].find(FENCE) {
        let open = cursor + found;
        match match_fence_at(text, open) {
            FenceMatch::NotOpener => {
                cursor = open + 1;
            }
            // No closing fence after this opener means there is none after any later one.
            FenceMatch::Unterminated => break,
            FenceMatch::Closed {
                language,
                content,
                end,
            } => {
                if open > emitted_to {
                    spans.push(SegmentSpan::text(emitted_to..open));
                }
                spans.push(SegmentSpan {
                    offset: open,
                    len: end - open,
                    kind: SpanKind::Code { language, content },
                });
                emitted_to = end;
                cursor = end;
            }
        }
    }

    if emitted_to < text.len() {
        spans.push(SegmentSpan::text(emitted_to..text.len()));
    }
    spans
}

/// Empty input yields no segments; any other input yields at least one.
pub fn parse_segments(text: &str) -> Vec<Segment> {
    scan_spans(text)
        .into_iter()
        .map(|span| match span.kind {
            SpanKind::Text => Segment::text(&text[span.range()]),
            SpanKind::Code { language, content } => Segment::code(
                &text[content],
                language
                    .map(|range| &text[range])
                    .unwrap_or(DEFAULT_CODE_LANGUAGE),
            ),
        })
        .collect()
}

fn match_fence_at(text: &str, open: usize) -> FenceMatch {
    let bytes = text.as_bytes();
    let tag_start = open + FENCE.len();
    let tag_end = bytes[tag_start..]
        .iter()
        .position(|byte| !is_word_byte(*byte))
        .map_or(bytes.len(), |len| tag_start + len);

    if bytes.get(tag_end) != Some(&b'\n') {
        return FenceMatch::NotOpener;
    }

    let content_start = tag_end + 1;
    let Some(close) = text[content_start..].find(FENCE) else {
        return FenceMatch::Unterminated;
    };
    let content_end = content_start + close;

    FenceMatch::Closed {
        language: (tag_end > tag_start).then_some(tag_start..tag_end),
        content: content_start..content_end,
        end: content_end + FENCE.len(),
    }
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}
