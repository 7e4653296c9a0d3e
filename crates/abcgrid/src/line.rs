//! Line classification shared by the bar locator and document scans.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    /// `%` comments and `%%` directives
    Comment,
    /// `w:` / `W:` lyrics
    Lyric,
    /// `X:`, `K:`, `+:` and every other field line
    Header,
    Music,
}

pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim_start();
    if trimmed.starts_with('%') {
        return LineKind::Comment;
    }
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some('w' | 'W'), Some(':')) => LineKind::Lyric,
        (Some(c), Some(':')) if c.is_ascii_alphabetic() || c == '+' => LineKind::Header,
        _ => LineKind::Music,
    }
}

/// Byte length of the musical part of a line: everything before an
/// unescaped `%` that is not inside a quoted annotation.
pub fn music_content_end(line: &str) -> usize {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '%' if !in_quotes => return i,
            _ => {}
        }
    }
    line.len()
}

/// One line of a document with its absolute byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub start: usize,
    /// Line text without the terminator (`\n` or `\r\n`)
    pub text: &'a str,
}

impl<'a> Line<'a> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    pub fn kind(&self) -> LineKind {
        classify_line(self.text)
    }
}

pub fn lines(doc: &str) -> impl Iterator<Item = Line<'_>> {
    let mut start = 0;
    doc.split('\n').map(move |raw| {
        let line = Line {
            start,
            text: raw.strip_suffix('\r').unwrap_or(raw),
        };
        start += raw.len() + 1;
        line
    })
}

/// The line containing `offset` (clamped to the document)
pub fn line_at(doc: &str, offset: usize) -> Line<'_> {
    let offset = floor_char_boundary(doc, offset);
    let start = doc[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = doc[offset..].find('\n').map_or(doc.len(), |i| offset + i);
    let text = &doc[start..end];
    Line {
        start,
        text: text.strip_suffix('\r').unwrap_or(text),
    }
}

pub(crate) fn floor_char_boundary(doc: &str, offset: usize) -> usize {
    let mut offset = offset.min(doc.len());
    while !doc.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
