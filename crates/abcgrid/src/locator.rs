//! Bar locator: find the measure around a cursor in a full document.

use serde::{Deserialize, Serialize};

use crate::line::{self, Line, LineKind};
use crate::parser::markup;

/// Half-open byte range `[start, end)` of a bar in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarRange {
    pub start: usize,
    pub end: usize,
}

impl BarRange {
    pub fn new(start: usize, end: usize) -> Self {
        BarRange {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The bar's text, or `""` if the range no longer fits the document
    pub fn slice<'d>(&self, doc: &'d str) -> &'d str {
        doc.get(self.start..self.end).unwrap_or("")
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Byte ranges of the barline runs in a line's musical content, relative
/// to the line start.
///
/// A run is a maximal stretch of `|`, `:`, `]` (and `[` directly before
/// `|`) that contains a `|` or `::`, plus any repeat-ending number after
/// it. Annotations, decorations and inline fields are stepped over so a
/// `|` inside them never splits a bar.
fn barline_runs(content: &str) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut rest = content;
    while let Some(c) = rest.chars().next() {
        let at = content.len() - rest.len();
        if markup::skip_protected(&mut rest).is_some() {
            continue;
        }
        let starts_run = c == '|' || c == ':' || rest.starts_with("[|");
        if !starts_run {
            rest = &rest[c.len_utf8()..];
            continue;
        }
        let mut len = 0;
        let bytes = rest.as_bytes();
        while len < bytes.len() {
            match bytes[len] {
                b'|' | b':' | b']' => len += 1,
                b'[' if bytes.get(len + 1) == Some(&b'|') => len += 1,
                _ => break,
            }
        }
        let run = &rest[..len];
        if run.contains('|') || run.contains("::") {
            // repeat endings: `|1`, `:|2`, `|[1`
            let after = &rest[len..];
            let tail = after.strip_prefix('[').unwrap_or(after);
            let consumed = if tail.starts_with(|c: char| c.is_ascii_digit()) {
                let ending = tail
                    .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '-'))
                    .unwrap_or(tail.len());
                rest.len() - tail.len() + ending
            } else {
                len
            };
            runs.push((at, at + consumed));
            rest = &rest[consumed..];
        } else {
            rest = &rest[len..];
        }
    }
    runs
}

/// Bar segments of one music line, in absolute offsets, before trimming
fn line_segments(line: &Line<'_>) -> Vec<BarRange> {
    let content_len = line::music_content_end(line.text);
    let content = &line.text[..content_len];
    let mut segments = Vec::new();
    let mut seg_start = 0;
    for (run_start, run_end) in barline_runs(content) {
        segments.push(BarRange::new(line.start + seg_start, line.start + run_start));
        seg_start = run_end;
    }
    segments.push(BarRange::new(line.start + seg_start, line.start + content_len));
    segments
}

/// Move `start` past leading inline fields (`[V:1]`, `[K:G] [L:1/16]`)
/// and the whitespace around them.
fn trim_inline_fields(doc: &str, range: BarRange) -> BarRange {
    let text = range.slice(doc);
    let mut rest = text;
    let mut trimmed = false;
    loop {
        let mut ahead = rest.trim_start();
        if markup::parse_inline_field(&mut ahead).is_err() {
            break;
        }
        rest = ahead;
        trimmed = true;
    }
    if !trimmed {
        return range;
    }
    let rest = rest.trim_start();
    BarRange::new(range.start + text.len() - rest.len(), range.end)
}

/// Find the bar enclosing `cursor`.
///
/// Returns `None` on comment, lyric and header lines, and when the cursor
/// sits in a trailing `%` comment. A cursor inside a barline belongs to
/// the bar after it.
pub fn locate_bar(doc: &str, cursor: usize) -> Option<BarRange> {
    let line = line::line_at(doc, cursor);
    let cursor = line::floor_char_boundary(doc, cursor);
    if line.kind() != LineKind::Music {
        tracing::trace!(cursor, kind = ?line.kind(), "no bar on this line");
        return None;
    }
    if cursor > line.start + line::music_content_end(line.text) {
        return None;
    }
    let segments = line_segments(&line);
    let segment = segments
        .iter()
        .find(|s| s.contains(cursor))
        .or_else(|| segments.iter().find(|s| s.start > cursor))?;
    let range = trim_inline_fields(doc, *segment);
    tracing::debug!(cursor, start = range.start, end = range.end, "located bar");
    Some(range)
}

/// Every bar of the document with some content, in document order
pub fn bars(doc: &str) -> Vec<BarRange> {
    line::lines(doc)
        .filter(|l| l.kind() == LineKind::Music)
        .flat_map(|l| line_segments(&l))
        .map(|s| trim_inline_fields(doc, s))
        .filter(|r| !r.slice(doc).trim().is_empty())
        .collect()
}

/// The last bar with content that starts before `current`
pub fn previous_bar(doc: &str, current: BarRange) -> Option<BarRange> {
    bars(doc)
        .into_iter()
        .take_while(|r| r.start < current.start)
        .filter(|r| r.end <= current.start)
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bar_at(doc: &str, cursor: usize) -> Option<&str> {
        locate_bar(doc, cursor).map(|r| r.slice(doc))
    }

    #[test]
    fn test_locate_simple() {
        let doc = "X:1\nK:C\nC D | E F | G A";
        let e = doc.find('E').unwrap();
        assert_eq!(bar_at(doc, e), Some(" E F "));
        assert_eq!(bar_at(doc, doc.len()), Some(" G A"));
        let c = doc.find('C').unwrap();
        assert_eq!(bar_at(doc, c), Some("C D "));
    }

    #[test]
    fn test_header_and_comment_lines_have_no_bar() {
        let doc = "X:1\nK:C\n% note\nw: la la\nC D|";
        assert_eq!(locate_bar(doc, 0), None);
        assert_eq!(locate_bar(doc, doc.find("% note").unwrap() + 2), None);
        assert_eq!(locate_bar(doc, doc.find("la").unwrap()), None);
    }

    #[test]
    fn test_cursor_at_document_start_and_end() {
        let doc = "CDEF|GABc|";
        assert_eq!(bar_at(doc, 0), Some("CDEF"));
        assert_eq!(locate_bar(doc, doc.len()), Some(BarRange::new(10, 10)));
    }

    #[test]
    fn test_line_without_barlines() {
        let doc = "K:C\nC D E F";
        assert_eq!(bar_at(doc, doc.len() - 1), Some("C D E F"));
    }

    #[test]
    fn test_cursor_on_barline_edges() {
        let doc = "AB|cd";
        assert_eq!(bar_at(doc, 2), Some("AB"));
        assert_eq!(bar_at(doc, 3), Some("cd"));
    }

    #[test]
    fn test_consecutive_barlines() {
        let doc = "AB||cd";
        // inside the `||` run: the bar after it
        assert_eq!(bar_at(doc, 3), Some("cd"));
        assert_eq!(bars(doc).len(), 2);
    }

    #[test]
    fn test_repeat_barlines() {
        let doc = "|: AB :|: cd :|1 ef |[2 ga |]";
        let texts: Vec<_> = bars(doc).iter().map(|r| r.slice(doc).trim()).collect();
        assert_eq!(texts, vec!["AB", "cd", "ef", "ga"]);
        let c = doc.find('c').unwrap();
        assert_eq!(bar_at(doc, c).map(str::trim), Some("cd"));
    }

    #[test]
    fn test_inline_field_is_trimmed() {
        let doc = "[V:1] C D E |";
        let range = locate_bar(doc, 8).unwrap();
        assert_eq!(range.start, 6);
        assert_eq!(range.end, doc.find('|').unwrap());
        assert_eq!(range.slice(doc), "C D E ");
    }

    #[test]
    fn test_bar_with_only_inline_fields_collapses() {
        let doc = "C D | [K:G] [L:1/16] | E";
        let field = doc.find("[K").unwrap();
        let range = locate_bar(doc, field + 1).unwrap();
        assert!(range.is_empty());
        assert_eq!(range.end, doc.rfind('|').unwrap());
    }

    #[test]
    fn test_barline_inside_annotation_does_not_split() {
        let doc = "\"A|B\"C D | E";
        assert_eq!(bar_at(doc, 6), Some("\"A|B\"C D "));
    }

    #[test]
    fn test_trailing_comment() {
        let doc = "C D | E F % tail";
        assert_eq!(locate_bar(doc, doc.len() - 1), None);
        assert_eq!(bar_at(doc, 6), Some(" E F "));
    }

    #[test]
    fn test_previous_bar_skips_empty_bars() {
        let doc = "X:1\nK:C\nC D |\n% c\n| | E F | G";
        let current = locate_bar(doc, doc.len()).unwrap();
        let prev = previous_bar(doc, current).unwrap();
        assert_eq!(prev.slice(doc), " E F ");
        let prev = previous_bar(doc, prev).unwrap();
        assert_eq!(prev.slice(doc), "C D ");
        assert_eq!(previous_bar(doc, prev), None);
    }
}
