//! Edit session: the located bar, carried between consecutive edits.
//!
//! The host applies replacements asynchronously, so after each edit the
//! session is advanced optimistically instead of re-locating the bar in
//! a document that may not have caught up yet.

use serde::{Deserialize, Serialize};

use crate::error::{EditError, Result};
use crate::locator::{self, BarRange};

/// A text replacement for the host to apply to the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Replacement {
    pub fn apply(&self, doc: &mut String) -> Result<()> {
        let fits = self.start <= self.end
            && self.end <= doc.len()
            && doc.is_char_boundary(self.start)
            && doc.is_char_boundary(self.end);
        if !fits {
            return Err(EditError::RangeOutOfBounds {
                start: self.start,
                end: self.end,
                len: doc.len(),
            });
        }
        doc.replace_range(self.start..self.end, &self.text);
        Ok(())
    }
}

/// How edits are written back around the bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Append `" |"` when no barline follows the bar
    pub trailing_barline: bool,
    /// Characters after the bar searched for an existing barline
    pub barline_peek: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            trailing_barline: true,
            barline_peek: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSession {
    pub range: BarRange,
    pub bar_text: String,
}

impl EditSession {
    pub fn locate(doc: &str, cursor: usize) -> Option<Self> {
        locator::locate_bar(doc, cursor).map(|range| Self::from_range(doc, range))
    }

    pub fn from_range(doc: &str, range: BarRange) -> Self {
        EditSession {
            range,
            bar_text: range.slice(doc).to_string(),
        }
    }

    /// Bars are the same when their text is, wherever they sit
    pub fn same_bar(&self, other: &EditSession) -> bool {
        self.bar_text == other.bar_text
    }

    /// The document no longer holds this session's text at its range
    pub fn is_stale(&self, doc: &str) -> bool {
        self.range.slice(doc) != self.bar_text
    }

    /// Advance past an applied edit: `end` moves by the change in length.
    pub fn apply_edit(self, new_text: &str) -> EditSession {
        let delta = new_text.len() as isize - self.bar_text.len() as isize;
        let end = self.range.end.saturating_add_signed(delta);
        EditSession {
            range: BarRange::new(self.range.start, end),
            bar_text: new_text.to_string(),
        }
    }

    /// Build the replacement for a new bar body and the session that
    /// follows it.
    ///
    /// Whitespace around the old bar is kept. A barline added after the
    /// bar is outside the next session's range.
    pub fn prepare_edit(
        &self,
        doc: &str,
        body: &str,
        options: WriteOptions,
    ) -> (Replacement, EditSession) {
        let old = self.bar_text.as_str();
        let (lead, trail) = if old.trim().is_empty() {
            let pad = if old.is_empty() { "" } else { " " };
            (pad, pad)
        } else {
            (
                &old[..old.len() - old.trim_start().len()],
                &old[old.trim_end().len()..],
            )
        };
        let bar_text = format!("{lead}{body}{trail}");

        let mut text = bar_text.clone();
        if options.trailing_barline && !barline_follows(doc, self.range.end, options.barline_peek) {
            text.push_str(if trail.is_empty() { " |" } else { "|" });
        }

        let replacement = Replacement {
            start: self.range.start,
            end: self.range.end,
            text,
        };
        let next = self.clone().apply_edit(&bar_text);
        tracing::debug!(
            start = replacement.start,
            end = replacement.end,
            new_end = next.range.end,
            "prepared bar replacement"
        );
        (replacement, next)
    }
}

fn barline_follows(doc: &str, offset: usize, peek: usize) -> bool {
    let ahead: String = doc.get(offset..).unwrap_or("").chars().take(peek).collect();
    ahead.contains('|') || ahead.contains("::")
}
