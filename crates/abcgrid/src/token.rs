//! Token types: what the tokenizer reads out of a bar, and the
//! tick-addressed form edits operate on.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Note,
    Chord,
    /// `z`, `x`, or a whole-bar `Z`/`X`
    Rest,
    /// Quoted chord symbol or text, zero duration
    Annotation,
    /// `[K:..]`, `[L:..]` and friends inside the bar, zero duration
    InlineField,
    /// Anything the tokenizer could not interpret, zero duration
    Opaque,
}

/// One lexical unit of a bar.
///
/// `start`/`end` are byte offsets into the bar text; `notes` holds full
/// pitch spellings (`^g`, `C,`) in source order and is empty for
/// everything but notes and chords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub kind: TokenKind,
    pub notes: Vec<String>,
    /// Duration in ticks after tuplet scaling
    pub duration: f64,
    /// Concatenated decoration markers, including those written inside a chord
    pub decorations: String,
    /// Grace block with braces, e.g. `{g}`
    pub grace: String,
    /// Written with the `o` open prefix
    pub open: bool,
    /// Raw duration suffix
    pub suffix: String,
    /// Followed by a `-` tie
    pub tie: bool,
    /// `p` of the tuplet that scaled this token
    pub tuplet: Option<u32>,
}

impl Token {
    pub(crate) fn new(text: &str, start: usize, kind: TokenKind) -> Self {
        Token {
            text: text.to_string(),
            start,
            end: start + text.len(),
            kind,
            notes: Vec::new(),
            duration: 0.0,
            decorations: String::new(),
            grace: String::new(),
            open: false,
            suffix: String::new(),
            tie: false,
            tuplet: None,
        }
    }

    /// Notes, chords and rests advance time; everything else is zero-width
    pub fn is_timed(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Note | TokenKind::Chord | TokenKind::Rest
        )
    }
}

/// A tick-addressed note entry: the unit edits and the optimizer work on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizableToken {
    pub tick: u32,
    pub notes: Vec<String>,
    pub duration: u32,
    pub decorations: String,
    pub grace: String,
    pub open: bool,
    /// Annotations written in front of this token
    pub annotations: String,
}

impl OptimizableToken {
    pub fn rest(tick: u32, duration: u32) -> Self {
        OptimizableToken {
            tick,
            duration,
            ..Default::default()
        }
    }

    pub fn note(tick: u32, notes: Vec<String>, duration: u32) -> Self {
        OptimizableToken {
            tick,
            notes,
            duration,
            ..Default::default()
        }
    }

    pub fn has_note(&self) -> bool {
        !self.notes.is_empty()
    }

    /// Holds its tick through re-optimization
    pub fn is_anchored(&self) -> bool {
        self.has_note() || !self.annotations.is_empty()
    }

    pub fn end(&self) -> u32 {
        self.tick + self.duration
    }

    /// Drop per-note markup once the last note is gone
    pub(crate) fn clear_markup(&mut self) {
        self.decorations.clear();
        self.grace.clear();
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_span() {
        let token = Token::new("^g2", 4, TokenKind::Note);
        assert_eq!(token.end, 7);
        assert!(token.is_timed());
        assert!(!Token::new("\"C\"", 0, TokenKind::Annotation).is_timed());
    }

    #[test]
    fn test_anchoring() {
        let rest = OptimizableToken::rest(0, 4);
        assert!(!rest.is_anchored());

        let annotated = OptimizableToken {
            annotations: "\"Am\"".into(),
            ..OptimizableToken::rest(0, 4)
        };
        assert!(annotated.is_anchored());
        assert!(!annotated.has_note());

        let note = OptimizableToken::note(8, vec!["A".into()], 4);
        assert!(note.is_anchored());
        assert_eq!(note.end(), 12);
    }
}
