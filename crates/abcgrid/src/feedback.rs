//! Tokenizer feedback (warnings, errors, suggestions).
//!
//! ABC in the wild is permissive and a bar is usually half-typed while
//! the grid is open, so the tokenizer never fails. Anything it had to
//! guess about is reported here, keyed by byte span within the bar.

use serde::{Deserialize, Serialize};

/// Feedback from tokenizing - warnings, errors, and suggestions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub level: FeedbackLevel,
    pub message: String,
    /// (start, end) byte offsets within the tokenized text
    pub span: (usize, usize),
    pub suggestion: Option<String>,
}

impl Feedback {
    pub fn error(message: impl Into<String>, start: usize, end: usize) -> Self {
        Self::at(FeedbackLevel::Error, message, start, end)
    }

    pub fn warning(message: impl Into<String>, start: usize, end: usize) -> Self {
        Self::at(FeedbackLevel::Warning, message, start, end)
    }

    pub fn info(message: impl Into<String>, start: usize, end: usize) -> Self {
        Self::at(FeedbackLevel::Info, message, start, end)
    }

    fn at(level: FeedbackLevel, message: impl Into<String>, start: usize, end: usize) -> Self {
        Feedback {
            level,
            message: message.into(),
            span: (start, end),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackLevel {
    /// Content could not be interpreted and was kept as an opaque segment
    Error,
    /// Interpreted with assumptions, may not be what the user intended
    Warning,
    /// Valid ABC the grid does not model (ties across edits, slurs, ...)
    Info,
}

/// Collector for feedback during tokenizing
#[derive(Debug, Default)]
pub struct FeedbackCollector {
    feedback: Vec<Feedback>,
}

impl FeedbackCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>, start: usize, end: usize) {
        self.feedback.push(Feedback::error(message, start, end));
    }

    pub fn warning(&mut self, message: impl Into<String>, start: usize, end: usize) {
        self.feedback.push(Feedback::warning(message, start, end));
    }

    pub fn warning_with_suggestion(
        &mut self,
        message: impl Into<String>,
        suggestion: impl Into<String>,
        start: usize,
        end: usize,
    ) {
        self.feedback
            .push(Feedback::warning(message, start, end).with_suggestion(suggestion));
    }

    pub fn info(&mut self, message: impl Into<String>, start: usize, end: usize) {
        self.feedback.push(Feedback::info(message, start, end));
    }

    /// Check if any errors were recorded
    pub fn has_errors(&self) -> bool {
        self.feedback
            .iter()
            .any(|f| f.level == FeedbackLevel::Error)
    }

    pub fn into_feedback(self) -> Vec<Feedback> {
        self.feedback
    }

    pub fn feedback(&self) -> &[Feedback] {
        &self.feedback
    }
}

/// A value together with the feedback collected while producing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult<T> {
    pub value: T,
    pub feedback: Vec<Feedback>,
}

impl<T> ParseResult<T> {
    pub fn new(value: T, feedback: Vec<Feedback>) -> Self {
        ParseResult { value, feedback }
    }

    pub fn ok(value: T) -> Self {
        ParseResult {
            value,
            feedback: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.feedback
            .iter()
            .any(|f| f.level == FeedbackLevel::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Feedback> {
        self.feedback
            .iter()
            .filter(|f| f.level == FeedbackLevel::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Feedback> {
        self.feedback
            .iter()
            .filter(|f| f.level == FeedbackLevel::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_builder() {
        let fb = Feedback::warning("Unterminated annotation", 3, 9)
            .with_suggestion("Close the annotation with \"");

        assert_eq!(fb.level, FeedbackLevel::Warning);
        assert_eq!(fb.span, (3, 9));
        assert_eq!(
            fb.suggestion,
            Some("Close the annotation with \"".to_string())
        );
    }

    #[test]
    fn test_feedback_collector() {
        let mut collector = FeedbackCollector::new();

        collector.info("Slur is not modeled", 0, 1);
        collector.error("Unknown character '&'", 4, 5);

        assert!(collector.has_errors());
        let feedback = collector.into_feedback();
        assert_eq!(feedback.len(), 2);
        assert_eq!(feedback[1].span, (4, 5));
    }

    #[test]
    fn test_parse_result() {
        let result: ParseResult<i32> = ParseResult::new(
            42,
            vec![
                Feedback::warning("test warning", 0, 1),
                Feedback::error("test error", 1, 2),
            ],
        );

        assert!(result.has_errors());
        assert_eq!(result.warnings().count(), 1);
        assert_eq!(result.errors().count(), 1);
        assert!(!ParseResult::ok(1).has_errors());
    }
}
