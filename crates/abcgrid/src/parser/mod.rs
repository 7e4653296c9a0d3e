//! Bar tokenizer.
//!
//! A hand-written scanner over the bar text that tries the recognizers in
//! [`markup`] and [`note`] in priority order: tuplet marker, annotation,
//! inline field, then a note group (decorations, open prefix, grace block,
//! chord / pitch / rest, duration suffix, tie). Whitespace separates
//! tokens and is not itself a token. Anything else becomes an opaque,
//! zero-duration token and a feedback entry; the scanner never fails.

pub mod markup;
pub mod note;

use crate::duration::DurationModel;
use crate::feedback::{FeedbackCollector, ParseResult};
use crate::grid::MAX_BAR_SPAN;
use crate::token::{Token, TokenKind};

use markup::TupletSpec;

/// Tokenize a bar, discarding feedback.
pub fn tokenize(bar: &str, model: &DurationModel) -> Vec<Token> {
    tokenize_with_feedback(bar, model).value
}

/// Tokenize a bar and report everything that had to be guessed.
pub fn tokenize_with_feedback(bar: &str, model: &DurationModel) -> ParseResult<Vec<Token>> {
    let mut lexer = Lexer {
        bar,
        rest: bar,
        model,
        collector: FeedbackCollector::new(),
        tokens: Vec::new(),
        tuplet: None,
        elapsed: 0.0,
    };
    lexer.run();
    tracing::trace!(bar, tokens = lexer.tokens.len(), "tokenized bar");
    ParseResult::new(lexer.tokens, lexer.collector.into_feedback())
}

struct ActiveTuplet {
    spec: TupletSpec,
    remaining: u32,
}

struct Lexer<'a> {
    bar: &'a str,
    rest: &'a str,
    model: &'a DurationModel,
    collector: FeedbackCollector,
    tokens: Vec<Token>,
    tuplet: Option<ActiveTuplet>,
    /// Ticks covered by the timed tokens so far
    elapsed: f64,
}

impl<'a> Lexer<'a> {
    fn offset(&self) -> usize {
        self.bar.len() - self.rest.len()
    }

    fn offset_of(&self, ahead: &str) -> usize {
        self.bar.len() - ahead.len()
    }

    fn run(&mut self) {
        while let Some(c) = self.rest.chars().next() {
            if c.is_whitespace() {
                self.rest = &self.rest[c.len_utf8()..];
                continue;
            }
            if self.try_tuplet()
                || self.try_annotation()
                || self.try_inline_field()
                || self.try_note_group()
            {
                continue;
            }
            self.opaque(c);
        }
        if let Some(active) = &self.tuplet {
            if active.remaining > 0 {
                let end = self.bar.len();
                self.collector.warning(
                    format!("Tuplet ({} is missing {} notes", active.spec.p, active.remaining),
                    end,
                    end,
                );
            }
        }
    }

    fn try_tuplet(&mut self) -> bool {
        let mut ahead = self.rest;
        let Ok(spec) = markup::parse_tuplet(&mut ahead) else {
            return false;
        };
        if self.tuplet.as_ref().is_some_and(|t| t.remaining > 0) {
            let start = self.offset();
            self.collector
                .warning("Tuplet starts before the previous one finished", start, self.offset_of(ahead));
        }
        self.tuplet = Some(ActiveTuplet {
            spec,
            remaining: spec.r,
        });
        self.rest = ahead;
        true
    }

    fn try_annotation(&mut self) -> bool {
        if !self.rest.starts_with('"') {
            return false;
        }
        let start = self.offset();
        let mut ahead = self.rest;
        let text = match markup::parse_annotation(&mut ahead) {
            Ok(text) => text,
            Err(_) => {
                let line_end = self.rest.find('\n').unwrap_or(self.rest.len());
                self.collector.warning_with_suggestion(
                    "Unterminated annotation",
                    "Close the annotation with \"",
                    start,
                    start + line_end,
                );
                ahead = &self.rest[line_end..];
                &self.rest[..line_end]
            }
        };
        self.tokens.push(Token::new(text, start, TokenKind::Annotation));
        self.rest = ahead;
        true
    }

    fn try_inline_field(&mut self) -> bool {
        let bytes = self.rest.as_bytes();
        if bytes.len() < 3 || bytes[0] != b'[' || !bytes[1].is_ascii_alphabetic() || bytes[2] != b':' {
            return false;
        }
        let start = self.offset();
        let mut ahead = self.rest;
        let (text, kind) = match markup::parse_inline_field(&mut ahead) {
            Ok(text) => (text, TokenKind::InlineField),
            Err(_) => {
                let end = self.rest.find(char::is_whitespace).unwrap_or(self.rest.len());
                self.collector
                    .error("Unterminated inline field", start, start + end);
                ahead = &self.rest[end..];
                (&self.rest[..end], TokenKind::Opaque)
            }
        };
        self.tokens.push(Token::new(text, start, kind));
        self.rest = ahead;
        true
    }

    fn try_note_group(&mut self) -> bool {
        let start = self.offset();
        let mut ahead = self.rest;
        let mut decorations = String::new();

        take_decorations(&mut ahead, &mut decorations);
        let mut open = take_open(&mut ahead);
        let grace = if ahead.starts_with('{') {
            attempt(&mut ahead, markup::parse_grace).unwrap_or("")
        } else {
            ""
        };
        take_decorations(&mut ahead, &mut decorations);
        open |= take_open(&mut ahead);

        let mut inner_suffix = None;
        // `[1` is a repeat ending, not a chord
        let chord = ahead.starts_with('[') && !ahead[1..].starts_with(|c: char| c.is_ascii_digit());
        let (kind, notes, whole_bars) = if chord {
            let notes = self.chord_body(&mut ahead, &mut decorations, &mut inner_suffix);
            if notes.is_empty() {
                self.collector
                    .warning("Empty chord, treating as a rest", start, self.offset_of(ahead));
                (TokenKind::Rest, notes, false)
            } else {
                (TokenKind::Chord, notes, false)
            }
        } else if let Some(pitch) = attempt(&mut ahead, note::pitch_text) {
            (TokenKind::Note, vec![pitch.to_string()], false)
        } else if let Some(rest) = attempt(&mut ahead, note::parse_rest) {
            (TokenKind::Rest, Vec::new(), matches!(rest, 'Z' | 'X'))
        } else {
            let consumed = self.rest.len() - ahead.len();
            if consumed == 0 {
                return false;
            }
            // a prefix with nothing to attach to
            self.collector
                .warning("Decoration is not followed by a note", start, start + consumed);
            self.push_opaque(start, start + consumed);
            self.rest = ahead;
            return true;
        };

        let suffix_start = self.offset_of(ahead);
        let mut suffix = note::duration_suffix(&mut ahead).unwrap_or("");
        if suffix.is_empty() {
            suffix = inner_suffix.unwrap_or("");
        }
        let tie = match ahead.strip_prefix('-') {
            Some(after) => {
                ahead = after;
                true
            }
            None => false,
        };

        let ticks = if whole_bars {
            let bars = match suffix {
                "" => 1,
                n => n.parse::<u32>().unwrap_or_else(|_| {
                    self.collector
                        .warning("Malformed bar count, assuming 1", suffix_start, suffix_start + n.len());
                    1
                }),
            };
            f64::from(self.model.grid().ticks_per_bar().saturating_mul(bars))
        } else {
            if !suffix.is_empty() && self.model.parse_suffix(suffix).is_none() {
                self.collector.warning(
                    format!("Malformed duration '{suffix}', using one unit"),
                    suffix_start,
                    suffix_start + suffix.len(),
                );
            }
            self.model.duration_to_ticks(suffix)
        };
        let (duration, tuplet) = self.apply_tuplet(ticks);

        let end = self.offset_of(ahead);
        let room = (f64::from(self.model.grid().max_content_ticks()) - self.elapsed).max(0.0);
        let duration = if duration > room {
            self.collector.warning(
                format!("Bar runs past {MAX_BAR_SPAN} bars, duration cut"),
                start,
                end,
            );
            room
        } else {
            duration
        };
        self.elapsed += duration;
        let mut token = Token::new(&self.bar[start..end], start, kind);
        token.notes = notes;
        token.duration = duration;
        token.decorations = decorations;
        token.grace = grace.to_string();
        token.open = open;
        token.suffix = suffix.to_string();
        token.tie = tie;
        token.tuplet = tuplet;
        self.tokens.push(token);
        self.rest = ahead;
        true
    }

    /// Parse `[...]`, collecting pitches and moving decorations written
    /// inside the brackets up to the token.
    fn chord_body(
        &mut self,
        ahead: &mut &'a str,
        decorations: &mut String,
        inner_suffix: &mut Option<&'a str>,
    ) -> Vec<String> {
        let chord_start = self.offset_of(ahead);
        *ahead = &ahead[1..];
        let mut notes = Vec::new();
        loop {
            *ahead = ahead.trim_start_matches([' ', '\t']);
            let Some(c) = ahead.chars().next() else {
                self.collector.warning_with_suggestion(
                    "Unterminated chord",
                    "Close the chord with ]",
                    chord_start,
                    self.bar.len(),
                );
                break;
            };
            if c == ']' {
                *ahead = &ahead[1..];
                break;
            }
            if let Some(dec) = attempt(ahead, markup::parse_decoration) {
                decorations.push_str(dec);
                continue;
            }
            if let Some(pitch) = attempt(ahead, note::pitch_text) {
                notes.push(pitch.to_string());
                let suffix = note::duration_suffix(ahead).unwrap_or("");
                if inner_suffix.is_none() && !suffix.is_empty() {
                    *inner_suffix = Some(suffix);
                }
                if let Some(after) = ahead.strip_prefix('-') {
                    *ahead = after;
                }
                continue;
            }
            let at = self.offset_of(ahead);
            self.collector
                .warning(format!("Unexpected '{c}' in chord"), at, at + c.len_utf8());
            *ahead = &ahead[c.len_utf8()..];
        }
        notes
    }

    fn apply_tuplet(&mut self, ticks: f64) -> (f64, Option<u32>) {
        match &mut self.tuplet {
            Some(active) if active.remaining > 0 => {
                active.remaining -= 1;
                let TupletSpec { p, q, .. } = active.spec;
                (ticks * q as f64 / p as f64, Some(p))
            }
            _ => (ticks, None),
        }
    }

    fn opaque(&mut self, c: char) {
        let start = self.offset();
        // unterminated blocks swallow the rest of the word so their
        // contents are not read as pitches
        let len = match c {
            '!' | '+' | '{' => self.rest.find(char::is_whitespace).unwrap_or(self.rest.len()),
            _ => c.len_utf8(),
        };
        let end = start + len;
        match c {
            '(' | ')' | '-' | '<' | '>' | '`' | '\\' => {
                self.collector
                    .info(format!("'{c}' is not modeled by the grid"), start, end)
            }
            '!' | '+' => self.collector.warning_with_suggestion(
                "Unterminated decoration",
                format!("Close the decoration with {c}"),
                start,
                end,
            ),
            '{' => self.collector.warning_with_suggestion(
                "Unterminated grace block",
                "Close the grace notes with }",
                start,
                end,
            ),
            _ => self
                .collector
                .error(format!("Unexpected character '{c}'"), start, end),
        }
        self.push_opaque(start, end);
        self.rest = &self.rest[len..];
    }

    /// Append an opaque span, merging with an adjacent opaque token
    fn push_opaque(&mut self, start: usize, end: usize) {
        match self.tokens.last_mut() {
            Some(last) if last.kind == TokenKind::Opaque && last.end == start => {
                last.text.push_str(&self.bar[start..end]);
                last.end = end;
            }
            _ => self
                .tokens
                .push(Token::new(&self.bar[start..end], start, TokenKind::Opaque)),
        }
    }
}

/// Run a recognizer, leaving the input untouched when it fails
fn attempt<'s, O>(
    input: &mut &'s str,
    mut parser: impl FnMut(&mut &'s str) -> note::PResult<O>,
) -> Option<O> {
    let mut ahead = *input;
    let out = parser(&mut ahead).ok()?;
    *input = ahead;
    Some(out)
}

fn take_decorations(ahead: &mut &str, decorations: &mut String) {
    while let Some(dec) = attempt(ahead, markup::parse_decoration) {
        decorations.push_str(dec);
    }
}

/// The `o` open prefix
fn take_open(ahead: &mut &str) -> bool {
    match ahead.strip_prefix('o') {
        Some(after) => {
            *ahead = after;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::FeedbackLevel;
    use crate::grid::TickGrid;
    use crate::header::UnitLength;
    use pretty_assertions::assert_eq;

    fn model() -> DurationModel {
        DurationModel::new(TickGrid::default())
    }

    fn notes_of(tokens: &[Token]) -> Vec<Vec<String>> {
        tokens.iter().map(|t| t.notes.clone()).collect()
    }

    #[test]
    fn test_simple_notes() {
        let tokens = tokenize("C2 E2 G2", &model());
        assert_eq!(tokens.len(), 3);
        assert_eq!(
            tokens.iter().map(|t| t.duration).collect::<Vec<_>>(),
            vec![24.0, 24.0, 24.0]
        );
        assert_eq!(notes_of(&tokens), vec![vec!["C"], vec!["E"], vec!["G"]]);
        assert_eq!((tokens[1].start, tokens[1].end), (3, 5));
    }

    #[test]
    fn test_tuplet_scales_following_notes() {
        let tokens = tokenize("(3ABc d", &model());
        let durations: Vec<_> = tokens.iter().map(|t| t.duration).collect();
        assert_eq!(durations, vec![8.0, 8.0, 8.0, 12.0]);
        assert_eq!(tokens[0].tuplet, Some(3));
        assert_eq!(tokens[3].tuplet, None);
        assert_eq!(tokens[0].start, 2);
    }

    #[test]
    fn test_tuplet_skips_annotations() {
        let tokens = tokenize("(3\"Am\"A B \"G\"c", &model());
        let timed: Vec<_> = tokens.iter().filter(|t| t.is_timed()).collect();
        assert!(timed.iter().all(|t| t.duration == 8.0));
        assert!(tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Annotation)
            .all(|t| t.duration == 0.0 && t.notes.is_empty()));
    }

    #[test]
    fn test_chord_with_annotation() {
        let tokens = tokenize("\"Am\"[CEG]2", &model());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Annotation);
        assert_eq!(tokens[0].text, "\"Am\"");
        assert_eq!(tokens[1].kind, TokenKind::Chord);
        assert_eq!(tokens[1].notes, vec!["C", "E", "G"]);
        assert_eq!(tokens[1].duration, 24.0);
    }

    #[test]
    fn test_drum_prefixes() {
        let tokens = tokenize("!>!{g}og", &model());
        assert_eq!(tokens.len(), 1);
        let token = &tokens[0];
        assert_eq!(token.decorations, "!>!");
        assert_eq!(token.grace, "{g}");
        assert!(token.open);
        assert_eq!(token.notes, vec!["g"]);
        assert_eq!(token.text, "!>!{g}og");
    }

    #[test]
    fn test_decorations_inside_chord_are_lifted() {
        let tokens = tokenize("[!>!g^g]/2", &model());
        assert_eq!(tokens[0].decorations, "!>!");
        assert_eq!(tokens[0].notes, vec!["g", "^g"]);
        assert_eq!(tokens[0].duration, 6.0);
    }

    #[test]
    fn test_chord_inner_length() {
        let tokens = tokenize("[C2E2]", &model());
        assert_eq!(tokens[0].duration, 24.0);
    }

    #[test]
    fn test_decoration_letters_are_not_pitches() {
        let tokens = tokenize("\"fade\" !fermata!c", &model());
        assert_eq!(notes_of(&tokens), vec![vec![], vec!["c".to_string()]]);
    }

    #[test]
    fn test_rests_and_whole_bar_rest() {
        let tokens = tokenize("z x/2 Z2", &model());
        assert_eq!(tokens[0].duration, 12.0);
        assert_eq!(tokens[1].duration, 6.0);
        assert_eq!(tokens[2].duration, 192.0);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Rest));
    }

    #[test]
    fn test_inline_field_and_tie() {
        let tokens = tokenize("[K:G] C2-C", &model());
        assert_eq!(tokens[0].kind, TokenKind::InlineField);
        assert_eq!(tokens[0].duration, 0.0);
        assert!(tokens[1].tie);
        assert_eq!(tokens[1].text, "C2-");
        assert!(!tokens[2].tie);
    }

    #[test]
    fn test_unterminated_annotation_degrades() {
        let result = tokenize_with_feedback("C \"Am", &model());
        assert_eq!(result.value.len(), 2);
        assert_eq!(result.value[1].kind, TokenKind::Annotation);
        assert_eq!(result.value[1].text, "\"Am");
        assert_eq!(result.warnings().count(), 1);
    }

    #[test]
    fn test_malformed_duration_is_one_unit() {
        let result = tokenize_with_feedback("C0", &model());
        assert_eq!(result.value[0].duration, 12.0);
        assert_eq!(result.warnings().count(), 1);
        assert_eq!(result.feedback[0].span, (1, 2));
    }

    #[test]
    fn test_unknown_runs_merge_into_opaque() {
        let result = tokenize_with_feedback("C && D", &model());
        let kinds: Vec<_> = result.value.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Note, TokenKind::Opaque, TokenKind::Note]
        );
        assert_eq!(result.value[1].text, "&&");
        assert_eq!(result.value[1].duration, 0.0);
        assert!(result.has_errors());
    }

    #[test]
    fn test_unterminated_decoration_hides_letters() {
        let result = tokenize_with_feedback("!fermata C", &model());
        assert_eq!(result.value[0].kind, TokenKind::Opaque);
        assert_eq!(result.value[0].text, "!fermata");
        assert_eq!(notes_of(&result.value)[1], vec!["C"]);
    }

    #[test]
    fn test_slurs_are_informational() {
        let result = tokenize_with_feedback("(CD)", &model());
        assert!(result
            .feedback
            .iter()
            .all(|f| f.level == FeedbackLevel::Info));
        assert_eq!(notes_of(&result.value)[1], vec!["C"]);
    }

    #[test]
    fn test_text_coverage() {
        let bar = " \"G\"!>!g2 (3[ce]g/ z [K:D] ^F,3/2- && ";
        let tokens = tokenize(bar, &model());
        let joined: String = tokens.iter().map(|t| t.text.as_str()).collect();
        let expected: String = bar.replace("(3", "").split_whitespace().collect();
        assert_eq!(joined, expected);
        for token in &tokens {
            assert_eq!(&bar[token.start..token.end], token.text);
        }
    }

    #[test]
    fn test_oversized_durations_are_cut() {
        let model = model();
        let max = f64::from(model.grid().max_content_ticks());

        let result = tokenize_with_feedback("C999999999 D", &model);
        assert_eq!(result.value[0].duration, max);
        assert_eq!(result.value[1].duration, 0.0);
        assert!(result
            .feedback
            .iter()
            .any(|f| f.level == FeedbackLevel::Warning && f.message.contains("duration cut")));

        let tokens = tokenize("Z99999999", &model);
        assert_eq!(tokens[0].duration, max);
    }

    #[test]
    fn test_extreme_bars_stay_bounded() {
        use crate::editor::BarEditor;
        use crate::instruments::{default_kit, resolve_kit};
        use crate::percmap::PercMap;

        let high = format!("c{}", "'".repeat(130));
        let low = format!("[C{}E]", ",".repeat(300));
        let bars = [
            "Z99999999",
            "X4294967295 C",
            "C999999999 D",
            "C99999999999",
            "(3C999999999 D E",
            "A//////////////////////////////////////// B",
            "(9999999999 C (3:0:0 DEF",
            "(4294967295 C D E",
            high.as_str(),
            low.as_str(),
            "!trill [ce {g c\"open",
            "[] ]]] {{ \"\" o o &&&",
            "Z99999999 C999999999 [gc]4294967295 z",
        ];

        let map = PercMap::scan("%%percmap g 42\n%%percmap c 38\n");
        let kit = resolve_kit(&default_kit(), &map);
        let editor = BarEditor::new(model());
        let max = editor.model().grid().max_content_ticks();

        for bar in bars {
            let tokens = editor.tokenize(bar);
            let length = editor.grid_length(&tokens);
            assert!(length <= max, "bar {bar:?} spans {length} ticks");
            assert_eq!(editor.project_flat(&tokens).len(), length as usize);
            for instrument in &kit {
                assert_eq!(editor.project_state(&tokens, instrument).len(), length as usize);
            }

            let once = editor.rewrite(&tokens);
            editor.rewrite(&editor.tokenize(&once));
            editor
                .toggle(&tokens, 0, "C")
                .unwrap_or_else(|e| panic!("bar {bar:?}: {e}"));
            editor
                .toggle(&tokens, length - 1, "C")
                .unwrap_or_else(|e| panic!("bar {bar:?}: {e}"));
        }
    }

    #[test]
    fn test_unit_length_changes_ticks() {
        let model = model().with_unit_length(UnitLength {
            numerator: 1,
            denominator: 4,
        });
        let tokens = tokenize("g g g og", &model);
        assert!(tokens.iter().all(|t| t.duration == 24.0));
        assert!(tokens[3].open);
    }
}
