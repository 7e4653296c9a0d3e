//! Pitch, duration and rest recognizers using winnow combinators.

use winnow::combinator::{alt, opt};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::duration::Duration;
use crate::pitch::{Accidental, NoteName, Pitch};

pub type PResult<T> = winnow::ModalResult<T>;

/// Parse a note letter and base octave.
/// Uppercase = octave 0, lowercase = octave 1
pub fn parse_note_name(input: &mut &str) -> PResult<(NoteName, i8)> {
    let c = one_of(['C', 'D', 'E', 'F', 'G', 'A', 'B', 'c', 'd', 'e', 'f', 'g', 'a', 'b'])
        .parse_next(input)?;
    let octave = if c.is_ascii_lowercase() { 1 } else { 0 };
    match NoteName::from_char(c) {
        Some(name) => Ok((name, octave)),
        None => unreachable!(), // one_of already validated the character
    }
}

/// Parse an accidental (^, ^^, _, __, =)
pub fn parse_accidental(input: &mut &str) -> PResult<Accidental> {
    alt((
        "^^".map(|_| Accidental::DoubleSharp),
        "^".map(|_| Accidental::Sharp),
        "__".map(|_| Accidental::DoubleFlat),
        "_".map(|_| Accidental::Flat),
        "=".map(|_| Accidental::Natural),
    ))
    .parse_next(input)
}

/// Octave marks beyond this shift are consumed but ignored
pub const MAX_OCTAVE_SHIFT: i8 = 10;

/// Parse octave modifiers (', ,)
pub fn parse_octave_modifier(input: &mut &str) -> PResult<i8> {
    let marks: &str = take_while(0.., ['\'', ',']).parse_next(input)?;
    let shift: i64 = marks.chars().map(|c| if c == '\'' { 1 } else { -1 }).sum();
    let limit = i64::from(MAX_OCTAVE_SHIFT);
    Ok(shift.clamp(-limit, limit) as i8)
}

/// Parse a spelled pitch: accidental, letter, octave marks
pub fn parse_pitch(input: &mut &str) -> PResult<Pitch> {
    let accidental = opt(parse_accidental).parse_next(input)?;
    let (name, base_octave) = parse_note_name(input)?;
    let octave_mod = parse_octave_modifier(input)?;
    Ok(Pitch {
        accidental,
        name,
        octave: base_octave.saturating_add(octave_mod),
    })
}

/// The source text of one pitch, e.g. `^g` or `C,,`
pub fn pitch_text<'s>(input: &mut &'s str) -> PResult<&'s str> {
    parse_pitch.take().parse_next(input)
}

/// The raw duration suffix following a note or rest (may be empty)
pub fn duration_suffix<'s>(input: &mut &'s str) -> PResult<&'s str> {
    take_while(0.., |c: char| c.is_ascii_digit() || c == '/').parse_next(input)
}

/// Parse a duration (2, /2, 3/2, /, //, etc.)
///
/// Numbers that overflow or a `/` run followed by digits other than a
/// single slash come back with a zero term so the caller can treat the
/// suffix as malformed.
pub fn parse_duration(input: &mut &str) -> PResult<Duration> {
    let multiplier_str: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let numerator = if multiplier_str.is_empty() {
        1
    } else {
        multiplier_str.parse().unwrap_or(0)
    };

    let denominator = opt(parse_divisor).parse_next(input)?.unwrap_or(1);

    Ok(Duration {
        numerator,
        denominator,
    })
}

/// Parse the divisor part of a duration (/2, /, //)
fn parse_divisor(input: &mut &str) -> PResult<u32> {
    let slashes: &str = take_while(1.., '/').parse_next(input)?;
    let den_str: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    if den_str.is_empty() {
        // A/ is A/2, A// is A/4
        Ok(1u32.checked_shl(slashes.len() as u32).unwrap_or(0))
    } else if slashes.len() == 1 {
        Ok(den_str.parse().unwrap_or(0))
    } else {
        Ok(0)
    }
}

/// Rest letters. `Z`/`X` are whole-bar rests whose suffix counts bars.
pub fn parse_rest(input: &mut &str) -> PResult<char> {
    one_of(['z', 'x', 'Z', 'X']).parse_next(input)
}
