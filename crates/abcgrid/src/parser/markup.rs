//! Non-pitch markup: annotations, decorations, grace blocks, inline
//! fields and tuplet markers, plus the pitch scanner that steps around
//! them.

use serde::{Deserialize, Serialize};
use winnow::combinator::{alt, delimited, opt, preceded};
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_while};

use super::note::{parse_pitch, PResult};
use crate::pitch::Pitch;

/// Single-character decorations (staccato, roll, fermata, trill, bowings...)
const SHORT_DECORATIONS: [char; 11] = ['.', '~', 'H', 'L', 'M', 'O', 'P', 'S', 'T', 'u', 'v'];

/// Quoted chord symbol or text annotation, quotes included
pub fn parse_annotation<'s>(input: &mut &'s str) -> PResult<&'s str> {
    delimited('"', take_till(0.., ['"', '\n']), '"')
        .take()
        .parse_next(input)
}

/// `!name!` or `+name+`
pub fn parse_long_decoration<'s>(input: &mut &'s str) -> PResult<&'s str> {
    alt((
        delimited('!', take_while(1.., |c: char| c != '!' && !c.is_whitespace()), '!'),
        delimited('+', take_while(1.., |c: char| c != '+' && !c.is_whitespace()), '+'),
    ))
    .take()
    .parse_next(input)
}

/// Any decoration, long or short
pub fn parse_decoration<'s>(input: &mut &'s str) -> PResult<&'s str> {
    alt((parse_long_decoration, one_of(SHORT_DECORATIONS).take())).parse_next(input)
}

/// `{...}` grace block, braces included
pub fn parse_grace<'s>(input: &mut &'s str) -> PResult<&'s str> {
    delimited('{', take_till(0.., ['}', '\n']), '}')
        .take()
        .parse_next(input)
}

/// Inline field such as `[V:1]` or `[L:1/16]`
pub fn parse_inline_field<'s>(input: &mut &'s str) -> PResult<&'s str> {
    (
        '[',
        one_of(|c: char| c.is_ascii_alphabetic()),
        ':',
        take_till(0.., [']', '\n']),
        ']',
    )
        .take()
        .parse_next(input)
}

fn comment<'s>(input: &mut &'s str) -> PResult<&'s str> {
    ('%', take_till(0.., '\n')).take().parse_next(input)
}

/// Tuplet `(p:q:r)`: the next `r` notes take the time of `q`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupletSpec {
    pub p: u32,
    pub q: u32,
    pub r: u32,
}

impl TupletSpec {
    /// Conventional `q` when the marker leaves it out
    pub fn default_q(p: u32) -> u32 {
        match p {
            2 => 3,
            3 => 2,
            4 => 3,
            6 => 2,
            8 => 3,
            _ => 2,
        }
    }
}

fn number(input: &mut &str) -> PResult<u32> {
    take_while(1.., |c: char| c.is_ascii_digit())
        .map(|s: &str| s.parse().unwrap_or(0))
        .parse_next(input)
}

/// Parse a tuplet marker: `(3`, `(3:2`, `(3:2:3`, `(3::2`
pub fn parse_tuplet(input: &mut &str) -> PResult<TupletSpec> {
    '('.parse_next(input)?;
    let p = number.verify(|p: &u32| *p >= 2).parse_next(input)?;
    let q_part = opt(preceded(':', opt(number))).parse_next(input)?;
    let r = match q_part {
        Some(_) => opt(preceded(':', opt(number))).parse_next(input)?.flatten(),
        None => None,
    };

    let q = q_part
        .flatten()
        .filter(|q| *q > 0)
        .unwrap_or_else(|| TupletSpec::default_q(p));
    let r = r.filter(|r| *r > 0).unwrap_or(p);

    Ok(TupletSpec { p, q, r })
}

/// Consume a region whose letters are never pitches: annotations,
/// `!..!`/`+..+` decorations, inline fields and comments.
pub fn skip_protected<'s>(input: &mut &'s str) -> Option<&'s str> {
    let mut ahead = *input;
    let region = alt((parse_annotation, parse_long_decoration, parse_inline_field, comment))
        .parse_next(&mut ahead)
        .ok()?;
    *input = ahead;
    Some(region)
}

/// Rewrite every pitch in `text` through `f`, leaving protected regions
/// and all other characters untouched.
pub fn rewrite_pitches(text: &str, mut f: impl FnMut(Pitch) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if let Some(region) = skip_protected(&mut rest) {
            out.push_str(region);
            continue;
        }
        if c == '\\' {
            let escaped = rest[1..].chars().next().map_or(0, char::len_utf8);
            out.push_str(&rest[..1 + escaped]);
            rest = &rest[1 + escaped..];
            continue;
        }
        let mut ahead = rest;
        if let Ok(pitch) = parse_pitch(&mut ahead) {
            out.push_str(&f(pitch));
            rest = ahead;
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Every pitch in `text`, skipping protected regions
pub fn pitches_in(text: &str) -> Vec<Pitch> {
    let mut found = Vec::new();
    rewrite_pitches(text, |pitch| {
        found.push(pitch);
        String::new()
    });
    found
}
