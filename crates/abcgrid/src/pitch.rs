//! Pitch spelling: note letters, accidentals and octave marks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parser::note::parse_pitch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NoteName {
    /// All note names in staff order, starting from C
    pub fn all() -> [NoteName; 7] {
        [
            NoteName::C,
            NoteName::D,
            NoteName::E,
            NoteName::F,
            NoteName::G,
            NoteName::A,
            NoteName::B,
        ]
    }

    /// Position within the C..B cycle (0-6)
    pub fn index(&self) -> usize {
        match self {
            NoteName::C => 0,
            NoteName::D => 1,
            NoteName::E => 2,
            NoteName::F => 3,
            NoteName::G => 4,
            NoteName::A => 5,
            NoteName::B => 6,
        }
    }

    pub fn from_index(index: i32) -> NoteName {
        Self::all()[index.rem_euclid(7) as usize]
    }

    /// Position on the circle of fifths relative to C (F = -1, B = 5)
    pub fn fifths(&self) -> i32 {
        match self {
            NoteName::F => -1,
            NoteName::C => 0,
            NoteName::G => 1,
            NoteName::D => 2,
            NoteName::A => 3,
            NoteName::E => 4,
            NoteName::B => 5,
        }
    }

    /// Parse from a single letter (case-insensitive)
    pub fn from_char(c: char) -> Option<NoteName> {
        match c.to_ascii_uppercase() {
            'C' => Some(NoteName::C),
            'D' => Some(NoteName::D),
            'E' => Some(NoteName::E),
            'F' => Some(NoteName::F),
            'G' => Some(NoteName::G),
            'A' => Some(NoteName::A),
            'B' => Some(NoteName::B),
            _ => None,
        }
    }

    fn letter(&self) -> char {
        match self {
            NoteName::C => 'C',
            NoteName::D => 'D',
            NoteName::E => 'E',
            NoteName::F => 'F',
            NoteName::G => 'G',
            NoteName::A => 'A',
            NoteName::B => 'B',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accidental {
    DoubleSharp,
    Sharp,
    Natural,
    Flat,
    DoubleFlat,
}

impl Accidental {
    /// Convert to semitone offset
    pub fn to_semitone_offset(&self) -> i8 {
        match self {
            Accidental::DoubleSharp => 2,
            Accidental::Sharp => 1,
            Accidental::Natural => 0,
            Accidental::Flat => -1,
            Accidental::DoubleFlat => -2,
        }
    }

    /// Accidental for a semitone offset. Zero maps to an explicit natural.
    pub fn from_offset(offset: i8) -> Option<Accidental> {
        match offset {
            2 => Some(Accidental::DoubleSharp),
            1 => Some(Accidental::Sharp),
            0 => Some(Accidental::Natural),
            -1 => Some(Accidental::Flat),
            -2 => Some(Accidental::DoubleFlat),
            _ => None,
        }
    }

    /// Parse from ABC (`^`, `_`, `=`) or conventional (`#`, `b`) spelling
    pub fn parse(s: &str) -> Option<Accidental> {
        match s {
            "#" | "^" => Some(Accidental::Sharp),
            "b" | "_" => Some(Accidental::Flat),
            "##" | "^^" => Some(Accidental::DoubleSharp),
            "bb" | "__" => Some(Accidental::DoubleFlat),
            "=" | "n" => Some(Accidental::Natural),
            _ => None,
        }
    }

    pub fn as_abc(&self) -> &'static str {
        match self {
            Accidental::DoubleSharp => "^^",
            Accidental::Sharp => "^",
            Accidental::Natural => "=",
            Accidental::Flat => "_",
            Accidental::DoubleFlat => "__",
        }
    }
}

/// A single spelled pitch as written in ABC.
///
/// Octave 0 is the uppercase octave (`C`..`B`), 1 the lowercase one
/// (`c`..`b`); `'` raises and `,` lowers by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    pub accidental: Option<Accidental>,
    pub name: NoteName,
    pub octave: i8,
}

impl Pitch {
    pub fn new(name: NoteName, octave: i8) -> Self {
        Pitch {
            accidental: None,
            name,
            octave,
        }
    }

    /// Parse a complete pitch such as `^F`, `c'` or `__B,,`.
    ///
    /// Returns `None` unless the whole string is one pitch.
    pub fn parse(s: &str) -> Option<Pitch> {
        let mut input = s;
        let pitch = parse_pitch(&mut input).ok()?;
        input.is_empty().then_some(pitch)
    }

    /// Same letter and octave, ignoring the accidental
    pub fn same_staff_position(&self, other: &Pitch) -> bool {
        self.name == other.name && self.octave == other.octave
    }

    /// Diatonic step count from the uppercase C
    pub fn diatonic_index(&self) -> i32 {
        self.octave as i32 * 7 + self.name.index() as i32
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(acc) = self.accidental {
            f.write_str(acc.as_abc())?;
        }
        let letter = self.name.letter();
        if self.octave >= 1 {
            write!(f, "{}", letter.to_ascii_lowercase())?;
            for _ in 1..self.octave {
                f.write_str("'")?;
            }
        } else {
            write!(f, "{}", letter)?;
            for _ in self.octave..0 {
                f.write_str(",")?;
            }
        }
        Ok(())
    }
}
