//! Key signatures (K: values) for degree arithmetic.

use serde::{Deserialize, Serialize};

use crate::pitch::{Accidental, NoteName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Major,
    Minor,
    Ionian,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Locrian,
}

impl Mode {
    /// Parse mode from string (case-insensitive, allows abbreviations)
    pub fn parse(s: &str) -> Option<Mode> {
        let s = s.to_lowercase();
        match s.as_str() {
            "maj" | "major" | "" => Some(Mode::Major),
            "min" | "minor" | "m" => Some(Mode::Minor),
            "ion" | "ionian" => Some(Mode::Ionian),
            "dor" | "dorian" => Some(Mode::Dorian),
            "phr" | "phrygian" => Some(Mode::Phrygian),
            "lyd" | "lydian" => Some(Mode::Lydian),
            "mix" | "mixolydian" => Some(Mode::Mixolydian),
            "aeo" | "aeolian" => Some(Mode::Aeolian),
            "loc" | "locrian" => Some(Mode::Locrian),
            _ => None,
        }
    }

    /// Shift on the circle of fifths relative to the major key on the same root
    fn fifths_offset(&self) -> i32 {
        match self {
            Mode::Lydian => 1,
            Mode::Major | Mode::Ionian => 0,
            Mode::Mixolydian => -1,
            Mode::Dorian => -2,
            Mode::Minor | Mode::Aeolian => -3,
            Mode::Phrygian => -4,
            Mode::Locrian => -5,
        }
    }
}

const SHARP_ORDER: [NoteName; 7] = [
    NoteName::F,
    NoteName::C,
    NoteName::G,
    NoteName::D,
    NoteName::A,
    NoteName::E,
    NoteName::B,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub root: NoteName,
    pub accidental: Option<Accidental>,
    pub mode: Mode,
}

impl Default for Key {
    fn default() -> Self {
        Key {
            root: NoteName::C,
            accidental: None,
            mode: Mode::Major,
        }
    }
}

impl Key {
    /// Parse a K: value (e.g., "G", "Am", "D dorian", "F#m", "Bb")
    pub fn parse(value: &str) -> Option<Key> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Some(Key::default());
        }

        let mut chars = trimmed.chars();
        let root = chars.next().and_then(NoteName::from_char)?;
        let rest = chars.as_str();

        let (accidental, rest) = if let Some(after) = rest.strip_prefix('#') {
            (Some(Accidental::Sharp), after)
        } else if let Some(after) = rest.strip_prefix('b') {
            // "Bb" and "Bbm" are flat keys; "Bm" never reaches here
            let word = after.split_whitespace().next().unwrap_or("");
            if after.is_empty() || after.starts_with(char::is_whitespace) || Mode::parse(word).is_some() {
                (Some(Accidental::Flat), after)
            } else {
                (None, rest)
            }
        } else {
            (None, rest)
        };

        let mode_str = rest.split_whitespace().next().unwrap_or("");
        let mode = match Mode::parse(mode_str) {
            Some(mode) => mode,
            // clef= and other K: modifiers
            None if mode_str.contains('=') => Mode::Major,
            None => {
                tracing::debug!(value, mode_str, "unknown mode");
                return None;
            }
        };

        Some(Key {
            root,
            accidental,
            mode,
        })
    }

    /// Sharps (positive) or flats (negative) in the signature
    pub fn fifths(&self) -> i32 {
        let accidental = self.accidental.map_or(0, |a| a.to_semitone_offset() as i32);
        (self.root.fifths() + 7 * accidental + self.mode.fifths_offset()).clamp(-7, 7)
    }

    /// Semitone offset the signature applies to each letter, indexed C..B
    pub fn signature(&self) -> [i8; 7] {
        let mut sig = [0i8; 7];
        let fifths = self.fifths();
        if fifths > 0 {
            for name in SHARP_ORDER.iter().take(fifths as usize) {
                sig[name.index()] = 1;
            }
        } else {
            for name in SHARP_ORDER.iter().rev().take(fifths.unsigned_abs() as usize) {
                sig[name.index()] = -1;
            }
        }
        sig
    }

    pub fn accidental_for(&self, name: NoteName) -> i8 {
        self.signature()[name.index()]
    }
}
