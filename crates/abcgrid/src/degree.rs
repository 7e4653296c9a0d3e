//! Scale-degree shifting and diatonic triads.

use crate::key::Key;
use crate::parser::markup::rewrite_pitches;
use crate::pitch::{Accidental, NoteName, Pitch};

/// Move one pitch by `steps` scale degrees in `key`.
///
/// The result is spelled with an explicit accidental whenever it sounds
/// altered from the natural letter, and with `=` when the key would
/// otherwise alter it. A chromatic alteration relative to the key (a
/// `^c` in C major) is carried to the new degree.
pub fn shift_pitch(pitch: Pitch, steps: i32, key: &Key) -> Pitch {
    let sig = key.signature();
    let from = sig[pitch.name.index()];
    let written = pitch.accidental.map_or(from, |a| a.to_semitone_offset());
    let alteration = written - from;

    let index = pitch.diatonic_index() + steps;
    let name = NoteName::from_index(index);
    let target = sig[name.index()];
    let value = (target + alteration).clamp(-2, 2);

    let accidental = if value != 0 {
        Accidental::from_offset(value)
    } else if target != 0 {
        Some(Accidental::Natural)
    } else {
        None
    };

    Pitch {
        accidental,
        name,
        octave: index.div_euclid(7) as i8,
    }
}

/// Shift every pitch of an ABC fragment by scale degrees. Durations,
/// decorations, annotations and inline fields pass through untouched.
pub fn shift_by_degree(abc: &str, steps: i32, key: &Key) -> String {
    rewrite_pitches(abc, |pitch| shift_pitch(pitch, steps, key).to_string())
}

/// Root-position triad on a 1-based scale degree, spelled in the key
/// (no explicit accidentals).
pub fn triad(key: &Key, degree: u8, octave: i8) -> Vec<Pitch> {
    let root = key.root.index() as i32 + octave as i32 * 7 + degree.max(1) as i32 - 1;
    [0, 2, 4]
        .iter()
        .map(|third| {
            let index = root + third;
            Pitch::new(NoteName::from_index(index), index.div_euclid(7) as i8)
        })
        .collect()
}
