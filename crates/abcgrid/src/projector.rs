//! Token stream -> per-tick grid views.
//!
//! Both projections are onset-based: a note shows up only at the tick it
//! starts on, never across its sustain.

use std::collections::BTreeSet;

use crate::grid::{BeatMode, TickGrid};
use crate::instruments::{Instrument, NoteState};
use crate::token::Token;

/// Each timed token with its onset tick, rounded to the grid
pub fn onsets(tokens: &[Token]) -> impl Iterator<Item = (u32, &Token)> {
    let mut position = 0.0_f64;
    tokens.iter().filter(|t| t.is_timed()).map(move |token| {
        let tick = position.round() as u32;
        position += token.duration;
        (tick, token)
    })
}

/// Ticks spanned by the tokens laid end to end
pub fn content_length(tokens: &[Token]) -> u32 {
    tokens
        .iter()
        .filter(|t| t.is_timed())
        .map(|t| t.duration)
        .sum::<f64>()
        .round() as u32
}

/// Pitches sounding at each tick's onset.
pub fn project_flat(tokens: &[Token], length: u32) -> Vec<BTreeSet<String>> {
    let mut grid = vec![BTreeSet::new(); length as usize];
    for (tick, token) in onsets(tokens) {
        match grid.get_mut(tick as usize) {
            Some(slot) => slot.extend(token.notes.iter().cloned()),
            None if token.notes.is_empty() => {}
            None => tracing::trace!(tick, length, "onset past the end of the grid"),
        }
    }
    grid
}

/// One instrument's state at each tick's onset.
pub fn project_state(tokens: &[Token], instrument: &Instrument, length: u32) -> Vec<Option<NoteState>> {
    let mut grid = vec![None; length as usize];
    for (tick, token) in onsets(tokens) {
        let state = instrument.state_of(&token.notes, &token.decorations, &token.grace, token.open);
        if let (Some(state), Some(slot)) = (state, grid.get_mut(tick as usize)) {
            // the first onset rounding onto a tick wins
            slot.get_or_insert(state);
        }
    }
    grid
}

/// A beat is a triplet beat when a token starting in it was scaled by a
/// `(3` tuplet. Grids that cannot hold triplets are all straight.
pub fn detect_beat_modes(tokens: &[Token], grid: &TickGrid) -> Vec<BeatMode> {
    let content = content_length(tokens).min(grid.max_content_ticks());
    let beats = grid.beats_per_bar.max(content.div_ceil(grid.ticks_per_beat));
    let mut modes = vec![BeatMode::Straight; beats as usize];
    if grid.triplet_step().is_none() {
        return modes;
    }
    for (tick, token) in onsets(tokens) {
        if token.tuplet == Some(3) {
            if let Some(mode) = modes.get_mut(grid.beat_of(tick)) {
                *mode = BeatMode::Triplet;
            }
        }
    }
    modes
}
