//! Single-tick edits over a bar's positioned note entries.
//!
//! A bar is lifted out of its token stream into [`OptimizableToken`]s
//! addressed by tick, edited there, and handed back to the optimizer.
//! Every edit first opens the clicked slot (see [`PositionedBar::open_slot`]).

use serde::{Deserialize, Serialize};

use crate::degree::shift_pitch;
use crate::error::{EditError, Result};
use crate::instruments::{Instrument, NoteState};
use crate::key::Key;
use crate::pitch::{Accidental, Pitch};
use crate::token::{OptimizableToken, Token, TokenKind};

/// How the clicked slot was made available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum EditPath {
    /// The slot already had its own onset or sat inside a rest
    InPlace,
    /// A note sounding from `onset` was cut short at the slot
    SplitSustain { onset: u32 },
    /// The slot lies past the bar's content; `gap` ticks of rest pad it
    Append { gap: u32 },
}

/// A bar as tick-addressed entries, at most one per tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionedBar {
    pub entries: Vec<OptimizableToken>,
    /// Ticks covered by the original content
    pub length: u32,
    /// Annotations after the last timed token
    pub trailing: String,
}

impl PositionedBar {
    /// Annotations and inline fields ride on the next timed token;
    /// opaque text is dropped.
    pub fn from_tokens(tokens: &[Token]) -> PositionedBar {
        let mut bar = PositionedBar::default();
        let mut position = 0.0_f64;
        let mut pending = String::new();

        for token in tokens {
            match token.kind {
                TokenKind::Annotation | TokenKind::InlineField => {
                    pending.push_str(&token.text);
                    continue;
                }
                TokenKind::Opaque => continue,
                TokenKind::Note | TokenKind::Chord | TokenKind::Rest => {}
            }
            let tick = position.round() as u32;
            position += token.duration;
            let end = (position.round() as u32).max(tick);

            if let Some(last) = bar.entries.last_mut().filter(|e| e.tick == tick) {
                // zero-width after rounding: fold into the entry already here
                for note in &token.notes {
                    if !last.notes.contains(note) {
                        last.notes.push(note.clone());
                    }
                }
                last.decorations.push_str(&token.decorations);
                last.grace.push_str(&token.grace);
                last.open |= token.open;
                last.annotations.push_str(&std::mem::take(&mut pending));
                last.duration = last.duration.max(end - tick);
                continue;
            }

            bar.entries.push(OptimizableToken {
                tick,
                notes: token.notes.clone(),
                duration: end - tick,
                decorations: token.decorations.clone(),
                grace: token.grace.clone(),
                open: token.open,
                annotations: std::mem::take(&mut pending),
            });
        }
        bar.length = position.round() as u32;
        bar.trailing = pending;
        bar
    }

    fn index_at(&self, tick: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.tick == tick)
    }

    /// The entry starting at `tick`, created as an empty rest if missing
    fn entry_at(&mut self, tick: u32) -> &mut OptimizableToken {
        let index = match self.entries.iter().position(|e| e.tick >= tick) {
            Some(i) if self.entries[i].tick == tick => i,
            Some(i) => {
                self.entries.insert(i, OptimizableToken::rest(tick, 1));
                i
            }
            None => {
                self.entries.push(OptimizableToken::rest(tick, 1));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }

    /// Make `tick` an independent slot.
    ///
    /// A note sustaining through `tick` from an earlier onset is truncated
    /// to end there, so long notes never block later slots.
    pub fn open_slot(&mut self, tick: u32) -> EditPath {
        if tick >= self.length {
            return EditPath::Append {
                gap: tick - self.length,
            };
        }
        let covering = self
            .entries
            .iter_mut()
            .find(|e| e.tick < tick && tick < e.end() && e.has_note());
        match covering {
            Some(entry) => {
                entry.duration = tick - entry.tick;
                EditPath::SplitSustain { onset: entry.tick }
            }
            None => EditPath::InPlace,
        }
    }

    /// Add `pitch` at `tick`, or remove it if it is already there.
    pub fn toggle(&mut self, tick: u32, pitch: &Pitch) {
        let spelled = pitch.to_string();
        let entry = self.entry_at(tick);
        match entry.notes.iter().position(|n| *n == spelled) {
            Some(i) => {
                entry.notes.remove(i);
                if entry.notes.is_empty() {
                    entry.clear_markup();
                }
            }
            None => entry.notes.push(spelled),
        }
    }

    /// Put one instrument into `target` at `tick`. Asking for the state it
    /// is already in clears it; `None` always clears.
    pub fn set_grouped_state(&mut self, tick: u32, instrument: &Instrument, target: Option<NoteState>) {
        let entry = self.entry_at(tick);
        let current = instrument.state_of_entry(entry);
        let next = if current == target { None } else { target };
        // leaving a decoration for another state takes the marker with it;
        // dropping the instrument leaves shared markers to the rest of the chord
        let drop_markers = matches!(current, Some(NoteState::Decoration(_))) && next.is_some();
        instrument.strip(entry, drop_markers);
        if let Some(state) = next {
            instrument.write(entry, state);
        }
        if entry.notes.is_empty() {
            entry.clear_markup();
        }
    }

    /// Remove every onset in `from..to`
    pub fn clear_range(&mut self, from: u32, to: u32) {
        for entry in self.entries.iter_mut().filter(|e| (from..to).contains(&e.tick)) {
            entry.notes.clear();
            entry.clear_markup();
        }
    }

    /// Replace the notes at `tick` with a voicing. The same voicing again
    /// clears the tick.
    pub fn insert_chord(&mut self, tick: u32, voicing: &[Pitch]) {
        let spelled: Vec<String> = voicing.iter().map(|p| p.to_string()).collect();
        let entry = self.entry_at(tick);
        if entry.notes == spelled {
            entry.notes.clear();
            entry.clear_markup();
        } else {
            entry.notes = spelled;
        }
    }

    /// Respell the note at `tick` that sits on `pitch`'s staff position.
    pub fn set_accidental(&mut self, tick: u32, pitch: &Pitch, accidental: Option<Accidental>) -> Result<()> {
        let entry = self
            .index_at(tick)
            .map(|i| &mut self.entries[i])
            .ok_or(EditError::NoNoteAt(tick))?;
        let note = entry
            .notes
            .iter_mut()
            .find(|n| Pitch::parse(n).is_some_and(|p| p.same_staff_position(pitch)))
            .ok_or(EditError::NoNoteAt(tick))?;
        *note = Pitch { accidental, ..*pitch }.to_string();
        Ok(())
    }

    /// Move every note at `tick` by scale degrees in `key`.
    pub fn shift_note(&mut self, tick: u32, steps: i32, key: &Key) -> Result<()> {
        let entry = self
            .index_at(tick)
            .map(|i| &mut self.entries[i])
            .filter(|e| e.has_note())
            .ok_or(EditError::NoNoteAt(tick))?;
        for note in entry.notes.iter_mut() {
            if let Some(pitch) = Pitch::parse(note) {
                *note = shift_pitch(pitch, steps, key).to_string();
            }
        }
        Ok(())
    }
}
