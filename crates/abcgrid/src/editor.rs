//! The bar editor: one grid configuration tying the tokenizer, the
//! projections and the edits together.
//!
//! Every edit runs the same pipeline: range check, triplet snap, lift the
//! tokens into a [`PositionedBar`], open the slot, apply the change,
//! re-optimize and serialize. The result is new bar text; writing it back
//! into the document is [`crate::session::EditSession`]'s job.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::duration::DurationModel;
use crate::error::{EditError, Result};
use crate::feedback::ParseResult;
use crate::grid::BeatMode;
use crate::instruments::{Instrument, NoteState};
use crate::key::Key;
use crate::mutation::{EditPath, PositionedBar};
use crate::parser;
use crate::pitch::{Accidental, Pitch};
use crate::projector;
use crate::serialize::serialize_bar;
use crate::token::Token;

/// New bar text and how the edited slot was reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOutcome {
    pub text: String,
    pub path: EditPath,
}

#[derive(Debug, Clone)]
pub struct BarEditor {
    model: DurationModel,
    /// Per-beat override; detected from the tokens when unset
    modes: Option<Vec<BeatMode>>,
}

impl BarEditor {
    pub fn new(model: DurationModel) -> Self {
        BarEditor { model, modes: None }
    }

    /// Lock beats to the given modes. Triplets need a beat divisible by 3.
    pub fn with_beat_modes(mut self, modes: Vec<BeatMode>) -> Result<Self> {
        let grid = self.model.grid();
        if modes.contains(&BeatMode::Triplet) && grid.triplet_step().is_none() {
            return Err(EditError::TripletUnsupported {
                ticks_per_beat: grid.ticks_per_beat,
            });
        }
        self.modes = Some(modes);
        Ok(self)
    }

    pub fn model(&self) -> &DurationModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut DurationModel {
        &mut self.model
    }

    pub fn tokenize(&self, bar: &str) -> Vec<Token> {
        parser::tokenize(bar, &self.model)
    }

    pub fn tokenize_with_feedback(&self, bar: &str) -> ParseResult<Vec<Token>> {
        parser::tokenize_with_feedback(bar, &self.model)
    }

    /// Grid width: the meter's bar, or the content if it runs longer
    pub fn grid_length(&self, tokens: &[Token]) -> u32 {
        let grid = self.model.grid();
        projector::content_length(tokens)
            .min(grid.max_content_ticks())
            .max(grid.ticks_per_bar())
    }

    pub fn project_flat(&self, tokens: &[Token]) -> Vec<BTreeSet<String>> {
        projector::project_flat(tokens, self.grid_length(tokens))
    }

    pub fn project_state(&self, tokens: &[Token], instrument: &Instrument) -> Vec<Option<NoteState>> {
        projector::project_state(tokens, instrument, self.grid_length(tokens))
    }

    pub fn beat_modes(&self, tokens: &[Token]) -> Vec<BeatMode> {
        match &self.modes {
            Some(modes) => modes.clone(),
            None => projector::detect_beat_modes(tokens, self.model.grid()),
        }
    }

    /// Triplet beats only have three slots; any tick inside one lands on
    /// the slot it falls in.
    fn snap(&self, tick: u32, modes: &[BeatMode]) -> u32 {
        let grid = self.model.grid();
        let beat = grid.beat_of(tick);
        match (modes.get(beat), grid.triplet_step()) {
            (Some(BeatMode::Triplet), Some(step)) => {
                let start = grid.beat_start(beat);
                start + (tick - start) / step * step
            }
            _ => tick,
        }
    }

    fn check_tick(&self, tokens: &[Token], tick: u32) -> Result<()> {
        let length = self.grid_length(tokens);
        if tick >= length {
            return Err(EditError::TickOutOfRange { tick, length });
        }
        Ok(())
    }

    fn edit(
        &self,
        tokens: &[Token],
        tick: u32,
        apply: impl FnOnce(&mut PositionedBar, u32) -> Result<()>,
    ) -> Result<EditOutcome> {
        self.check_tick(tokens, tick)?;
        let modes = self.beat_modes(tokens);
        let tick = self.snap(tick, &modes);
        let mut bar = PositionedBar::from_tokens(tokens);
        let path = bar.open_slot(tick);
        apply(&mut bar, tick)?;
        let text = self.render(&bar, &modes);
        tracing::debug!(tick, ?path, text = %text, "bar edited");
        Ok(EditOutcome { text, path })
    }

    fn render(&self, bar: &PositionedBar, modes: &[BeatMode]) -> String {
        let optimized = self.model.optimize_bar(&bar.entries, modes);
        serialize_bar(&optimized, &self.model, modes, &bar.trailing)
    }

    /// Re-optimize a bar without changing it
    pub fn rewrite(&self, tokens: &[Token]) -> String {
        let modes = self.beat_modes(tokens);
        self.render(&PositionedBar::from_tokens(tokens), &modes)
    }

    /// Add or remove one pitch at a tick.
    pub fn toggle(&self, tokens: &[Token], tick: u32, pitch: &str) -> Result<EditOutcome> {
        let pitch = parse_pitch(pitch)?;
        self.edit(tokens, tick, |bar, tick| {
            bar.toggle(tick, &pitch);
            Ok(())
        })
    }

    /// Set one grouped instrument's state at a tick; `None` clears it.
    pub fn set_grouped_state(
        &self,
        tokens: &[Token],
        tick: u32,
        instrument: &Instrument,
        state: Option<NoteState>,
    ) -> Result<EditOutcome> {
        self.edit(tokens, tick, |bar, tick| {
            bar.set_grouped_state(tick, instrument, state);
            Ok(())
        })
    }

    /// Remove every onset in `from..to`.
    pub fn clear_range(&self, tokens: &[Token], from: u32, to: u32) -> Result<EditOutcome> {
        self.edit(tokens, from, |bar, from| {
            bar.clear_range(from, to);
            Ok(())
        })
    }

    pub fn insert_chord(&self, tokens: &[Token], tick: u32, voicing: &[Pitch]) -> Result<EditOutcome> {
        self.edit(tokens, tick, |bar, tick| {
            bar.insert_chord(tick, voicing);
            Ok(())
        })
    }

    pub fn set_accidental(
        &self,
        tokens: &[Token],
        tick: u32,
        pitch: &str,
        accidental: Option<Accidental>,
    ) -> Result<EditOutcome> {
        let pitch = parse_pitch(pitch)?;
        self.edit(tokens, tick, |bar, tick| bar.set_accidental(tick, &pitch, accidental))
    }

    pub fn shift_note(&self, tokens: &[Token], tick: u32, steps: i32, key: &Key) -> Result<EditOutcome> {
        self.edit(tokens, tick, |bar, tick| bar.shift_note(tick, steps, key))
    }
}

fn parse_pitch(text: &str) -> Result<Pitch> {
    Pitch::parse(text).ok_or_else(|| EditError::InvalidPitch(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TickGrid;
    use crate::header::UnitLength;
    use crate::instruments::{default_kit, resolve_kit};
    use crate::percmap::PercMap;
    use pretty_assertions::assert_eq;

    fn editor() -> BarEditor {
        BarEditor::new(DurationModel::new(TickGrid::default()))
    }

    fn sixteenth_editor() -> BarEditor {
        BarEditor::new(DurationModel::new(TickGrid::new(4)).with_unit_length(UnitLength {
            numerator: 1,
            denominator: 16,
        }))
    }

    #[test]
    fn test_toggle_into_rests() {
        let editor = sixteenth_editor();
        let tokens = editor.tokenize("z z z z");
        let outcome = editor.toggle(&tokens, 0, "A").unwrap();
        assert_eq!(outcome.text, "Az3 z4 z4 z4");
        assert_eq!(outcome.path, EditPath::InPlace);
    }

    #[test]
    fn test_toggle_twice_restores_onsets() {
        let editor = editor();
        let tokens = editor.tokenize("C2 E2 G2 z2");
        let once = editor.toggle(&tokens, 36, "D").unwrap();
        let twice = editor.toggle(&editor.tokenize(&once.text), 36, "D").unwrap();
        let before = editor.project_flat(&tokens);
        let after = editor.project_flat(&editor.tokenize(&twice.text));
        assert_eq!(before, after);
    }

    #[test]
    fn test_split_sustain_path() {
        let editor = editor();
        let tokens = editor.tokenize("C4 z4");
        let outcome = editor.toggle(&tokens, 12, "E").unwrap();
        assert_eq!(outcome.path, EditPath::SplitSustain { onset: 0 });
        assert_eq!(outcome.text, "CE z2 z2 z2");
    }

    #[test]
    fn test_append_path() {
        let editor = editor();
        let tokens = editor.tokenize("C2");
        let outcome = editor.toggle(&tokens, 48, "G").unwrap();
        assert_eq!(outcome.path, EditPath::Append { gap: 24 });
        assert_eq!(outcome.text, "Cz z2 Gz z2");
    }

    #[test]
    fn test_tick_out_of_range() {
        let editor = editor();
        let tokens = editor.tokenize("C2");
        assert_eq!(
            editor.toggle(&tokens, 96, "C"),
            Err(EditError::TickOutOfRange { tick: 96, length: 96 })
        );
        assert_eq!(
            editor.toggle(&tokens, 0, "H"),
            Err(EditError::InvalidPitch("H".into()))
        );
    }

    #[test]
    fn test_triplet_clicks() {
        let editor = editor().with_beat_modes(vec![BeatMode::Triplet]).unwrap();
        let mut text = String::new();
        for tick in [0, 8, 16] {
            text = editor.toggle(&editor.tokenize(&text), tick, "A").unwrap().text;
        }
        assert_eq!(text, "(3AAA z2 z2 z2");

        // off-slot clicks land on the slot they fall in
        let snapped = editor.toggle(&editor.tokenize(&text), 4, "A").unwrap().text;
        let direct = editor.toggle(&editor.tokenize(&text), 0, "A").unwrap().text;
        assert_eq!(snapped, direct);
        assert_eq!(snapped, "(3zAA z2 z2 z2");
    }

    #[test]
    fn test_triplets_refused_on_binary_grid() {
        let editor = BarEditor::new(DurationModel::new(TickGrid::new(8)));
        assert_eq!(
            editor.with_beat_modes(vec![BeatMode::Triplet]).err(),
            Some(EditError::TripletUnsupported { ticks_per_beat: 8 })
        );
    }

    #[test]
    fn test_grouped_state_round_trip() {
        let map = PercMap::scan("%%percmap g 42\n%%percmap ^g 46\n%%percmap c 38\n");
        let kit = resolve_kit(&default_kit(), &map);
        let editor = BarEditor::new(DurationModel::new(TickGrid::default()).with_unit_length(UnitLength {
            numerator: 1,
            denominator: 4,
        }));
        let tokens = editor.tokenize("g g g g");
        let text = editor
            .set_grouped_state(&tokens, 24, &kit[1], Some(NoteState::Flam))
            .unwrap()
            .text;
        assert_eq!(text, "g {c}[gc] g g");

        let tokens = editor.tokenize(&text);
        let states = editor.project_state(&tokens, &kit[1]);
        assert_eq!(states[24], Some(NoteState::Flam));
        assert_eq!(editor.project_state(&tokens, &kit[0])[24], Some(NoteState::Base));
    }

    #[test]
    fn test_accented_chord_back_to_base() {
        let map = PercMap::scan("%%percmap g 42\n%%percmap c 38\n");
        let kit = resolve_kit(&default_kit(), &map);
        let editor = BarEditor::new(DurationModel::new(TickGrid::default()).with_unit_length(UnitLength {
            numerator: 1,
            denominator: 4,
        }));
        let tokens = editor.tokenize("!>![gc] z z z");
        assert_eq!(editor.project_state(&tokens, &kit[1])[0], Some(NoteState::Decoration(0)));

        let text = editor
            .set_grouped_state(&tokens, 0, &kit[1], Some(NoteState::Base))
            .unwrap()
            .text;
        assert_eq!(text, "[gc] z z z");
        let tokens = editor.tokenize(&text);
        assert_eq!(editor.project_state(&tokens, &kit[1])[0], Some(NoteState::Base));
    }

    #[test]
    fn test_annotations_survive_edits() {
        let editor = editor();
        let tokens = editor.tokenize("\"Am\"A2 \"D\"z2 z4");
        let text = editor.toggle(&tokens, 72, "F").unwrap().text;
        assert_eq!(text, "\"Am\"Az \"D\"z2 z2 Fz");
    }

    #[test]
    fn test_rewrite_is_fixed_point() {
        let editor = editor();
        for bar in ["C2 E2 G2", "(3ABc d2 z4", "\"G\"[GBd]4 z2 !>!c2", "z8"] {
            let once = editor.rewrite(&editor.tokenize(bar));
            let twice = editor.rewrite(&editor.tokenize(&once));
            assert_eq!(once, twice, "{bar}");
        }
    }

    #[test]
    fn test_chord_accidental_and_shift() {
        let editor = editor();
        let key = Key::parse("G").unwrap();
        let tokens = editor.tokenize("z8");
        let voicing = crate::degree::triad(&key, 1, 0);
        let text = editor.insert_chord(&tokens, 0, &voicing).unwrap().text;
        assert_eq!(text, "[GBd]z z2 z2 z2");

        let tokens = editor.tokenize(&text);
        let text = editor.set_accidental(&tokens, 0, "B", Some(Accidental::Flat)).unwrap().text;
        assert_eq!(text, "[G_Bd]z z2 z2 z2");

        let tokens = editor.tokenize(&text);
        let text = editor.shift_note(&tokens, 0, 1, &key).unwrap().text;
        assert_eq!(text, "[A_ce]z z2 z2 z2");

        let tokens = editor.tokenize(&text);
        assert_eq!(
            editor.shift_note(&tokens, 12, 1, &key),
            Err(EditError::NoNoteAt(12))
        );
    }

    #[test]
    fn test_clear_range() {
        let editor = editor();
        let tokens = editor.tokenize("CDEF GABc");
        let text = editor.clear_range(&tokens, 12, 36).unwrap().text;
        assert_eq!(text, "Cz zF GA Bc");
    }
}
