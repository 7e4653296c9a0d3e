//! Optimized entries -> ABC bar text.

use crate::duration::DurationModel;
use crate::grid::BeatMode;
use crate::token::OptimizableToken;

/// Write one entry: annotations, decorations, open prefix, grace block,
/// then the rest, note or chord with its suffix.
pub fn render_token(token: &OptimizableToken, suffix: &str) -> String {
    let mut out = String::new();
    out.push_str(&token.annotations);
    if token.has_note() {
        out.push_str(&token.decorations);
        if token.open {
            out.push('o');
        }
        out.push_str(&token.grace);
    }
    match token.notes.as_slice() {
        [] => out.push('z'),
        [note] => out.push_str(note),
        notes => {
            out.push('[');
            for note in notes {
                out.push_str(note);
            }
            out.push(']');
        }
    }
    out.push_str(suffix);
    out
}

/// Serialize optimizer output: tokens concatenate within a beat, beats
/// are separated by one space. Triplet beats are written as `(3` and
/// three slots at their written (un-scaled) length.
pub fn serialize_bar(
    tokens: &[OptimizableToken],
    model: &DurationModel,
    modes: &[BeatMode],
    trailing: &str,
) -> String {
    let grid = model.grid();
    let mut beats: Vec<String> = Vec::new();
    let mut current = None;

    for token in tokens {
        let beat = grid.beat_of(token.tick);
        let triplet_step = grid
            .triplet_step()
            .filter(|_| modes.get(beat) == Some(&BeatMode::Triplet));
        if current != Some(beat) {
            current = Some(beat);
            beats.push(match triplet_step {
                Some(_) => "(3".to_string(),
                None => String::new(),
            });
        }
        let suffix = match triplet_step {
            // a slot never spills over its step
            Some(step) => model.scaled_suffix(step.min(token.duration), 1.5),
            None => model.ticks_to_suffix(token.duration),
        };
        if let Some(text) = beats.last_mut() {
            text.push_str(&render_token(token, &suffix));
        }
    }

    let mut bar = beats.join(" ");
    if !trailing.is_empty() {
        if !bar.is_empty() {
            bar.push(' ');
        }
        bar.push_str(trailing);
    }
    bar
}
