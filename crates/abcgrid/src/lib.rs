//! Step-grid editing for ABC music notation.
//!
//! This crate locates the bar around a text cursor, tokenizes it onto a
//! fixed tick grid, projects it into per-tick views for drum and note
//! grids, and writes single-tick edits back as minimal ABC text.
//!
//! # Example
//!
//! ```
//! use abcgrid::{BarEditor, DurationModel, EditSession, TickGrid, WriteOptions};
//!
//! let mut doc = String::from("X:1\nM:4/4\nL:1/8\nK:C\nC2 E2 G2 z2 | z8 |\n");
//! let mut model = DurationModel::new(TickGrid::default());
//! model.update_unit_length(&doc);
//! let editor = BarEditor::new(model);
//!
//! let cursor = doc.find("z8").unwrap();
//! let session = EditSession::locate(&doc, cursor).unwrap();
//! let tokens = editor.tokenize(&session.bar_text);
//! let outcome = editor.toggle(&tokens, 0, "A").unwrap();
//!
//! let (replacement, _next) = session.prepare_edit(&doc, &outcome.text, WriteOptions::default());
//! replacement.apply(&mut doc).unwrap();
//! assert!(doc.contains("| Az z2 z2 z2 |"));
//! ```

pub mod degree;
pub mod duration;
pub mod editor;
pub mod error;
pub mod feedback;
pub mod grid;
pub mod header;
pub mod instruments;
pub mod key;
pub mod line;
pub mod locator;
pub mod mutation;
pub mod parser;
pub mod percmap;
pub mod pitch;
pub mod projector;
pub mod registry;
pub mod serialize;
pub mod session;
pub mod token;

pub use degree::{shift_by_degree, shift_pitch, triad};
pub use duration::{Duration, DurationModel};
pub use editor::{BarEditor, EditOutcome};
pub use error::{EditError, Result};
pub use feedback::{Feedback, FeedbackLevel, ParseResult};
pub use grid::{BeatMode, NoteFill, TickGrid};
pub use header::{Meter, TuneHeader, UnitLength};
pub use instruments::{default_kit, resolve_kit, Instrument, InstrumentDef, NoteState};
pub use key::{Key, Mode};
pub use line::{classify_line, LineKind};
pub use locator::{locate_bar, BarRange};
pub use mutation::EditPath;
pub use parser::{tokenize, tokenize_with_feedback};
pub use percmap::{visible_instruments, PercEntry, PercMap, Visibility};
pub use pitch::{Accidental, NoteName, Pitch};
pub use registry::{EditorRegistry, InstanceId, Role};
pub use session::{EditSession, Replacement, WriteOptions};
pub use token::{OptimizableToken, Token, TokenKind};

/// Find an instrument of a resolved kit by id.
pub fn find_instrument<'k>(kit: &'k [Instrument], id: &str) -> Result<&'k Instrument> {
    kit.iter()
        .find(|i| i.id() == id)
        .ok_or_else(|| EditError::UnknownInstrument(id.to_string()))
}
