use thiserror::Error;

/// Caller contract violations. Malformed ABC never ends up here; it is
/// reported as tokenizer feedback instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("tick {tick} is outside the {length}-tick bar grid")]
    TickOutOfRange { tick: u32, length: u32 },

    #[error("a beat of {ticks_per_beat} ticks cannot hold triplets")]
    TripletUnsupported { ticks_per_beat: u32 },

    #[error("no note starts at tick {0}")]
    NoNoteAt(u32),

    #[error("'{0}' is not an ABC pitch")]
    InvalidPitch(String),

    #[error("unknown instrument '{0}'")]
    UnknownInstrument(String),

    #[error("replacement {start}..{end} does not fit a document of {len} bytes")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, EditError>;
