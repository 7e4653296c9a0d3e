//! Section types for the configuration file.

use abcgrid::NoteFill;
use serde::{Deserialize, Serialize};

/// Grid resolution and write-back behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSettings {
    /// Ticks in one beat. Multiples of 3 allow triplet beats.
    /// Default: 24
    #[serde(default = "GridSettings::default_ticks_per_beat")]
    pub ticks_per_beat: u32,

    /// Where a sustained note stops.
    /// Default: unit
    #[serde(default)]
    pub note_fill: NoteFill,

    /// Append `" |"` to an edited bar that has no closing barline.
    /// Default: true
    #[serde(default = "GridSettings::default_trailing_barline")]
    pub trailing_barline: bool,

    /// Characters after the bar searched for an existing barline.
    /// Default: 3
    #[serde(default = "GridSettings::default_barline_peek")]
    pub barline_peek: usize,
}

impl GridSettings {
    fn default_ticks_per_beat() -> u32 {
        24
    }

    fn default_trailing_barline() -> bool {
        true
    }

    fn default_barline_peek() -> usize {
        3
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            ticks_per_beat: Self::default_ticks_per_beat(),
            note_fill: NoteFill::default(),
            trailing_barline: Self::default_trailing_barline(),
            barline_peek: Self::default_barline_peek(),
        }
    }
}

/// Log filter used by the command-line host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive such as `info` or `abcgrid=debug`.
    /// Default: info
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

pub(crate) fn note_fill_name(fill: NoteFill) -> &'static str {
    match fill {
        NoteFill::Unit => "unit",
        NoteFill::Beat => "beat",
    }
}

pub(crate) fn parse_note_fill(value: &str) -> Option<NoteFill> {
    match value.trim().to_ascii_lowercase().as_str() {
        "unit" => Some(NoteFill::Unit),
        "beat" => Some(NoteFill::Beat),
        _ => None,
    }
}
