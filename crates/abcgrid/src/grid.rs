//! The fixed-resolution tick grid a bar is projected onto.

use serde::{Deserialize, Serialize};

/// Bars of content one bar text may span; longer durations are cut here.
pub const MAX_BAR_SPAN: u32 = 16;

/// Largest meter numerator or denominator taken from a header
pub const MAX_METER_PART: u32 = 64;

/// Tick resolution and bar shape.
///
/// `ticks_per_beat` is fixed per grid instance; beats and beat unit follow
/// the tune's meter and change when `M:` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickGrid {
    pub ticks_per_beat: u32,
    pub beats_per_bar: u32,
    /// Denominator of the meter: 4 means one beat is a quarter note
    pub beat_unit: u32,
}

impl Default for TickGrid {
    fn default() -> Self {
        TickGrid {
            ticks_per_beat: 24,
            beats_per_bar: 4,
            beat_unit: 4,
        }
    }
}

impl TickGrid {
    pub fn new(ticks_per_beat: u32) -> Self {
        TickGrid {
            ticks_per_beat: ticks_per_beat.max(1),
            ..TickGrid::default()
        }
    }

    pub fn ticks_per_bar(&self) -> u32 {
        self.ticks_per_beat.saturating_mul(self.beats_per_bar)
    }

    /// Ticks in one whole note
    pub fn ticks_per_whole(&self) -> u32 {
        self.ticks_per_beat.saturating_mul(self.beat_unit)
    }

    /// Upper bound on the ticks a bar's content may cover
    pub fn max_content_ticks(&self) -> u32 {
        self.ticks_per_bar().saturating_mul(MAX_BAR_SPAN)
    }

    pub fn beat_of(&self, tick: u32) -> usize {
        (tick / self.ticks_per_beat) as usize
    }

    pub fn beat_start(&self, beat: usize) -> u32 {
        beat as u32 * self.ticks_per_beat
    }

    /// Width of one triplet slot, if the beat divides into three
    pub fn triplet_step(&self) -> Option<u32> {
        (self.ticks_per_beat % 3 == 0).then_some(self.ticks_per_beat / 3)
    }
}

/// How a beat is subdivided when re-optimized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatMode {
    #[default]
    Straight,
    /// Locked to three independent slots written as `(3`
    Triplet,
}

/// Where a sustained note stops when no later onset cuts it short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteFill {
    /// Next unit-length (`L:`) boundary or beat end
    #[default]
    Unit,
    /// Beat end
    Beat,
}
