//! Duration model: ABC length suffixes <-> ticks, and the optimizer that
//! turns a sparse set of onsets back into minimal tokens.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::{BeatMode, NoteFill, TickGrid, MAX_METER_PART};
use crate::header::{Meter, TuneHeader, UnitLength};
use crate::parser::note::parse_duration;
use crate::token::OptimizableToken;

/// Denominators tried when writing a tick count as a fraction of `L:`
const CANDIDATE_DENOMINATORS: [u32; 9] = [2, 3, 4, 6, 8, 12, 16, 24, 32];

const EPSILON: f64 = 1e-6;

/// A duration suffix as a multiple of the unit length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duration {
    pub numerator: u32,
    pub denominator: u32,
}

impl Duration {
    pub fn unit() -> Self {
        Duration {
            numerator: 1,
            denominator: 1,
        }
    }

    /// Zero terms come from overflowing or nonsensical suffixes
    pub fn is_valid(&self) -> bool {
        self.numerator > 0 && self.denominator > 0
    }
}

/// Converts between suffixes and ticks for one grid and unit length.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationModel {
    grid: TickGrid,
    unit: UnitLength,
    ticks_per_unit: f64,
    fill: NoteFill,
}

impl DurationModel {
    pub fn new(grid: TickGrid) -> Self {
        let mut model = DurationModel {
            grid,
            unit: UnitLength::default(),
            ticks_per_unit: 0.0,
            fill: NoteFill::default(),
        };
        model.recompute();
        model
    }

    pub fn with_fill(mut self, fill: NoteFill) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_unit_length(mut self, unit: UnitLength) -> Self {
        self.set_unit_length(unit);
        self
    }

    pub fn grid(&self) -> &TickGrid {
        &self.grid
    }

    pub fn unit_length(&self) -> UnitLength {
        self.unit
    }

    pub fn ticks_per_unit(&self) -> f64 {
        self.ticks_per_unit
    }

    pub fn fill(&self) -> NoteFill {
        self.fill
    }

    pub fn set_unit_length(&mut self, unit: UnitLength) {
        self.unit = unit;
        self.recompute();
    }

    pub fn set_meter(&mut self, meter: Meter) {
        let (beats, unit) = meter.to_fraction();
        if beats > MAX_METER_PART || unit > MAX_METER_PART {
            tracing::warn!(beats, unit, "meter out of range, clamping");
        }
        self.grid.beats_per_bar = beats.clamp(1, MAX_METER_PART);
        self.grid.beat_unit = unit.clamp(1, MAX_METER_PART);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.ticks_per_unit = self.grid.ticks_per_whole() as f64 * self.unit.as_f64();
    }

    /// Re-read `L:` and `M:` from the whole document.
    pub fn update_unit_length(&mut self, doc: &str) {
        self.update_unit_length_at(doc, doc.len());
    }

    /// Re-read `L:` and `M:` as they stand at `offset`.
    pub fn update_unit_length_at(&mut self, doc: &str, offset: usize) {
        let header = TuneHeader::scan_until(doc, offset);
        self.set_meter(header.meter.unwrap_or(Meter::Common));
        self.set_unit_length(header.effective_unit_length());
        tracing::trace!(
            unit = ?self.unit,
            ticks_per_unit = self.ticks_per_unit,
            "unit length updated"
        );
    }

    /// Parse a suffix; `None` if it is malformed
    pub fn parse_suffix(&self, suffix: &str) -> Option<Duration> {
        let mut input = suffix;
        let duration = parse_duration(&mut input).ok()?;
        (input.is_empty() && duration.is_valid()).then_some(duration)
    }

    /// Ticks for a suffix. Malformed suffixes count as one unit.
    pub fn duration_to_ticks(&self, suffix: &str) -> f64 {
        match self.parse_suffix(suffix) {
            Some(d) => self.ticks_per_unit * d.numerator as f64 / d.denominator as f64,
            None => self.ticks_per_unit,
        }
    }

    /// Shortest suffix for a tick count, if one exists
    pub fn try_ticks_to_suffix(&self, ticks: u32) -> Option<String> {
        ratio_suffix(ticks as f64 / self.ticks_per_unit)
    }

    /// Shortest suffix for a tick count, degrading to a decimal multiplier
    /// that ABC readers will not accept.
    pub fn ticks_to_suffix(&self, ticks: u32) -> String {
        self.scaled_suffix(ticks, 1.0)
    }

    /// Suffix for `ticks` written `scale` times longer, as tuplet members are
    pub fn scaled_suffix(&self, ticks: u32, scale: f64) -> String {
        let ratio = ticks as f64 * scale / self.ticks_per_unit;
        match ratio_suffix(ratio) {
            Some(suffix) => suffix,
            None => {
                tracing::warn!(ticks, ratio, "no ABC fraction for duration, writing decimal");
                ratio.to_string()
            }
        }
    }

    /// Next unit-length boundary strictly after `tick`
    fn next_unit_boundary(&self, tick: u32) -> u32 {
        let units = (tick as f64 / self.ticks_per_unit + EPSILON).floor() + 1.0;
        let boundary = (units * self.ticks_per_unit - EPSILON).ceil() as u32;
        boundary.max(tick + 1)
    }

    /// Re-derive minimal tokens from sparse onsets.
    ///
    /// Only anchored tokens (notes, or annotations) keep their position;
    /// rests are regenerated. The result covers every beat of the bar
    /// exactly, in tick order.
    pub fn optimize_bar(
        &self,
        tokens: &[OptimizableToken],
        modes: &[BeatMode],
    ) -> Vec<OptimizableToken> {
        let tpb = self.grid.ticks_per_beat;
        let content_end = tokens
            .iter()
            .map(|t| t.tick.saturating_add(t.duration.max(1)))
            .max()
            .unwrap_or(0)
            .min(self.grid.max_content_ticks());
        let beats = self.grid.beats_per_bar.max(content_end.div_ceil(tpb));

        let mut anchors: BTreeMap<u32, &OptimizableToken> = BTreeMap::new();
        for token in tokens.iter().filter(|t| t.is_anchored()) {
            anchors.entry(token.tick).or_insert(token);
        }

        let mut out = Vec::new();
        for beat in 0..beats as usize {
            let start = self.grid.beat_start(beat);
            let end = start + tpb;
            match (modes.get(beat).copied().unwrap_or_default(), self.grid.triplet_step()) {
                (BeatMode::Triplet, Some(step)) => {
                    for slot in 0..3 {
                        let slot_start = start + slot * step;
                        let occupant = anchors.range(slot_start..slot_start + step).next();
                        out.push(match occupant {
                            Some((_, token)) => placed(token, slot_start, step),
                            None => OptimizableToken::rest(slot_start, step),
                        });
                    }
                }
                (mode, _) => {
                    if mode == BeatMode::Triplet {
                        tracing::warn!(beat, tpb, "beat does not divide into triplets, writing straight");
                    }
                    self.optimize_straight_beat(&anchors, start, end, &mut out);
                }
            }
        }
        out
    }

    fn optimize_straight_beat(
        &self,
        anchors: &BTreeMap<u32, &OptimizableToken>,
        start: u32,
        end: u32,
        out: &mut Vec<OptimizableToken>,
    ) {
        let mut tick = start;
        while tick < end {
            let next_onset = anchors
                .range(tick + 1..end)
                .next()
                .map_or(end, |(t, _)| *t);
            match anchors.get(&tick) {
                Some(token) if token.has_note() => {
                    let stop = match self.fill {
                        NoteFill::Beat => next_onset,
                        NoteFill::Unit => next_onset.min(self.next_unit_boundary(tick)),
                    };
                    out.push(placed(token, tick, stop - tick));
                    tick = stop;
                }
                Some(token) => {
                    out.push(placed(token, tick, next_onset - tick));
                    tick = next_onset;
                }
                None => {
                    out.push(OptimizableToken::rest(tick, next_onset - tick));
                    tick = next_onset;
                }
            }
        }
    }
}

/// Copy of an anchor at a new position and length. Annotation-only
/// anchors come out as rests carrying their annotations.
fn placed(token: &OptimizableToken, tick: u32, duration: u32) -> OptimizableToken {
    if token.has_note() {
        OptimizableToken {
            tick,
            duration,
            ..token.clone()
        }
    } else {
        OptimizableToken {
            annotations: token.annotations.clone(),
            ..OptimizableToken::rest(tick, duration)
        }
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn ratio_suffix(ratio: f64) -> Option<String> {
    if !ratio.is_finite() || ratio < EPSILON {
        return None;
    }
    if (ratio - 1.0).abs() < EPSILON {
        return Some(String::new());
    }
    if (ratio - ratio.round()).abs() < EPSILON {
        return Some(format!("{}", ratio.round() as u32));
    }
    CANDIDATE_DENOMINATORS.iter().find_map(|&den| {
        let num = ratio * den as f64;
        if (num - num.round()).abs() >= EPSILON {
            return None;
        }
        let num = num.round() as u32;
        let divisor = gcd(num, den);
        let (num, den) = (num / divisor, den / divisor);
        Some(if num == 1 {
            format!("/{den}")
        } else {
            format!("{num}/{den}")
        })
    })
}
