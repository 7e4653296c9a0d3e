//! `L:`, `M:` and `K:` header scanning.
//!
//! The grid only needs the fields that change how durations map onto
//! ticks (plus the key, for degree shifting), so this is a line scan
//! rather than a full header parse.

use serde::{Deserialize, Serialize};

use crate::line::{self, LineKind};

/// Meter/time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Meter {
    Simple { numerator: u32, denominator: u32 },
    Common, // C = 4/4
    Cut,    // C| = 2/2
    None,   // Free meter
}

impl Meter {
    /// Beats per bar and beat unit
    pub fn to_fraction(&self) -> (u32, u32) {
        match self {
            Meter::Simple {
                numerator,
                denominator,
            } => (*numerator, *denominator),
            Meter::Common => (4, 4),
            Meter::Cut => (2, 2),
            Meter::None => (4, 4), // Default assumption
        }
    }

    /// Parse meter field value (e.g., "4/4", "C", "C|", "6/8")
    pub fn parse(value: &str) -> Option<Meter> {
        match value.trim() {
            "C" => Some(Meter::Common),
            "C|" => Some(Meter::Cut),
            "none" | "free" => Some(Meter::None),
            other => {
                let (numerator, denominator) = parse_fraction(other)?;
                Some(Meter::Simple {
                    numerator,
                    denominator,
                })
            }
        }
    }
}

/// Unit note length (L: field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLength {
    pub numerator: u32,
    pub denominator: u32,
}

impl Default for UnitLength {
    fn default() -> Self {
        UnitLength {
            numerator: 1,
            denominator: 8,
        }
    }
}

impl UnitLength {
    /// Parse unit length field value ("1/8", "1/16", or "1" for a whole note)
    pub fn parse(value: &str) -> Option<UnitLength> {
        let value = value.trim();
        let (numerator, denominator) = match parse_fraction(value) {
            Some(fraction) => fraction,
            None => (value.parse().ok()?, 1),
        };
        Some(UnitLength {
            numerator,
            denominator,
        })
    }

    /// Fraction of a whole note
    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

fn parse_fraction(s: &str) -> Option<(u32, u32)> {
    let (num, den) = s.split_once('/')?;
    let num: u32 = num.trim().parse().ok()?;
    let den: u32 = den.trim().parse().ok()?;
    (num > 0 && den > 0).then_some((num, den))
}

/// Infer unit length from meter per ABC standard
pub fn infer_unit_length(meter: Option<&Meter>) -> UnitLength {
    match meter {
        Some(Meter::Simple {
            numerator,
            denominator,
        }) => {
            let ratio = *numerator as f32 / *denominator as f32;
            if ratio < 0.75 {
                UnitLength {
                    numerator: 1,
                    denominator: 16,
                }
            } else {
                UnitLength::default()
            }
        }
        _ => UnitLength::default(),
    }
}

/// The duration-relevant header fields in force at some point of a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuneHeader {
    pub meter: Option<Meter>,
    pub unit_length: Option<UnitLength>,
    /// Raw `K:` value
    pub key: Option<String>,
}

impl TuneHeader {
    /// Scan a whole document; the last field of each kind wins.
    pub fn scan(doc: &str) -> TuneHeader {
        Self::scan_until(doc, doc.len())
    }

    /// Scan header lines starting before `offset`. `X:` starts a new tune
    /// and forgets what the previous one declared.
    pub fn scan_until(doc: &str, offset: usize) -> TuneHeader {
        let mut header = TuneHeader::default();
        for line in line::lines(doc).take_while(|l| l.start <= offset) {
            if line.kind() != LineKind::Header {
                continue;
            }
            let trimmed = line.text.trim_start();
            let Some((field, value)) = trimmed.split_once(':') else {
                continue;
            };
            match field {
                "X" => header = TuneHeader::default(),
                "L" => match UnitLength::parse(value) {
                    Some(unit) => header.unit_length = Some(unit),
                    None => tracing::debug!(value, "ignoring invalid L: field"),
                },
                "M" => match Meter::parse(value) {
                    Some(meter) => header.meter = Some(meter),
                    None => tracing::debug!(value, "ignoring invalid M: field"),
                },
                "K" => header.key = Some(value.trim().to_string()),
                _ => {}
            }
        }
        header
    }

    /// Declared unit length, or the one the meter implies
    pub fn effective_unit_length(&self) -> UnitLength {
        self.unit_length
            .unwrap_or_else(|| infer_unit_length(self.meter.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_parse() {
        assert_eq!(Meter::parse("C"), Some(Meter::Common));
        assert_eq!(Meter::parse("C|").map(|m| m.to_fraction()), Some((2, 2)));
        assert_eq!(
            Meter::parse(" 6/8 "),
            Some(Meter::Simple {
                numerator: 6,
                denominator: 8
            })
        );
        assert_eq!(Meter::parse("waltz"), None);
    }

    #[test]
    fn test_unit_length_parse() {
        assert_eq!(
            UnitLength::parse("1/16"),
            Some(UnitLength {
                numerator: 1,
                denominator: 16
            })
        );
        assert_eq!(UnitLength::parse("1").map(|u| u.as_f64()), Some(1.0));
        assert_eq!(UnitLength::parse("1/0"), None);
        assert_eq!(UnitLength::parse("eighth"), None);
    }

    #[test]
    fn test_infer_unit_length() {
        let two_four = Meter::Simple {
            numerator: 2,
            denominator: 4,
        };
        assert_eq!(infer_unit_length(Some(&two_four)).denominator, 16);
        assert_eq!(infer_unit_length(Some(&Meter::Common)).denominator, 8);
        assert_eq!(infer_unit_length(None).denominator, 8);
    }

    #[test]
    fn test_scan_last_field_wins() {
        let doc = "X:1\nM:3/4\nL:1/8\nK:G\nABc|\nL:1/16\nABcd|\n";
        let header = TuneHeader::scan(doc);
        assert_eq!(header.effective_unit_length().denominator, 16);
        assert_eq!(header.meter.map(|m| m.to_fraction()), Some((3, 4)));
        assert_eq!(header.key.as_deref(), Some("G"));

        let before_change = doc.find("ABc|").unwrap();
        let header = TuneHeader::scan_until(doc, before_change);
        assert_eq!(header.effective_unit_length().denominator, 8);
    }

    #[test]
    fn test_scan_new_tune_resets() {
        let doc = "X:1\nL:1/4\nK:C\nC|\n\nX:2\nM:2/4\nK:D\nD|\n";
        let header = TuneHeader::scan(doc);
        assert_eq!(header.unit_length, None);
        assert_eq!(header.effective_unit_length().denominator, 16);
    }
}
