//! Drum group definitions and how their states are written in ABC.
//!
//! A definition names MIDI drums, not ABC characters; it is bound to the
//! characters of a particular tune through that tune's [`PercMap`].

use serde::{Deserialize, Serialize};

use crate::parser::markup::pitches_in;
use crate::percmap::PercMap;
use crate::token::OptimizableToken;

/// What a grouped instrument is doing at one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteState {
    Base,
    /// Index into the instrument's alternates
    Alt(usize),
    /// Index into the instrument's decorations
    Decoration(usize),
    Flam,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltDef {
    pub midi: u8,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub icon: String,
    /// Written as the `o` prefix on the base note
    #[serde(default)]
    pub open_prefix: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecorationDef {
    pub label: String,
    /// ABC decoration text, e.g. `!>!`
    pub marker: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentDef {
    pub id: String,
    pub label: String,
    pub base_midi: u8,
    #[serde(default)]
    pub base_icon: String,
    #[serde(default)]
    pub allows_flam: bool,
    #[serde(default)]
    pub alternates: Vec<AltDef>,
    #[serde(default)]
    pub decorations: Vec<DecorationDef>,
}

fn alt(midi: u8, label: &str, icon: &str, open_prefix: bool) -> AltDef {
    AltDef {
        midi,
        label: label.to_string(),
        icon: icon.to_string(),
        open_prefix,
    }
}

fn accent() -> DecorationDef {
    DecorationDef {
        label: "Accent".to_string(),
        marker: "!>!".to_string(),
        icon: ">".to_string(),
    }
}

fn instrument(
    id: &str,
    label: &str,
    base_midi: u8,
    base_icon: &str,
    alternates: Vec<AltDef>,
    decorations: Vec<DecorationDef>,
    allows_flam: bool,
) -> InstrumentDef {
    InstrumentDef {
        id: id.to_string(),
        label: label.to_string(),
        base_midi,
        base_icon: base_icon.to_string(),
        allows_flam,
        alternates,
        decorations,
    }
}

/// The built-in drum kit
pub fn default_kit() -> Vec<InstrumentDef> {
    vec![
        instrument(
            "hihat",
            "Hi-hat",
            42,
            "x",
            vec![alt(46, "Open", "o", true), alt(44, "Pedal", "-", false)],
            vec![accent()],
            false,
        ),
        instrument(
            "snare",
            "Snare",
            38,
            "*",
            vec![alt(37, "Side stick", "/", false)],
            vec![accent()],
            true,
        ),
        instrument("kick", "Kick", 36, "O", vec![], vec![accent()], false),
        instrument(
            "ride",
            "Ride",
            51,
            "x",
            vec![alt(53, "Bell", "^", false)],
            vec![],
            false,
        ),
        instrument(
            "crash",
            "Crash",
            49,
            "#",
            vec![alt(57, "Crash 2", "#", false)],
            vec![],
            false,
        ),
        instrument("tom-high", "High tom", 50, "o", vec![], vec![], true),
        instrument("tom-mid", "Mid tom", 47, "o", vec![], vec![], true),
        instrument("tom-floor", "Floor tom", 41, "o", vec![], vec![], true),
    ]
}

/// An alternate bound to a tune
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAlt {
    pub character: Option<String>,
    pub open_prefix: bool,
}

/// An instrument definition bound to a tune's characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub def: InstrumentDef,
    pub base: String,
    pub alts: Vec<ResolvedAlt>,
}

impl Instrument {
    /// Bind a definition to the percmap. `None` when the base drum has no
    /// character in this tune.
    pub fn resolve(def: &InstrumentDef, map: &PercMap) -> Option<Instrument> {
        let base = map.character_for(def.base_midi)?.to_string();
        let alts = def
            .alternates
            .iter()
            .map(|a| ResolvedAlt {
                character: map.character_for(a.midi).map(str::to_string),
                open_prefix: a.open_prefix,
            })
            .collect();
        Some(Instrument {
            def: def.clone(),
            base,
            alts,
        })
    }

    pub fn id(&self) -> &str {
        &self.def.id
    }

    /// This instrument's characters: base first, then alternates
    pub fn characters(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.base.as_str())
            .chain(self.alts.iter().filter_map(|a| a.character.as_deref()))
    }

    fn uses_open_prefix(&self) -> bool {
        self.alts.iter().any(|a| a.open_prefix)
    }

    /// State of this instrument in one note entry, if it plays there.
    ///
    /// Flam wins over decoration, decoration over alternate, alternate
    /// over base.
    pub fn state_of(
        &self,
        notes: &[String],
        decorations: &str,
        grace: &str,
        open: bool,
    ) -> Option<NoteState> {
        let has_base = notes.iter().any(|n| *n == self.base);
        let alt_hit = self.alts.iter().position(|a| {
            a.character.as_ref().is_some_and(|c| notes.contains(c)) || (a.open_prefix && open && has_base)
        });
        if !has_base && alt_hit.is_none() {
            return None;
        }
        if self.def.allows_flam && self.in_grace(grace) {
            return Some(NoteState::Flam);
        }
        if let Some(i) = self
            .def
            .decorations
            .iter()
            .position(|d| decorations.contains(&d.marker))
        {
            return Some(NoteState::Decoration(i));
        }
        Some(alt_hit.map_or(NoteState::Base, NoteState::Alt))
    }

    pub fn state_of_entry(&self, entry: &OptimizableToken) -> Option<NoteState> {
        self.state_of(&entry.notes, &entry.decorations, &entry.grace, entry.open)
    }

    fn in_grace(&self, grace: &str) -> bool {
        pitches_in(grace).iter().any(|p| p.to_string() == self.base)
    }

    /// Remove this instrument's characters from an entry, leaving other
    /// instruments' characters alone.
    ///
    /// Decorations belong to the whole chord. This instrument's markers go
    /// only with `drop_markers` or once no notes remain.
    pub(crate) fn strip(&self, entry: &mut OptimizableToken, drop_markers: bool) {
        entry.notes.retain(|n| !self.characters().any(|c| c == n));
        if drop_markers || entry.notes.is_empty() {
            for def in &self.def.decorations {
                entry.decorations = entry.decorations.replace(&def.marker, "");
            }
        }
        if self.uses_open_prefix() {
            entry.open = false;
        }
        let grace: Vec<String> = pitches_in(&entry.grace)
            .iter()
            .map(|p| p.to_string())
            .filter(|p| *p != self.base)
            .collect();
        entry.grace = if grace.is_empty() {
            String::new()
        } else {
            format!("{{{}}}", grace.concat())
        };
    }

    /// Write a state into an entry that holds none of this instrument.
    pub(crate) fn write(&self, entry: &mut OptimizableToken, state: NoteState) {
        match state {
            NoteState::Base => self.add(entry, &self.base),
            NoteState::Alt(i) => match self.alts.get(i) {
                Some(alt) if alt.open_prefix => {
                    entry.open = true;
                    self.add(entry, &self.base);
                }
                Some(ResolvedAlt {
                    character: Some(c), ..
                }) => self.add(entry, c),
                _ => {
                    tracing::warn!(instrument = self.id(), alt = i, "alternate has no character in this tune");
                    self.add(entry, &self.base);
                }
            },
            NoteState::Decoration(i) => {
                if let Some(def) = self.def.decorations.get(i) {
                    if !entry.decorations.contains(&def.marker) {
                        entry.decorations.push_str(&def.marker);
                    }
                }
                self.add(entry, &self.base);
            }
            NoteState::Flam => {
                entry.grace = match entry.grace.strip_suffix('}') {
                    Some(open) => format!("{open}{}}}", self.base),
                    None => format!("{{{}}}", self.base),
                };
                self.add(entry, &self.base);
            }
        }
    }

    fn add(&self, entry: &mut OptimizableToken, character: &str) {
        if !entry.notes.iter().any(|n| n == character) {
            entry.notes.push(character.to_string());
        }
    }
}

/// Bind every definition whose base drum the tune maps
pub fn resolve_kit(defs: &[InstrumentDef], map: &PercMap) -> Vec<Instrument> {
    defs.iter()
        .filter_map(|def| Instrument::resolve(def, map))
        .collect()
}
