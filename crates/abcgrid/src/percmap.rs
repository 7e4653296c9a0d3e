//! `%%percmap` directives and which drum rows to show.

use serde::{Deserialize, Serialize};

use crate::line;
use crate::locator::{self, BarRange};
use crate::parser::markup::pitches_in;
use crate::pitch::Pitch;

/// General MIDI percussion key map, notes 35-81
const GM_DRUMS: [&str; 47] = [
    "Acoustic Bass Drum",
    "Bass Drum 1",
    "Side Stick",
    "Acoustic Snare",
    "Hand Clap",
    "Electric Snare",
    "Low Floor Tom",
    "Closed Hi-Hat",
    "High Floor Tom",
    "Pedal Hi-Hat",
    "Low Tom",
    "Open Hi-Hat",
    "Low-Mid Tom",
    "Hi-Mid Tom",
    "Crash Cymbal 1",
    "High Tom",
    "Ride Cymbal 1",
    "Chinese Cymbal",
    "Ride Bell",
    "Tambourine",
    "Splash Cymbal",
    "Cowbell",
    "Crash Cymbal 2",
    "Vibraslap",
    "Ride Cymbal 2",
    "Hi Bongo",
    "Low Bongo",
    "Mute Hi Conga",
    "Open Hi Conga",
    "Low Conga",
    "High Timbale",
    "Low Timbale",
    "High Agogo",
    "Low Agogo",
    "Cabasa",
    "Maracas",
    "Short Whistle",
    "Long Whistle",
    "Short Guiro",
    "Long Guiro",
    "Claves",
    "Hi Wood Block",
    "Low Wood Block",
    "Mute Cuica",
    "Open Cuica",
    "Mute Triangle",
    "Open Triangle",
];

const GM_FIRST: u8 = 35;

pub fn gm_drum_name(midi: u8) -> Option<&'static str> {
    midi.checked_sub(GM_FIRST)
        .and_then(|i| GM_DRUMS.get(i as usize))
        .copied()
}

/// Look up a GM drum by name, ignoring case and punctuation
/// (`closed-hi-hat`, `Closed Hi-Hat`)
pub fn gm_drum_number(name: &str) -> Option<u8> {
    let wanted = normalize(name);
    GM_DRUMS
        .iter()
        .position(|n| normalize(n) == wanted)
        .map(|i| GM_FIRST + i as u8)
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercEntry {
    /// ABC pitch spelling, e.g. `^g`
    pub character: String,
    pub midi: u8,
    pub label: String,
    /// Optional note head for renderers (`x`, `triangle`, ...)
    pub head: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercMap {
    entries: Vec<PercEntry>,
}

impl PercMap {
    /// Collect `%%percmap <note> <midi|name> [head]` lines. A later line
    /// for the same note replaces the earlier one in place.
    pub fn scan(doc: &str) -> PercMap {
        let mut map = PercMap::default();
        for line in line::lines(doc) {
            let Some(args) = line.text.trim_start().strip_prefix("%%percmap") else {
                continue;
            };
            match parse_entry(args) {
                Some(entry) => map.insert(entry),
                None => tracing::debug!(line = line.text, "ignoring malformed percmap"),
            }
        }
        map
    }

    pub fn insert(&mut self, entry: PercEntry) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.character == entry.character)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn entries(&self) -> &[PercEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, character: &str) -> Option<&PercEntry> {
        self.entries.iter().find(|e| e.character == character)
    }

    /// The first note mapped to a MIDI drum
    pub fn character_for(&self, midi: u8) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.midi == midi)
            .map(|e| e.character.as_str())
    }
}

fn parse_entry(args: &str) -> Option<PercEntry> {
    let mut parts = args.split_whitespace();
    let character = Pitch::parse(parts.next()?)?.to_string();
    let target = parts.next()?;
    let midi = match target.parse::<u8>() {
        Ok(n) => n,
        Err(_) => gm_drum_number(target)?,
    };
    let label = gm_drum_name(midi)
        .map(str::to_string)
        .unwrap_or_else(|| format!("MIDI {midi}"));
    Some(PercEntry {
        character,
        midi,
        label,
        head: parts.next().map(str::to_string),
    })
}

/// Which drum rows to offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Drums used in the current bar, or the previous one while it is empty
    #[default]
    FollowBar,
    /// Drums used anywhere in the tune
    Locked,
}

/// Percmap entries to show, in percmap order.
pub fn visible_instruments<'m>(
    doc: &str,
    current: Option<BarRange>,
    map: &'m PercMap,
    visibility: Visibility,
    pinned: &[String],
) -> Vec<&'m PercEntry> {
    let used_in = |text: &str| -> Vec<String> {
        pitches_in(text)
            .iter()
            .map(|p| p.to_string())
            .filter(|c| map.get(c).is_some())
            .collect()
    };

    let used: Vec<String> = match (visibility, current) {
        (Visibility::Locked, _) => locator::bars(doc)
            .iter()
            .flat_map(|r| used_in(r.slice(doc)))
            .collect(),
        (Visibility::FollowBar, Some(range)) => {
            let here = used_in(range.slice(doc));
            if here.is_empty() {
                locator::previous_bar(doc, range)
                    .map(|prev| used_in(prev.slice(doc)))
                    .unwrap_or_default()
            } else {
                here
            }
        }
        (Visibility::FollowBar, None) => Vec::new(),
    };

    map.entries()
        .iter()
        .filter(|e| used.contains(&e.character) || pinned.contains(&e.character))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = "X:1\n%%percmap g 42\n%%percmap ^g open-hi-hat x\n%%percmap c 38\n%%percmap F 36\nK:C perc\n[gF] g [gc] g | z4 |\n";

    #[test]
    fn test_gm_lookup() {
        assert_eq!(gm_drum_name(42), Some("Closed Hi-Hat"));
        assert_eq!(gm_drum_name(81), Some("Open Triangle"));
        assert_eq!(gm_drum_name(34), None);
        assert_eq!(gm_drum_name(82), None);
        assert_eq!(gm_drum_number("closed-hi-hat"), Some(42));
        assert_eq!(gm_drum_number("Acoustic Snare"), Some(38));
        assert_eq!(gm_drum_number("kazoo"), None);
    }

    #[test]
    fn test_scan() {
        let map = PercMap::scan(DOC);
        assert_eq!(map.entries().len(), 4);
        let open = map.get("^g").unwrap();
        assert_eq!(open.midi, 46);
        assert_eq!(open.label, "Open Hi-Hat");
        assert_eq!(open.head.as_deref(), Some("x"));
        assert_eq!(map.character_for(38), Some("c"));
    }

    #[test]
    fn test_later_line_overrides() {
        let map = PercMap::scan("%%percmap g 42\n%%percmap c 38\n%%percmap g 44\n%%percmap ? 1\n");
        let chars: Vec<_> = map.entries().iter().map(|e| (e.character.as_str(), e.midi)).collect();
        assert_eq!(chars, vec![("g", 44), ("c", 38)]);
    }

    #[test]
    fn test_visible_follows_bar() {
        let map = PercMap::scan(DOC);
        let first = locator::locate_bar(DOC, DOC.find("[gF]").unwrap()).unwrap();
        let visible: Vec<_> = visible_instruments(DOC, Some(first), &map, Visibility::FollowBar, &[])
            .iter()
            .map(|e| e.character.as_str())
            .collect();
        assert_eq!(visible, vec!["g", "c", "F"]);
    }

    #[test]
    fn test_visible_falls_back_to_previous_bar() {
        let map = PercMap::scan(DOC);
        let empty = locator::locate_bar(DOC, DOC.find("z4").unwrap()).unwrap();
        let visible = visible_instruments(DOC, Some(empty), &map, Visibility::FollowBar, &[]);
        assert_eq!(visible.len(), 3);
    }

    #[test]
    fn test_visible_pinned_and_locked() {
        let map = PercMap::scan(DOC);
        let pinned = vec!["^g".to_string()];
        let visible = visible_instruments(DOC, None, &map, Visibility::FollowBar, &pinned);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].character, "^g");

        let locked = visible_instruments(DOC, None, &map, Visibility::Locked, &pinned);
        assert_eq!(locked.len(), 4);
    }
}
