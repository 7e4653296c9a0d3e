//! Subcommand implementations.

use abcgrid::{
    find_instrument, resolve_kit, shift_by_degree, triad, Key, NoteState, PercMap,
};
use anyhow::{bail, Context, Result};
use gridconf::{ConfigSources, GridConfig};
use serde_json::json;
use std::path::Path;

use crate::document::{self, OpenDocument};
use crate::{Output, Target};

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_key(key: &str) -> Result<Key> {
    Key::parse(key).with_context(|| format!("'{key}' is not a key"))
}

/// Parse `base`, `alt[:i]`, `decoration[:i]`, `flam` or `none`.
pub fn parse_state(text: &str) -> Result<Option<NoteState>> {
    let (name, index) = match text.split_once(':') {
        Some((name, index)) => {
            let index: usize = index
                .parse()
                .with_context(|| format!("bad index in state '{text}'"))?;
            (name, index)
        }
        None => (text, 0),
    };
    let state = match name {
        "none" => None,
        "base" => Some(NoteState::Base),
        "flam" => Some(NoteState::Flam),
        "alt" => Some(NoteState::Alt(index)),
        "decoration" => Some(NoteState::Decoration(index)),
        _ => bail!("unknown state '{text}'"),
    };
    Ok(state)
}

pub fn locate(target: &Target) -> Result<()> {
    let text = document::read(&target.file)?;
    let range = abcgrid::locate_bar(&text, target.cursor)
        .with_context(|| format!("no bar at offset {}", target.cursor))?;
    print_json(&json!({
        "start": range.start,
        "end": range.end,
        "text": range.slice(&text),
    }))
}

pub fn tokens(config: &GridConfig, target: &Target) -> Result<()> {
    let doc = OpenDocument::open(config, target)?;
    let result = doc.editor.tokenize_with_feedback(&doc.session.bar_text);
    for feedback in &result.feedback {
        tracing::warn!(?feedback, "tokenizer feedback");
    }
    print_json(&result.value)
}

pub fn grid(config: &GridConfig, target: &Target, instrument: Option<&str>) -> Result<()> {
    let doc = OpenDocument::open(config, target)?;
    let tokens = doc.tokens();
    let length = doc.editor.grid_length(&tokens);

    match instrument {
        Some(id) => {
            let kit = resolve_kit(&config.kit(), &PercMap::scan(&doc.text));
            let instrument = find_instrument(&kit, id)?;
            let ticks: Vec<_> = doc
                .editor
                .project_state(&tokens, instrument)
                .into_iter()
                .enumerate()
                .filter_map(|(tick, state)| state.map(|state| json!({ "tick": tick, "state": state })))
                .collect();
            print_json(&json!({ "instrument": id, "length": length, "ticks": ticks }))
        }
        None => {
            let ticks: Vec<_> = doc
                .editor
                .project_flat(&tokens)
                .into_iter()
                .enumerate()
                .filter(|(_, notes)| !notes.is_empty())
                .map(|(tick, notes)| json!({ "tick": tick, "notes": notes }))
                .collect();
            print_json(&json!({ "length": length, "ticks": ticks }))
        }
    }
}

pub fn toggle(
    config: &GridConfig,
    target: &Target,
    tick: u32,
    pitch: &str,
    output: Output,
) -> Result<()> {
    let doc = OpenDocument::open(config, target)?.lock_triplets(&output.triplet_beats)?;
    let outcome = doc.editor.toggle(&doc.tokens(), tick, pitch)?;
    doc.commit(config, outcome, output)
}

pub fn set_state(
    config: &GridConfig,
    target: &Target,
    tick: u32,
    instrument: &str,
    state: &str,
    output: Output,
) -> Result<()> {
    let state = parse_state(state)?;
    let doc = OpenDocument::open(config, target)?.lock_triplets(&output.triplet_beats)?;
    let kit = resolve_kit(&config.kit(), &PercMap::scan(&doc.text));
    let instrument = find_instrument(&kit, instrument)?;
    let outcome = doc
        .editor
        .set_grouped_state(&doc.tokens(), tick, instrument, state)?;
    doc.commit(config, outcome, output)
}

pub fn chord(
    config: &GridConfig,
    target: &Target,
    tick: u32,
    key: &str,
    degree: u8,
    octave: i8,
    output: Output,
) -> Result<()> {
    if !(1..=7).contains(&degree) {
        bail!("degree must be between 1 and 7, got {degree}");
    }
    let key = parse_key(key)?;
    let voicing = triad(&key, degree, octave);
    let doc = OpenDocument::open(config, target)?.lock_triplets(&output.triplet_beats)?;
    let outcome = doc.editor.insert_chord(&doc.tokens(), tick, &voicing)?;
    doc.commit(config, outcome, output)
}

pub fn shift(steps: i32, key: &str, fragment: &str) -> Result<()> {
    let key = parse_key(key)?;
    println!("{}", shift_by_degree(fragment, steps, &key));
    Ok(())
}

pub fn percmap(file: &Path) -> Result<()> {
    let text = document::read(file)?;
    print_json(&PercMap::scan(&text).entries())
}

pub fn config(config: &GridConfig, sources: &ConfigSources) -> Result<()> {
    for file in &sources.files {
        println!("# loaded {}", file.display());
    }
    for var in &sources.env_overrides {
        println!("# overridden by {var}");
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
