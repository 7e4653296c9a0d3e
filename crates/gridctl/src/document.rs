//! An ABC file opened at a cursor, and writing edits back to it.

use abcgrid::{BarEditor, BeatMode, EditOutcome, EditSession, Token};
use anyhow::{bail, Context, Result};
use gridconf::GridConfig;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Output, Target};

pub struct OpenDocument {
    pub path: PathBuf,
    pub text: String,
    pub session: EditSession,
    pub editor: BarEditor,
}

impl OpenDocument {
    pub fn open(config: &GridConfig, target: &Target) -> Result<Self> {
        let text = read(&target.file)?;
        let session = EditSession::locate(&text, target.cursor).with_context(|| {
            format!(
                "no bar at offset {} of {}",
                target.cursor,
                target.file.display()
            )
        })?;

        let mut model = config.duration_model();
        model.update_unit_length_at(&text, session.range.start);
        tracing::debug!(
            start = session.range.start,
            end = session.range.end,
            bar = %session.bar_text,
            "bar located"
        );

        Ok(OpenDocument {
            path: target.file.clone(),
            text,
            session,
            editor: BarEditor::new(model),
        })
    }

    /// Edit the given beats as triplets; the rest keep their detected mode.
    pub fn lock_triplets(mut self, beats: &[usize]) -> Result<Self> {
        if beats.is_empty() {
            return Ok(self);
        }
        let grid = self.editor.model().grid();
        let limit = (grid.max_content_ticks() / grid.ticks_per_beat.max(1)) as usize;
        if let Some(beat) = beats.iter().find(|&&b| b >= limit) {
            bail!("triplet beat {beat} is past the last beat ({})", limit.saturating_sub(1));
        }

        let mut modes = self.editor.beat_modes(&self.tokens());
        for &beat in beats {
            if modes.len() <= beat {
                modes.resize(beat + 1, BeatMode::Straight);
            }
            modes[beat] = BeatMode::Triplet;
        }
        tracing::debug!(?modes, "beat modes locked");
        self.editor = self.editor.with_beat_modes(modes)?;
        Ok(self)
    }

    pub fn tokens(&self) -> Vec<Token> {
        self.editor.tokenize(&self.session.bar_text)
    }

    /// Splice an edited bar into the document, then print or save it.
    pub fn commit(mut self, config: &GridConfig, outcome: EditOutcome, output: Output) -> Result<()> {
        let (replacement, next) =
            self.session
                .prepare_edit(&self.text, &outcome.text, config.write_options());
        replacement
            .apply(&mut self.text)
            .context("splicing the edited bar")?;
        tracing::debug!(path = ?outcome.path, bar = %next.bar_text, "bar rewritten");

        if output.write {
            write_atomic(&self.path, &self.text)
        } else {
            print!("{}", self.text);
            Ok(())
        }
    }
}

pub fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Write through a temp file in the same directory, then rename over `path`.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating a temp file in {}", dir.display()))?;
    file.write_all(contents.as_bytes())
        .context("writing the edited document")?;
    file.persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
