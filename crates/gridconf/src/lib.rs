//! Layered configuration for the abcgrid step editor.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, tables merge key by key):
//! 1. `/etc/abcgrid/config.toml` (system)
//! 2. `~/.config/abcgrid/config.toml` (user)
//! 3. `./abcgrid.toml` or an explicit `--config` path (local)
//! 4. Environment variables (`ABCGRID_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [grid]
//! ticks_per_beat = 24
//! note_fill = "unit"
//! trailing_barline = true
//! barline_peek = 3
//!
//! [logging]
//! level = "info"
//!
//! [[kit]]
//! id = "kick"
//! label = "Kick"
//! base_midi = 36
//! ```

pub mod loader;
pub mod settings;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use settings::{GridSettings, LoggingConfig};

use abcgrid::{default_kit, DurationModel, InstrumentDef, TickGrid, WriteOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Complete editor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GridConfig {
    #[serde(default)]
    pub grid: GridSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Replaces the built-in drum groups when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kit: Option<Vec<InstrumentDef>>,
}

#[derive(Serialize)]
struct KitSection<'a> {
    kit: &'a [InstrumentDef],
}

impl GridConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with `config_path` standing in for `./abcgrid.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::load_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let mut config = Self::from_table(merged).map_err(|e| ConfigError::Parse {
            path: sources.files.last().cloned().unwrap_or_default(),
            message: e.to_string(),
        })?;

        loader::apply_env_overrides(&mut config, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    pub(crate) fn from_table(table: toml::Table) -> Result<Self, toml::de::Error> {
        toml::Value::Table(table).try_into()
    }

    /// Reject values the editor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.ticks_per_beat == 0 {
            return Err(ConfigError::Invalid(
                "grid.ticks_per_beat must be at least 1".to_string(),
            ));
        }
        if let Some(kit) = &self.kit {
            let mut seen = HashSet::new();
            for def in kit {
                if !seen.insert(def.id.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "kit id '{}' is defined twice",
                        def.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn tick_grid(&self) -> TickGrid {
        TickGrid::new(self.grid.ticks_per_beat)
    }

    /// A duration model on this grid; headers are read per document.
    pub fn duration_model(&self) -> DurationModel {
        DurationModel::new(self.tick_grid()).with_fill(self.grid.note_fill)
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            trailing_barline: self.grid.trailing_barline,
            barline_peek: self.grid.barline_peek,
        }
    }

    /// The configured drum groups, or the built-in catalog.
    pub fn kit(&self) -> Vec<InstrumentDef> {
        self.kit.clone().unwrap_or_else(default_kit)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let mut output = String::new();

        output.push_str("# abcgrid configuration\n\n");

        output.push_str("[grid]\n");
        output.push_str(&format!("ticks_per_beat = {}\n", self.grid.ticks_per_beat));
        output.push_str(&format!(
            "note_fill = \"{}\"\n",
            settings::note_fill_name(self.grid.note_fill)
        ));
        output.push_str(&format!(
            "trailing_barline = {}\n",
            self.grid.trailing_barline
        ));
        output.push_str(&format!("barline_peek = {}\n", self.grid.barline_peek));

        output.push_str("\n[logging]\n");
        output.push_str(&format!(
            "level = {}\n",
            toml::Value::String(self.logging.level.clone())
        ));

        if let Some(kit) = &self.kit {
            output.push('\n');
            output.push_str(&toml::to_string(&KitSection { kit })?);
        }

        Ok(output)
    }
}
