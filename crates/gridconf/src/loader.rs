//! Config file discovery, loading, and environment variable overlay.

use crate::settings::parse_note_fill;
use crate::{ConfigError, GridConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// An explicit `cli_path` replaces the local `./abcgrid.toml` and is
/// returned even when missing, so loading reports it.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/abcgrid/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("abcgrid/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        files.push(path.to_path_buf());
        return files;
    }

    let local = PathBuf::from("abcgrid.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read one config file as a raw table, checking it deserializes on its own.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_table(&contents, path)
}

fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    // surface type errors against the file that caused them
    GridConfig::from_table(table.clone()).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(table)
}

/// Merge `overlay` into `base`. Nested tables merge key by key; any other
/// value, arrays included, replaces what was there.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut GridConfig, sources: &mut ConfigSources) {
    apply_env_overrides_from(config, sources, |name| env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// `ABCGRID_LOG` wins over `RUST_LOG` when both are set. Values that do not
/// parse are ignored.
pub fn apply_env_overrides_from(
    config: &mut GridConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("ABCGRID_TICKS_PER_BEAT") {
        if let Ok(ticks) = v.trim().parse::<u32>() {
            if ticks > 0 {
                config.grid.ticks_per_beat = ticks;
                sources.env_overrides.push("ABCGRID_TICKS_PER_BEAT".to_string());
            }
        }
    }
    if let Some(v) = lookup("ABCGRID_NOTE_FILL") {
        if let Some(fill) = parse_note_fill(&v) {
            config.grid.note_fill = fill;
            sources.env_overrides.push("ABCGRID_NOTE_FILL".to_string());
        }
    }

    for name in ["RUST_LOG", "ABCGRID_LOG"] {
        if let Some(v) = lookup(name).filter(|v| !v.trim().is_empty()) {
            config.logging.level = v;
            sources.env_overrides.push(name.to_string());
        }
    }
}
