//! gridctl - drive the abcgrid bar editor from the command line
//!
//! Subcommands:
//! - `gridctl locate <file> --cursor N` - Show the bar around a cursor
//! - `gridctl tokens <file> --cursor N` - Tokenize that bar
//! - `gridctl grid <file> --cursor N` - Project the bar onto the tick grid
//! - `gridctl toggle|set-state|chord` - Edit one tick and write the bar back
//! - `gridctl shift` - Degree-shift an ABC fragment
//! - `gridctl percmap <file>` - List `%%percmap` entries
//! - `gridctl config` - Print the effective configuration

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gridconf::GridConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod document;

#[derive(Parser)]
#[command(name = "gridctl")]
#[command(about = "Step-grid editing for ABC notation")]
#[command(version)]
struct Cli {
    /// Config file used in place of ./abcgrid.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// A document and a cursor inside it
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// ABC file
    pub file: PathBuf,

    /// Byte offset of the cursor
    #[arg(long, default_value = "0")]
    pub cursor: usize,
}

#[derive(Args, Debug, Clone)]
pub struct Output {
    /// Replace the file instead of printing the new document
    #[arg(long)]
    pub write: bool,

    /// Beats (from 0) to edit as triplets, e.g. `0,2`
    #[arg(long, value_delimiter = ',')]
    pub triplet_beats: Vec<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the bar around the cursor
    Locate {
        #[command(flatten)]
        target: Target,
    },

    /// Tokenize the bar around the cursor as JSON
    Tokens {
        #[command(flatten)]
        target: Target,
    },

    /// Project the bar onto the tick grid
    Grid {
        #[command(flatten)]
        target: Target,

        /// Show one drum group's states instead of the pitches at each tick
        #[arg(long)]
        instrument: Option<String>,
    },

    /// Add or remove a pitch at a tick
    Toggle {
        #[command(flatten)]
        target: Target,

        #[arg(long)]
        tick: u32,

        /// ABC pitch, e.g. `^F,`
        #[arg(long)]
        pitch: String,

        #[command(flatten)]
        output: Output,
    },

    /// Set a drum group's state at a tick
    SetState {
        #[command(flatten)]
        target: Target,

        #[arg(long)]
        tick: u32,

        /// Drum group id from the kit
        #[arg(long)]
        instrument: String,

        /// base, alt[:i], decoration[:i], flam or none
        #[arg(long)]
        state: String,

        #[command(flatten)]
        output: Output,
    },

    /// Insert the triad on a scale degree at a tick
    Chord {
        #[command(flatten)]
        target: Target,

        #[arg(long)]
        tick: u32,

        /// Key, e.g. `G`, `Am`, `D dor`
        #[arg(long)]
        key: String,

        /// Scale degree, 1 to 7
        #[arg(long)]
        degree: u8,

        /// Octave offset from the middle octave
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        octave: i8,

        #[command(flatten)]
        output: Output,
    },

    /// Shift every pitch of an ABC fragment by scale steps
    Shift {
        #[arg(long, allow_hyphen_values = true)]
        steps: i32,

        #[arg(long)]
        key: String,

        /// ABC fragment
        fragment: String,
    },

    /// List the %%percmap entries of a document
    Percmap {
        /// ABC file
        file: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

fn init_tracing(config: &GridConfig, verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = GridConfig::load_with_sources_from(cli.config.as_deref())
        .context("loading configuration")?;
    init_tracing(&config, cli.verbose);
    tracing::debug!(files = ?sources.files, env = ?sources.env_overrides, "configuration loaded");

    match cli.command {
        Commands::Locate { target } => commands::locate(&target),
        Commands::Tokens { target } => commands::tokens(&config, &target),
        Commands::Grid { target, instrument } => {
            commands::grid(&config, &target, instrument.as_deref())
        }
        Commands::Toggle {
            target,
            tick,
            pitch,
            output,
        } => commands::toggle(&config, &target, tick, &pitch, output),
        Commands::SetState {
            target,
            tick,
            instrument,
            state,
            output,
        } => commands::set_state(&config, &target, tick, &instrument, &state, output),
        Commands::Chord {
            target,
            tick,
            key,
            degree,
            octave,
            output,
        } => commands::chord(&config, &target, tick, &key, degree, octave, output),
        Commands::Shift {
            steps,
            key,
            fragment,
        } => commands::shift(steps, &key, &fragment),
        Commands::Percmap { file } => commands::percmap(&file),
        Commands::Config => commands::config(&config, &sources),
    }
}
