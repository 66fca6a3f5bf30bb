//! # wall_cli
//!
//! Evaluates a shear wall cyclic test record from the terminal.
//!
//! ```text
//! wall_cli record.csv --preset wood_loaded --length 0.91
//! wall_cli record.csv --delete 3,7 --save w01.swb
//! wall_cli w01.swb --json
//! ```
//!
//! Logging goes to stderr and follows `RUST_LOG` (default `warn`, raised by
//! `-v`/`-vv`).

mod ingest;
mod report;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use tracing_subscriber::EnvFilter;
use wall_core::bundle::SessionBundle;
use wall_core::config::{AnalysisConfig, DeformationBasis, EnvelopeSide, WallPreset};
use wall_core::engine::EngineState;
use wall_core::file_io::{load_bundle, save_bundle, FileLock, BUNDLE_EXTENSION};

#[derive(Parser, Debug)]
#[command(author, version, about = "Shear wall cyclic test evaluation", long_about = None)]
struct Cli {
    /// Two-column record (deformation, load) or a saved .swb bundle
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Load column file; INPUT then holds only the deformation column
    #[arg(long, value_hint = ValueHint::FilePath)]
    loads: Option<PathBuf>,

    /// Specimen name (defaults to the input file stem)
    #[arg(long)]
    name: Option<String>,

    #[command(flatten)]
    overrides: Overrides,

    /// Envelope point indices to delete before evaluating
    #[arg(long, value_delimiter = ',')]
    delete: Vec<usize>,

    /// Save the session as a bundle
    #[arg(long, value_hint = ValueHint::FilePath)]
    save: Option<PathBuf>,

    /// Print the envelope and result as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SideArg {
    Positive,
    Negative,
}

impl From<SideArg> for EnvelopeSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Positive => EnvelopeSide::Positive,
            SideArg::Negative => EnvelopeSide::Negative,
        }
    }
}

/// Configuration flags, applied over the defaults or a bundle's config.
#[derive(clap::Args, Debug, Default)]
struct Overrides {
    /// Wall preset: wood_loaded, wood_tierod, lgs_true, lgs_apparent
    #[arg(long, value_parser = parse_preset)]
    preset: Option<WallPreset>,

    /// Envelope side
    #[arg(long, value_enum)]
    side: Option<SideArg>,

    /// Wall length L (m)
    #[arg(long)]
    length: Option<f64>,

    /// N of the specific deformation 1/N
    #[arg(long)]
    specific: Option<f64>,

    /// N of the ultimate deformation limit 1/N
    #[arg(long)]
    ultimate: Option<f64>,

    #[arg(long)]
    c0: Option<f64>,

    #[arg(long)]
    alpha: Option<f64>,

    /// Read the specific deformation on the reference deformation column
    #[arg(long)]
    reference_basis: bool,
}

impl Overrides {
    /// Preset first, then the individual values on top of it.
    fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(preset) = self.preset {
            config.apply_preset(preset);
        }
        if let Some(side) = self.side {
            config.side = side.into();
        }
        if let Some(length) = self.length {
            config.wall_length = length;
        }
        if let Some(n) = self.specific {
            config.specific_deformation_denominator = n;
        }
        if let Some(n) = self.ultimate {
            config.ultimate_deformation_denominator = n;
        }
        if let Some(c0) = self.c0 {
            config.c0 = c0;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if self.reference_basis {
            config.specific_basis = DeformationBasis::Reference;
        }
    }
}

fn parse_preset(code: &str) -> std::result::Result<WallPreset, String> {
    WallPreset::from_code(code).ok_or_else(|| {
        let known: Vec<&str> = WallPreset::all().iter().map(|p| p.code()).collect();
        format!("unknown preset '{}', expected one of {}", code, known.join(", "))
    })
}

fn is_bundle(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(BUNDLE_EXTENSION)
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Build the session bundle from the input file(s) and flags.
fn load_input(cli: &Cli) -> Result<SessionBundle> {
    let mut bundle = if is_bundle(&cli.input) {
        load_bundle(&cli.input)?
    } else {
        let text = read_text(&cli.input)?;
        let samples = match &cli.loads {
            Some(loads) => ingest::parse_columns(&text, &read_text(loads)?),
            None => ingest::parse_two_column(&text),
        };
        if samples.is_empty() {
            return Err(anyhow!("no numeric (deformation, load) rows in {}", cli.input.display()));
        }
        let stem = cli
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        SessionBundle::new(stem, samples, AnalysisConfig::default())
    };

    let before = bundle.config;
    cli.overrides.apply(&mut bundle.config);
    if bundle.config.side != before.side {
        // an edited envelope belongs to the side it was taken from
        bundle.edited_envelope = None;
    }
    if let Some(name) = &cli.name {
        bundle.meta.specimen_name = name.clone();
    }
    Ok(bundle)
}

fn run(cli: Cli) -> Result<()> {
    let bundle = load_input(&cli)?;
    let specimen = bundle.meta.specimen_name.clone();
    let mut engine: EngineState = bundle.into_engine()?;

    if !cli.delete.is_empty() {
        engine.delete_points(&cli.delete)?;
    }

    if let Some(err) = engine.last_error() {
        return Err(anyhow!("evaluation failed: {}", err));
    }
    let analysis = engine
        .analysis()
        .ok_or_else(|| anyhow!("no analysis was produced"))?;

    if cli.json {
        let record = serde_json::json!({
            "specimen": specimen,
            "config": engine.config(),
            "envelope": engine.envelope(),
            "analysis": analysis,
        });
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print!("{}", report::render(&specimen, engine.config(), analysis));
    }

    if let Some(path) = &cli.save {
        let user = std::env::var("USER").unwrap_or_else(|_| "wall_cli".to_string());
        let _lock = FileLock::acquire(path, user)?;
        save_bundle(&SessionBundle::from_engine(&engine, specimen), path)?;
        eprintln!("saved {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    run(cli)
}
