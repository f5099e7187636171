use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use serde::Serialize;
use tracing::info;

use divebomb::config::ProfileConfig;
use divebomb::detection::detect_dives;
use divebomb::error::InsufficientData;
use divebomb::export::{export_dives, PhaseSegments};
use divebomb::logging::init_tracing;
use divebomb::models::{Episode, Recording};
use divebomb::preprocess::{normalize, read_delimited};
use divebomb::profile::{profile_dives, profile_dives_parallel, ProfileSummary};

#[derive(Parser, Debug)]
#[command(author, version, about = "Dive segmentation for biologging depth recordings", long_about = None)]
struct Cli {
    /// Profiling configuration (TOML)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the detected dive episodes as JSON
    Episodes {
        /// Delimited text recording
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
    },
    /// Print the per-dive phase attributes as JSON
    Profile {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,

        /// Analyze episodes on all cores
        #[arg(long)]
        parallel: bool,
    },
    /// Write one JSON bundle per dive into a directory
    Export {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,

        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out_dir: PathBuf,
    },
}

#[derive(Serialize)]
struct EpisodeRow {
    start: usize,
    end: usize,
    start_time: f64,
    end_time: f64,
}

#[derive(Serialize)]
struct ProfileReport {
    summary: ProfileSummary,
    dives: Vec<DiveRow>,
}

#[derive(Serialize)]
struct DiveRow {
    episode: Episode,
    attributes: BTreeMap<String, Option<f64>>,
    insufficient_reason: Option<InsufficientData>,
    /// Sample counts per phase
    segments: Option<SegmentBounds>,
}

#[derive(Serialize)]
struct SegmentBounds {
    descent: usize,
    bottom: usize,
    ascent: usize,
    surface: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => ProfileConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ProfileConfig::default(),
    };

    match &cli.command {
        Command::Episodes { input } => {
            let recording = load_recording(input, &config)?;
            let episodes = detect_dives(&recording, &config.detection_options())?;
            let samples = recording.samples();
            let rows: Vec<EpisodeRow> = episodes
                .iter()
                .map(|episode| EpisodeRow {
                    start: episode.start,
                    end: episode.end,
                    start_time: samples[episode.start].time,
                    end_time: samples[episode.end.saturating_sub(1).max(episode.start)].time,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Profile { input, parallel } => {
            let recording = load_recording(input, &config)?;
            let dives = if *parallel {
                profile_dives_parallel(&recording, &config)?
            } else {
                profile_dives(&recording, &config)?
            };

            let rows = dives
                .iter()
                .map(|dive| {
                    let samples = recording.episode_samples(&dive.episode);
                    DiveRow {
                        episode: dive.episode,
                        attributes: dive.record.to_flat_map(),
                        insufficient_reason: dive.record.insufficiency(),
                        segments: PhaseSegments::split(samples, &dive.record).map(|s| {
                            SegmentBounds {
                                descent: s.descent.len(),
                                bottom: s.bottom.len(),
                                ascent: s.ascent.len(),
                                surface: s.surface.len(),
                            }
                        }),
                    }
                })
                .collect();
            let report = ProfileReport {
                summary: ProfileSummary::from_dives(&dives),
                dives: rows,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Export { input, out_dir } => {
            let recording = load_recording(input, &config)?;
            let dives = profile_dives(&recording, &config)?;
            fs::create_dir_all(out_dir)
                .with_context(|| format!("failed to create {}", out_dir.display()))?;

            let exports = export_dives(&recording, &dives);
            for export in &exports {
                let path = out_dir.join(export.file_name());
                let json = serde_json::to_string_pretty(export)?;
                fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            info!(dives = exports.len(), out_dir = %out_dir.display(), "export finished");
        }
    }

    Ok(())
}

fn load_recording(path: &Path, config: &ProfileConfig) -> Result<Recording> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let table = read_delimited(&text, config.delimiter)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let recording = normalize(&table, &config.columns, config.time_format.as_deref())?;
    info!(samples = recording.len(), input = %path.display(), "recording loaded");
    Ok(recording)
}
