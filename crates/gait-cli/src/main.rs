//! Gait emotion CLI.
//!
//! Reads a clip JSON file, runs the analysis, and prints JSON on stdout.
//! Logs go to stderr.
//!
//! ```text
//! gait-cli predict clip.json --model models/emotion_model.json
//! gait-cli features clip.json --n-joints 17
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gait_core::features::FeatureExtractor;
use gait_core::types::RawClip;
use gait_emotion::{EmotionModel, GaitEmotionAnalyzer, ModelArtifact};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

mod config;

use config::GaitConfig;

#[derive(Parser)]
#[command(name = "gait-cli")]
#[command(version)]
#[command(about = "Emotion analysis from gait keypoint clips")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (TOML, JSON, or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the emotion expressed by a clip
    Predict {
        /// Clip JSON file
        clip: PathBuf,

        /// Model artifact, overriding the configured path
        #[arg(long)]
        model: Option<PathBuf>,

        /// Joints per frame for flat clips
        #[arg(long)]
        n_joints: Option<usize>,
    },
    /// Print the handcrafted feature vector of a clip
    Features {
        /// Clip JSON file
        clip: PathBuf,

        /// Joints per frame for flat clips
        #[arg(long)]
        n_joints: Option<usize>,
    },
}

#[derive(Serialize)]
struct FeatureReport {
    raw_frames: usize,
    features: Vec<f64>,
    named: BTreeMap<&'static str, f64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GaitConfig::from_file(path),
        None => GaitConfig::from_env(),
    }
    .context("Failed to load configuration")?;

    // Setup logging based on verbosity
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Predict {
            clip,
            model,
            n_joints,
        } => predict(&config, &clip, model, n_joints),
        Commands::Features { clip, n_joints } => features(&config, &clip, n_joints),
    }
}

fn load_clip(path: &Path, n_joints: Option<usize>) -> anyhow::Result<RawClip> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read clip {}", path.display()))?;
    let clip = RawClip::from_json(&json)
        .with_context(|| format!("Failed to decode clip {}", path.display()))?;

    Ok(match n_joints {
        Some(n) => clip.with_joint_count(n),
        None => clip,
    })
}

fn predict(
    config: &GaitConfig,
    clip: &Path,
    model: Option<PathBuf>,
    n_joints: Option<usize>,
) -> anyhow::Result<()> {
    let raw = load_clip(clip, n_joints)?;

    let model_path = model.or_else(|| config.model.path.clone());
    let mut model = EmotionModel::from_artifact(ModelArtifact::load(model_path.as_deref()));
    if let Some(rules) = config.model.load_rules()? {
        model = model.with_rules(rules);
    }
    let model = Arc::new(model);
    let analyzer = GaitEmotionAnalyzer::with_config(model, config.extraction_config());

    let analysis = analyzer
        .analyze(&raw)
        .with_context(|| format!("Failed to analyze clip {}", clip.display()))?;

    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

fn features(config: &GaitConfig, clip: &Path, n_joints: Option<usize>) -> anyhow::Result<()> {
    let raw = load_clip(clip, n_joints)?;
    let extractor = FeatureExtractor::new(config.extraction_config());

    let features = extractor
        .extract(&raw)
        .with_context(|| format!("Failed to extract features from {}", clip.display()))?;

    let report = FeatureReport {
        raw_frames: raw.raw_frame_count(),
        features: features.to_vec(),
        named: features.named().into_iter().collect(),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
