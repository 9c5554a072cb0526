//! SynthScan CLI
//!
//! Estimates whether an image was synthetically generated, from its metadata
//! and, when the metadata is not conclusive, an image classifier.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use synthscan_analyzers::pixels::encoded_dimensions;
use synthscan_analyzers::{
    CandleVitProvider, Dispatcher, FusionPipeline, HeuristicBreakdown, HeuristicScorer,
    ModelInferenceAdapter,
};
use synthscan_core::{keys, AnalysisResult, EncodedImage, MetadataRecord};
use tracing::{debug, info, warn};

mod config;

use config::{ConfigSummary, Overrides};

/// Exit code when no registered analyzer handles the request
const EXIT_UNHANDLED: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "synthscan")]
#[command(about = "Synthetic media detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse an image with the heuristic and the classifier
    Analyze(AnalyzeArgs),

    /// Score metadata with the heuristic only
    Heuristic(HeuristicArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Image file to analyse
    image: PathBuf,

    /// JSON metadata sidecar
    #[arg(short, long)]
    metadata: Option<PathBuf>,

    /// Analyzer configuration file
    #[arg(short, long, env = "SYNTHSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Model weights (safetensors), overriding the configured source
    #[arg(long, env = "SYNTHSCAN_MODEL")]
    model: Option<PathBuf>,

    /// ViT configuration JSON for the model
    #[arg(long)]
    model_config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct HeuristicArgs {
    /// JSON metadata sidecar
    #[arg(short, long)]
    metadata: Option<PathBuf>,
}

/// JSON report printed by `analyze`
#[derive(Debug, Serialize)]
struct AnalysisReport {
    image: String,
    #[serde(flatten)]
    result: AnalysisResult,
    heuristic: HeuristicBreakdown,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match cli.command {
        Command::Analyze(args) => analyze(args).await,
        Command::Heuristic(args) => heuristic(args),
    }
}

async fn analyze(args: AnalyzeArgs) -> Result<ExitCode> {
    let overrides = Overrides {
        model: args.model.clone(),
        model_config: args.model_config.clone(),
    };
    let config = config::load(args.config.as_deref(), &overrides)?;
    debug!("Configuration: {}", serde_json::to_string(&ConfigSummary::from(&config))?);

    let model_config = config
        .model_config()
        .context("no model configured (pass --model or set `model` in the config file)")?;

    // A missing artifact stops here rather than on first inference
    let provider = CandleVitProvider::new(model_config.clone())?;
    let adapter = ModelInferenceAdapter::new(provider)
        .with_output_name(model_config.output_name.clone())
        .with_input_size(model_config.input_size, model_config.input_size);

    let pipeline = FusionPipeline::image(Arc::new(adapter)).with_params(config.fusion_params())?;
    let dispatcher = Dispatcher::builder().strategy(pipeline).build();

    let media = EncodedImage::from_file(&args.image)
        .with_context(|| format!("reading image {}", args.image.display()))?;
    let mut metadata = config::load_metadata(args.metadata.as_deref())?;
    fill_dimensions(&mut metadata, &media);

    info!("Analysing {}", args.image.display());
    let Some(result) = dispatcher.analyze_image(&media, &metadata).await else {
        warn!("No analyzer applies to {}", args.image.display());
        return Ok(ExitCode::from(EXIT_UNHANDLED));
    };

    let report = AnalysisReport {
        image: args.image.display().to_string(),
        result,
        heuristic: HeuristicScorer::evaluate(&metadata),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(ExitCode::SUCCESS)
}

fn heuristic(args: HeuristicArgs) -> Result<ExitCode> {
    let metadata = config::load_metadata(args.metadata.as_deref())?;
    let breakdown = HeuristicScorer::evaluate(&metadata);
    println!("{}", serde_json::to_string_pretty(&breakdown)?);
    Ok(ExitCode::SUCCESS)
}

/// Take pixel dimensions from the image header when the sidecar lacks them
fn fill_dimensions(metadata: &mut MetadataRecord, media: &EncodedImage) {
    if metadata.contains(keys::PIXEL_WIDTH) && metadata.contains(keys::PIXEL_HEIGHT) {
        return;
    }

    match encoded_dimensions(media) {
        Ok((width, height)) => {
            if !metadata.contains(keys::PIXEL_WIDTH) {
                metadata.insert(keys::PIXEL_WIDTH, width);
            }
            if !metadata.contains(keys::PIXEL_HEIGHT) {
                metadata.insert(keys::PIXEL_HEIGHT, height);
            }
        }
        Err(e) => debug!("Could not read image dimensions: {}", e),
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("synthscan=debug,synthscan_analyzers=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("synthscan=info,synthscan_analyzers=info"))
    };

    // Logs go to stderr so stdout carries only the JSON report
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
