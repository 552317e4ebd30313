//! frameforge CLI entrypoint.
//!
//! ```bash
//! frameforge run photo.png clip.mkv --scale 4 --interpolate 2
//! frameforge estimate clip.mkv
//! frameforge models
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use forge_core::catalog::ModelCatalog;
use forge_core::codec::FfmpegCodec;
use forge_core::config::{ConfigManager, EnhanceConfig, Settings};
use forge_core::estimate::{CostEstimator, Predictor};
use forge_core::models::{
    InterpolationFactor, MediaItem, ScaleFactor,
};
use forge_core::pipeline::{BatchSummary, Coordinator, ItemOutcome};

const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "webp", "bmp", "tif", "tiff"];

#[derive(Parser, Debug)]
#[command(
    name = "frameforge",
    version,
    about = "Upscale images and videos with external model tools",
    arg_required_else_help = true
)]
struct Cli {
    /// Path to the config file (default: platform config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enhance a batch of images and videos.
    Run(BatchArgs),
    /// Print an advisory time/size estimate for a batch.
    Estimate(BatchArgs),
    /// List known models and their install status.
    Models,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Input files (images and videos, freely mixed).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory (default: from config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Spatial model to use.
    #[arg(long)]
    model: Option<String>,

    /// Spatial scale factor (1, 2, or 4).
    #[arg(long)]
    scale: Option<u32>,

    /// Temporal model to use for interpolation.
    #[arg(long)]
    temporal_model: Option<String>,

    /// Frame interpolation factor (1, 2, or 4).
    #[arg(long)]
    interpolate: Option<u32>,

    /// Run one job at a time.
    #[arg(long)]
    no_concurrency: bool,

    /// Worker cap when concurrency is enabled.
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> ExitCode {
    forge_core::logging::init_tracing("forge_core=info,forge_cli=info");

    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Run(args) => run_batch(&settings, &args),
        Commands::Estimate(args) => estimate_batch(&settings, &args),
        Commands::Models => list_models(&settings),
    }
}

fn load_settings(override_path: Option<&Path>) -> Result<Settings, String> {
    let path = match override_path {
        Some(path) => path.to_path_buf(),
        None => dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("frameforge")
            .join("config.toml"),
    };

    let mut manager = ConfigManager::new(path);
    manager
        .load_or_create()
        .map_err(|e| format!("loading config: {}", e))?;
    Ok(manager.settings().clone())
}

fn build_catalog(settings: &Settings) -> Arc<ModelCatalog> {
    let install_dir = (!settings.tools.install_dir.is_empty())
        .then(|| PathBuf::from(&settings.tools.install_dir));
    Arc::new(ModelCatalog::with_default_tools(install_dir.as_deref()))
}

fn build_codec(settings: &Settings) -> Arc<FfmpegCodec> {
    let codec = if settings.tools.ffmpeg.is_empty() && settings.tools.ffprobe.is_empty() {
        FfmpegCodec::new()
    } else {
        let ffmpeg = if settings.tools.ffmpeg.is_empty() {
            "ffmpeg".to_string()
        } else {
            settings.tools.ffmpeg.clone()
        };
        let ffprobe = if settings.tools.ffprobe.is_empty() {
            "ffprobe".to_string()
        } else {
            settings.tools.ffprobe.clone()
        };
        FfmpegCodec::with_executables(ffmpeg, ffprobe)
    };
    Arc::new(codec)
}

fn build_config(settings: &Settings, args: &BatchArgs) -> Result<EnhanceConfig, String> {
    let mut config = settings.to_enhance_config();

    if let Some(model) = &args.model {
        config = config.select_spatial(model.clone());
    }
    if let Some(model) = &args.temporal_model {
        config = config.select_temporal(model.clone());
    }
    if let Some(scale) = args.scale {
        let scale = ScaleFactor::from_multiplier(scale)
            .ok_or_else(|| format!("unsupported scale factor {} (use 1, 2, or 4)", scale))?;
        let mut spatial = config.spatial();
        spatial.scale = scale;
        let model = config.spatial_model.clone();
        config = config.with_spatial_settings(model, spatial);
    }
    if let Some(factor) = args.interpolate {
        let factor = InterpolationFactor::from_multiplier(factor)
            .ok_or_else(|| format!("unsupported interpolation factor {} (use 1, 2, or 4)", factor))?;
        let mut temporal = config.temporal();
        temporal.factor = factor;
        let model = config.temporal_model.clone();
        config = config.with_temporal_settings(model, temporal);
    }

    let mut policy = config.concurrency;
    if args.no_concurrency {
        policy.enabled = false;
    }
    if let Some(workers) = args.workers {
        policy.workers = workers;
    }
    Ok(config.with_concurrency(policy))
}

fn collect_items(args: &BatchArgs, settings: &Settings) -> Vec<MediaItem> {
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.paths.output_folder));

    args.inputs
        .iter()
        .map(|input| {
            let file_name = input
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output"));
            let target = output_dir.join(file_name);
            if is_image(input) {
                MediaItem::image(input, target)
            } else {
                MediaItem::video(input, target)
            }
        })
        .collect()
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn run_batch(settings: &Settings, args: &BatchArgs) -> ExitCode {
    let config = match build_config(settings, args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let items = collect_items(args, settings);
    let total = items.len();

    let coordinator = Coordinator::new(config, build_catalog(settings), build_codec(settings))
        .with_log_dir(&settings.paths.logs_folder)
        .with_progress(|index, phase| {
            tracing::info!("item {}: {}", index, phase);
        });

    let handle = match coordinator.submit(items) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut reports = Vec::with_capacity(total);
    for report in handle.iter() {
        match &report.outcome {
            ItemOutcome::Completed {
                output,
                degraded_frames,
            } => {
                if *degraded_frames > 0 {
                    println!(
                        "done (degraded, {} substituted frame(s)): {} -> {}",
                        degraded_frames,
                        report.input,
                        output.display()
                    );
                } else {
                    println!("done: {} -> {}", report.input, output.display());
                }
            }
            ItemOutcome::Failed(e) => println!("failed: {}: {}", report.input, e),
        }
        reports.push(report);
    }

    let summary = BatchSummary::from_reports(&reports);
    println!(
        "{}/{} completed ({} degraded, {} failed, {} cancelled)",
        summary.completed,
        summary.total(),
        summary.degraded,
        summary.failed,
        summary.cancelled
    );

    if summary.completed > 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn estimate_batch(settings: &Settings, args: &BatchArgs) -> ExitCode {
    let config = match build_config(settings, args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let codec = build_codec(settings);
    let estimator = CostEstimator::new(codec.clone())
        .with_size_model(Arc::new(PixelAreaSize))
        .with_time_model(Arc::new(PixelThroughputTime));

    let coordinator = Coordinator::new(config, build_catalog(settings), codec)
        .with_estimator(Arc::new(estimator));

    let items = collect_items(args, settings);
    println!("{}", coordinator.estimate(&items));
    ExitCode::SUCCESS
}

fn list_models(settings: &Settings) -> ExitCode {
    let catalog = build_catalog(settings);
    for backend in catalog.all() {
        let status = if backend.is_installed() {
            "installed"
        } else {
            "missing"
        };
        println!(
            "{:<12} {:<9} {:<10} {}",
            backend.name(),
            backend.family().to_string(),
            status,
            backend.executable().display()
        );
    }
    ExitCode::SUCCESS
}

/// Rough per-frame PNG size: a few bytes per output pixel.
struct PixelAreaSize;

impl Predictor for PixelAreaSize {
    fn predict(&self, features: &HashMap<String, f64>) -> Option<f64> {
        let width = features.get("width")?;
        let height = features.get("height")?;
        Some(width * height * 2.5)
    }
}

/// Rough wall time from pixel throughput per worker.
struct PixelThroughputTime;

impl Predictor for PixelThroughputTime {
    fn predict(&self, features: &HashMap<String, f64>) -> Option<f64> {
        const PIXELS_PER_SECOND_PER_WORKER: f64 = 1_500_000.0;
        let width = features.get("width")?;
        let height = features.get("height")?;
        let concurrency = features.get("concurrency").copied().unwrap_or(1.0).max(1.0);
        Some(width * height / (PIXELS_PER_SECOND_PER_WORKER * concurrency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_extensions_are_detected() {
        assert!(is_image(Path::new("/in/photo.PNG")));
        assert!(is_image(Path::new("/in/photo.jpeg")));
        assert!(!is_image(Path::new("/in/clip.mkv")));
        assert!(!is_image(Path::new("/in/noext")));
    }

    #[test]
    fn cli_flags_override_settings() {
        let settings = Settings::default();
        let args = BatchArgs {
            inputs: vec![PathBuf::from("a.png")],
            output_dir: None,
            model: Some("waifu2x".to_string()),
            scale: Some(4),
            temporal_model: None,
            interpolate: Some(1),
            no_concurrency: true,
            workers: None,
        };

        let config = build_config(&settings, &args).unwrap();
        assert_eq!(config.spatial_model, "waifu2x");
        assert_eq!(config.spatial().scale, ScaleFactor::X4);
        assert_eq!(config.temporal().factor, InterpolationFactor::X1);
        assert_eq!(config.concurrency.cap(), 1);
    }

    #[test]
    fn bad_scale_is_rejected() {
        let settings = Settings::default();
        let args = BatchArgs {
            inputs: vec![PathBuf::from("a.png")],
            output_dir: None,
            model: None,
            scale: Some(3),
            temporal_model: None,
            interpolate: None,
            no_concurrency: false,
            workers: None,
        };
        assert!(build_config(&settings, &args).is_err());
    }

    #[test]
    fn items_classify_by_extension() {
        let settings = Settings::default();
        let args = BatchArgs {
            inputs: vec![PathBuf::from("a.png"), PathBuf::from("b.mkv")],
            output_dir: Some(PathBuf::from("/out")),
            model: None,
            scale: None,
            temporal_model: None,
            interpolate: None,
            no_concurrency: false,
            workers: None,
        };

        let items = collect_items(&args, &settings);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, forge_core::models::MediaKind::Image);
        assert_eq!(items[1].kind, forge_core::models::MediaKind::Video);
        assert_eq!(items[1].target, PathBuf::from("/out/b.mkv"));
    }
}
