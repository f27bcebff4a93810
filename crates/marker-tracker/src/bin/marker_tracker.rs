use std::{error::Error, path::PathBuf};

use clap::{Parser, Subcommand};
#[cfg(not(feature = "tracing"))]
use log::LevelFilter;
#[cfg(feature = "tracing")]
use marker_tracker::core::init_tracing;
#[cfg(not(feature = "tracing"))]
use marker_tracker::core::init_with_level;
use marker_tracker::core::{
    load_camera_file, DetectedMarker, FrameView, GlMatrix, DEFAULT_FAR_CLIP, DEFAULT_NEAR_CLIP,
};
use marker_tracker::{
    DetectionEngine, DetectionEngineError, LogSink, PatternGeometry, PatternLoader, PatternStore,
    TrackerConfig, TrackingSession,
};
use serde::Serialize;

/// Inspect tracker calibration, pattern and configuration files.
#[derive(Debug, Parser)]
#[command(author, version, about = "Marker tracker file inspection")]
struct Args {
    /// Log at debug level, or emit JSON events with the `tracing` feature.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a camera file and print the model with its rendering projection.
    Camera {
        path: PathBuf,
        #[arg(long, default_value_t = DEFAULT_NEAR_CLIP)]
        near: f64,
        #[arg(long, default_value_t = DEFAULT_FAR_CLIP)]
        far: f64,
    },
    /// Parse a pattern file and report the id it would be stored under.
    Pattern {
        path: PathBuf,
        #[arg(long, default_value_t = 16)]
        width: usize,
        #[arg(long, default_value_t = 16)]
        height: usize,
    },
    /// Initialize a session from a JSON tracker config.
    Config { path: PathBuf },
}

#[derive(Serialize)]
struct CameraReport {
    camera: marker_tracker::core::CameraModel,
    gl_projection: GlMatrix,
}

#[derive(Serialize)]
struct SessionReport {
    patterns: Vec<i32>,
    threshold: u8,
    marker_width: f64,
    gl_projection: Option<GlMatrix>,
}

// Stands in for a detector when only initialization is exercised.
struct IdleEngine;

impl DetectionEngine for IdleEngine {
    fn detect_markers(
        &mut self,
        _frame: &FrameView<'_>,
        _threshold: u8,
        _markers: &mut Vec<DetectedMarker>,
    ) -> Result<(), DetectionEngineError> {
        Ok(())
    }
}

fn run(command: Command) -> Result<String, Box<dyn Error>> {
    let json = match command {
        Command::Camera { path, near, far } => {
            let camera = load_camera_file(&path, near, far)?;
            let report = CameraReport {
                gl_projection: camera.gl_projection(),
                camera,
            };
            serde_json::to_string_pretty(&report)?
        }
        Command::Pattern {
            path,
            width,
            height,
        } => {
            let mut store = PatternStore::new(PatternGeometry {
                width,
                height,
                max_patterns: 1,
            });
            let id = store.load_pattern(&path)?;
            let report = serde_json::json!({ "id": id, "width": width, "height": height });
            serde_json::to_string_pretty(&report)?
        }
        Command::Config { path } => {
            let config = TrackerConfig::load_json(&path)?;
            let mut session =
                TrackingSession::new(IdleEngine, config.params.clone()).with_sink(LogSink);
            let patterns = config.initialize(&mut session)?;
            let report = SessionReport {
                patterns,
                threshold: session.threshold(),
                marker_width: session.marker_width(),
                gl_projection: session.gl_projection(),
            };
            serde_json::to_string_pretty(&report)?
        }
    };
    Ok(json)
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: bool) -> Result<(), Box<dyn Error>> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    init_with_level(level)?;
    Ok(())
}

// RUST_LOG drives the subscriber; `--verbose` switches to JSON events.
#[cfg(feature = "tracing")]
fn init_logging(verbose: bool) -> Result<(), Box<dyn Error>> {
    init_tracing(verbose);
    Ok(())
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose)?;
    println!("{}", run(args.command)?);
    Ok(())
}
