//! Runs the tracking pipeline over a synthetic scene of moving boxes.

use std::convert::Infallible;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trackrelay::{
    Detection, DetectionSource, Frame, FrameOrchestrator, IntoDetections, IouTracker,
    LoggingEventHandler, PipelineConfig, Rect, TrackerConfig, TrackerPipeline,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of synthetic frames to generate
    #[arg(long, default_value_t = 150)]
    frames: u64,

    /// Frame width in pixels
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Frame height in pixels
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Stop after this many frames
    #[arg(long, env = "TRACKRELAY_MAX_FRAMES")]
    max_frames: Option<u64>,

    /// Log the open targets of every frame
    #[arg(long)]
    visualize: bool,

    /// Do not write annotated frames
    #[arg(long)]
    no_save_output: bool,

    /// Write per-frame JSON records to tracks.jsonl
    #[arg(long)]
    track_log: bool,

    /// Directory for annotated frames and the track log
    #[arg(
        long,
        env = "TRACKRELAY_OUTPUT_DIR",
        default_value_os_t = PipelineConfig::default().output_dir
    )]
    output_dir: PathBuf,

    /// Log every created / associated / closed event
    #[arg(long)]
    log_events: bool,

    /// Maximum IoU distance for an association
    #[arg(long, default_value_t = 0.7)]
    match_thresh: f32,

    /// Minimum score for a detection to open a target
    #[arg(long, default_value_t = 0.5)]
    min_score: f32,

    /// Unmatched frames tolerated before a target closes
    #[arg(long, default_value_t = 10)]
    max_missed_frames: u32,
}

impl Args {
    fn apply(&self, config: &mut PipelineConfig) {
        config.max_frames = self.max_frames;
        config.output_dir = self.output_dir.clone();
        config.visualize |= self.visualize;
        config.track_log |= self.track_log;
        if self.no_save_output {
            config.save_output = false;
        }
    }
}

/// An object that moves linearly while it is in view.
struct ScriptedObject {
    first_frame: u64,
    last_frame: u64,
    origin: Rect,
    velocity: (f32, f32),
    score: f32,
    /// Skip every n-th frame to simulate a missed detection
    dropout_every: Option<u64>,
}

impl ScriptedObject {
    fn observe(&self, frame_index: u64) -> Option<(Rect, f32)> {
        if frame_index < self.first_frame || frame_index > self.last_frame {
            return None;
        }
        if self
            .dropout_every
            .is_some_and(|n| frame_index % n == n - 1)
        {
            return None;
        }
        let dt = (frame_index - self.first_frame) as f32;
        let bbox = self
            .origin
            .translate(self.velocity.0 * dt, self.velocity.1 * dt);
        Some((bbox, self.score))
    }
}

/// Detector that replays a fixed scene.
struct ScriptedDetector {
    objects: Vec<ScriptedObject>,
}

impl ScriptedDetector {
    fn demo_scene() -> Self {
        Self {
            objects: vec![
                ScriptedObject {
                    first_frame: 0,
                    last_frame: u64::MAX,
                    origin: Rect::new(40.0, 60.0, 60.0, 120.0),
                    velocity: (2.0, 0.5),
                    score: 0.9,
                    dropout_every: None,
                },
                ScriptedObject {
                    first_frame: 20,
                    last_frame: 90,
                    origin: Rect::new(400.0, 200.0, 50.0, 100.0),
                    velocity: (-1.5, 0.0),
                    score: 0.8,
                    dropout_every: Some(7),
                },
                ScriptedObject {
                    first_frame: 60,
                    last_frame: u64::MAX,
                    origin: Rect::new(250.0, 50.0, 40.0, 80.0),
                    velocity: (0.0, 1.5),
                    score: 0.85,
                    dropout_every: None,
                },
                // low-confidence clutter, never opens a target
                ScriptedObject {
                    first_frame: 0,
                    last_frame: u64::MAX,
                    origin: Rect::new(560.0, 400.0, 30.0, 30.0),
                    velocity: (0.0, 0.0),
                    score: 0.3,
                    dropout_every: Some(3),
                },
            ],
        }
    }
}

impl DetectionSource for ScriptedDetector {
    type Error = Infallible;

    fn detect(&mut self, _frame: &Frame, frame_index: u64) -> Result<Vec<Detection>, Self::Error> {
        let raw: Vec<(Rect, f32)> = self
            .objects
            .iter()
            .filter_map(|object| object.observe(frame_index))
            .collect();
        Ok(raw.into_detections(frame_index))
    }
}

fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = PipelineConfig::from_env();
    args.apply(&mut config);
    let sinks = config.build_sinks().context("creating output sinks")?;

    let tracker = IouTracker::new(TrackerConfig {
        match_thresh: args.match_thresh,
        min_score: args.min_score,
        max_missed_frames: args.max_missed_frames,
    });
    let mut orchestrator = FrameOrchestrator::new(tracker);
    if args.log_events {
        orchestrator.add_event_handler(Box::new(LoggingEventHandler));
    }

    let mut pipeline = TrackerPipeline::with_orchestrator(ScriptedDetector::demo_scene(), orchestrator)
        .with_sinks(sinks)
        .with_max_frames(config.max_frames);

    let (width, height) = (args.width, args.height);
    let frames = (0..args.frames).map(|_| Frame::blank(width, height));
    let summary = pipeline.run(frames).context("tracking run failed")?;

    if let Some(final_targets) = pipeline.orchestrator_mut().take_final_targets() {
        for target in final_targets.values() {
            info!(
                target_id = %target.id,
                first_frame = target.first_frame,
                last_frame = target.last_frame,
                "target open at end of sequence"
            );
        }
    }

    info!(
        frames = summary.frames_processed,
        created = summary.targets_created,
        associations = summary.associations,
        closed = summary.targets_closed,
        sink_failures = summary.sink_failures,
        "done"
    );
    Ok(())
}
