//! Integration module for connecting detectors, trackers and sinks.
//!
//! The [`FrameOrchestrator`] drives a [`Tracker`](crate::Tracker) through its
//! frame protocol and aggregates its events; [`TrackerPipeline`] wraps it
//! with a [`DetectionSource`] and a set of [`FrameSink`]s.

mod annotate;
mod builder;
mod collector;
mod detector;
mod orchestrator;
mod pipeline;
mod sink;
mod track_log;

pub use annotate::{AnnotatedFrameWriter, annotate, target_color};
pub use builder::DetectionBuilder;
pub use collector::EventCollector;
pub use detector::{DetectionSource, IntoDetections};
pub use orchestrator::{FinishReport, FrameOrchestrator, OrchestratorState, StepOutput};
pub use pipeline::{CancelToken, FrameStats, RunSummary, TrackerPipeline};
pub use sink::{FrameOutput, FrameSink, SinkSet, SummarySink};
pub use track_log::{TRACK_LOG_FILE, TrackLogWriter};
