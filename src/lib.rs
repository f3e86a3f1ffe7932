//! Frame-sequential multi-object tracking orchestration.
//!
//! Detections for each frame are handed to a [`Tracker`]; the lifecycle
//! events it emits (target created, associated, closed) are collected per
//! frame and the open targets are forwarded to presentation and persistence
//! sinks.
//!
//! ```ignore
//! use trackrelay::{Frame, IouTracker, TrackerPipeline};
//!
//! let mut pipeline = TrackerPipeline::new(my_detector, IouTracker::default());
//! let summary = pipeline.run(frames)?;
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod integration;
pub mod tracker;

pub use config::PipelineConfig;
pub use error::{FrameError, InvalidStateReason, LifecycleCall, OrchestratorError, SinkError};
pub use frame::Frame;
pub use integration::{
    AnnotatedFrameWriter, CancelToken, DetectionBuilder, DetectionSource, EventCollector,
    FinishReport, FrameOrchestrator, FrameOutput, FrameSink, FrameStats, IntoDetections,
    OrchestratorState, RunSummary, SinkSet, StepOutput, SummarySink, TrackLogWriter,
    TrackerPipeline,
};
pub use tracker::{
    Detection, DetectionId, HandlerResponse, IouTracker, IouTrackerError, LoggingEventHandler,
    OpenTargets, Rect, TargetId, TargetStatus, TrackTarget, Tracker, TrackerConfig,
    TrackingEvent, TrackingEventHandler,
};
