//! TrackerPipeline for combining detection, tracking and presentation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::error::OrchestratorError;
use crate::frame::Frame;
use crate::integration::orchestrator::{FinishReport, FrameOrchestrator};
use crate::integration::sink::{FrameOutput, FrameSink, SinkSet};
use crate::tracker::Tracker;

use super::DetectionSource;

/// Shared flag asking a running pipeline to stop at the next frame boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-frame counts returned by [`TrackerPipeline::process_frame`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub detections: usize,
    pub created: usize,
    pub associated: usize,
    pub closed: usize,
    pub open_targets: usize,
    pub sink_failures: usize,
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub targets_created: usize,
    pub associations: usize,
    /// Closures during frames plus those forced by `finish`
    pub targets_closed: usize,
    pub sink_failures: usize,
    /// The cancel token stopped the run early
    pub cancelled: bool,
    /// `None` when no frame was processed
    pub finish: Option<FinishReport>,
}

impl RunSummary {
    fn absorb(&mut self, stats: FrameStats) {
        self.frames_processed += 1;
        self.targets_created += stats.created;
        self.associations += stats.associated;
        self.targets_closed += stats.closed;
        self.sink_failures += stats.sink_failures;
    }
}

/// Bundles a detector, a [`FrameOrchestrator`] and a set of sinks.
///
/// Frames are handled strictly one at a time: detect, step the tracker,
/// then present to every sink. Detector and tracker failures stop the run;
/// sink failures are logged and the run continues.
pub struct TrackerPipeline<D: DetectionSource, T: Tracker> {
    detector: D,
    orchestrator: FrameOrchestrator<T>,
    sinks: SinkSet,
    max_frames: Option<u64>,
    cancel: CancelToken,
}

impl<D: DetectionSource, T: Tracker> TrackerPipeline<D, T> {
    /// Create a new tracking pipeline with no sinks and no frame bound.
    pub fn new(detector: D, tracker: T) -> Self {
        Self::with_orchestrator(detector, FrameOrchestrator::new(tracker))
    }

    /// Use a preconfigured orchestrator, e.g. one with extra event handlers.
    pub fn with_orchestrator(detector: D, orchestrator: FrameOrchestrator<T>) -> Self {
        Self {
            detector,
            orchestrator,
            sinks: SinkSet::new(),
            max_frames: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_sinks(mut self, sinks: SinkSet) -> Self {
        self.sinks = sinks;
        self
    }

    /// Stop after `max_frames` frames; `None` runs until the source ends.
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that stops [`run`](Self::run) at the next frame boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Detect, track and present a single frame.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        frame_index: u64,
    ) -> Result<FrameStats, OrchestratorError> {
        self.orchestrator.ensure_can_step(frame_index)?;
        let detections = self
            .detector
            .detect(frame, frame_index)
            .map_err(|source| OrchestratorError::Detector {
                frame_index,
                source: Box::new(source),
            })?;

        let step = self.orchestrator.step(frame, &detections, frame_index)?;
        let output = FrameOutput {
            frame,
            frame_index,
            detections: step.detections,
            open_targets: step.open_targets,
        };
        let sink_failures = self.sinks.present_all(&output);

        Ok(FrameStats {
            detections: step.detections.len(),
            created: step.events.created().len(),
            associated: step.events.associated().len(),
            closed: step.events.closed().len(),
            open_targets: step.open_targets.len(),
            sink_failures,
        })
    }

    /// Run a whole sequence, numbering frames from 0, then finish tracking.
    ///
    /// Stops early when `max_frames` is reached or the cancel token is raised;
    /// both are checked between frames, before the next one is pulled from
    /// `frames`. `finish` is called once if at
    /// least one frame was processed.
    pub fn run<I>(&mut self, frames: I) -> Result<RunSummary, OrchestratorError>
    where
        I: IntoIterator<Item = Frame>,
    {
        let mut summary = RunSummary::default();
        let mut frames = frames.into_iter();
        let mut frame_index = 0u64;

        loop {
            if self.max_frames.is_some_and(|max| frame_index >= max) {
                info!(max_frames = frame_index, "frame bound reached");
                break;
            }
            if self.cancel.is_cancelled() {
                info!(frame_index, "run cancelled");
                summary.cancelled = true;
                break;
            }
            // Pull from the source only once the bound and the token allow it
            let Some(frame) = frames.next() else {
                break;
            };
            let stats = self.process_frame(&frame, frame_index)?;
            summary.absorb(stats);
            frame_index += 1;
        }

        if summary.frames_processed > 0 {
            let report = self.orchestrator.finish()?;
            summary.targets_closed += report.closed.len();
            summary.finish = Some(report);
        }

        info!(
            frames = summary.frames_processed,
            created = summary.targets_created,
            closed = summary.targets_closed,
            sink_failures = summary.sink_failures,
            "run complete"
        );
        Ok(summary)
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    pub fn orchestrator(&self) -> &FrameOrchestrator<T> {
        &self.orchestrator
    }

    /// Mutable access, e.g. to call `take_final_targets` after a run.
    pub fn orchestrator_mut(&mut self) -> &mut FrameOrchestrator<T> {
        &mut self.orchestrator
    }
}
