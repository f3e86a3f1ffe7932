//! FrameOrchestrator: drives the begin / track / finish protocol of a tracker.

use tracing::{debug, info};

use crate::error::{InvalidStateReason, LifecycleCall, OrchestratorError};
use crate::frame::Frame;
use crate::integration::collector::EventCollector;
use crate::tracker::{
    Detection, HandlerResponse, OpenTargets, TrackTarget, Tracker, TrackingEventHandler,
};

/// Lifecycle state of a [`FrameOrchestrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrchestratorState {
    /// No frame has been stepped yet.
    #[default]
    NotStarted,
    /// Frames up to and including `last_frame` have been stepped.
    Running { last_frame: u64 },
    /// `finish` completed.
    Finished,
    /// The tracker failed; the run cannot continue.
    Aborted,
}

/// What one `step` produced, valid until the next mutating call.
#[derive(Debug, Clone, Copy)]
pub struct StepOutput<'a> {
    pub frame_index: u64,
    pub detections: &'a [Detection],
    /// Events emitted during this step only
    pub events: &'a EventCollector,
    /// The tracker's open targets after this step
    pub open_targets: &'a OpenTargets,
}

/// Outcome of [`FrameOrchestrator::finish`].
#[derive(Debug, Clone, PartialEq)]
pub struct FinishReport {
    pub last_frame: u64,
    /// Targets closed by the flush, in emission order
    pub closed: Vec<TrackTarget>,
}

/// Forwards each notification to the collector, then to the extra handlers.
struct EventFanout<'a> {
    collector: &'a mut EventCollector,
    handlers: &'a mut [Box<dyn TrackingEventHandler>],
}

impl TrackingEventHandler for EventFanout<'_> {
    fn on_target_created(
        &mut self,
        detection: &Detection,
        target: &TrackTarget,
    ) -> HandlerResponse {
        let response = self.collector.on_target_created(detection, target);
        for handler in self.handlers.iter_mut() {
            handler.on_target_created(detection, target);
        }
        response
    }

    fn on_target_associated(
        &mut self,
        detection: &Detection,
        target: &TrackTarget,
    ) -> HandlerResponse {
        let response = self.collector.on_target_associated(detection, target);
        for handler in self.handlers.iter_mut() {
            handler.on_target_associated(detection, target);
        }
        response
    }

    fn on_target_closed(&mut self, target: &TrackTarget) -> HandlerResponse {
        let response = self.collector.on_target_closed(target);
        for handler in self.handlers.iter_mut() {
            handler.on_target_closed(target);
        }
        response
    }
}

/// Owns a tracker and its event collector and enforces the frame protocol.
///
/// Frame 0 begins tracking, every later frame must follow the previous one
/// by exactly one, and `finish` is called once at the end. The collector is
/// reset before every call into the tracker so that its contents always
/// describe the latest call alone.
pub struct FrameOrchestrator<T: Tracker> {
    tracker: T,
    collector: EventCollector,
    handlers: Vec<Box<dyn TrackingEventHandler>>,
    state: OrchestratorState,
    final_targets: Option<OpenTargets>,
}

impl<T: Tracker> FrameOrchestrator<T> {
    pub fn new(tracker: T) -> Self {
        Self {
            tracker,
            collector: EventCollector::new(),
            handlers: Vec::new(),
            state: OrchestratorState::NotStarted,
            final_targets: None,
        }
    }

    /// Register an additional handler, notified after the collector.
    pub fn add_event_handler(&mut self, handler: Box<dyn TrackingEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn with_event_handler(mut self, handler: Box<dyn TrackingEventHandler>) -> Self {
        self.add_event_handler(handler);
        self
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Events recorded during the most recent `step` or `finish`.
    pub fn events(&self) -> &EventCollector {
        &self.collector
    }

    /// The tracker's current open targets.
    pub fn open_targets(&self) -> &OpenTargets {
        self.tracker.open_targets()
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn into_tracker(self) -> T {
        self.tracker
    }

    /// Process one frame.
    ///
    /// `frame_index` 0 begins tracking; later indices must increase by one.
    /// Any violation is reported as [`OrchestratorError::InvalidState`] and
    /// leaves the orchestrator untouched. A tracker failure aborts the run.
    pub fn step<'a>(
        &'a mut self,
        frame: &Frame,
        detections: &'a [Detection],
        frame_index: u64,
    ) -> Result<StepOutput<'a>, OrchestratorError> {
        let call = LifecycleCall::for_step(frame_index);
        self.ensure_can_step(frame_index)?;

        self.collector.reset();
        let mut events = EventFanout {
            collector: &mut self.collector,
            handlers: &mut self.handlers,
        };
        let result = match call {
            LifecycleCall::BeginTrack => {
                self.tracker
                    .begin_track(frame, detections, frame_index, &mut events)
            }
            _ => self.tracker.track(frame, detections, frame_index, &mut events),
        };
        if let Err(source) = result {
            self.state = OrchestratorState::Aborted;
            return Err(OrchestratorError::Tracker {
                call,
                frame_index: Some(frame_index),
                source: Box::new(source),
            });
        }

        if call == LifecycleCall::BeginTrack {
            info!(width = frame.width(), height = frame.height(), "tracking started");
        }
        self.state = OrchestratorState::Running {
            last_frame: frame_index,
        };
        debug!(
            frame_index,
            detections = detections.len(),
            created = self.collector.created().len(),
            associated = self.collector.associated().len(),
            closed = self.collector.closed().len(),
            open = self.tracker.open_targets().len(),
            "frame tracked"
        );

        Ok(StepOutput {
            frame_index,
            detections,
            events: &self.collector,
            open_targets: self.tracker.open_targets(),
        })
    }

    /// Flush the tracker after the last frame.
    ///
    /// The open targets as they stood before the flush are kept for exactly
    /// one read through [`take_final_targets`](Self::take_final_targets);
    /// closures forced by the flush are readable through [`events`](Self::events).
    pub fn finish(&mut self) -> Result<FinishReport, OrchestratorError> {
        let last_frame = match self.state {
            OrchestratorState::Running { last_frame } => last_frame,
            OrchestratorState::NotStarted => {
                return Err(finish_rejected(InvalidStateReason::NotStarted));
            }
            OrchestratorState::Finished => {
                return Err(finish_rejected(InvalidStateReason::Finished));
            }
            OrchestratorState::Aborted => {
                return Err(finish_rejected(InvalidStateReason::Aborted));
            }
        };

        let final_targets = self.tracker.open_targets().clone();
        self.collector.reset();
        let mut events = EventFanout {
            collector: &mut self.collector,
            handlers: &mut self.handlers,
        };
        if let Err(source) = self.tracker.finish_track(&mut events) {
            self.state = OrchestratorState::Aborted;
            return Err(OrchestratorError::Tracker {
                call: LifecycleCall::FinishTrack,
                frame_index: None,
                source: Box::new(source),
            });
        }

        self.state = OrchestratorState::Finished;
        self.final_targets = Some(final_targets);
        info!(
            last_frame,
            closed = self.collector.closed().len(),
            "tracking finished"
        );

        Ok(FinishReport {
            last_frame,
            closed: self.collector.closed().to_vec(),
        })
    }

    /// The open targets captured by `finish`, handed out once.
    pub fn take_final_targets(&mut self) -> Option<OpenTargets> {
        self.final_targets.take()
    }

    /// Whether `step(.., frame_index)` would be accepted in the current state.
    pub fn ensure_can_step(&self, frame_index: u64) -> Result<(), OrchestratorError> {
        self.check_step(frame_index)
            .map_err(|reason| OrchestratorError::InvalidState {
                call: LifecycleCall::for_step(frame_index),
                frame_index: Some(frame_index),
                reason,
            })
    }

    fn check_step(&self, frame_index: u64) -> Result<(), InvalidStateReason> {
        match self.state {
            OrchestratorState::NotStarted if frame_index == 0 => Ok(()),
            OrchestratorState::NotStarted => Err(InvalidStateReason::NotStarted),
            OrchestratorState::Running { .. } if frame_index == 0 => {
                Err(InvalidStateReason::AlreadyStarted)
            }
            OrchestratorState::Running { last_frame } if frame_index != last_frame + 1 => {
                Err(InvalidStateReason::FrameIndexGap {
                    expected: last_frame + 1,
                    got: frame_index,
                })
            }
            OrchestratorState::Running { .. } => Ok(()),
            OrchestratorState::Finished => Err(InvalidStateReason::Finished),
            OrchestratorState::Aborted => Err(InvalidStateReason::Aborted),
        }
    }
}

fn finish_rejected(reason: InvalidStateReason) -> OrchestratorError {
    OrchestratorError::InvalidState {
        call: LifecycleCall::FinishTrack,
        frame_index: None,
        reason,
    }
}
