//! Tracking lifecycle events and the listener contract trackers notify through.

use tracing::info;

use crate::tracker::detection::Detection;
use crate::tracker::target::TrackTarget;

/// A lifecycle notification about a target, borrowed for the duration of the
/// notifying call.
#[derive(Debug, Clone, Copy)]
pub enum TrackingEvent<'a> {
    /// A new target was opened from this detection.
    Created {
        detection: &'a Detection,
        target: &'a TrackTarget,
    },
    /// An existing target was matched to this detection.
    Associated {
        detection: &'a Detection,
        target: &'a TrackTarget,
    },
    /// The target was closed and left the open registry.
    Closed { target: &'a TrackTarget },
}

impl<'a> TrackingEvent<'a> {
    pub fn target(&self) -> &'a TrackTarget {
        match *self {
            Self::Created { target, .. }
            | Self::Associated { target, .. }
            | Self::Closed { target } => target,
        }
    }

    /// The detection behind the event; `None` for closures.
    pub fn detection(&self) -> Option<&'a Detection> {
        match *self {
            Self::Created { detection, .. } | Self::Associated { detection, .. } => {
                Some(detection)
            }
            Self::Closed { .. } => None,
        }
    }
}

/// Status returned by a handler to the notifying tracker.
///
/// Only `Continue` exists today; further variants are reserved for
/// tracker-directed control such as suppressing default behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum HandlerResponse {
    /// Event handled, no special action requested.
    #[default]
    Continue,
}

/// Listener for tracking lifecycle events.
///
/// A tracker must call these synchronously, once per decision, from inside
/// the `begin_track` / `track` / `finish_track` call that made it.
pub trait TrackingEventHandler {
    fn on_target_created(
        &mut self,
        detection: &Detection,
        target: &TrackTarget,
    ) -> HandlerResponse;

    fn on_target_associated(
        &mut self,
        detection: &Detection,
        target: &TrackTarget,
    ) -> HandlerResponse;

    fn on_target_closed(&mut self, target: &TrackTarget) -> HandlerResponse;

    /// Dispatch a tagged event to the matching entry point.
    fn notify(&mut self, event: TrackingEvent<'_>) -> HandlerResponse {
        match event {
            TrackingEvent::Created { detection, target } => {
                self.on_target_created(detection, target)
            }
            TrackingEvent::Associated { detection, target } => {
                self.on_target_associated(detection, target)
            }
            TrackingEvent::Closed { target } => self.on_target_closed(target),
        }
    }
}

impl<H: TrackingEventHandler + ?Sized> TrackingEventHandler for Box<H> {
    fn on_target_created(
        &mut self,
        detection: &Detection,
        target: &TrackTarget,
    ) -> HandlerResponse {
        (**self).on_target_created(detection, target)
    }

    fn on_target_associated(
        &mut self,
        detection: &Detection,
        target: &TrackTarget,
    ) -> HandlerResponse {
        (**self).on_target_associated(detection, target)
    }

    fn on_target_closed(&mut self, target: &TrackTarget) -> HandlerResponse {
        (**self).on_target_closed(target)
    }
}

/// Handler that logs every event at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventHandler;

impl TrackingEventHandler for LoggingEventHandler {
    fn on_target_created(
        &mut self,
        detection: &Detection,
        target: &TrackTarget,
    ) -> HandlerResponse {
        info!(det_id = %detection.id(), target_id = %target.id, "target created");
        HandlerResponse::Continue
    }

    fn on_target_associated(
        &mut self,
        detection: &Detection,
        target: &TrackTarget,
    ) -> HandlerResponse {
        info!(det_id = %detection.id(), target_id = %target.id, "target association");
        HandlerResponse::Continue
    }

    fn on_target_closed(&mut self, target: &TrackTarget) -> HandlerResponse {
        info!(target_id = %target.id, "target closed");
        HandlerResponse::Continue
    }
}
