//! Per-frame aggregation of tracking events.

use std::collections::BTreeMap;

use tracing::warn;

use crate::tracker::{
    Detection, DetectionId, HandlerResponse, TrackTarget, TrackingEventHandler,
};

/// Collects the events a tracker emits during one lifecycle call.
///
/// The orchestrator resets it before every call into the tracker, so after
/// the call returns the three collections hold exactly that call's events.
/// Recording never rejects an event.
#[derive(Debug, Clone, Default)]
pub struct EventCollector {
    created: BTreeMap<DetectionId, TrackTarget>,
    associated: BTreeMap<DetectionId, TrackTarget>,
    closed: Vec<TrackTarget>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all three collections.
    pub fn reset(&mut self) {
        self.created.clear();
        self.associated.clear();
        self.closed.clear();
    }

    /// Targets created this frame, keyed by the detection that opened them.
    pub fn created(&self) -> &BTreeMap<DetectionId, TrackTarget> {
        &self.created
    }

    /// Targets associated this frame, keyed by the matched detection.
    pub fn associated(&self) -> &BTreeMap<DetectionId, TrackTarget> {
        &self.associated
    }

    /// Targets closed this frame, in emission order.
    pub fn closed(&self) -> &[TrackTarget] {
        &self.closed
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.associated.is_empty() && self.closed.is_empty()
    }

    /// Total number of recorded events.
    pub fn len(&self) -> usize {
        self.created.len() + self.associated.len() + self.closed.len()
    }
}

impl TrackingEventHandler for EventCollector {
    fn on_target_created(
        &mut self,
        detection: &Detection,
        target: &TrackTarget,
    ) -> HandlerResponse {
        if self.associated.contains_key(&detection.id()) {
            warn!(
                det_id = %detection.id(),
                target_id = %target.id,
                "detection both created and associated a target"
            );
        }
        self.created.insert(detection.id(), target.clone());
        HandlerResponse::Continue
    }

    fn on_target_associated(
        &mut self,
        detection: &Detection,
        target: &TrackTarget,
    ) -> HandlerResponse {
        if self.created.contains_key(&detection.id()) {
            warn!(
                det_id = %detection.id(),
                target_id = %target.id,
                "detection both created and associated a target"
            );
        }
        self.associated.insert(detection.id(), target.clone());
        HandlerResponse::Continue
    }

    fn on_target_closed(&mut self, target: &TrackTarget) -> HandlerResponse {
        self.closed.push(target.clone());
        HandlerResponse::Continue
    }
}
