//! Minimal IoU tracker implementing the [`Tracker`] contract.
//!
//! Each frame, open targets are greedily matched to detections by box
//! overlap. Unmatched detections with enough confidence open new targets and
//! targets left unmatched for too long are closed. There is no motion model.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::frame::Frame;
use crate::tracker::detection::Detection;
use crate::tracker::engine::{OpenTargets, Tracker};
use crate::tracker::event::TrackingEventHandler;
use crate::tracker::matching::{self, AssignmentResult};
use crate::tracker::rect::Rect;
use crate::tracker::target::{TargetId, TrackTarget};

/// Configuration for the [`IouTracker`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Maximum IoU distance (1 - IoU) accepted for an association
    pub match_thresh: f32,
    /// Minimum detection score required to open a new target
    pub min_score: f32,
    /// Consecutive unmatched frames tolerated before a target is closed
    pub max_missed_frames: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            match_thresh: 0.7,
            min_score: 0.5,
            max_missed_frames: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IouTrackerError {
    #[error("frame is empty ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("frame size changed from {expected:?} to {got:?}")]
    FrameSizeChanged { expected: (u32, u32), got: (u32, u32) },

    #[error("track called before begin_track")]
    NotStarted,
}

pub struct IouTracker {
    config: TrackerConfig,
    open: OpenTargets,
    missed: BTreeMap<TargetId, u32>,
    frame_size: Option<(u32, u32)>,
    next_id: u64,
}

impl IouTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            open: OpenTargets::new(),
            missed: BTreeMap::new(),
            frame_size: None,
            next_id: 1,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Frame size captured by `begin_track`.
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.frame_size
    }

    fn next_target_id(&mut self) -> TargetId {
        let id = TargetId(self.next_id);
        self.next_id += 1;
        id
    }

    fn check_frame(&self, frame: &Frame) -> Result<(), IouTrackerError> {
        let got = frame.size();
        match self.frame_size {
            None => Err(IouTrackerError::NotStarted),
            Some(expected) if expected != got => {
                Err(IouTrackerError::FrameSizeChanged { expected, got })
            }
            Some(_) => Ok(()),
        }
    }

    fn update(
        &mut self,
        detections: &[Detection],
        frame_index: u64,
        events: &mut dyn TrackingEventHandler,
    ) {
        let ids: Vec<TargetId> = self.open.keys().copied().collect();
        let target_rects: Vec<Rect> = self.open.values().map(|t| t.bbox).collect();
        let det_rects: Vec<Rect> = detections.iter().map(Detection::bbox).collect();
        let dists = matching::iou_distance(&target_rects, &det_rects);

        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = matching::greedy_assignment(&dists, self.config.match_thresh);

        // Step 1: associations
        for (itarget, idet) in matches {
            let det = &detections[idet];
            self.missed.insert(ids[itarget], 0);
            if let Some(target) = self.open.get_mut(&ids[itarget]) {
                target.update(det.bbox(), frame_index);
                events.on_target_associated(det, target);
            }
        }

        // Step 2: close targets that went stale
        for itarget in unmatched_tracks {
            let id = ids[itarget];
            let missed = self.missed.entry(id).or_insert(0);
            *missed += 1;
            if *missed <= self.config.max_missed_frames {
                continue;
            }
            self.missed.remove(&id);
            if let Some(mut target) = self.open.remove(&id) {
                target.mark_closed();
                events.on_target_closed(&target);
            }
        }

        // Step 3: open new targets
        for idet in unmatched_detections {
            let det = &detections[idet];
            if det.score() < self.config.min_score {
                continue;
            }
            let id = self.next_target_id();
            let target = TrackTarget::new(id, det.bbox(), frame_index);
            events.on_target_created(det, &target);
            self.missed.insert(id, 0);
            self.open.insert(id, target);
        }

        debug!(
            frame_index,
            detections = detections.len(),
            open = self.open.len(),
            "iou tracker updated"
        );
    }
}

impl Default for IouTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl Tracker for IouTracker {
    type Error = IouTrackerError;

    fn begin_track(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
        frame_index: u64,
        events: &mut dyn TrackingEventHandler,
    ) -> Result<(), Self::Error> {
        let (width, height) = frame.size();
        if width == 0 || height == 0 {
            return Err(IouTrackerError::EmptyFrame { width, height });
        }
        self.frame_size = Some((width, height));
        self.open.clear();
        self.missed.clear();
        self.update(detections, frame_index, events);
        Ok(())
    }

    fn track(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
        frame_index: u64,
        events: &mut dyn TrackingEventHandler,
    ) -> Result<(), Self::Error> {
        self.check_frame(frame)?;
        self.update(detections, frame_index, events);
        Ok(())
    }

    fn finish_track(&mut self, events: &mut dyn TrackingEventHandler) -> Result<(), Self::Error> {
        for (_, mut target) in std::mem::take(&mut self.open) {
            target.mark_closed();
            events.on_target_closed(&target);
        }
        self.missed.clear();
        self.frame_size = None;
        Ok(())
    }

    fn open_targets(&self) -> &OpenTargets {
        &self.open
    }
}
