//! Persistent track targets owned by a tracker's registry.

use std::fmt;

use serde::Serialize;

use crate::tracker::rect::Rect;

/// Target identity, stable across frames for the same physical object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    /// Present in the open registry and eligible for association
    #[default]
    Open,
    /// Closed by the tracker; never reopened
    Closed,
}

/// A tracked object spanning one or more frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackTarget {
    /// Stable target identifier
    pub id: TargetId,
    /// Most recent bounding box (TLWH)
    pub bbox: Rect,
    pub status: TargetStatus,
    /// Frame the target was created in
    pub first_frame: u64,
    /// Last frame a detection was associated with the target
    pub last_frame: u64,
}

impl TrackTarget {
    /// Open a new target from a detection observed at `frame_index`.
    pub fn new(id: TargetId, bbox: Rect, frame_index: u64) -> Self {
        Self {
            id,
            bbox,
            status: TargetStatus::Open,
            first_frame: frame_index,
            last_frame: frame_index,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TargetStatus::Open
    }

    /// Record an associated detection.
    pub fn update(&mut self, bbox: Rect, frame_index: u64) {
        self.bbox = bbox;
        self.last_frame = frame_index;
    }

    pub fn mark_closed(&mut self) {
        self.status = TargetStatus::Closed;
    }

    /// Number of frames between creation and the last association, inclusive.
    pub fn age(&self) -> u64 {
        self.last_frame.saturating_sub(self.first_frame) + 1
    }
}
