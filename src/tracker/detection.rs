//! Detections handed from the detector to the tracker, one per observed object per frame.

use std::fmt;

use serde::Serialize;

use crate::tracker::rect::Rect;

/// Identity of a detection, unique within the frame it was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DetectionId(pub u32);

impl fmt::Display for DetectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single object observed in one frame.
///
/// Detections are immutable once built: the tracker and the emitted
/// events only ever borrow them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    id: DetectionId,
    bbox: Rect,
    score: f32,
    frame_index: u64,
}

impl Detection {
    pub fn new(id: DetectionId, bbox: Rect, score: f32, frame_index: u64) -> Self {
        Self {
            id,
            bbox,
            score,
            frame_index,
        }
    }

    pub fn id(&self) -> DetectionId {
        self.id
    }

    /// Bounding box in pixel space (TLWH).
    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    /// Detector confidence score.
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Index of the frame this detection was observed in.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}
