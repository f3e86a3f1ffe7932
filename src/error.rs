//! Error types for the orchestration core, sinks and configuration.

use std::fmt;

use thiserror::Error;

/// Boxed collaborator error, carried through unchanged.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The tracker lifecycle call an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCall {
    BeginTrack,
    Track,
    FinishTrack,
}

impl LifecycleCall {
    /// The call a `step` at `frame_index` maps to.
    pub fn for_step(frame_index: u64) -> Self {
        if frame_index == 0 {
            Self::BeginTrack
        } else {
            Self::Track
        }
    }
}

impl fmt::Display for LifecycleCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BeginTrack => "begin_track",
            Self::Track => "track",
            Self::FinishTrack => "finish_track",
        })
    }
}

/// Why a lifecycle call was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidStateReason {
    #[error("tracking has not begun; the first step must use frame index 0")]
    NotStarted,
    #[error("tracking already began; frame index 0 may only be stepped once")]
    AlreadyStarted,
    #[error("expected frame index {expected}, got {got}")]
    FrameIndexGap { expected: u64, got: u64 },
    #[error("tracking already finished")]
    Finished,
    #[error("an earlier tracker failure aborted this run")]
    Aborted,
}

/// Errors surfaced by the orchestrator and the pipeline loop.
///
/// None of these are retried: a frame-sequential tracker that failed mid
/// frame cannot be stepped again without breaking target continuity.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid {call} call{}: {reason}", fmt_frame(.frame_index))]
    InvalidState {
        call: LifecycleCall,
        frame_index: Option<u64>,
        reason: InvalidStateReason,
    },

    #[error("tracker failed in {call}{}", fmt_frame(.frame_index))]
    Tracker {
        call: LifecycleCall,
        frame_index: Option<u64>,
        #[source]
        source: BoxError,
    },

    #[error("detector failed at frame {frame_index}")]
    Detector {
        frame_index: u64,
        #[source]
        source: BoxError,
    },
}

impl OrchestratorError {
    /// Frame index of the offending call, if it had one.
    pub fn frame_index(&self) -> Option<u64> {
        match self {
            Self::InvalidState { frame_index, .. } | Self::Tracker { frame_index, .. } => {
                *frame_index
            }
            Self::Detector { frame_index, .. } => Some(*frame_index),
        }
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// The rejection reason for state-machine violations.
    pub fn invalid_state_reason(&self) -> Option<InvalidStateReason> {
        match self {
            Self::InvalidState { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

fn fmt_frame(frame_index: &Option<u64>) -> String {
    frame_index
        .map(|index| format!(" at frame {index}"))
        .unwrap_or_default()
}

/// Frame buffer construction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("pixel buffer holds {actual} bytes, expected {expected} for a {width}x{height} RGB8 frame")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Presentation and persistence failures. Logged by the pipeline, never fatal.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame buffer does not match {width}x{height}")]
    InvalidFrame { width: u32, height: u32 },
}
