mod detection;
mod engine;
mod event;
mod iou_tracker;
mod matching;
mod rect;
mod target;

pub use detection::{Detection, DetectionId};
pub use engine::{OpenTargets, Tracker};
pub use event::{HandlerResponse, LoggingEventHandler, TrackingEvent, TrackingEventHandler};
pub use iou_tracker::{IouTracker, IouTrackerError, TrackerConfig};
pub use matching::{AssignmentResult, greedy_assignment, iou_distance};
pub use rect::{Rect, iou_batch};
pub use target::{TargetId, TargetStatus, TrackTarget};
