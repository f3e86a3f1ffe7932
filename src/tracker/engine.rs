//! The tracker interface the orchestrator drives.

use std::collections::BTreeMap;

use crate::frame::Frame;
use crate::tracker::detection::Detection;
use crate::tracker::event::TrackingEventHandler;
use crate::tracker::target::{TargetId, TrackTarget};

/// Open targets keyed by identity, ordered by id.
pub type OpenTargets = BTreeMap<TargetId, TrackTarget>;

/// A frame-sequential multi-object tracker.
///
/// The lifecycle is one `begin_track` for frame 0, `track` for every later
/// frame in order, then a single `finish_track`. During each call the
/// tracker must report every creation, association and closure it decides
/// on through `events`, synchronously, before returning.
///
/// # Example
///
/// ```ignore
/// use trackrelay::{Detection, Frame, OpenTargets, Tracker, TrackingEventHandler};
///
/// struct MyTracker { open: OpenTargets }
///
/// impl Tracker for MyTracker {
///     type Error = std::io::Error;
///
///     fn begin_track(&mut self, frame: &Frame, detections: &[Detection], frame_index: u64,
///                    events: &mut dyn TrackingEventHandler) -> Result<(), Self::Error> {
///         self.track(frame, detections, frame_index, events)
///     }
///     // ...
/// }
/// ```
pub trait Tracker {
    /// Error type for tracker failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Initialise per-sequence state from the first frame and process its detections.
    fn begin_track(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
        frame_index: u64,
        events: &mut dyn TrackingEventHandler,
    ) -> Result<(), Self::Error>;

    /// Process a subsequent frame.
    fn track(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
        frame_index: u64,
        events: &mut dyn TrackingEventHandler,
    ) -> Result<(), Self::Error>;

    /// Flush the sequence, closing every remaining open target.
    fn finish_track(&mut self, events: &mut dyn TrackingEventHandler) -> Result<(), Self::Error>;

    /// Currently open targets as of the last lifecycle call.
    ///
    /// Closed targets never appear here.
    fn open_targets(&self) -> &OpenTargets;
}
