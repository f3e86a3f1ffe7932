//! Trait for object detection backends feeding the pipeline.

use crate::frame::Frame;
use crate::tracker::{Detection, DetectionId, Rect};

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the pipeline.
///
/// # Example
///
/// ```ignore
/// use trackrelay::{Detection, DetectionSource, Frame};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &Frame, frame_index: u64) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run inference on one frame.
    ///
    /// Returned detections must carry `frame_index` and ids unique within
    /// the frame. An empty vector is a valid result.
    fn detect(&mut self, frame: &Frame, frame_index: u64) -> Result<Vec<Detection>, Self::Error>;
}

/// Helper trait for converting model-specific outputs to `Detection`s.
///
/// Implement this for your model's output format to enable easy conversion.
pub trait IntoDetections {
    /// Convert the output into detections observed at `frame_index`.
    fn into_detections(self, frame_index: u64) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self, _frame_index: u64) -> Vec<Detection> {
        self
    }
}

/// `(box, score)` pairs, numbered in order.
impl IntoDetections for Vec<(Rect, f32)> {
    fn into_detections(self, frame_index: u64) -> Vec<Detection> {
        self.into_iter()
            .zip(0u32..)
            .map(|((bbox, score), id)| Detection::new(DetectionId(id), bbox, score, frame_index))
            .collect()
    }
}
