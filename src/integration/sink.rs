//! Downstream consumers of per-frame tracking output.

use tracing::{info, warn};

use crate::error::SinkError;
use crate::frame::Frame;
use crate::tracker::{Detection, OpenTargets};

/// Everything a sink receives for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameOutput<'a> {
    pub frame: &'a Frame,
    pub frame_index: u64,
    pub detections: &'a [Detection],
    pub open_targets: &'a OpenTargets,
}

/// Presentation or persistence of tracking results.
///
/// Sinks are best-effort: a failure is logged by the caller and the frame's
/// output is simply missing. Empty detection lists and empty target maps are
/// valid input.
pub trait FrameSink {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    fn present(&mut self, output: &FrameOutput<'_>) -> Result<(), SinkError>;
}

/// A set of sinks presented to in registration order.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn FrameSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn FrameSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Present to every sink, logging and swallowing failures.
    ///
    /// Returns the number of sinks that failed.
    pub fn present_all(&mut self, output: &FrameOutput<'_>) -> usize {
        let mut failures = 0;
        for sink in &mut self.sinks {
            if let Err(err) = sink.present(output) {
                failures += 1;
                warn!(
                    sink = sink.name(),
                    frame_index = output.frame_index,
                    error = %err,
                    "sink failed, output for this frame is missing"
                );
            }
        }
        failures
    }
}

/// Logs one line per open target each frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummarySink;

impl FrameSink for SummarySink {
    fn name(&self) -> &str {
        "summary"
    }

    fn present(&mut self, output: &FrameOutput<'_>) -> Result<(), SinkError> {
        info!(
            frame_index = output.frame_index,
            detections = output.detections.len(),
            open_targets = output.open_targets.len(),
            "frame summary"
        );
        for target in output.open_targets.values() {
            let [x, y, w, h] = target.bbox.to_tlwh();
            info!(target_id = %target.id, x, y, w, h, age = target.age(), "open target");
        }
        Ok(())
    }
}
