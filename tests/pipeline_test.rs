use std::cell::{Cell, RefCell};
use std::fs;
use std::rc::Rc;

use thiserror::Error;
use trackrelay::{
    AnnotatedFrameWriter, CancelToken, Detection, DetectionSource, Frame, FrameOutput, FrameSink,
    IntoDetections, InvalidStateReason, IouTracker, OrchestratorError, OrchestratorState,
    PipelineConfig, Rect, SinkError, TargetId, TrackLogWriter, TrackerConfig, TrackerPipeline,
};

/// One object drifting right, visible for frames `0..=visible_until`.
struct DriftDetector {
    visible_until: u64,
    cancel_at: Option<(u64, CancelToken)>,
    fail_at: Option<u64>,
    calls: u64,
}

impl DriftDetector {
    fn new(visible_until: u64) -> Self {
        Self {
            visible_until,
            cancel_at: None,
            fail_at: None,
            calls: 0,
        }
    }
}

#[derive(Debug, Error)]
#[error("decoder produced a malformed frame")]
struct MalformedFrame;

impl DetectionSource for DriftDetector {
    type Error = MalformedFrame;

    fn detect(&mut self, _frame: &Frame, frame_index: u64) -> Result<Vec<Detection>, Self::Error> {
        self.calls += 1;
        if self.fail_at == Some(frame_index) {
            return Err(MalformedFrame);
        }
        if let Some((at, token)) = &self.cancel_at {
            if *at == frame_index {
                token.cancel();
            }
        }
        let mut raw = Vec::new();
        if frame_index <= self.visible_until {
            let x = 10.0 + 2.0 * frame_index as f32;
            raw.push((Rect::new(x, 20.0, 40.0, 80.0), 0.9));
        }
        Ok(raw.into_detections(frame_index))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Seen {
    frame_index: u64,
    detections: usize,
    open_targets: Vec<TargetId>,
}

struct RecordingSink {
    seen: Rc<RefCell<Vec<Seen>>>,
}

impl FrameSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn present(&mut self, output: &FrameOutput<'_>) -> Result<(), SinkError> {
        self.seen.borrow_mut().push(Seen {
            frame_index: output.frame_index,
            detections: output.detections.len(),
            open_targets: output.open_targets.keys().copied().collect(),
        });
        Ok(())
    }
}

struct BrokenSink;

impl FrameSink for BrokenSink {
    fn name(&self) -> &str {
        "broken"
    }

    fn present(&mut self, _output: &FrameOutput<'_>) -> Result<(), SinkError> {
        Err(SinkError::Io(std::io::Error::other("read-only filesystem")))
    }
}

fn frames(count: u64) -> impl Iterator<Item = Frame> {
    (0..count).map(|_| Frame::blank(160, 120))
}

/// Like [`frames`], counting how many frames the pipeline pulled.
fn counted_frames(count: u64, pulled: Rc<Cell<u64>>) -> impl Iterator<Item = Frame> {
    frames(count).inspect(move |_| pulled.set(pulled.get() + 1))
}

fn tracker() -> IouTracker {
    IouTracker::new(TrackerConfig {
        max_missed_frames: 1,
        ..TrackerConfig::default()
    })
}

#[test]
fn test_run_forwards_every_frame_to_sinks() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut pipeline = TrackerPipeline::new(DriftDetector::new(2), tracker())
        .with_sink(Box::new(RecordingSink { seen: seen.clone() }));

    let summary = pipeline.run(frames(6)).unwrap();

    assert_eq!(summary.frames_processed, 6);
    assert_eq!(summary.targets_created, 1);
    assert_eq!(summary.associations, 2);
    // Closed after two missed frames (frames 3 and 4)
    assert_eq!(summary.targets_closed, 1);
    assert_eq!(summary.sink_failures, 0);
    assert!(!summary.cancelled);
    assert!(summary.finish.as_ref().unwrap().closed.is_empty());

    let seen = seen.borrow();
    assert_eq!(seen.len(), 6);
    assert_eq!(
        seen[0],
        Seen {
            frame_index: 0,
            detections: 1,
            open_targets: vec![TargetId(1)],
        }
    );
    assert_eq!(seen[3].detections, 0);
    assert_eq!(seen[3].open_targets, vec![TargetId(1)]);
    assert!(seen[4].open_targets.is_empty());
    assert!(seen[5].open_targets.is_empty());

    assert_eq!(pipeline.orchestrator().state(), OrchestratorState::Finished);
}

#[test]
fn test_finish_flushes_open_targets() {
    let mut pipeline = TrackerPipeline::new(DriftDetector::new(u64::MAX), tracker());
    let summary = pipeline.run(frames(3)).unwrap();

    let report = summary.finish.unwrap();
    assert_eq!(report.last_frame, 2);
    assert_eq!(report.closed.len(), 1);
    assert_eq!(summary.targets_closed, 1);

    let final_targets = pipeline.orchestrator_mut().take_final_targets().unwrap();
    assert!(final_targets.contains_key(&TargetId(1)));
    assert!(pipeline.orchestrator_mut().take_final_targets().is_none());
}

#[test]
fn test_max_frames_bounds_the_run() {
    let pulled = Rc::new(Cell::new(0));
    let mut pipeline =
        TrackerPipeline::new(DriftDetector::new(u64::MAX), tracker()).with_max_frames(Some(4));
    let summary = pipeline.run(counted_frames(10, pulled.clone())).unwrap();

    assert_eq!(summary.frames_processed, 4);
    assert_eq!(summary.finish.unwrap().last_frame, 3);
    // The source is not read past the bound
    assert_eq!(pulled.get(), 4);
    assert_eq!(pipeline.detector().calls, 4);
}

#[test]
fn test_cancel_takes_effect_at_frame_boundary() {
    let token = CancelToken::new();
    let detector = DriftDetector {
        cancel_at: Some((2, token.clone())),
        ..DriftDetector::new(u64::MAX)
    };
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut pipeline = TrackerPipeline::new(detector, tracker())
        .with_cancel_token(token)
        .with_sink(Box::new(RecordingSink { seen: seen.clone() }));

    let pulled = Rc::new(Cell::new(0));
    let summary = pipeline.run(counted_frames(10, pulled.clone())).unwrap();

    // Frame 2 raised the flag mid-frame and still completed
    assert!(summary.cancelled);
    assert_eq!(summary.frames_processed, 3);
    assert_eq!(pulled.get(), 3);
    assert_eq!(seen.borrow().len(), 3);
    assert_eq!(pipeline.orchestrator().state(), OrchestratorState::Finished);
}

#[test]
fn test_sink_failures_do_not_abort() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut pipeline = TrackerPipeline::new(DriftDetector::new(u64::MAX), tracker())
        .with_sink(Box::new(BrokenSink))
        .with_sink(Box::new(RecordingSink { seen: seen.clone() }));

    let summary = pipeline.run(frames(4)).unwrap();

    assert_eq!(summary.frames_processed, 4);
    assert_eq!(summary.sink_failures, 4);
    assert_eq!(seen.borrow().len(), 4);
}

#[test]
fn test_detector_failure_stops_the_run() {
    let detector = DriftDetector {
        fail_at: Some(2),
        ..DriftDetector::new(u64::MAX)
    };
    let mut pipeline = TrackerPipeline::new(detector, tracker());

    let err = pipeline.run(frames(5)).unwrap_err();
    match &err {
        OrchestratorError::Detector {
            frame_index,
            source,
        } => {
            assert_eq!(*frame_index, 2);
            assert!(source.downcast_ref::<MalformedFrame>().is_some());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.to_string(), "detector failed at frame 2");
    assert_eq!(
        pipeline.orchestrator().state(),
        OrchestratorState::Running { last_frame: 1 }
    );
}

#[test]
fn test_process_frame_after_finish_skips_the_detector() {
    let mut pipeline = TrackerPipeline::new(DriftDetector::new(u64::MAX), tracker());
    pipeline.run(frames(2)).unwrap();
    assert_eq!(pipeline.detector().calls, 2);

    pipeline.detector_mut().fail_at = Some(2);
    let err = pipeline
        .process_frame(&Frame::blank(160, 120), 2)
        .unwrap_err();

    assert_eq!(err.invalid_state_reason(), Some(InvalidStateReason::Finished));
    assert_eq!(pipeline.detector().calls, 2);
}

#[test]
fn test_process_frame_after_abort_skips_the_detector() {
    let mut pipeline = TrackerPipeline::new(DriftDetector::new(u64::MAX), tracker());
    pipeline.process_frame(&Frame::blank(160, 120), 0).unwrap();
    pipeline
        .process_frame(&Frame::blank(80, 60), 1)
        .unwrap_err();
    assert_eq!(pipeline.orchestrator().state(), OrchestratorState::Aborted);

    let err = pipeline
        .process_frame(&Frame::blank(160, 120), 2)
        .unwrap_err();
    assert_eq!(err.invalid_state_reason(), Some(InvalidStateReason::Aborted));
    assert_eq!(pipeline.detector().calls, 2);
}

#[test]
fn test_tracker_failure_stops_the_run() {
    let mut pipeline = TrackerPipeline::new(DriftDetector::new(u64::MAX), tracker());
    let mixed = vec![Frame::blank(160, 120), Frame::blank(80, 60)];

    let err = pipeline.run(mixed).unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Tracker {
            frame_index: Some(1),
            ..
        }
    ));
    assert_eq!(pipeline.orchestrator().state(), OrchestratorState::Aborted);
}

#[test]
fn test_empty_source_never_begins() {
    let mut pipeline = TrackerPipeline::new(DriftDetector::new(u64::MAX), tracker());
    let summary = pipeline.run(frames(0)).unwrap();

    assert_eq!(summary.frames_processed, 0);
    assert!(summary.finish.is_none());
    assert_eq!(pipeline.orchestrator().state(), OrchestratorState::NotStarted);
}

#[test]
fn test_file_sinks_write_output() {
    let dir = std::env::temp_dir().join(format!("trackrelay-pipeline-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);

    let config = PipelineConfig {
        save_output: true,
        track_log: true,
        output_dir: dir.clone(),
        ..PipelineConfig::default()
    };
    let mut pipeline = TrackerPipeline::new(DriftDetector::new(u64::MAX), tracker())
        .with_sinks(config.build_sinks().unwrap());
    pipeline.run(frames(3)).unwrap();

    for frame_index in 0..3 {
        let path = AnnotatedFrameWriter::new(&dir)
            .unwrap()
            .frame_path(frame_index);
        assert!(path.exists(), "missing {}", path.display());
    }
    let log = fs::read_to_string(dir.join(trackrelay::integration::TRACK_LOG_FILE)).unwrap();
    assert_eq!(log.lines().count(), 3);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_track_log_writer_in_memory() {
    let mut pipeline = TrackerPipeline::new(DriftDetector::new(0), tracker())
        .with_sink(Box::new(TrackLogWriter::from_writer(std::io::sink())));
    let summary = pipeline.run(frames(2)).unwrap();
    assert_eq!(summary.sink_failures, 0);
}
