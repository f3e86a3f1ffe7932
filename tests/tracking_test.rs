use trackrelay::{
    Detection, DetectionBuilder, DetectionId, EventCollector, Frame, IouTracker, IouTrackerError,
    TargetId, Tracker, TrackerConfig,
};

fn det(id: u32, x1: f32, y1: f32, x2: f32, y2: f32, score: f32, frame_index: u64) -> Detection {
    DetectionBuilder::new()
        .id(id)
        .tlbr(x1, y1, x2, y2)
        .score(score)
        .frame_index(frame_index)
        .build()
}

#[test]
fn test_basic_tracking() {
    let mut tracker = IouTracker::new(TrackerConfig {
        max_missed_frames: 1,
        ..TrackerConfig::default()
    });
    let mut events = EventCollector::new();
    let frame = Frame::blank(640, 480);

    // Frame 0: One detection opens a target
    let dets0 = vec![det(0, 100.0, 100.0, 200.0, 200.0, 0.9, 0)];
    tracker.begin_track(&frame, &dets0, 0, &mut events).unwrap();
    assert_eq!(events.created().len(), 1);
    let id1 = events.created()[&DetectionId(0)].id;
    assert_eq!(tracker.open_targets().len(), 1);

    // Frame 1: Same object moved slightly
    events.reset();
    let dets1 = vec![det(0, 105.0, 105.0, 205.0, 205.0, 0.9, 1)];
    tracker.track(&frame, &dets1, 1, &mut events).unwrap();
    assert!(events.created().is_empty());
    assert_eq!(events.associated()[&DetectionId(0)].id, id1); // ID should persist

    // Frame 2: Low score detections still associate, they just never open targets
    events.reset();
    let dets2 = vec![det(0, 110.0, 110.0, 210.0, 210.0, 0.2, 2)];
    tracker.track(&frame, &dets2, 2, &mut events).unwrap();
    assert_eq!(events.associated()[&DetectionId(0)].id, id1);

    // Frame 3: Object occluded, within the miss budget
    events.reset();
    tracker.track(&frame, &[], 3, &mut events).unwrap();
    assert!(events.is_empty());
    assert!(tracker.open_targets().contains_key(&id1));

    // Frame 4: Object reappears and is picked up again
    events.reset();
    let dets4 = vec![det(0, 115.0, 115.0, 215.0, 215.0, 0.9, 4)];
    tracker.track(&frame, &dets4, 4, &mut events).unwrap();
    assert_eq!(events.associated()[&DetectionId(0)].id, id1);

    // Frames 5-6: Object gone long enough to close
    events.reset();
    tracker.track(&frame, &[], 5, &mut events).unwrap();
    assert!(events.closed().is_empty());
    events.reset();
    tracker.track(&frame, &[], 6, &mut events).unwrap();
    assert_eq!(events.closed().len(), 1);
    assert_eq!(events.closed()[0].id, id1);
    assert!(tracker.open_targets().is_empty());

    // Frame 7: A new detection at the same place is a new target
    events.reset();
    let dets7 = vec![det(0, 115.0, 115.0, 215.0, 215.0, 0.9, 7)];
    tracker.track(&frame, &dets7, 7, &mut events).unwrap();
    let id2 = events.created()[&DetectionId(0)].id;
    assert_ne!(id2, id1);

    // Finish closes what is left
    events.reset();
    tracker.finish_track(&mut events).unwrap();
    assert_eq!(events.closed().len(), 1);
    assert_eq!(events.closed()[0].id, id2);
    assert!(tracker.open_targets().is_empty());
}

#[test]
fn test_ids_are_sequential_per_tracker() {
    let frame = Frame::blank(640, 480);
    let dets = vec![
        det(0, 0.0, 0.0, 50.0, 50.0, 0.9, 0),
        det(1, 300.0, 300.0, 350.0, 350.0, 0.9, 0),
    ];

    for _ in 0..2 {
        let mut tracker = IouTracker::default();
        let mut events = EventCollector::new();
        tracker.begin_track(&frame, &dets, 0, &mut events).unwrap();

        assert_eq!(events.created()[&DetectionId(0)].id, TargetId(1));
        assert_eq!(events.created()[&DetectionId(1)].id, TargetId(2));
    }
}

#[test]
fn test_finish_closes_in_id_order() {
    let frame = Frame::blank(640, 480);
    let dets = vec![
        det(0, 400.0, 0.0, 450.0, 50.0, 0.9, 0),
        det(1, 0.0, 0.0, 50.0, 50.0, 0.9, 0),
        det(2, 200.0, 200.0, 250.0, 250.0, 0.9, 0),
    ];
    let mut tracker = IouTracker::default();
    let mut events = EventCollector::new();
    tracker.begin_track(&frame, &dets, 0, &mut events).unwrap();

    events.reset();
    tracker.finish_track(&mut events).unwrap();
    let closed: Vec<u64> = events.closed().iter().map(|t| t.id.0).collect();
    assert_eq!(closed, vec![1, 2, 3]);
}

#[test]
fn test_one_event_per_detection() {
    let frame = Frame::blank(640, 480);
    let mut tracker = IouTracker::default();
    let mut events = EventCollector::new();

    let dets0 = vec![det(0, 10.0, 10.0, 60.0, 60.0, 0.9, 0)];
    tracker.begin_track(&frame, &dets0, 0, &mut events).unwrap();

    // One detection continues the target, the other is new
    events.reset();
    let dets1 = vec![
        det(0, 12.0, 12.0, 62.0, 62.0, 0.9, 1),
        det(1, 300.0, 300.0, 350.0, 350.0, 0.9, 1),
    ];
    tracker.track(&frame, &dets1, 1, &mut events).unwrap();

    for d in &dets1 {
        let in_created = events.created().contains_key(&d.id());
        let in_associated = events.associated().contains_key(&d.id());
        assert!(in_created ^ in_associated);
    }
}

#[test]
fn test_tracker_errors() {
    let mut events = EventCollector::new();

    let mut tracker = IouTracker::default();
    let err = tracker
        .track(&Frame::blank(10, 10), &[], 1, &mut events)
        .unwrap_err();
    assert_eq!(err, IouTrackerError::NotStarted);

    let err = tracker
        .begin_track(&Frame::blank(0, 10), &[], 0, &mut events)
        .unwrap_err();
    assert_eq!(
        err,
        IouTrackerError::EmptyFrame {
            width: 0,
            height: 10
        }
    );

    tracker
        .begin_track(&Frame::blank(10, 10), &[], 0, &mut events)
        .unwrap();
    assert_eq!(tracker.frame_size(), Some((10, 10)));
    let err = tracker
        .track(&Frame::blank(20, 10), &[], 1, &mut events)
        .unwrap_err();
    assert_eq!(
        err,
        IouTrackerError::FrameSizeChanged {
            expected: (10, 10),
            got: (20, 10)
        }
    );
}
