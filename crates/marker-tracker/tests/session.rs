use std::collections::VecDeque;
use std::fs;

use approx::assert_relative_eq;
use marker_tracker::core::{
    estimate_planar_pose, marker_object_corners, CameraModel, CameraModelError, DetectedMarker,
    FrameView, PixelFormat, PoseEstimateError, PoseMatrix, INVALID_MARKER_ID,
};
use marker_tracker::{
    DetectionEngine, DetectionEngineError, Diagnostic, MemorySink, PatternError, PoseEstimator,
    TrackerInitError, TrackerParams, TrackingSession,
};
use nalgebra::{Point2, Rotation3, Vector3, Vector4};

/// Replays queued detection results, one per frame.
#[derive(Default)]
struct ScriptedEngine {
    frames: VecDeque<Result<Vec<DetectedMarker>, DetectionEngineError>>,
    formats: Vec<PixelFormat>,
    thresholds: Vec<u8>,
}

impl ScriptedEngine {
    fn with_frames(frames: Vec<Vec<DetectedMarker>>) -> Self {
        Self {
            frames: frames.into_iter().map(Ok).collect(),
            formats: vec![PixelFormat::Luminance8],
            thresholds: Vec::new(),
        }
    }

    fn push_failure(&mut self, status: i32) {
        self.frames.push_back(Err(DetectionEngineError::Status(status)));
    }
}

impl DetectionEngine for ScriptedEngine {
    fn supports_pixel_format(&self, format: PixelFormat) -> bool {
        self.formats.contains(&format)
    }

    fn detect_markers(
        &mut self,
        _frame: &FrameView<'_>,
        threshold: u8,
        markers: &mut Vec<DetectedMarker>,
    ) -> Result<(), DetectionEngineError> {
        self.thresholds.push(threshold);
        let next = self.frames.pop_front().unwrap_or_else(|| Ok(Vec::new()))?;
        markers.extend(next);
        Ok(())
    }
}

/// Records the arguments of every call; the first `failures` calls fail.
struct RecordingEstimator {
    calls: Vec<(i32, [f64; 2], f64)>,
    failures: usize,
    pose: PoseMatrix,
}

impl RecordingEstimator {
    fn failing_first(failures: usize, pose: PoseMatrix) -> Self {
        Self {
            calls: Vec::new(),
            failures,
            pose,
        }
    }
}

impl PoseEstimator for RecordingEstimator {
    fn estimate_pose(
        &mut self,
        _camera: &CameraModel,
        marker: &DetectedMarker,
        center: [f64; 2],
        width: f64,
    ) -> Result<PoseMatrix, PoseEstimateError> {
        self.calls.push((marker.id, center, width));
        if self.failures > 0 {
            self.failures -= 1;
            return Err(PoseEstimateError::DegenerateCorners);
        }
        Ok(self.pose)
    }
}

const PIXELS: [u8; 16] = [0; 16];

fn frame() -> FrameView<'static> {
    FrameView::gray(4, 4, &PIXELS).expect("frame")
}

fn pose_at(tx: f64, ty: f64, tz: f64, yaw: f64) -> PoseMatrix {
    let r = Rotation3::from_euler_angles(0.2, -0.1, yaw);
    let mut pose = PoseMatrix::zeros();
    pose.fixed_view_mut::<3, 3>(0, 0).copy_from(r.matrix());
    pose.set_column(3, &Vector3::new(tx, ty, tz));
    pose
}

/// Marker whose corners are the projection of a default-sized marker at `pose`.
fn marker_at(id: i32, confidence: f32, pose: &PoseMatrix) -> DetectedMarker {
    let camera = CameraModel::synthetic();
    let params = TrackerParams::default();
    let corners = marker_object_corners(params.marker_center, params.marker_width).map(|p| {
        let uvw = camera.projection() * (pose * Vector4::new(p.x, p.y, 0.0, 1.0));
        Point2::new(uvw[0] / uvw[2], uvw[1] / uvw[2])
    });
    DetectedMarker::from_corners(id, confidence, corners, 0)
}

fn session_with(
    frames: Vec<Vec<DetectedMarker>>,
) -> (TrackingSession<ScriptedEngine>, MemorySink) {
    let sink = MemorySink::new();
    let mut session = TrackingSession::new(
        ScriptedEngine::with_frames(frames),
        TrackerParams::default(),
    )
    .with_sink(sink.clone());
    session.init_without_camera_file().expect("init");
    (session, sink)
}

#[test]
fn synthetic_camera_defaults() {
    let (session, _) = session_with(Vec::new());
    let camera = session.camera().expect("camera");
    assert_eq!(camera.width(), 400);
    assert_eq!(camera.height(), 400);
    assert_eq!(camera.focal_length, [150.0, 150.0]);
    assert_eq!(camera.principal_point, [200.0, 200.0]);
    assert_eq!(camera.near_clip, 1.0);
    assert_eq!(camera.far_clip, 1000.0);
    assert_eq!(session.gl_projection(), Some(camera.gl_projection()));
}

#[test]
fn pose_is_zero_before_any_selection() {
    let (session, _) = session_with(Vec::new());
    assert_eq!(session.pose(), PoseMatrix::zeros());
    let mut expected = [0.0; 16];
    expected[15] = 1.0;
    assert_eq!(session.gl_pose(), expected);
    assert_eq!(session.confidence(), 0.0);
}

#[test]
fn detect_returns_valid_ids_in_order() {
    let p = pose_at(0.0, 0.0, 30.0, 0.1);
    let (mut session, _) = session_with(vec![vec![
        marker_at(7, 0.4, &p),
        marker_at(INVALID_MARKER_ID, 0.9, &p),
        marker_at(3, 0.8, &p),
    ]]);

    assert_eq!(session.detect(&frame()), vec![7, 3]);
    assert_eq!(session.detection_count(), 3);
    assert_eq!(session.engine().thresholds, vec![100]);
}

#[test]
fn best_by_confidence_breaks_ties_toward_first() {
    let a = pose_at(-3.0, 1.0, 30.0, 0.1);
    let b = pose_at(2.0, -1.0, 25.0, -0.3);
    let (mut session, _) = session_with(vec![vec![
        marker_at(4, 0.6, &a),
        marker_at(5, 0.6, &b),
        marker_at(6, 0.2, &b),
    ]]);
    session.detect(&frame());

    assert_eq!(session.select_best_by_confidence(), Some(4));
    assert_relative_eq!(session.pose(), a, epsilon = 1e-6);
    assert_relative_eq!(session.confidence(), 0.6);
}

#[test]
fn invalid_only_frame_selects_nothing() {
    let p = pose_at(0.0, 0.0, 30.0, 0.0);
    let (mut session, _) = session_with(vec![
        vec![marker_at(2, 0.7, &p)],
        vec![marker_at(INVALID_MARKER_ID, 1.0, &p)],
    ]);
    session.detect(&frame());
    assert_eq!(session.select_best_by_confidence(), Some(2));
    let selected = session.pose();

    assert!(session.detect(&frame()).is_empty());
    assert_eq!(session.select_best_by_confidence(), None);
    assert_eq!(session.pose(), selected);
    assert_eq!(session.confidence(), 0.0);
    assert_eq!(session.select_by_id(INVALID_MARKER_ID), 0);
}

#[test]
fn empty_frame_leaves_state_untouched() {
    let p = pose_at(1.0, 0.0, 30.0, 0.0);
    let (mut session, sink) = session_with(vec![vec![marker_at(2, 0.7, &p)]]);
    session.detect(&frame());
    session.select_by_id(2);
    let (pose, confidence, handle) = (
        session.pose(),
        session.confidence(),
        session.detection_handle(),
    );

    let empty = FrameView {
        width: 0,
        height: 0,
        format: PixelFormat::Luminance8,
        data: &[],
    };
    assert!(session.detect(&empty).is_empty());
    assert_eq!(session.pose(), pose);
    assert_eq!(session.confidence(), confidence);
    assert_eq!(session.detection_handle(), handle);
    assert!(session.engine().thresholds.len() == 1);
    assert!(sink.snapshot().is_empty());
}

#[test]
fn detection_resets_confidence_but_not_pose() {
    let p = pose_at(0.0, 1.0, 20.0, 0.2);
    let (mut session, _) = session_with(vec![
        vec![marker_at(1, 0.9, &p)],
        vec![marker_at(1, 0.5, &p)],
    ]);
    session.detect(&frame());
    session.select_by_id(1);
    assert_relative_eq!(session.confidence(), 0.9);

    session.detect(&frame());
    assert_eq!(session.confidence(), 0.0);
    assert_relative_eq!(session.pose(), p, epsilon = 1e-6);
}

#[test]
fn duplicate_ids_resolve_to_the_last_match() {
    let first = pose_at(-2.0, 0.0, 30.0, 0.0);
    let last = pose_at(3.0, 2.0, 45.0, 0.5);
    let markers = vec![marker_at(9, 0.9, &first), marker_at(9, 0.3, &last)];
    let (mut session, _) = session_with(vec![markers.clone()]);
    session.detect(&frame());

    assert_eq!(session.select_by_id(9), 2);
    let camera = CameraModel::synthetic();
    let expected = estimate_planar_pose(&camera, &markers[1], [0.0, 0.0], 2.0).expect("pose");
    assert_relative_eq!(session.pose(), expected, epsilon = 1e-9);
    assert_relative_eq!(session.pose(), last, epsilon = 1e-6);
    assert_relative_eq!(session.confidence(), 0.3);

    // best-by-confidence picks the id, then the same last-wins rule applies
    assert_eq!(session.select_best_by_confidence(), Some(9));
    assert_relative_eq!(session.pose(), last, epsilon = 1e-6);
}

#[test]
fn marker_info_lookup_is_idempotent() {
    let p = pose_at(0.0, 0.0, 30.0, 0.0);
    let (mut session, _) = session_with(vec![vec![marker_at(11, 0.5, &p), marker_at(11, 0.7, &p)]]);
    session.detect(&frame());

    let first = session.marker_info_by_id(11).copied();
    assert_eq!(first.map(|m| m.confidence), Some(0.5));
    assert_eq!(session.marker_info_by_id(11).copied(), first);
    assert!(session.marker_info_by_id(12).is_none());
    assert_eq!(session.confidence(), 0.0);
}

#[test]
fn engine_failure_keeps_previous_detections() {
    let p = pose_at(0.0, 0.0, 30.0, 0.0);
    let mut engine = ScriptedEngine::with_frames(vec![vec![marker_at(1, 0.5, &p)]]);
    engine.push_failure(-4);
    let sink = MemorySink::new();
    let mut session =
        TrackingSession::new(engine, TrackerParams::default()).with_sink(sink.clone());
    session.init_without_camera_file().expect("init");

    assert_eq!(session.detect(&frame()), vec![1]);
    let handle = session.detection_handle();
    assert!(session.detect(&frame()).is_empty());

    assert_eq!(session.detections_for(handle).expect("current").len(), 1);
    assert!(matches!(
        sink.take().as_slice(),
        [Diagnostic::DetectionFailed { .. }]
    ));
}

#[test]
fn stale_handles_are_rejected_after_new_frame() {
    let p = pose_at(0.0, 0.0, 30.0, 0.0);
    let (mut session, _) = session_with(vec![vec![marker_at(1, 0.5, &p)], Vec::new()]);
    session.detect(&frame());
    let old = session.detection_handle();
    session.detect(&frame());

    let err = session.detections_for(old).unwrap_err();
    assert_eq!(err.handle, old.generation);
    assert_eq!(err.current, old.generation + 1);
}

#[test]
fn detect_before_init_reports_and_returns_empty() {
    let sink = MemorySink::new();
    let mut session = TrackingSession::new(
        ScriptedEngine::with_frames(Vec::new()),
        TrackerParams::default(),
    )
    .with_sink(sink.clone());

    assert!(session.detect(&frame()).is_empty());
    assert!(session.engine().thresholds.is_empty());
    assert_eq!(sink.take(), vec![Diagnostic::NotInitialized]);
}

#[test]
fn mismatched_frame_format_is_not_forwarded() {
    let (mut session, sink) = session_with(Vec::new());
    let rgb = [0u8; 12];
    let frame = FrameView::new(2, 2, PixelFormat::Rgb888, &rgb).expect("frame");

    assert!(session.detect(&frame).is_empty());
    assert!(session.engine().thresholds.is_empty());
    assert_eq!(
        sink.take(),
        vec![Diagnostic::FrameFormatMismatch {
            expected: PixelFormat::Luminance8,
            got: PixelFormat::Rgb888,
        }]
    );
}

#[test]
fn unsupported_pixel_format_fails_every_init_path() {
    let sink = MemorySink::new();
    let params = TrackerParams {
        pixel_format: PixelFormat::Rgb565,
        ..TrackerParams::default()
    };
    let mut session =
        TrackingSession::new(ScriptedEngine::with_frames(Vec::new()), params).with_sink(sink.clone());

    assert!(matches!(
        session.init_without_camera_file(),
        Err(TrackerInitError::UnsupportedPixelFormat(PixelFormat::Rgb565))
    ));
    assert!(matches!(
        session.init_with_camera(CameraModel::synthetic()),
        Err(TrackerInitError::UnsupportedPixelFormat(_))
    ));
    assert!(!session.is_initialized());
    assert_eq!(sink.take().len(), 2);
}

#[test]
fn camera_file_init_and_failure_keeps_previous_camera() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("camera.cal");
    let camera = CameraModel::pinhole([640, 480], [500.0, 510.0], [320.0, 240.0]);
    fs::write(&path, camera.to_calib_text()).expect("write");

    let sink = MemorySink::new();
    let mut session = TrackingSession::new(
        ScriptedEngine::with_frames(Vec::new()),
        TrackerParams::default(),
    )
    .with_sink(sink.clone());
    session
        .init_with_camera_file(&path, 5.0, 500.0)
        .expect("init");
    let loaded = session.camera().cloned().expect("camera");
    assert_eq!(loaded.width(), 640);
    assert_eq!((loaded.near_clip, loaded.far_clip), (5.0, 500.0));

    let missing = dir.path().join("missing.cal");
    let err = session
        .init_with_camera_file(&missing, 1.0, 1000.0)
        .unwrap_err();
    assert!(matches!(err, TrackerInitError::CameraLoad { .. }));
    assert_eq!(session.camera(), Some(&loaded));
    assert!(matches!(
        sink.take().as_slice(),
        [Diagnostic::CameraLoadFailed { .. }]
    ));
}

#[test]
fn pattern_failures_are_reported_with_their_code() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.patt");
    fs::write(&path, "1 2 3").expect("write");

    let (mut session, sink) = session_with(Vec::new());
    let err = session.add_pattern(&path).unwrap_err();
    assert!(matches!(err, PatternError::ValueCount { .. }));

    match sink.take().as_slice() {
        [Diagnostic::PatternLoadFailed { code, .. }] => assert_eq!(*code, -2),
        other => panic!("unexpected diagnostics: {other:?}"),
    }
}

#[test]
fn explicit_threshold_is_stored_and_forwarded() {
    let (mut session, _) = session_with(vec![Vec::new(), Vec::new()]);
    session.detect_with_threshold(&frame(), 42);
    session.detect(&frame());
    assert_eq!(session.threshold(), 42);
    assert_eq!(session.engine().thresholds, vec![42, 42]);
}

#[test]
fn sessions_can_move_across_threads() {
    let p = pose_at(0.0, 0.0, 30.0, 0.0);
    let (mut session, _) = session_with(vec![vec![marker_at(3, 0.5, &p)]]);
    let id = std::thread::spawn(move || {
        session.detect(&frame());
        session.select_best_by_confidence()
    })
    .join()
    .expect("thread");
    assert_eq!(id, Some(3));
}

fn recording_session(
    markers: Vec<DetectedMarker>,
    estimator: RecordingEstimator,
) -> (TrackingSession<ScriptedEngine, RecordingEstimator>, MemorySink) {
    let sink = MemorySink::new();
    let mut session = TrackingSession::with_estimator(
        ScriptedEngine::with_frames(vec![markers]),
        estimator,
        TrackerParams::default(),
    )
    .with_sink(sink.clone());
    session.init_without_camera_file().expect("init");
    (session, sink)
}

#[test]
fn failed_estimate_skips_the_entry_and_later_duplicate_wins() {
    let p = pose_at(0.0, 0.0, 30.0, 0.0);
    let estimated = pose_at(1.0, 2.0, 50.0, 0.3);
    let (mut session, sink) = recording_session(
        vec![marker_at(5, 0.9, &p), marker_at(5, 0.4, &p)],
        RecordingEstimator::failing_first(1, estimated),
    );
    session.set_marker_center([1.0, -2.0]);
    session.set_marker_width(7.5);
    session.detect(&frame());

    assert_eq!(session.select_by_id(5), 1);
    assert_eq!(session.estimator().calls, vec![(5, [1.0, -2.0], 7.5); 2]);
    assert_eq!(session.pose(), estimated);
    assert_relative_eq!(session.confidence(), 0.4);
    assert!(matches!(
        sink.take().as_slice(),
        [Diagnostic::PoseEstimateFailed { id: 5, .. }]
    ));
}

#[test]
fn best_selection_reports_id_even_when_no_pose_is_applied() {
    let p = pose_at(0.0, 0.0, 30.0, 0.0);
    let (mut session, sink) = recording_session(
        vec![marker_at(5, 0.8, &p)],
        RecordingEstimator::failing_first(usize::MAX, p),
    );
    session.detect(&frame());

    assert_eq!(session.select_best_by_confidence(), Some(5));
    assert_eq!(session.pose(), PoseMatrix::zeros());
    assert_eq!(session.confidence(), 0.0);
    assert!(matches!(
        sink.take().as_slice(),
        [Diagnostic::PoseEstimateFailed { id: 5, .. }]
    ));
}

#[test]
fn invalid_camera_is_rejected_and_previous_one_kept() {
    let (mut session, sink) = session_with(Vec::new());
    let mut bad = CameraModel::synthetic();
    bad.focal_length = [0.0, 150.0];

    assert!(matches!(
        session.init_with_camera(bad),
        Err(TrackerInitError::InvalidCamera(CameraModelError::FocalLength { .. }))
    ));
    assert_eq!(session.camera(), Some(&CameraModel::synthetic()));
    assert!(matches!(
        sink.take().as_slice(),
        [Diagnostic::InvalidCamera { .. }]
    ));
}
