use std::path::Path;

use marker_tracker_core::{
    gl_matrix_from_pose, CameraModel, DetectedMarker, FrameView, GlMatrix, PoseMatrix,
    INVALID_MARKER_ID,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{DetectionHandle, DetectionSet, StaleDetectionHandle, TrackerInitError, TrackerParams};
use crate::diagnostics::{Diagnostic, DiagnosticSink, NullSink};
use crate::engine::{
    CameraFileLoader, CameraLoader, DetectionEngine, PlanarPoseEstimator, PoseEstimator,
};
use crate::pattern::{PatternError, PatternId, PatternLoader, PatternStore};

/// Tracks one marker at a time in a single camera.
///
/// Per frame: [`detect`](Self::detect) caches the engine's raw result set,
/// then [`select_best_by_confidence`](Self::select_best_by_confidence) or
/// [`select_by_id`](Self::select_by_id) computes the pose of one marker.
/// Detection alone never changes the pose; it only resets the confidence.
///
/// Before any selection the pose is all zeros and the rendering matrix is
/// zero except for element 15, which is `1.0`.
///
/// The session does no locking. It is `Send` when its engine and estimator
/// are, so independent sessions may run on separate threads.
pub struct TrackingSession<E, P = PlanarPoseEstimator> {
    engine: E,
    estimator: P,
    params: TrackerParams,
    camera: Option<CameraModel>,
    detections: DetectionSet,
    pose: PoseMatrix,
    gl_pose: GlMatrix,
    confidence: f32,
    camera_loader: Box<dyn CameraLoader>,
    patterns: Box<dyn PatternLoader>,
    sink: Box<dyn DiagnosticSink>,
}

impl<E: DetectionEngine> TrackingSession<E, PlanarPoseEstimator> {
    pub fn new(engine: E, params: TrackerParams) -> Self {
        Self::with_estimator(engine, PlanarPoseEstimator, params)
    }
}

impl<E: DetectionEngine, P: PoseEstimator> TrackingSession<E, P> {
    /// Session with a custom pose estimator. Uses the file camera loader, a
    /// [`PatternStore`] sized by `params.pattern` and a [`NullSink`].
    pub fn with_estimator(engine: E, estimator: P, params: TrackerParams) -> Self {
        let patterns = PatternStore::new(params.pattern);
        let pose = PoseMatrix::zeros();
        Self {
            engine,
            estimator,
            camera: None,
            detections: DetectionSet::default(),
            gl_pose: gl_matrix_from_pose(&pose),
            pose,
            confidence: 0.0,
            camera_loader: Box::new(CameraFileLoader),
            patterns: Box::new(patterns),
            sink: Box::new(NullSink),
            params,
        }
    }

    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn with_camera_loader(mut self, loader: impl CameraLoader + 'static) -> Self {
        self.camera_loader = Box::new(loader);
        self
    }

    pub fn with_pattern_loader(mut self, loader: impl PatternLoader + 'static) -> Self {
        self.patterns = Box::new(loader);
        self
    }

    fn report(&self, diagnostic: Diagnostic) {
        self.sink.report(&diagnostic);
    }

    fn check_pixel_format(&self) -> Result<(), TrackerInitError> {
        let format = self.params.pixel_format;
        if self.engine.supports_pixel_format(format) {
            return Ok(());
        }
        self.report(Diagnostic::UnsupportedPixelFormat(format));
        Err(TrackerInitError::UnsupportedPixelFormat(format))
    }

    // Replaces (and drops) any previously installed model.
    fn install_camera(&mut self, camera: CameraModel) -> Result<(), TrackerInitError> {
        if let Err(err) = camera.validate() {
            self.report(Diagnostic::InvalidCamera {
                reason: err.to_string(),
            });
            return Err(err.into());
        }
        log::debug!(
            "installing camera {}x{} (near={}, far={})",
            camera.width(),
            camera.height(),
            camera.near_clip,
            camera.far_clip
        );
        self.camera = Some(camera);
        Ok(())
    }

    /// Initialize from a calibration file. On failure the previously
    /// installed camera, if any, stays in place.
    pub fn init_with_camera_file(
        &mut self,
        path: impl AsRef<Path>,
        near_clip: f64,
        far_clip: f64,
    ) -> Result<(), TrackerInitError> {
        let path = path.as_ref();
        self.check_pixel_format()?;
        let camera = match self.camera_loader.load_camera(path, near_clip, far_clip) {
            Ok(camera) => camera,
            Err(source) => {
                self.report(Diagnostic::CameraLoadFailed {
                    path: path.to_path_buf(),
                    reason: source.to_string(),
                });
                return Err(TrackerInitError::CameraLoad {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        self.install_camera(camera)
    }

    /// Initialize with [`CameraModel::synthetic`] and clip planes (1, 1000).
    pub fn init_without_camera_file(&mut self) -> Result<(), TrackerInitError> {
        self.check_pixel_format()?;
        self.install_camera(CameraModel::synthetic())
    }

    /// Initialize with a caller-built model.
    pub fn init_with_camera(&mut self, camera: CameraModel) -> Result<(), TrackerInitError> {
        self.check_pixel_format()?;
        self.install_camera(camera)
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.camera.is_some()
    }

    /// Run the detection engine on `frame` with the current threshold and
    /// return the valid marker ids in detection order.
    ///
    /// Returns an empty list without touching any state for an empty frame.
    /// Returns an empty list when the session is not initialized, when the
    /// frame layout differs from the configured pixel format, or when the
    /// engine fails; in the last case the previous detection set is kept
    /// but its generation does not advance.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, frame),
            fields(width = frame.width, height = frame.height, threshold = self.params.threshold)
        )
    )]
    pub fn detect(&mut self, frame: &FrameView<'_>) -> Vec<i32> {
        if frame.is_empty() {
            return Vec::new();
        }
        if self.camera.is_none() {
            self.report(Diagnostic::NotInitialized);
            return Vec::new();
        }
        if frame.format != self.params.pixel_format {
            self.report(Diagnostic::FrameFormatMismatch {
                expected: self.params.pixel_format,
                got: frame.format,
            });
            return Vec::new();
        }

        self.confidence = 0.0;

        let threshold = self.params.threshold;
        let engine = &mut self.engine;
        if let Err(err) = self
            .detections
            .refill(|markers| engine.detect_markers(frame, threshold, markers))
        {
            self.report(Diagnostic::DetectionFailed {
                reason: err.to_string(),
            });
            return Vec::new();
        }

        let ids: Vec<i32> = self.detections.valid_ids().collect();
        log::debug!(
            "frame {}: {} candidates, {} valid",
            self.detections.generation(),
            self.detections.len(),
            ids.len()
        );
        ids
    }

    /// Store `threshold` as the session threshold, then [`detect`](Self::detect).
    pub fn detect_with_threshold(&mut self, frame: &FrameView<'_>, threshold: u8) -> Vec<i32> {
        self.params.threshold = threshold;
        self.detect(frame)
    }

    /// Select the valid marker with the highest confidence (earliest wins
    /// ties) and compute its pose. Returns `None`, leaving pose and
    /// confidence untouched, when there is no valid candidate.
    ///
    /// The id is returned even if no pose could be estimated for it. The
    /// pose then still belongs to an earlier selection and
    /// [`confidence`](Self::confidence) stays `0.0`, so check it before
    /// trusting the pose.
    pub fn select_best_by_confidence(&mut self) -> Option<i32> {
        let id = self.detections.best_by_confidence()?.id;
        self.select_by_id(id);
        Some(id)
    }

    /// Compute the pose of every record carrying `id`, in detection order.
    ///
    /// Each match overwrites pose, rendering matrix and confidence, so with
    /// duplicate ids the last match wins. Records whose pose cannot be
    /// estimated are skipped. Returns the number of records applied; `0`
    /// means nothing changed. The invalid id is never selectable.
    pub fn select_by_id(&mut self, id: i32) -> usize {
        if id == INVALID_MARKER_ID {
            return 0;
        }
        let Some(camera) = self.camera.as_ref() else {
            return 0;
        };
        let center = self.params.marker_center;
        let width = self.params.marker_width;

        let mut applied = 0;
        for marker in self.detections.markers().iter().filter(|m| m.id == id) {
            match self.estimator.estimate_pose(camera, marker, center, width) {
                Ok(pose) => {
                    self.pose = pose;
                    self.gl_pose = gl_matrix_from_pose(&pose);
                    self.confidence = marker.confidence;
                    applied += 1;
                }
                Err(err) => self.sink.report(&Diagnostic::PoseEstimateFailed {
                    id,
                    reason: err.to_string(),
                }),
            }
        }
        applied
    }

    /// Register a pattern file with the pattern loader.
    pub fn add_pattern(&mut self, path: impl AsRef<Path>) -> Result<PatternId, PatternError> {
        let path = path.as_ref();
        self.patterns.load_pattern(path).inspect_err(|err| {
            self.sink.report(&Diagnostic::PatternLoadFailed {
                path: path.to_path_buf(),
                code: err.code(),
                reason: err.to_string(),
            })
        })
    }

    /// Pose of the last selected marker.
    #[inline]
    pub fn pose(&self) -> PoseMatrix {
        self.pose
    }

    /// [`pose`](Self::pose) in the column-major rendering convention.
    #[inline]
    pub fn gl_pose(&self) -> GlMatrix {
        self.gl_pose
    }

    /// Confidence of the last selected marker; reset to 0 by each detection.
    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// First record with `id` in the current detection set.
    pub fn marker_info_by_id(&self, id: i32) -> Option<&DetectedMarker> {
        self.detections.find(id)
    }

    /// Raw records of the current detection set, invalid ones included.
    #[inline]
    pub fn detections(&self) -> &[DetectedMarker] {
        self.detections.markers()
    }

    #[inline]
    pub fn detection_count(&self) -> usize {
        self.detections.len()
    }

    pub fn detection_handle(&self) -> DetectionHandle {
        self.detections.handle()
    }

    pub fn detections_for(
        &self,
        handle: DetectionHandle,
    ) -> Result<&[DetectedMarker], StaleDetectionHandle> {
        self.detections.resolve(handle)
    }

    #[inline]
    pub fn camera(&self) -> Option<&CameraModel> {
        self.camera.as_ref()
    }

    /// Rendering projection of the installed camera.
    pub fn gl_projection(&self) -> Option<GlMatrix> {
        self.camera.as_ref().map(CameraModel::gl_projection)
    }

    #[inline]
    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    #[inline]
    pub fn threshold(&self) -> u8 {
        self.params.threshold
    }

    pub fn set_threshold(&mut self, threshold: u8) {
        self.params.threshold = threshold;
    }

    #[inline]
    pub fn marker_width(&self) -> f64 {
        self.params.marker_width
    }

    pub fn set_marker_width(&mut self, width: f64) {
        self.params.marker_width = width;
    }

    #[inline]
    pub fn marker_center(&self) -> [f64; 2] {
        self.params.marker_center
    }

    pub fn set_marker_center(&mut self, center: [f64; 2]) {
        self.params.marker_center = center;
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn estimator(&self) -> &P {
        &self.estimator
    }
}
