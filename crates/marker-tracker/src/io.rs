//! JSON configuration for building a ready-to-use session.

use std::{
    fs,
    path::{Path, PathBuf},
};

use marker_tracker_core::{DEFAULT_FAR_CLIP, DEFAULT_NEAR_CLIP};
use serde::{Deserialize, Serialize};

use crate::{
    DetectionEngine, PatternError, PatternId, PoseEstimator, TrackerInitError, TrackerParams,
    TrackingSession,
};

#[derive(thiserror::Error, Debug)]
pub enum TrackerIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum TrackerConfigError {
    #[error(transparent)]
    Init(#[from] TrackerInitError),
    #[error("pattern {} could not be registered", path.display())]
    Pattern {
        path: PathBuf,
        #[source]
        source: PatternError,
    },
}

fn default_near_clip() -> f64 {
    DEFAULT_NEAR_CLIP
}

fn default_far_clip() -> f64 {
    DEFAULT_FAR_CLIP
}

/// Tracker configuration file.
///
/// Without `camera_file` the session is initialized with the synthetic
/// camera and the clip fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub camera_file: Option<PathBuf>,
    #[serde(default = "default_near_clip")]
    pub near_clip: f64,
    #[serde(default = "default_far_clip")]
    pub far_clip: f64,
    #[serde(default)]
    pub params: TrackerParams,
    /// Pattern files registered in order after initialization.
    #[serde(default)]
    pub patterns: Vec<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            camera_file: None,
            near_clip: DEFAULT_NEAR_CLIP,
            far_clip: DEFAULT_FAR_CLIP,
            params: TrackerParams::default(),
            patterns: Vec::new(),
        }
    }
}

impl TrackerConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, TrackerIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), TrackerIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Build a session with the default estimator and initialize it.
    pub fn build_session<E: DetectionEngine>(
        &self,
        engine: E,
    ) -> Result<TrackingSession<E>, TrackerConfigError> {
        let mut session = TrackingSession::new(engine, self.params.clone());
        self.initialize(&mut session)?;
        Ok(session)
    }

    /// Initialize `session` and register the configured patterns. Any
    /// pattern that fails to load aborts with an error.
    pub fn initialize<E: DetectionEngine, P: PoseEstimator>(
        &self,
        session: &mut TrackingSession<E, P>,
    ) -> Result<Vec<PatternId>, TrackerConfigError> {
        match &self.camera_file {
            Some(path) => session.init_with_camera_file(path, self.near_clip, self.far_clip)?,
            None => session.init_without_camera_file()?,
        }

        self.patterns
            .iter()
            .map(|path| {
                session
                    .add_pattern(path)
                    .map_err(|source| TrackerConfigError::Pattern {
                        path: path.clone(),
                        source,
                    })
            })
            .collect()
    }
}
