//! Pattern templates and the bounded store they are loaded into.
//!
//! A `.patt` file holds the template in four orientations. Each orientation
//! is three colour planes, each plane `height` rows of `width` integers in
//! `0..=255`, all whitespace-separated.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Pattern identifier; matches the ids a detection engine reports.
pub type PatternId = i32;

const ORIENTATIONS: usize = 4;
const CHANNELS: usize = 3;

/// Template resolution and store capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternGeometry {
    pub width: usize,
    pub height: usize,
    pub max_patterns: usize,
}

impl Default for PatternGeometry {
    fn default() -> Self {
        Self {
            width: 16,
            height: 16,
            max_patterns: 32,
        }
    }
}

impl PatternGeometry {
    /// Number of values a `.patt` file must contain.
    pub fn value_count(&self) -> usize {
        ORIENTATIONS * CHANNELS * self.width * self.height
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PatternError {
    #[error("cannot read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{token}` is not a pattern value")]
    Parse { token: String },
    #[error("pattern value {value} outside 0..=255")]
    ValueRange { value: i64 },
    #[error("expected {expected} pattern values, found {got}")]
    ValueCount { expected: usize, got: usize },
    #[error("pattern store is full ({capacity} patterns)")]
    StoreFull { capacity: usize },
}

impl PatternError {
    /// Negative status code for callers that expect integer results:
    /// `-1` unreadable file, `-2` malformed template, `-3` store full.
    pub fn code(&self) -> i32 {
        match self {
            PatternError::Io { .. } => -1,
            PatternError::Parse { .. }
            | PatternError::ValueRange { .. }
            | PatternError::ValueCount { .. } => -2,
            PatternError::StoreFull { .. } => -3,
        }
    }
}

/// A template in all four orientations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternTemplate {
    width: usize,
    height: usize,
    /// One `[channel][row][col]` buffer per orientation.
    orientations: [Vec<u8>; ORIENTATIONS],
}

impl PatternTemplate {
    /// Parse template text for the given resolution.
    pub fn parse(text: &str, width: usize, height: usize) -> Result<Self, PatternError> {
        let plane = CHANNELS * width * height;
        let expected = ORIENTATIONS * plane;

        let mut values = Vec::with_capacity(expected);
        for token in text.split_whitespace() {
            let value: i64 = token.parse().map_err(|_| PatternError::Parse {
                token: token.to_owned(),
            })?;
            let byte = u8::try_from(value).map_err(|_| PatternError::ValueRange { value })?;
            values.push(byte);
        }
        if values.len() != expected {
            return Err(PatternError::ValueCount {
                expected,
                got: values.len(),
            });
        }

        let orientations = std::array::from_fn(|dir| values[dir * plane..(dir + 1) * plane].to_vec());
        Ok(Self {
            width,
            height,
            orientations,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw `[channel][row][col]` samples of one orientation (`dir` taken mod 4).
    pub fn orientation(&self, dir: usize) -> &[u8] {
        &self.orientations[dir % ORIENTATIONS]
    }

    pub fn value(&self, dir: usize, channel: usize, row: usize, col: usize) -> Option<u8> {
        if channel >= CHANNELS || row >= self.height || col >= self.width {
            return None;
        }
        let idx = (channel * self.height + row) * self.width + col;
        self.orientation(dir).get(idx).copied()
    }
}

/// Registers pattern files and hands back their ids.
pub trait PatternLoader: Send {
    fn load_pattern(&mut self, path: &Path) -> Result<PatternId, PatternError>;
}

/// In-memory pattern table with a fixed number of slots.
///
/// Ids are slot indices; freed slots are reused lowest first.
#[derive(Clone, Debug)]
pub struct PatternStore {
    geometry: PatternGeometry,
    slots: Vec<Option<PatternTemplate>>,
}

impl PatternStore {
    pub fn new(geometry: PatternGeometry) -> Self {
        Self {
            geometry,
            slots: Vec::new(),
        }
    }

    pub fn geometry(&self) -> PatternGeometry {
        self.geometry
    }

    /// Store an already-parsed template.
    pub fn insert(&mut self, template: PatternTemplate) -> Result<PatternId, PatternError> {
        let slot = match self.slots.iter().position(Option::is_none) {
            Some(free) => free,
            None if self.slots.len() < self.geometry.max_patterns => {
                self.slots.push(None);
                self.slots.len() - 1
            }
            None => {
                return Err(PatternError::StoreFull {
                    capacity: self.geometry.max_patterns,
                })
            }
        };
        self.slots[slot] = Some(template);
        Ok(slot as PatternId)
    }

    /// Release a slot. Returns `false` if nothing was stored under `id`.
    pub fn free_pattern(&mut self, id: PatternId) -> bool {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.slots.get_mut(idx))
            .and_then(Option::take)
            .is_some()
    }

    pub fn get(&self, id: PatternId) -> Option<&PatternTemplate> {
        let idx = usize::try_from(id).ok()?;
        self.slots.get(idx)?.as_ref()
    }

    /// Number of loaded patterns.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PatternLoader for PatternStore {
    fn load_pattern(&mut self, path: &Path) -> Result<PatternId, PatternError> {
        let text = fs::read_to_string(path).map_err(|source| PatternError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let template = PatternTemplate::parse(&text, self.geometry.width, self.geometry.height)?;
        let id = self.insert(template)?;
        log::debug!("loaded pattern {} as id {id}", path.display());
        Ok(id)
    }
}
