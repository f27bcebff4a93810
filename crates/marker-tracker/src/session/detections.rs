use marker_tracker_core::DetectedMarker;

/// Identifies one detection set; see [`DetectionSet::resolve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DetectionHandle {
    pub generation: u64,
    pub count: usize,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("detection handle from generation {handle} is stale (current generation {current})")]
pub struct StaleDetectionHandle {
    pub handle: u64,
    pub current: u64,
}

/// Raw marker records of the last successful detection.
///
/// The set is replaced wholesale by each successful engine run. Engines fill
/// a scratch buffer, which is swapped in only on success, so a failed run
/// leaves the previous set in place.
#[derive(Clone, Debug, Default)]
pub struct DetectionSet {
    markers: Vec<DetectedMarker>,
    scratch: Vec<DetectedMarker>,
    generation: u64,
}

impl DetectionSet {
    pub(crate) fn refill<E>(
        &mut self,
        fill: impl FnOnce(&mut Vec<DetectedMarker>) -> Result<(), E>,
    ) -> Result<(), E> {
        self.scratch.clear();
        fill(&mut self.scratch)?;
        std::mem::swap(&mut self.markers, &mut self.scratch);
        self.generation += 1;
        Ok(())
    }

    #[inline]
    pub fn markers(&self) -> &[DetectedMarker] {
        &self.markers
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Number of sets installed so far; `0` before the first detection.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn handle(&self) -> DetectionHandle {
        DetectionHandle {
            generation: self.generation,
            count: self.markers.len(),
        }
    }

    /// Markers of the set `handle` was taken from, if it is still current.
    pub fn resolve(&self, handle: DetectionHandle) -> Result<&[DetectedMarker], StaleDetectionHandle> {
        if handle.generation != self.generation {
            return Err(StaleDetectionHandle {
                handle: handle.generation,
                current: self.generation,
            });
        }
        Ok(&self.markers)
    }

    /// Ids of valid candidates, in detection order.
    pub fn valid_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.markers.iter().filter(|m| m.is_valid()).map(|m| m.id)
    }

    /// First record carrying `id`.
    pub fn find(&self, id: i32) -> Option<&DetectedMarker> {
        self.markers.iter().find(|m| m.id == id)
    }

    /// Valid candidate with the highest confidence. Only a strictly greater
    /// confidence displaces the current best, so ties go to the earlier entry.
    pub fn best_by_confidence(&self) -> Option<&DetectedMarker> {
        let mut best: Option<&DetectedMarker> = None;
        for marker in self.markers.iter().filter(|m| m.is_valid()) {
            let replace = match best {
                None => true,
                Some(current) => current.confidence < marker.confidence,
            };
            if replace {
                best = Some(marker);
            }
        }
        best
    }
}
