//! Landmark providers

use crate::{Landmark, LandmarkSet, MeshError};
use camera_capture::VideoFrame;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

/// Landmark model seam: zero or one face per processed frame
pub trait LandmarkProvider {
    fn process(&mut self, frame: &VideoFrame) -> Result<Option<LandmarkSet>, MeshError>;
}

/// Returns the same result for every frame
#[derive(Debug, Clone, Default)]
pub struct FixedLandmarkProvider {
    face: Option<LandmarkSet>,
}

impl FixedLandmarkProvider {
    pub fn new(face: Option<LandmarkSet>) -> Self {
        Self { face }
    }

    /// Replace the face returned for subsequent frames
    pub fn set_face(&mut self, face: Option<LandmarkSet>) {
        self.face = face;
    }
}

impl LandmarkProvider for FixedLandmarkProvider {
    fn process(&mut self, _frame: &VideoFrame) -> Result<Option<LandmarkSet>, MeshError> {
        Ok(self.face.clone())
    }
}

/// Replays a recorded landmark stream.
///
/// One JSON value per line: `null` for a frame without a face, otherwise an
/// array of `[x, y]` or `[x, y, z]` points in model index order.
#[derive(Debug, Clone)]
pub struct ReplayLandmarkProvider {
    frames: Vec<Option<LandmarkSet>>,
    position: usize,
    looping: bool,
}

impl ReplayLandmarkProvider {
    /// Load a stream from disk
    pub fn open(path: impl AsRef<Path>, looping: bool) -> Result<Self, MeshError> {
        let file = std::fs::File::open(path.as_ref())?;
        let provider = Self::from_reader(std::io::BufReader::new(file), looping)?;
        info!(
            "Loaded landmark replay {} ({} frames)",
            path.as_ref().display(),
            provider.frames.len()
        );
        Ok(provider)
    }

    /// Parse a stream from any buffered reader
    pub fn from_reader(reader: impl BufRead, looping: bool) -> Result<Self, MeshError> {
        let mut frames = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            frames.push(parse_line(trimmed, idx + 1)?);
        }
        Ok(Self {
            frames,
            position: 0,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<Option<LandmarkSet>, MeshError> {
    let raw: Option<Vec<Vec<f64>>> =
        serde_json::from_str(line).map_err(|e| MeshError::InvalidLandmark {
            line: line_no,
            reason: e.to_string(),
        })?;

    let Some(raw) = raw else {
        return Ok(None);
    };

    let points = raw
        .into_iter()
        .map(|coords| match coords.as_slice() {
            [x, y] => Ok(Landmark::new(*x, *y)),
            [x, y, z] => Ok(Landmark { x: *x, y: *y, z: *z }),
            other => Err(MeshError::InvalidLandmark {
                line: line_no,
                reason: format!("expected 2 or 3 coordinates, got {}", other.len()),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    LandmarkSet::new(points).map(Some)
}

impl LandmarkProvider for ReplayLandmarkProvider {
    fn process(&mut self, _frame: &VideoFrame) -> Result<Option<LandmarkSet>, MeshError> {
        if self.frames.is_empty() {
            return Ok(None);
        }
        if self.position >= self.frames.len() {
            if !self.looping {
                return Ok(None);
            }
            debug!("Landmark replay wrapped");
            self.position = 0;
        }
        let face = self.frames[self.position].clone();
        self.position += 1;
        Ok(face)
    }
}
