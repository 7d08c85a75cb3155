//! Landmark points and the face-mesh index space

use crate::MeshError;
use serde::{Deserialize, Serialize};

/// Number of points in one face-mesh landmark set
pub const MESH_POINT_COUNT: usize = 468;

/// Nose tip
pub const NOSE_TIP: usize = 1;

/// Left cheek extreme
pub const LEFT_CHEEK: usize = 234;

/// Right cheek extreme
pub const RIGHT_CHEEK: usize = 454;

/// Six-point contour of the subject's left eye
pub const LEFT_EYE: EyeIndices = EyeIndices([362, 385, 387, 263, 373, 380]);

/// Six-point contour of the subject's right eye
pub const RIGHT_EYE: EyeIndices = EyeIndices([33, 160, 158, 133, 153, 144]);

/// Six landmark indices around one eye, ordered p1..p6.
///
/// (p1, p4) are the corners, (p2, p6) and (p3, p5) the vertical pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeIndices(pub [usize; 6]);

impl EyeIndices {
    pub fn as_array(&self) -> [usize; 6] {
        self.0
    }
}

/// A normalized landmark point (x, y in [0, 1] of the frame; z relative depth)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Euclidean distance in the image plane
    pub fn distance(&self, other: &Landmark) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// One frame's worth of landmarks for a single face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLandmarkSet")]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

/// Serialized form, checked by `LandmarkSet::new` on the way in
#[derive(Deserialize)]
struct RawLandmarkSet {
    points: Vec<Landmark>,
}

impl TryFrom<RawLandmarkSet> for LandmarkSet {
    type Error = MeshError;

    fn try_from(raw: RawLandmarkSet) -> Result<Self, Self::Error> {
        Self::new(raw.points)
    }
}

impl LandmarkSet {
    /// Wrap a point list; must cover the full mesh index space
    pub fn new(points: Vec<Landmark>) -> Result<Self, MeshError> {
        if points.len() < MESH_POINT_COUNT {
            return Err(MeshError::TooFewPoints {
                expected: MESH_POINT_COUNT,
                actual: points.len(),
            });
        }
        Ok(Self { points })
    }

    /// Caller guarantees `points.len() >= MESH_POINT_COUNT`
    pub(crate) fn from_full_mesh(points: Vec<Landmark>) -> Self {
        debug_assert!(points.len() >= MESH_POINT_COUNT);
        Self { points }
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point by model index
    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn nose_tip(&self) -> Landmark {
        self.points[NOSE_TIP]
    }

    pub fn left_cheek(&self) -> Landmark {
        self.points[LEFT_CHEEK]
    }

    pub fn right_cheek(&self) -> Landmark {
        self.points[RIGHT_CHEEK]
    }

    /// The six contour points of one eye, in p1..p6 order
    pub fn eye(&self, indices: EyeIndices) -> [Landmark; 6] {
        indices.0.map(|i| self.points[i])
    }

    pub fn set(&mut self, index: usize, point: Landmark) {
        if let Some(slot) = self.points.get_mut(index) {
            *slot = point;
        }
    }

    /// Apply the same offset to every point
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| Landmark { x: p.x + dx, y: p.y + dy, z: p.z })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_sets() {
        let err = LandmarkSet::new(vec![Landmark::default(); 10]).unwrap_err();
        assert!(matches!(err, MeshError::TooFewPoints { expected: 468, actual: 10 }));
    }

    #[test]
    fn test_deserialize_checks_point_count() {
        assert!(serde_json::from_str::<LandmarkSet>(r#"{"points":[]}"#).is_err());
        assert!(serde_json::from_str::<LandmarkSet>(r#"{"points":[{"x":0.5,"y":0.5}]}"#).is_err());

        let full = LandmarkSet::new(vec![Landmark::new(0.5, 0.5); MESH_POINT_COUNT]).unwrap();
        let json = serde_json::to_string(&full).unwrap();
        let back: LandmarkSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), MESH_POINT_COUNT);
        assert_eq!(back.nose_tip(), Landmark::new(0.5, 0.5));
    }

    #[test]
    fn test_indices_in_range() {
        for idx in LEFT_EYE.0.iter().chain(RIGHT_EYE.0.iter()) {
            assert!(*idx < MESH_POINT_COUNT);
        }
        assert!(RIGHT_CHEEK < MESH_POINT_COUNT);
    }

    #[test]
    fn test_eye_order() {
        let mut set = LandmarkSet::new(vec![Landmark::default(); MESH_POINT_COUNT]).unwrap();
        set.set(362, Landmark::new(0.1, 0.2));
        set.set(380, Landmark::new(0.6, 0.7));
        let eye = set.eye(LEFT_EYE);
        assert_eq!(eye[0], Landmark::new(0.1, 0.2));
        assert_eq!(eye[5], Landmark::new(0.6, 0.7));
    }

    #[test]
    fn test_distance() {
        let a = Landmark::new(0.0, 0.0);
        let b = Landmark::new(0.3, 0.4);
        assert!((a.distance(&b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_z_defaults_when_missing() {
        let p: Landmark = serde_json::from_str(r#"{"x":0.5,"y":0.25}"#).unwrap();
        assert_eq!(p, Landmark::new(0.5, 0.25));
    }
}
