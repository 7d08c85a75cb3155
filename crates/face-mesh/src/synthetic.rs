//! Synthetic faces for demos and tests

use crate::{EyeIndices, Landmark, LandmarkSet, LEFT_CHEEK, LEFT_EYE, MESH_POINT_COUNT, NOSE_TIP, RIGHT_CHEEK, RIGHT_EYE};

const EYE_WIDTH: f64 = 0.08;

/// Parameters of a generated face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticFace {
    /// Eye aspect ratio of both eyes
    pub ear: f64,
    /// Normalized vertical position of the nose tip
    pub nose_y: f64,
    /// Horizontal span between the cheek extremes
    pub face_width: f64,
}

impl Default for SyntheticFace {
    fn default() -> Self {
        Self {
            ear: 0.30,
            nose_y: 0.50,
            face_width: 0.30,
        }
    }
}

impl SyntheticFace {
    pub fn with_ear(mut self, ear: f64) -> Self {
        self.ear = ear;
        self
    }

    pub fn with_nose_y(mut self, nose_y: f64) -> Self {
        self.nose_y = nose_y;
        self
    }

    pub fn with_face_width(mut self, face_width: f64) -> Self {
        self.face_width = face_width;
        self
    }

    /// Build a full mesh-sized landmark set
    pub fn build(&self) -> LandmarkSet {
        let mut points = vec![Landmark::new(0.5, 0.5); MESH_POINT_COUNT];

        place_eye(&mut points, LEFT_EYE, 0.6, 0.4, self.ear);
        place_eye(&mut points, RIGHT_EYE, 0.4, 0.4, self.ear);

        points[NOSE_TIP] = Landmark::new(0.5, self.nose_y);
        points[LEFT_CHEEK] = Landmark::new(0.5 - self.face_width / 2.0, 0.5);
        points[RIGHT_CHEEK] = Landmark::new(0.5 + self.face_width / 2.0, 0.5);

        LandmarkSet::from_full_mesh(points)
    }
}

// Corners on the horizontal axis, both vertical pairs `ear * width` apart.
fn place_eye(points: &mut [Landmark], eye: EyeIndices, cx: f64, cy: f64, ear: f64) {
    let [p1, p2, p3, p4, p5, p6] = eye.0;
    let half_open = ear * EYE_WIDTH / 2.0;
    points[p1] = Landmark::new(cx - EYE_WIDTH / 2.0, cy);
    points[p4] = Landmark::new(cx + EYE_WIDTH / 2.0, cy);
    points[p2] = Landmark::new(cx - EYE_WIDTH / 6.0, cy - half_open);
    points[p6] = Landmark::new(cx - EYE_WIDTH / 6.0, cy + half_open);
    points[p3] = Landmark::new(cx + EYE_WIDTH / 6.0, cy - half_open);
    points[p5] = Landmark::new(cx + EYE_WIDTH / 6.0, cy + half_open);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_geometry() {
        let face = SyntheticFace::default()
            .with_nose_y(0.8)
            .with_face_width(0.5)
            .build();
        assert_eq!(face.len(), MESH_POINT_COUNT);
        assert_eq!(face.nose_tip().y, 0.8);
        assert!(((face.left_cheek().x - face.right_cheek().x).abs() - 0.5).abs() < 1e-12);

        let eye = face.eye(LEFT_EYE);
        let vertical = eye[1].distance(&eye[5]);
        let horizontal = eye[0].distance(&eye[3]);
        assert!((vertical / horizontal - 0.30).abs() < 1e-9);
    }
}
