//! Canonical 3D face geometry used as the PnP reference.

use crate::{
    constants::{
        LANDMARK_CHIN, LANDMARK_LEFT_EYE_OUTER, LANDMARK_LEFT_MOUTH_CORNER, LANDMARK_NOSE_TIP,
        LANDMARK_RIGHT_EYE_OUTER, LANDMARK_RIGHT_MOUTH_CORNER, NUM_FACIAL_LANDMARKS,
    },
    Error, Result,
};
use opencv::core::{Point2d, Point2f, Point3d};

/// Number of correspondence points in the canonical model
pub const MODEL_POINT_COUNT: usize = 6;

/// The six canonical 3D reference points of a generic face, in model units.
///
/// Order: nose tip, chin, left eye outer corner, right eye outer corner,
/// left mouth corner, right mouth corner. The nose tip must stay at the
/// coordinate-system origin; the pose solver relies on it.
#[must_use]
pub fn model_points() -> [Point3d; MODEL_POINT_COUNT] {
    [
        Point3d::new(0.0, 0.0, 0.0),
        Point3d::new(0.0, -330.0, -65.0),
        Point3d::new(-225.0, 170.0, -135.0),
        Point3d::new(225.0, 170.0, -135.0),
        Point3d::new(-150.0, -150.0, -125.0),
        Point3d::new(150.0, -150.0, -125.0),
    ]
}

/// Extract the six 2D image points corresponding to [`model_points`] from a
/// full 68-point landmark shape.
///
/// The output order matches the canonical model point order exactly;
/// correspondence is positional, not labeled.
///
/// # Errors
///
/// Returns an error if the shape does not have exactly 68 points.
pub fn correspondence_points(landmarks: &[Point2f]) -> Result<[Point2d; MODEL_POINT_COUNT]> {
    if landmarks.len() != NUM_FACIAL_LANDMARKS {
        return Err(Error::InvalidInput(format!(
            "Expected {} landmarks, got {}",
            NUM_FACIAL_LANDMARKS,
            landmarks.len()
        )));
    }

    let pick = |idx: usize| {
        let p = landmarks[idx];
        Point2d::new(f64::from(p.x), f64::from(p.y))
    };

    Ok([
        pick(LANDMARK_NOSE_TIP),
        pick(LANDMARK_CHIN),
        pick(LANDMARK_LEFT_EYE_OUTER),
        pick(LANDMARK_RIGHT_EYE_OUTER),
        pick(LANDMARK_LEFT_MOUTH_CORNER),
        pick(LANDMARK_RIGHT_MOUTH_CORNER),
    ])
}
