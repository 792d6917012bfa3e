//! Per-face detection results and their assembly.

use crate::constants::{FACE_LABEL, NUM_POSE_POINTS};
use opencv::core::{Point, Point2d, Point2f, Rect};
use std::collections::HashMap;

/// Axis-aligned face bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl From<Rect> for BoundingBox {
    fn from(rect: Rect) -> Self {
        Self {
            left: rect.x,
            top: rect.y,
            right: rect.x + rect.width,
            bottom: rect.y + rect.height,
        }
    }
}

/// One detected face: bounding box and label always, landmarks and pose
/// indicator points only when a shape was found for this face.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Face bounding box
    pub bbox: BoundingBox,
    /// Detection label, always [`FACE_LABEL`]
    pub label: &'static str,
    /// 68 landmark points in image coordinates, empty when no shape was found
    pub landmarks: Vec<Point>,
    /// Projected pose axis endpoints, present only when a shape was found
    /// and the pose solver converged
    pub pose_points: Option<[Point2d; NUM_POSE_POINTS]>,
}

/// Assemble the ordered result sequence from detector output.
///
/// Produces exactly one record per detected box, index-for-index with the
/// detector ordering. Faces with no entry in `shapes` get an empty landmark
/// list and no pose. `pose_points` is invoked once per face that has a
/// shape; returning `None` leaves the record without pose indicators.
#[allow(clippy::cast_possible_truncation)] // Landmark pixel rounding
pub fn assemble_results<F>(
    boxes: &[Rect],
    shapes: &HashMap<usize, Vec<Point2f>>,
    mut pose_points: F,
) -> Vec<DetectionResult>
where
    F: FnMut(&[Point2f]) -> Option<[Point2d; NUM_POSE_POINTS]>,
{
    boxes
        .iter()
        .enumerate()
        .map(|(index, &rect)| {
            let (landmarks, pose) = match shapes.get(&index) {
                Some(shape) => {
                    let landmarks = shape
                        .iter()
                        .map(|p| Point::new(p.x.round() as i32, p.y.round() as i32))
                        .collect();
                    (landmarks, pose_points(shape))
                }
                None => (Vec::new(), None),
            };

            DetectionResult {
                bbox: rect.into(),
                label: FACE_LABEL,
                landmarks,
                pose_points: pose,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_from_rect() {
        let bbox = BoundingBox::from(Rect::new(10, 20, 30, 40));
        assert_eq!(bbox.left, 10);
        assert_eq!(bbox.top, 20);
        assert_eq!(bbox.right, 40);
        assert_eq!(bbox.bottom, 60);
    }

    #[test]
    fn test_assemble_empty() {
        let results = assemble_results(&[], &HashMap::new(), |_| None);
        assert!(results.is_empty());
    }

    #[test]
    fn test_assemble_without_shape() {
        let boxes = vec![Rect::new(0, 0, 10, 10)];
        let results = assemble_results(&boxes, &HashMap::new(), |_| {
            panic!("pose must not be computed without a shape")
        });

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].label, "face");
        assert!(results[0].landmarks.is_empty());
        assert!(results[0].pose_points.is_none());
    }

    #[test]
    fn test_landmark_rounding() {
        let boxes = vec![Rect::new(0, 0, 10, 10)];
        let mut shapes = HashMap::new();
        shapes.insert(0, vec![Point2f::new(1.6, 2.4)]);

        let results = assemble_results(&boxes, &shapes, |_| None);
        assert_eq!(results[0].landmarks[0], Point::new(2, 2));
    }
}
