//! The stateful per-instance detection pipeline.

use crate::{
    config::DetectorConfig,
    face_detection::FaceDetector,
    mark_detection::MarkDetector,
    pose_estimation::PoseEstimator,
    result::{assemble_results, DetectionResult},
    utils::refine_boxes,
    Error, Result,
};
use opencv::core::{Mat, Point2f, Rect, Size};
use opencv::imgcodecs;
use opencv::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// One live detector instance: the loaded face detection and landmark
/// models plus the result buffer of the most recent detection call.
///
/// The buffer is replaced on every call; the pipeline never accumulates
/// results across images. Callers needing concurrent detection must
/// serialize access (the handle registry wraps each instance in a mutex).
pub struct FacePipeline {
    face_detector: FaceDetector,
    mark_detector: MarkDetector,
    max_faces: usize,
    bbox_expansion: f32,
    boxes: Vec<Rect>,
    shapes: HashMap<usize, Vec<Point2f>>,
    frame_size: Size,
}

impl FacePipeline {
    /// Load both models and build a ready-to-use pipeline
    ///
    /// # Errors
    ///
    /// Returns an error if either model fails to load. A pipeline that
    /// fails construction must not exist; callers abort instance creation.
    pub fn new<P: AsRef<Path>>(config: &DetectorConfig, landmark_model_path: P) -> Result<Self> {
        let face_detector = FaceDetector::new(
            &config.model,
            config.confidence_threshold,
            config.iou_threshold,
        )?;
        let mark_detector = MarkDetector::new(landmark_model_path)?;

        Ok(Self {
            face_detector,
            mark_detector,
            max_faces: config.max_faces,
            bbox_expansion: config.bbox_expansion,
            boxes: Vec::new(),
            shapes: HashMap::new(),
            frame_size: Size::default(),
        })
    }

    /// Detect faces in an image file, returning the face count
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be decoded or detection fails
    pub fn detect_path<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let image = imgcodecs::imread(
            path.to_str()
                .ok_or_else(|| Error::InvalidInput(format!("Non-UTF-8 path: {}", path.display())))?,
            imgcodecs::IMREAD_COLOR,
        )?;
        if image.empty() {
            return Err(Error::InvalidInput(format!(
                "Cannot decode image: {}",
                path.display()
            )));
        }

        self.detect_mat(&image)
    }

    /// Detect faces in a 3-channel BGR image, returning the face count
    ///
    /// Replaces the result buffer of any previous call. Per-face landmark
    /// failures are absorbed: the face keeps its bounding box but has no
    /// shape entry.
    ///
    /// # Errors
    ///
    /// Returns an error if face detection itself fails
    pub fn detect_mat(&mut self, image: &Mat) -> Result<usize> {
        self.boxes.clear();
        self.shapes.clear();
        self.frame_size = image.size()?;

        let mut faces = self.face_detector.detect(image)?;
        faces.truncate(self.max_faces);

        for (index, face) in faces.iter().enumerate() {
            let mut refined = vec![face.rect];
            refine_boxes(&mut refined, image.cols(), image.rows(), self.bbox_expansion)?;
            let refined = refined[0];

            match self.extract_shape(image, refined) {
                Ok(Some(shape)) => {
                    self.shapes.insert(index, shape);
                }
                Ok(None) => {
                    log::debug!("No usable shape for face {index}");
                }
                Err(e) => {
                    log::debug!("Landmark extraction failed for face {index}: {e}");
                }
            }
        }

        self.boxes.extend(faces.iter().map(|f| f.rect));
        Ok(self.boxes.len())
    }

    /// Crop one refined face region and predict its shape in image coordinates
    fn extract_shape(&self, image: &Mat, refined: Rect) -> Result<Option<Vec<Point2f>>> {
        let roi = Mat::roi(image, refined)?;
        let crop = roi.try_clone()?;

        let mut marks = self.mark_detector.detect(&crop)?;
        if marks.len() != crate::constants::NUM_FACIAL_LANDMARKS {
            return Ok(None);
        }

        offset_to_image(&mut marks, refined.x as f32, refined.y as f32);
        Ok(Some(marks))
    }

    /// Bounding boxes of the most recent detection call, in stable order
    pub fn boxes(&self) -> &[Rect] {
        &self.boxes
    }

    /// Landmark shape for a face index, if one was found
    pub fn shape(&self, index: usize) -> Option<&[Point2f]> {
        self.shapes.get(&index).map(Vec::as_slice)
    }

    /// Number of faces found by the most recent detection call
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.boxes.len()
    }

    /// Assemble the ordered per-face results, estimating pose for every
    /// face that has a shape
    ///
    /// # Errors
    ///
    /// Returns an error if the camera model cannot be built for the last
    /// image's dimensions
    pub fn results(&self) -> Result<Vec<DetectionResult>> {
        let estimator = if self.shapes.is_empty() {
            None
        } else {
            Some(PoseEstimator::from_image_size(
                self.frame_size.width,
                self.frame_size.height,
            )?)
        };

        Ok(assemble_results(&self.boxes, &self.shapes, |shape| {
            estimator.as_ref().and_then(|est| match est.estimate(shape) {
                Ok(pose) => pose.map(|p| p.axis_points),
                Err(e) => {
                    log::debug!("Pose estimation failed: {e}");
                    None
                }
            })
        }))
    }
}

/// Translate crop-relative landmarks back into full-image coordinates
fn offset_to_image(marks: &mut [Point2f], origin_x: f32, origin_y: f32) {
    for point in marks {
        point.x += origin_x;
        point.y += origin_y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_to_image() {
        let mut marks = vec![Point2f::new(1.0, 2.0), Point2f::new(0.0, 0.0)];
        offset_to_image(&mut marks, 100.0, 50.0);

        assert_eq!(marks[0], Point2f::new(101.0, 52.0));
        assert_eq!(marks[1], Point2f::new(100.0, 50.0));
    }
}
