//! 68-point facial landmark extraction backed by ONNX Runtime.

use crate::{constants::NUM_FACIAL_LANDMARKS, utils::safe_cast::usize_to_i32, Error, Result};
use ndarray::{Array1, Array4, CowArray};
use opencv::core::{Mat, Point2f, Size, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Landmark detector input size
const LANDMARK_INPUT_SIZE: i32 = 128;

/// Values per face in the model output (68 points, x and y)
const OUTPUT_VALUES_PER_FACE: usize = NUM_FACIAL_LANDMARKS * 2;

/// Facial landmark detector using an ONNX shape regression model
///
/// The landmark topology is fixed by the trained model (68-point scheme);
/// it is not configurable at runtime.
pub struct MarkDetector {
    session: Session,
    input_size: i32,
}

impl MarkDetector {
    /// Create a new landmark detector from an ONNX model file
    ///
    /// # Errors
    ///
    /// Returns an error if the model file cannot be loaded, the model has
    /// no inputs or outputs, or the runtime environment cannot be created.
    /// Construction failure is fatal for the instance.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        log::info!(
            "Initializing MarkDetector with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("mark_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelInputError("Model has no inputs".to_string()));
        }
        if session.outputs.is_empty() {
            return Err(Error::ModelOutputError("Model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            input_size: LANDMARK_INPUT_SIZE,
        })
    }

    /// Predict the landmark shape for a single face crop
    ///
    /// Coordinates are returned relative to the crop, scaled to its size.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails
    pub fn detect(&self, face_image: &Mat) -> Result<Vec<Point2f>> {
        let results = self.detect_batch(&[face_image])?;
        Ok(results.into_iter().next().unwrap_or_default())
    }

    /// Predict landmark shapes for a batch of face crops
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing fails, inference fails, or the
    /// output tensor does not hold 136 values per face
    pub fn detect_batch(&self, face_images: &[&Mat]) -> Result<Vec<Vec<Point2f>>> {
        if face_images.is_empty() {
            return Ok(Vec::new());
        }

        let preprocessed = self.preprocess_batch(face_images)?;
        let marks = self.forward(preprocessed)?;

        if marks.len() != face_images.len() * OUTPUT_VALUES_PER_FACE {
            return Err(Error::ModelOutputError(format!(
                "Expected {} output values for {} faces, got {}",
                face_images.len() * OUTPUT_VALUES_PER_FACE,
                face_images.len(),
                marks.len()
            )));
        }

        Ok(self.postprocess(&marks, face_images))
    }

    /// Resize, color-convert and normalize the crops into an NHWC tensor
    #[allow(clippy::cast_sign_loss)] // OpenCV dimensions are positive
    fn preprocess_batch(&self, images: &[&Mat]) -> Result<Array4<f32>> {
        let batch_size = images.len();
        let size = self.input_size as usize;
        let channels = 3;

        let mut batch_data = vec![0.0f32; batch_size * size * size * channels];

        for (idx, &image) in images.iter().enumerate() {
            let mut resized = Mat::default();
            imgproc::resize(
                image,
                &mut resized,
                Size::new(self.input_size, self.input_size),
                0.0,
                0.0,
                InterpolationFlags::INTER_LINEAR as i32,
            )?;

            let mut rgb_image = Mat::default();
            imgproc::cvt_color(&resized, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

            // Normalize to [0, 1]
            let mut float_image = Mat::default();
            rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

            let offset = idx * size * size * channels;
            for row in 0..size {
                for col in 0..size {
                    let pixel =
                        float_image.at_2d::<opencv::core::Vec3f>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                    for ch in 0..channels {
                        batch_data[offset + (row * size + col) * channels + ch] = pixel[ch];
                    }
                }
            }
        }

        Array4::from_shape_vec((batch_size, size, size, channels), batch_data)
            .map_err(|e| Error::ModelDataFormatError(format!("Failed to create input array: {e}")))
    }

    /// Run forward pass through the model
    fn forward(&self, inputs: Array4<f32>) -> Result<Array1<f32>> {
        let cow_array = CowArray::from(inputs.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;
        let marks_output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| Error::ModelOutputError("No output from model".to_string()))?;

        let marks_tensor = marks_output.try_extract::<f32>()?;
        let marks_view = marks_tensor.view();
        let marks_data = marks_view
            .as_slice()
            .ok_or_else(|| Error::ModelOutputError("Non-contiguous output tensor".to_string()))?;

        Ok(Array1::from(marks_data.to_vec()))
    }

    /// Scale normalized model output back to per-crop pixel coordinates
    #[allow(clippy::cast_precision_loss)] // Pixel coordinates
    fn postprocess(&self, marks: &Array1<f32>, face_images: &[&Mat]) -> Vec<Vec<Point2f>> {
        face_images
            .iter()
            .enumerate()
            .map(|(i, face_image)| {
                let offset = i * OUTPUT_VALUES_PER_FACE;
                let face_width = face_image.cols() as f32;
                let face_height = face_image.rows() as f32;

                (0..NUM_FACIAL_LANDMARKS)
                    .map(|j| {
                        let idx = offset + j * 2;
                        Point2f::new(
                            marks[idx] * face_width / self.input_size as f32,
                            marks[idx + 1] * face_height / self.input_size as f32,
                        )
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_values_per_face() {
        assert_eq!(OUTPUT_VALUES_PER_FACE, 136);
    }

    #[test]
    fn test_landmark_topology_bounds() {
        // 68-point scheme regions, per the iBUG annotation layout
        // Jaw line 0-16, brows 17-26, nose 27-35, eyes 36-47, lips 48-67
        assert!(16 < NUM_FACIAL_LANDMARKS);
        assert!(26 < NUM_FACIAL_LANDMARKS);
        assert!(35 < NUM_FACIAL_LANDMARKS);
        assert!(47 < NUM_FACIAL_LANDMARKS);
        assert_eq!(67, NUM_FACIAL_LANDMARKS - 1);
    }
}
