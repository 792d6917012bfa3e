//! Pinhole camera model derived from image dimensions.

use crate::{constants::CAMERA_CENTER_FACTOR, Error, Result};
use opencv::core::{Mat, CV_64F};
use opencv::prelude::*;

/// Camera intrinsic parameters for an uncalibrated pinhole approximation.
///
/// The focal length is approximated by the image width and the principal
/// point sits at the image center; no calibration step is involved. Lens
/// distortion is assumed to be zero.
pub struct CameraIntrinsics {
    matrix: Mat,
    dist_coeffs: Mat,
    focal_length: f64,
    principal_point: (f64, f64),
}

impl CameraIntrinsics {
    /// Build intrinsics for an image of the given dimensions
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Either dimension is not positive
    /// - OpenCV matrix construction fails
    pub fn from_image_size(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidInput(format!(
                "Image dimensions must be positive, got {width}x{height}"
            )));
        }

        let focal_length = f64::from(width);
        let center = (
            f64::from(width) / CAMERA_CENTER_FACTOR,
            f64::from(height) / CAMERA_CENTER_FACTOR,
        );

        let mut matrix = Mat::zeros(3, 3, CV_64F)?.to_mat()?;
        let values: [f64; 9] = [
            focal_length,
            0.0,
            center.0,
            0.0,
            focal_length,
            center.1,
            0.0,
            0.0,
            1.0,
        ];
        for (idx, &value) in values.iter().enumerate() {
            let (i, j) = (idx / 3, idx % 3);
            *matrix.at_2d_mut::<f64>(i as i32, j as i32)? = value;
        }

        // No lens distortion
        let dist_coeffs = Mat::zeros(4, 1, CV_64F)?.to_mat()?;

        Ok(Self {
            matrix,
            dist_coeffs,
            focal_length,
            principal_point: center,
        })
    }

    /// The 3x3 intrinsic matrix
    pub fn matrix(&self) -> &Mat {
        &self.matrix
    }

    /// The 4x1 zero distortion coefficient vector
    pub fn dist_coeffs(&self) -> &Mat {
        &self.dist_coeffs
    }

    /// Focal length in pixels
    #[must_use]
    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    /// Principal point in pixel coordinates
    #[must_use]
    pub fn principal_point(&self) -> (f64, f64) {
        self.principal_point
    }
}
