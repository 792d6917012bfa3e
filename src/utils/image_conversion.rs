//! Conversion from host bitmap formats to OpenCV matrices.

use crate::utils::safe_cast::u32_to_i32;
use crate::{Error, Result};
use image::RgbaImage;
use opencv::core::{Mat, Scalar, Vec3b, CV_8UC3};
use opencv::prelude::*;

/// Convert a decoded RGBA bitmap into a 3-channel BGR `Mat`.
///
/// The alpha channel is dropped; the detector contract requires 3-channel
/// input, so every bitmap entering the pipeline goes through here first.
///
/// # Errors
///
/// Returns an error if the bitmap is empty or too large for OpenCV
/// dimensions
#[allow(clippy::cast_possible_wrap)] // Coordinates bounded by checked dimensions
pub fn rgba_to_bgr_mat(bitmap: &RgbaImage) -> Result<Mat> {
    let width = u32_to_i32(bitmap.width())?;
    let height = u32_to_i32(bitmap.height())?;
    if width == 0 || height == 0 {
        return Err(Error::InvalidInput(format!(
            "Empty bitmap: {width}x{height}"
        )));
    }

    let mut mat = Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0))?;
    for (x, y, pixel) in bitmap.enumerate_pixels() {
        let [r, g, b, _alpha] = pixel.0;
        *mat.at_2d_mut::<Vec3b>(y as i32, x as i32)? = Vec3b::from([b, g, r]);
    }

    Ok(mat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_rgba_to_bgr_channel_order() {
        let mut bitmap = RgbaImage::new(2, 2);
        bitmap.put_pixel(0, 0, Rgba([10, 20, 30, 255]));
        bitmap.put_pixel(1, 1, Rgba([200, 100, 50, 0]));

        let mat = rgba_to_bgr_mat(&bitmap).unwrap();

        assert_eq!(mat.rows(), 2);
        assert_eq!(mat.cols(), 2);
        assert_eq!(mat.channels(), 3);

        // RGBA (10, 20, 30, 255) becomes BGR (30, 20, 10); alpha is gone
        let pixel = mat.at_2d::<Vec3b>(0, 0).unwrap();
        assert_eq!(pixel[0], 30);
        assert_eq!(pixel[1], 20);
        assert_eq!(pixel[2], 10);

        // Fully transparent pixels convert the same way
        let pixel = mat.at_2d::<Vec3b>(1, 1).unwrap();
        assert_eq!(pixel[0], 50);
        assert_eq!(pixel[1], 100);
        assert_eq!(pixel[2], 200);
    }

    #[test]
    fn test_empty_bitmap_is_rejected() {
        let bitmap = RgbaImage::new(0, 0);
        assert!(rgba_to_bgr_mat(&bitmap).is_err());
    }
}
