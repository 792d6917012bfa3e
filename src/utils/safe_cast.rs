//! Safe casting utilities to prevent overflow on 32-bit systems

use crate::{Error, Result};

/// Safely convert usize to i32 with overflow checking
///
/// # Errors
///
/// Returns an error if the value exceeds i32::MAX
pub fn usize_to_i32(value: usize) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Safely convert u32 to i32 with overflow checking
///
/// # Errors
///
/// Returns an error if the value exceeds i32::MAX
pub fn u32_to_i32(value: u32) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Clamp and convert f32 to i32 for pixel coordinates
#[must_use]
#[allow(clippy::cast_precision_loss)] // Acceptable for clamping bounds
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
pub fn f32_to_i32_clamp(value: f32, min: i32, max: i32) -> i32 {
    // Ensure min <= max
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    let clamped = value.clamp(min as f32, max as f32);

    // Ensure result is within bounds after conversion
    let result = clamped as i32;
    result.clamp(min, max)
}
