//! Constants used throughout the library

/// Number of facial landmarks for a full face shape
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Landmark indices of the six pose correspondence points (68-point scheme)
pub const LANDMARK_NOSE_TIP: usize = 30;
pub const LANDMARK_CHIN: usize = 8;
pub const LANDMARK_LEFT_EYE_OUTER: usize = 36;
pub const LANDMARK_RIGHT_EYE_OUTER: usize = 45;
pub const LANDMARK_LEFT_MOUTH_CORNER: usize = 48;
pub const LANDMARK_RIGHT_MOUTH_CORNER: usize = 54;

/// Length of the projected pose axes, in canonical model units
pub const POSE_AXIS_LENGTH: f64 = 400.0;

/// Number of projected pose indicator points per face
pub const NUM_POSE_POINTS: usize = 3;

/// Label attached to every face detection result
pub const FACE_LABEL: &str = "face";

/// Camera matrix center factor
pub const CAMERA_CENTER_FACTOR: f64 = 2.0;

/// Image normalization constants for face detection
pub const IMAGE_NORMALIZATION_OFFSET: f32 = 127.5;
pub const IMAGE_NORMALIZATION_SCALE: f32 = 128.0;

/// Relative triangle-area threshold below which six correspondence points
/// are treated as collinear and PnP solving is skipped
pub const DEGENERACY_EPSILON: f64 = 1e-6;

/// Default face region expansion before landmark cropping
pub const DEFAULT_BBOX_EXPANSION: f32 = 0.2;
