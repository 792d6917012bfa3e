//! Face detection and head pose estimation library.
//!
//! The pipeline turns raw pixels into structured per-face results:
//! 1. Face detection locates face bounding boxes (ONNX Runtime)
//! 2. Landmark extraction predicts 68 key points per face
//! 3. Pose estimation recovers head orientation by solving `PnP` against a
//!    canonical 3D face model and projects three axis endpoints back into
//!    image space
//! 4. Result aggregation packages box, label, landmarks and pose indicator
//!    points into one record per face
//!
//! Hosts embed the library through [`FaceDetContext`]: an explicit context
//! object owning a registry of opaque handles, each holding at most one
//! live detector instance.
//!
//! # Examples
//!
//! ```no_run
//! use facedet::{config::Config, FaceDetContext};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let context = FaceDetContext::new(Config::default());
//!
//! let handle = context.create_handle()?;
//! context.init(handle, "assets/face_landmarks.onnx")?;
//!
//! for face in context.detect_path(handle, "group_photo.jpg")? {
//!     println!(
//!         "face at ({}, {})-({}, {}), {} landmarks, pose: {}",
//!         face.bbox.left,
//!         face.bbox.top,
//!         face.bbox.right,
//!         face.bbox.bottom,
//!         face.landmarks.len(),
//!         face.pose_points.is_some(),
//!     );
//! }
//!
//! context.deinit(handle)?;
//! # Ok(())
//! # }
//! ```

/// Pinhole camera intrinsics derived from image dimensions
pub mod camera;

/// Configuration management
pub mod config;

/// Constants used throughout the library
pub mod constants;

/// Host-facing detection context
pub mod context;

/// Error types and result handling
pub mod error;

/// Face detection module for finding faces in images
pub mod face_detection;

/// Canonical 3D face geometry for pose solving
pub mod face_model;

/// Facial landmark detection module for finding 68 key points
pub mod mark_detection;

/// The stateful per-instance detection pipeline
pub mod pipeline;

/// Head pose estimation using the `PnP` algorithm
pub mod pose_estimation;

/// Handle registry guarding instance lifecycle
pub mod registry;

/// Per-face detection results
pub mod result;

/// Utility functions for image processing and coordinate handling
pub mod utils;

pub use context::FaceDetContext;
pub use error::{Error, Result};
pub use registry::Handle;
pub use result::{BoundingBox, DetectionResult};
