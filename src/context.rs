//! Host-facing detection context: the narrow call boundary.

use crate::{
    config::Config,
    pipeline::FacePipeline,
    registry::{Handle, Registry},
    result::DetectionResult,
    utils::image_conversion::rgba_to_bgr_mat,
    Error, Result,
};
use image::RgbaImage;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// The embedding context threaded through all boundary calls.
///
/// Constructed once by the host and passed by reference; owns the handle
/// registry and the detector-side configuration. There is no global state:
/// two contexts are fully independent.
pub struct FaceDetContext {
    registry: Registry<FacePipeline>,
    config: Config,
}

impl FaceDetContext {
    /// Create a context with the given configuration
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            registry: Registry::new(),
            config,
        }
    }

    /// Create a context with the default configuration
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Allocate a handle for one host-side detector object
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned
    pub fn create_handle(&self) -> Result<Handle> {
        self.registry.create()
    }

    /// Initialize the handle's detector instance from a landmark model path.
    ///
    /// If the handle already holds a live instance, that instance is fully
    /// released before the new one is installed. On construction failure
    /// the slot is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if either model fails to load or the handle is
    /// unknown
    pub fn init<P: AsRef<Path>>(&self, handle: Handle, landmark_model_path: P) -> Result<()> {
        log::info!("Initializing detector for handle {}", handle.id());
        let pipeline = FacePipeline::new(&self.config.detector, landmark_model_path)?;
        self.registry.replace(handle, Some(pipeline))
    }

    /// Release the handle's detector instance.
    ///
    /// Safe to call on a handle that was never initialized; deinitializing
    /// twice in a row is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown
    pub fn deinit(&self, handle: Handle) -> Result<()> {
        log::info!("Deinitializing detector for handle {}", handle.id());
        self.registry.replace(handle, None)
    }

    /// Drop the handle itself, releasing any live instance.
    /// The handle is invalid afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown
    pub fn release_handle(&self, handle: Handle) -> Result<()> {
        self.registry.remove(handle)
    }

    /// Detect faces in an image file
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown or uninitialized, the
    /// file cannot be decoded, or detection fails
    pub fn detect_path<P: AsRef<Path>>(&self, handle: Handle, path: P) -> Result<Vec<DetectionResult>> {
        let instance = self.instance(handle)?;
        let mut pipeline = instance.lock().map_err(|_| Error::LockPoisoned("pipeline"))?;

        let count = pipeline.detect_path(path)?;
        log::info!("Detected {count} faces for handle {}", handle.id());
        pipeline.results()
    }

    /// Detect faces in a decoded RGBA bitmap.
    ///
    /// The alpha channel is stripped and the pixels converted to the
    /// 3-channel layout the detector requires.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown or uninitialized, the
    /// bitmap cannot be converted, or detection fails
    pub fn detect_bitmap(&self, handle: Handle, bitmap: &RgbaImage) -> Result<Vec<DetectionResult>> {
        let image = rgba_to_bgr_mat(bitmap)?;

        let instance = self.instance(handle)?;
        let mut pipeline = instance.lock().map_err(|_| Error::LockPoisoned("pipeline"))?;

        let count = pipeline.detect_mat(&image)?;
        log::info!("Detected {count} faces for handle {}", handle.id());
        pipeline.results()
    }

    fn instance(&self, handle: Handle) -> Result<Arc<Mutex<FacePipeline>>> {
        self.registry.get(handle)?.ok_or(Error::NotInitialized)
    }
}
