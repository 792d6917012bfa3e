//! Head pose recovery from facial landmarks via `PnP` solving.

use crate::{
    camera::CameraIntrinsics,
    constants::{DEGENERACY_EPSILON, NUM_POSE_POINTS, POSE_AXIS_LENGTH},
    face_model::{self, MODEL_POINT_COUNT},
    Result,
};
use opencv::{
    calib3d,
    core::{Mat, Point2d, Point2f, Point3d, Vec3d, CV_64F},
    prelude::*,
};

/// Recovered head orientation for a single face.
#[derive(Debug, Clone, Copy)]
pub struct HeadPose {
    /// Rotation vector (Rodrigues form) of the head relative to the camera
    pub rotation: Vec3d,
    /// Translation vector of the head relative to the camera
    pub translation: Vec3d,
    /// The three axis endpoints projected back into image space:
    /// forward (+Z), up (+Y), side (+X)
    pub axis_points: [Point2d; NUM_POSE_POINTS],
}

impl HeadPose {
    /// Euler angles (pitch, yaw, roll) in degrees derived from the rotation vector
    ///
    /// # Errors
    ///
    /// Returns an error if the Rodrigues conversion fails
    pub fn euler_angles(&self) -> Result<Vec3d> {
        let rvec = Mat::from_slice(&self.rotation.0)?;
        let mut rotation_matrix = Mat::default();
        calib3d::rodrigues(&rvec, &mut rotation_matrix, &mut Mat::default())?;

        let r13 = rotation_matrix.at_2d::<f64>(0, 2)?;
        let r21 = rotation_matrix.at_2d::<f64>(1, 0)?;
        let r22 = rotation_matrix.at_2d::<f64>(1, 1)?;
        let r23 = rotation_matrix.at_2d::<f64>(1, 2)?;
        let r33 = rotation_matrix.at_2d::<f64>(2, 2)?;

        let pitch = (-r23).asin();
        let yaw = r13.atan2(*r33);
        let roll = r21.atan2(*r22);

        Ok(Vec3d::from([
            pitch.to_degrees(),
            yaw.to_degrees(),
            roll.to_degrees(),
        ]))
    }
}

/// Head pose estimator solving the Perspective-n-Point problem against the
/// canonical 3D face model.
pub struct PoseEstimator {
    model_points: [Point3d; MODEL_POINT_COUNT],
    camera: CameraIntrinsics,
}

impl PoseEstimator {
    /// Create a pose estimator for the given camera
    #[must_use]
    pub fn new(camera: CameraIntrinsics) -> Self {
        Self {
            model_points: face_model::model_points(),
            camera,
        }
    }

    /// Create a pose estimator for images of the given dimensions
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are not positive
    pub fn from_image_size(width: i32, height: i32) -> Result<Self> {
        Ok(Self::new(CameraIntrinsics::from_image_size(width, height)?))
    }

    /// Estimate the head pose from a full 68-point landmark shape.
    ///
    /// Returns `Ok(None)` when no pose can be recovered for this face:
    /// the six correspondence points are degenerate (near-collinear) or the
    /// solver does not converge. Those conditions are absorbed here rather
    /// than surfaced as hard errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape does not have exactly 68 points or an
    /// OpenCV matrix operation fails outside the solver itself.
    pub fn estimate(&self, landmarks: &[Point2f]) -> Result<Option<HeadPose>> {
        let image_points = face_model::correspondence_points(landmarks)?;

        if is_degenerate(&image_points) {
            log::debug!("Degenerate correspondence points, skipping pose solve");
            return Ok(None);
        }

        let mut object_mat = Mat::zeros(MODEL_POINT_COUNT as i32, 3, CV_64F)?.to_mat()?;
        for (i, point) in self.model_points.iter().enumerate() {
            *object_mat.at_2d_mut::<f64>(i as i32, 0)? = point.x;
            *object_mat.at_2d_mut::<f64>(i as i32, 1)? = point.y;
            *object_mat.at_2d_mut::<f64>(i as i32, 2)? = point.z;
        }

        let mut image_mat = Mat::zeros(MODEL_POINT_COUNT as i32, 2, CV_64F)?.to_mat()?;
        for (i, point) in image_points.iter().enumerate() {
            *image_mat.at_2d_mut::<f64>(i as i32, 0)? = point.x;
            *image_mat.at_2d_mut::<f64>(i as i32, 1)? = point.y;
        }

        let mut rvec = Mat::default();
        let mut tvec = Mat::default();
        let converged = match calib3d::solve_pnp(
            &object_mat,
            &image_mat,
            self.camera.matrix(),
            self.camera.dist_coeffs(),
            &mut rvec,
            &mut tvec,
            false,
            calib3d::SOLVEPNP_ITERATIVE,
        ) {
            Ok(converged) => converged,
            Err(e) => {
                log::debug!("PnP solver failed: {e}");
                return Ok(None);
            }
        };
        if !converged {
            log::debug!("PnP solver did not converge");
            return Ok(None);
        }

        let axis_points = self.project_axis_points(&rvec, &tvec)?;

        Ok(Some(HeadPose {
            rotation: Vec3d::from([
                *rvec.at_2d::<f64>(0, 0)?,
                *rvec.at_2d::<f64>(1, 0)?,
                *rvec.at_2d::<f64>(2, 0)?,
            ]),
            translation: Vec3d::from([
                *tvec.at_2d::<f64>(0, 0)?,
                *tvec.at_2d::<f64>(1, 0)?,
                *tvec.at_2d::<f64>(2, 0)?,
            ]),
            axis_points,
        }))
    }

    /// Project the three synthetic axis endpoints through the recovered pose
    fn project_axis_points(&self, rvec: &Mat, tvec: &Mat) -> Result<[Point2d; NUM_POSE_POINTS]> {
        let axis_endpoints = [
            Point3d::new(0.0, 0.0, POSE_AXIS_LENGTH),
            Point3d::new(0.0, POSE_AXIS_LENGTH, 0.0),
            Point3d::new(POSE_AXIS_LENGTH, 0.0, 0.0),
        ];
        let axis_mat = Mat::from_slice(&axis_endpoints)?;

        let mut projected = Mat::default();
        calib3d::project_points(
            &axis_mat,
            rvec,
            tvec,
            self.camera.matrix(),
            self.camera.dist_coeffs(),
            &mut projected,
            &mut Mat::default(),
            0.0,
        )?;

        let mut axis_points = [Point2d::default(); NUM_POSE_POINTS];
        for (i, out) in axis_points.iter_mut().enumerate() {
            *out = *projected.at_2d::<Point2d>(i as i32, 0)?;
        }
        Ok(axis_points)
    }
}

/// Whether the six correspondence points are too close to collinear for
/// the solver to produce a meaningful pose.
fn is_degenerate(points: &[Point2d]) -> bool {
    let mut span_sq: f64 = 0.0;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let dx = points[j].x - points[i].x;
            let dy = points[j].y - points[i].y;
            span_sq = span_sq.max(dx * dx + dy * dy);
        }
    }
    if span_sq <= f64::EPSILON {
        return true;
    }

    let mut max_cross: f64 = 0.0;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            for k in (j + 1)..points.len() {
                let ux = points[j].x - points[i].x;
                let uy = points[j].y - points[i].y;
                let vx = points[k].x - points[i].x;
                let vy = points[k].y - points[i].y;
                max_cross = max_cross.max((ux * vy - uy * vx).abs());
            }
        }
    }

    max_cross <= DEGENERACY_EPSILON * span_sq
}
