//! Numeric tests for the pose estimation path

use facedet::camera::CameraIntrinsics;
use facedet::constants::NUM_FACIAL_LANDMARKS;
use facedet::face_model;
use facedet::pose_estimation::PoseEstimator;
use opencv::core::Point2f;

const FOCAL: f64 = 640.0;
const CENTER: (f64, f64) = (320.0, 240.0);
const DEPTH: f64 = 1000.0;

/// Correspondence landmark indices, in canonical model order
const CORRESPONDENCE: [usize; 6] = [30, 8, 36, 45, 48, 54];

/// Build a 68-point shape whose six correspondence points are the canonical
/// model rotated about the Y axis by `yaw` radians, translated `DEPTH` units
/// in front of the camera, and projected through the test intrinsics.
fn synthetic_landmarks(yaw: f64) -> Vec<Point2f> {
    let model = face_model::model_points();
    let (sin, cos) = yaw.sin_cos();

    let mut landmarks = vec![Point2f::new(0.0, 0.0); NUM_FACIAL_LANDMARKS];
    for (slot, &index) in CORRESPONDENCE.iter().enumerate() {
        let p = model[slot];
        let x = p.x * cos + p.z * sin;
        let y = p.y;
        let z = -p.x * sin + p.z * cos + DEPTH;

        landmarks[index] = Point2f::new(
            (FOCAL * x / z + CENTER.0) as f32,
            (FOCAL * y / z + CENTER.1) as f32,
        );
    }
    landmarks
}

#[test]
fn test_intrinsics_from_640_wide_image() {
    let camera = CameraIntrinsics::from_image_size(640, 480).unwrap();
    assert_eq!(camera.focal_length(), 640.0);
    assert_eq!(camera.principal_point(), (320.0, 240.0));

    let camera = CameraIntrinsics::from_image_size(640, 360).unwrap();
    assert_eq!(camera.focal_length(), 640.0);
    assert_eq!(camera.principal_point(), (320.0, 180.0));
}

#[test]
fn test_frontal_pose_recovery() {
    let estimator = PoseEstimator::from_image_size(640, 480).unwrap();
    let pose = estimator
        .estimate(&synthetic_landmarks(0.0))
        .unwrap()
        .expect("frontal face must yield a pose");

    // Translation recovered close to the synthetic depth
    assert!(pose.translation[0].abs() < 20.0);
    assert!(pose.translation[1].abs() < 20.0);
    assert!((pose.translation[2] - DEPTH).abs() < 20.0);

    // Rotation near identity
    let rotation_norm =
        (pose.rotation[0].powi(2) + pose.rotation[1].powi(2) + pose.rotation[2].powi(2)).sqrt();
    assert!(rotation_norm < 0.05, "rotation norm was {rotation_norm}");

    // Forward axis endpoint (0, 0, 400) projects near the principal point
    // for an unrotated head centered on the optical axis
    assert!((pose.axis_points[0].x - CENTER.0).abs() < 10.0);
    assert!((pose.axis_points[0].y - CENTER.1).abs() < 10.0);
}

#[test]
fn test_pose_points_are_exactly_three() {
    let estimator = PoseEstimator::from_image_size(640, 480).unwrap();
    let pose = estimator
        .estimate(&synthetic_landmarks(0.2))
        .unwrap()
        .expect("rotated face must yield a pose");

    assert_eq!(pose.axis_points.len(), 3);
    for point in &pose.axis_points {
        assert!(point.x.is_finite());
        assert!(point.y.is_finite());
    }
}

#[test]
fn test_rotation_magnitude_grows_with_yaw() {
    let estimator = PoseEstimator::from_image_size(640, 480).unwrap();

    let magnitudes: Vec<f64> = [0.1, 0.25, 0.4]
        .iter()
        .map(|&yaw| {
            let pose = estimator
                .estimate(&synthetic_landmarks(yaw))
                .unwrap()
                .expect("rotated face must yield a pose");
            let norm = (pose.rotation[0].powi(2)
                + pose.rotation[1].powi(2)
                + pose.rotation[2].powi(2))
            .sqrt();
            // Sanity bound: recovered magnitude tracks the applied yaw
            assert!((norm - yaw).abs() < 0.1, "yaw {yaw} recovered as {norm}");
            norm
        })
        .collect();

    assert!(magnitudes[0] < magnitudes[1]);
    assert!(magnitudes[1] < magnitudes[2]);
}

#[test]
fn test_collinear_points_give_no_pose() {
    let estimator = PoseEstimator::from_image_size(640, 480).unwrap();

    // Every landmark on one line: the correspondence points are collinear
    let landmarks: Vec<Point2f> = (0..NUM_FACIAL_LANDMARKS)
        .map(|i| Point2f::new(i as f32, 2.0 * i as f32))
        .collect();

    let pose = estimator.estimate(&landmarks).unwrap();
    assert!(pose.is_none());
}

#[test]
fn test_coincident_points_give_no_pose() {
    let estimator = PoseEstimator::from_image_size(640, 480).unwrap();
    let landmarks = vec![Point2f::new(100.0, 100.0); NUM_FACIAL_LANDMARKS];

    let pose = estimator.estimate(&landmarks).unwrap();
    assert!(pose.is_none());
}

#[test]
fn test_wrong_landmark_count_is_an_error() {
    let estimator = PoseEstimator::from_image_size(640, 480).unwrap();
    let landmarks = vec![Point2f::new(0.0, 0.0); 5];

    assert!(estimator.estimate(&landmarks).is_err());
}

#[test]
fn test_euler_angles_track_yaw() {
    let estimator = PoseEstimator::from_image_size(640, 480).unwrap();
    let pose = estimator
        .estimate(&synthetic_landmarks(0.3))
        .unwrap()
        .expect("rotated face must yield a pose");

    let angles = pose.euler_angles().unwrap();
    // Yaw component in degrees, with a loose bound for solver noise
    assert!(
        (angles[1].abs() - 0.3f64.to_degrees()).abs() < 3.0,
        "expected ~{:.1} degrees of yaw, got {:.1}",
        0.3f64.to_degrees(),
        angles[1]
    );
}
