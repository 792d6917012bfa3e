//! Benchmarks for pose estimation and box utilities

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use facedet::pose_estimation::PoseEstimator;
use facedet::utils::refine_boxes;
use opencv::core::{Point2f, Rect};

fn benchmark_pose_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pose_estimation");

    let estimator = PoseEstimator::from_image_size(640, 480).expect("Failed to create pose estimator");

    // Landmarks spread on an ellipse around the image center
    let landmarks: Vec<Point2f> = (0..68)
        .map(|i| {
            let angle = (i as f32) * 2.0 * std::f32::consts::PI / 68.0;
            Point2f::new(320.0 + 100.0 * angle.cos(), 240.0 + 60.0 * angle.sin())
        })
        .collect();

    group.bench_function("estimate_pose_68_landmarks", |b| {
        b.iter(|| {
            let pose = estimator.estimate(&landmarks).expect("Pose estimation failed");
            black_box(pose);
        });
    });

    group.finish();
}

fn benchmark_utils(c: &mut Criterion) {
    let mut group = c.benchmark_group("utils");

    let test_boxes = vec![
        Rect::new(10, 20, 100, 150),
        Rect::new(50, 60, 200, 250),
        Rect::new(100, 120, 80, 90),
        Rect::new(200, 180, 150, 160),
    ];

    group.bench_function("refine_boxes_4", |b| {
        b.iter(|| {
            let mut boxes = test_boxes.clone();
            refine_boxes(&mut boxes, 640, 480, 0.25).expect("Failed to refine boxes");
            black_box(boxes);
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_pose_estimation, benchmark_utils);
criterion_main!(benches);
