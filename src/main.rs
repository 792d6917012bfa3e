//! Command line front end running the detection pipeline on a single image.

use anyhow::Result;
use clap::Parser;
use facedet::{config::Config, FaceDetContext};
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image file to process
    image: String,

    /// Path to the facial landmarks ONNX model
    #[arg(short, long, default_value = "assets/face_landmarks.onnx")]
    landmarks: String,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {path}");
            Config::from_file(path)?
        }
        None => Config::default(),
    };
    config.validate()?;

    let context = FaceDetContext::new(config);
    let handle = context.create_handle()?;
    context.init(handle, &args.landmarks)?;

    let results = context.detect_path(handle, &args.image)?;
    println!("{} face(s) found in {}", results.len(), args.image);

    for (index, face) in results.iter().enumerate() {
        println!(
            "#{index}: {} at ({}, {})-({}, {}), {} landmarks",
            face.label, face.bbox.left, face.bbox.top, face.bbox.right, face.bbox.bottom,
            face.landmarks.len(),
        );
        if let Some(points) = &face.pose_points {
            println!(
                "     pose axes: forward ({:.1}, {:.1}), up ({:.1}, {:.1}), side ({:.1}, {:.1})",
                points[0].x, points[0].y, points[1].x, points[1].y, points[2].x, points[2].y,
            );
        }
    }

    context.deinit(handle)?;
    Ok(())
}
