//! SCRFD-style face detection backed by ONNX Runtime.

use crate::constants::{IMAGE_NORMALIZATION_OFFSET, IMAGE_NORMALIZATION_SCALE};
use crate::{Error, Result};
use ndarray::{s, Array1, Array2, Array4, CowArray};
use opencv::core::{Mat, Rect, Scalar, Size, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// A single detected face region
#[derive(Debug, Clone, Copy)]
pub struct FaceBox {
    /// Bounding box of the detected face
    pub rect: Rect,
    /// Confidence score of the detection
    pub score: f32,
}

/// Face detector using an SCRFD ONNX model
///
/// Detections are returned ordered by descending confidence; callers index
/// into that order and rely on it staying stable for a given image.
pub struct FaceDetector {
    session: Session,
    input_size: (i32, i32),
    conf_threshold: f32,
    nms_threshold: f32,
    num_anchors: usize,
    strides: Vec<i32>,
    offset: usize,
    center_cache: HashMap<(i32, i32, i32), Array2<f32>>,
}

impl FaceDetector {
    /// Create a new face detector from an ONNX model file
    ///
    /// # Errors
    ///
    /// Returns an error if the model file cannot be loaded or the ONNX
    /// runtime environment cannot be created. A detector that fails here
    /// must not be used; construction failure is fatal for the instance.
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32, nms_threshold: f32) -> Result<Self> {
        log::info!(
            "Initializing FaceDetector with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input_meta = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelInputError("Model has no inputs".to_string()))?;

        // Input shape is [batch, channels, height, width]
        let input_shape = &input_meta.dimensions;
        let input_size = if input_shape.len() >= 4 {
            let height = input_shape[2].unwrap_or(640) as i32;
            let width = input_shape[3].unwrap_or(640) as i32;
            (width, height)
        } else {
            (640, 640)
        };

        // Stride layout follows from the number of model outputs
        let num_outputs = session.outputs.len();
        let (offset, strides, num_anchors) = match num_outputs {
            6 | 9 => (3, vec![8, 16, 32], 2),
            10 | 15 => (5, vec![8, 16, 32, 64, 128], 1),
            _ => {
                log::warn!("Unknown model configuration with {num_outputs} outputs, using defaults");
                (3, vec![8, 16, 32], 2)
            }
        };

        Ok(Self {
            session,
            input_size,
            conf_threshold,
            nms_threshold,
            num_anchors,
            strides,
            offset,
            center_cache: HashMap::new(),
        })
    }

    /// Detect faces in a 3-channel BGR image
    ///
    /// # Errors
    ///
    /// Returns an error if the image is not 3-channel (alpha must be
    /// stripped by the caller before detection), or if preprocessing or
    /// inference fails.
    pub fn detect(&mut self, image: &Mat) -> Result<Vec<FaceBox>> {
        if image.channels() != 3 {
            return Err(Error::InvalidInput(format!(
                "Expected a 3-channel image, got {} channels",
                image.channels()
            )));
        }

        let img_height = image.rows();
        let img_width = image.cols();

        // Letterbox: resize keeping aspect ratio, pad to model input size
        let ratio_img = img_height as f32 / img_width as f32;
        let (input_width, input_height) = self.input_size;
        let ratio_model = input_height as f32 / input_width as f32;

        let (new_width, new_height) = if ratio_img > ratio_model {
            let new_height = input_height;
            let new_width = (new_height as f32 / ratio_img) as i32;
            (new_width, new_height)
        } else {
            let new_width = input_width;
            let new_height = (new_width as f32 * ratio_img) as i32;
            (new_width, new_height)
        };

        let det_scale = new_height as f32 / img_height as f32;

        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(new_width, new_height),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut det_img = Mat::new_rows_cols_with_default(
            input_height,
            input_width,
            opencv::core::CV_8UC3,
            Scalar::all(0.0),
        )?;
        let mut roi = det_img.roi_mut(Rect::new(0, 0, new_width, new_height))?;
        resized.copy_to(&mut roi)?;

        let inputs = self.preprocess(&det_img)?;
        let (scores_list, bboxes_list) = self.forward(inputs, self.conf_threshold)?;

        self.postprocess(scores_list, bboxes_list, det_scale)
    }

    /// Normalize the padded image into an NCHW tensor
    fn preprocess(&self, image: &Mat) -> Result<Array4<f32>> {
        let mut rgb_image = Mat::default();
        imgproc::cvt_color(image, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0, 0.0)?;

        let height = float_image.rows() as usize;
        let width = float_image.cols() as usize;
        let channels = 3;

        let mut data = vec![0.0f32; height * width * channels];
        for row in 0..height {
            for col in 0..width {
                let pixel = float_image.at_2d::<opencv::core::Vec3f>(row as i32, col as i32)?;
                for ch in 0..channels {
                    let idx = (row * width + col) * channels + ch;
                    data[idx] = (pixel[ch] - IMAGE_NORMALIZATION_OFFSET) / IMAGE_NORMALIZATION_SCALE;
                }
            }
        }

        let array = Array4::from_shape_vec((1, height, width, channels), data)
            .map_err(|e| Error::ModelDataFormatError(format!("Failed to create input array: {e}")))?;

        // NHWC to NCHW
        Ok(array.permuted_axes([0, 3, 1, 2]))
    }

    /// Run inference and decode per-stride score/bbox outputs
    fn forward(&mut self, inputs: Array4<f32>, threshold: f32) -> Result<(Vec<Array1<f32>>, Vec<Array2<f32>>)> {
        let mut scores_list = Vec::new();
        let mut bboxes_list = Vec::new();

        let input_height = inputs.shape()[2] as i32;
        let input_width = inputs.shape()[3] as i32;

        let cow_array = CowArray::from(inputs.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        for (idx, &stride) in self.strides.iter().enumerate() {
            let scores_output = outputs[idx].try_extract::<f32>()?;
            let scores_view = scores_output.view();
            let scores_flat = scores_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous score output".to_string()))?;
            let scores = Array1::from(scores_flat.to_vec());

            let bbox_output = outputs[idx + self.offset].try_extract::<f32>()?;
            let bbox_view = bbox_output.view();
            let bbox_shape = bbox_view.shape();
            let n_anchors = bbox_shape[0] * bbox_shape[1] * bbox_shape[2];
            let bbox_data: Vec<f32> = bbox_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous bbox output".to_string()))?
                .iter()
                .map(|&x| x * stride as f32)
                .collect();
            let distances = Array2::from_shape_vec((n_anchors, 4), bbox_data)
                .map_err(|e| Error::ModelOutputError(format!("Failed to reshape bbox output: {e}")))?;

            let height = input_height / stride;
            let width = input_width / stride;
            let key = (height, width, stride);
            let anchor_centers = if let Some(centers) = self.center_cache.get(&key) {
                centers.clone()
            } else {
                let centers = Self::generate_anchor_centers(height, width, stride, self.num_anchors);
                if self.center_cache.len() < 100 {
                    self.center_cache.insert(key, centers.clone());
                }
                centers
            };

            let decoded = Self::distance_to_bbox(&anchor_centers, &distances);

            let pos_inds: Vec<usize> = scores
                .iter()
                .enumerate()
                .filter_map(|(i, &score)| (score >= threshold).then_some(i))
                .collect();

            let pos_scores = Array1::from(pos_inds.iter().map(|&i| scores[i]).collect::<Vec<f32>>());
            let pos_bboxes = Array2::from_shape_vec(
                (pos_inds.len(), 4),
                pos_inds.iter().flat_map(|&i| decoded.row(i).to_vec()).collect(),
            )
            .map_err(|e| Error::ModelOutputError(format!("Failed to collect bboxes: {e}")))?;

            scores_list.push(pos_scores);
            bboxes_list.push(pos_bboxes);
        }

        Ok((scores_list, bboxes_list))
    }

    /// Anchor center grid for one stride level
    fn generate_anchor_centers(height: i32, width: i32, stride: i32, num_anchors: usize) -> Array2<f32> {
        let mut centers = Vec::new();
        for y in 0..height {
            for x in 0..width {
                for _ in 0..num_anchors.max(1) {
                    centers.push((x * stride) as f32);
                    centers.push((y * stride) as f32);
                }
            }
        }

        let n_points = (height * width) as usize * num_anchors.max(1);
        Array2::from_shape_vec((n_points, 2), centers).expect("anchor center grid shape mismatch")
    }

    /// Convert per-anchor distance predictions to corner-form boxes
    fn distance_to_bbox(points: &Array2<f32>, distances: &Array2<f32>) -> Array2<f32> {
        let n_boxes = points.shape()[0];
        let mut boxes = Array2::zeros((n_boxes, 4));

        for i in 0..n_boxes {
            let cx = points[[i, 0]];
            let cy = points[[i, 1]];
            boxes[[i, 0]] = cx - distances[[i, 0]];
            boxes[[i, 1]] = cy - distances[[i, 1]];
            boxes[[i, 2]] = cx + distances[[i, 2]];
            boxes[[i, 3]] = cy + distances[[i, 3]];
        }

        boxes
    }

    /// Merge per-stride detections, rescale and suppress overlaps
    fn postprocess(
        &self,
        scores_list: Vec<Array1<f32>>,
        bboxes_list: Vec<Array2<f32>>,
        det_scale: f32,
    ) -> Result<Vec<FaceBox>> {
        let all_scores = concatenate_1d(&scores_list);
        let all_bboxes = concatenate_2d(&bboxes_list);

        // Descending score order; this is the ordering callers see
        let mut indices: Vec<usize> = (0..all_scores.len()).collect();
        indices.sort_by(|&a, &b| {
            all_scores[b]
                .partial_cmp(&all_scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let scaled_bboxes: Array2<f32> = &all_bboxes / det_scale;

        let keep = Self::nms(&scaled_bboxes, &indices, self.nms_threshold);

        let mut detections = Vec::new();
        for &orig_idx in &keep {
            let rect = Rect::new(
                scaled_bboxes[[orig_idx, 0]] as i32,
                scaled_bboxes[[orig_idx, 1]] as i32,
                (scaled_bboxes[[orig_idx, 2]] - scaled_bboxes[[orig_idx, 0]]) as i32,
                (scaled_bboxes[[orig_idx, 3]] - scaled_bboxes[[orig_idx, 1]]) as i32,
            );
            detections.push(FaceBox {
                rect,
                score: all_scores[orig_idx],
            });
        }

        Ok(detections)
    }

    /// Non-maximum suppression over boxes visited in `order`; returns the
    /// surviving indices, still in `order`'s ordering
    fn nms(bboxes: &Array2<f32>, order: &[usize], nms_threshold: f32) -> Vec<usize> {
        let mut keep = Vec::new();
        let mut order = order.to_vec();

        while let Some(&i) = order.first() {
            keep.push(i);

            let x1_i = bboxes[[i, 0]];
            let y1_i = bboxes[[i, 1]];
            let x2_i = bboxes[[i, 2]];
            let y2_i = bboxes[[i, 3]];
            let area_i = (x2_i - x1_i + 1.0) * (y2_i - y1_i + 1.0);

            order = order
                .into_iter()
                .skip(1)
                .filter(|&j| {
                    let x1_j = bboxes[[j, 0]];
                    let y1_j = bboxes[[j, 1]];
                    let x2_j = bboxes[[j, 2]];
                    let y2_j = bboxes[[j, 3]];
                    let area_j = (x2_j - x1_j + 1.0) * (y2_j - y1_j + 1.0);

                    let w = (x2_i.min(x2_j) - x1_i.max(x1_j) + 1.0).max(0.0);
                    let h = (y2_i.min(y2_j) - y1_i.max(y1_j) + 1.0).max(0.0);
                    let inter = w * h;
                    let iou = inter / (area_i + area_j - inter);

                    iou <= nms_threshold
                })
                .collect();
        }

        keep
    }
}

fn concatenate_1d(arrays: &[Array1<f32>]) -> Array1<f32> {
    let total_len: usize = arrays.iter().map(Array1::len).sum();
    let mut result = Array1::zeros(total_len);

    let mut offset = 0;
    for array in arrays {
        result.slice_mut(s![offset..offset + array.len()]).assign(array);
        offset += array.len();
    }

    result
}

fn concatenate_2d(arrays: &[Array2<f32>]) -> Array2<f32> {
    if arrays.is_empty() {
        return Array2::zeros((0, 4));
    }

    let total_rows: usize = arrays.iter().map(|a| a.shape()[0]).sum();
    let cols = arrays[0].shape()[1];
    let mut result = Array2::zeros((total_rows, cols));

    let mut offset = 0;
    for array in arrays {
        let rows = array.shape()[0];
        result.slice_mut(s![offset..offset + rows, ..]).assign(array);
        offset += rows;
    }

    result
}
