use crate::common::{config::DetectorConfig, FaceGateError, Result};
use crate::core::onnx::load_session;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;
use image::{DynamicImage, imageops::FilterType};
use ndarray::{Array4, CowArray};

#[derive(Debug, Clone, PartialEq)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

impl FaceBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// YOLO-style single class face detector.
pub struct FaceDetector {
    session: Session,
    _environment: Arc<Environment>,
    config: DetectorConfig,
}

impl FaceDetector {
    pub fn new(model_path: &Path, config: &DetectorConfig, optimization_level: u32) -> Result<Self> {
        let (environment, session) = load_session("face_detector", model_path, optimization_level)?;
        Ok(Self {
            session,
            _environment: environment,
            config: config.clone(),
        })
    }

    /// Faces above the configured confidence, in original image coordinates,
    /// most confident first.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceBox>> {
        let orig_width = image.width() as f32;
        let orig_height = image.height() as f32;
        let (input_w, input_h) = (self.config.input_width, self.config.input_height);

        let img_array = if image.width() == input_w && image.height() == input_h {
            image_to_array(image)
        } else {
            image_to_array(&image.resize_exact(input_w, input_h, FilterType::Nearest))
        };

        let cow_array = CowArray::from(img_array.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let output = outputs
            .first()
            .ok_or_else(|| FaceGateError::Model("Detector produced no outputs".into()))?
            .try_extract::<f32>()?
            .view()
            .to_owned();
        let shape = output.shape().to_vec();
        let values = output
            .as_slice()
            .ok_or_else(|| FaceGateError::Model("Detector output is not contiguous".into()))?;

        let candidates = decode_predictions(values, &shape, &self.config);
        let mut faces = non_max_suppression(candidates, self.config.nms_iou_threshold);
        faces.retain(|face| face.confidence >= self.config.detection_confidence);

        let scale_x = orig_width / input_w as f32;
        let scale_y = orig_height / input_h as f32;
        for face in &mut faces {
            face.x1 *= scale_x;
            face.x2 *= scale_x;
            face.y1 *= scale_y;
            face.y2 *= scale_y;
        }

        tracing::debug!("Detected {} face(s)", faces.len());
        Ok(faces)
    }
}

/// Grayscale replicated over three channels, scaled to [0, 1].
fn image_to_array(img: &DynamicImage) -> Array4<f32> {
    let gray = img.to_luma8();
    let width = img.width() as usize;
    let height = img.height() as usize;
    let mut array = Array4::<f32>::zeros((1, 3, height, width));

    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = pixel[0] as f32 / 255.0;
        let (x, y) = (x as usize, y as usize);
        array[[0, 0, y, x]] = value;
        array[[0, 1, y, x]] = value;
        array[[0, 2, y, x]] = value;
    }

    array
}

/// Turns raw `[cx, cy, w, h, conf]` rows into corner boxes in detector input
/// space. Accepts `[1, N, 5]`, the transposed `[1, 5, N]` and `[N, 5]`.
fn decode_predictions(values: &[f32], shape: &[usize], config: &DetectorConfig) -> Vec<FaceBox> {
    let (num_predictions, row_len, transposed) = match shape {
        [_, a, b] if b > a && *a <= 10 => (*b, *a, true),
        [_, a, b] => (*a, *b, false),
        [a, b] => (*a, *b, false),
        other => {
            tracing::warn!("Unexpected detector output shape: {:?}", other);
            return Vec::new();
        }
    };
    if row_len < 4 || values.len() < num_predictions * row_len {
        tracing::warn!("Detector output too small for shape {:?}", shape);
        return Vec::new();
    }

    let at = |i: usize, field: usize| -> f32 {
        if transposed {
            values[field * num_predictions + i]
        } else {
            values[i * row_len + field]
        }
    };

    let max_x = config.input_width as f32;
    let max_y = config.input_height as f32;
    let mut faces = Vec::new();

    for i in 0..num_predictions {
        let confidence = if row_len > 4 { at(i, 4) } else { 0.0 };
        if confidence <= 0.001 {
            continue;
        }

        let (mut cx, mut cy, mut w, mut h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
        // Normalized coordinates
        if cx <= 1.0 && cy <= 1.0 && w <= 1.0 && h <= 1.0 {
            cx *= max_x;
            w *= max_x;
            cy *= max_y;
            h *= max_y;
        }

        let x1 = (cx - w / 2.0).max(0.0);
        let y1 = (cy - h / 2.0).max(0.0);
        let x2 = (cx + w / 2.0).min(max_x);
        let y2 = (cy + h / 2.0).min(max_y);

        if x2 - x1 > config.min_face_size && y2 - y1 > config.min_face_size {
            faces.push(FaceBox { x1, y1, x2, y2, confidence });
        }
    }

    faces
}

pub fn non_max_suppression(mut boxes: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<FaceBox> = Vec::new();
    for candidate in boxes {
        if keep.iter().all(|kept| iou(kept, &candidate) < iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

pub fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> FaceBox {
        FaceBox { x1, y1, x2, y2, confidence }
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = face(0.0, 0.0, 10.0, 10.0, 0.9);
        let b = face(20.0, 20.0, 30.0, 30.0, 0.9);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn nms_keeps_most_confident_of_overlapping() {
        let boxes = vec![
            face(0.0, 0.0, 100.0, 100.0, 0.7),
            face(2.0, 2.0, 102.0, 102.0, 0.95),
            face(300.0, 300.0, 400.0, 400.0, 0.8),
        ];
        let kept = non_max_suppression(boxes, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.95);
        assert_eq!(kept[1].confidence, 0.8);
    }

    #[test]
    fn decodes_standard_layout() {
        let config = DetectorConfig::default();
        // Two predictions: one face, one below the floor.
        let values = vec![
            320.0, 320.0, 100.0, 120.0, 0.92,
            10.0, 10.0, 50.0, 50.0, 0.0,
        ];
        let faces = decode_predictions(&values, &[2, 5], &config);
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0], face(270.0, 260.0, 370.0, 380.0, 0.92));
    }

    #[test]
    fn decodes_transposed_layout() {
        let config = DetectorConfig::default();
        // Fields are rows: cx, cy, w, h, conf for 12 predictions.
        let n = 12;
        let mut values = vec![0.0f32; 5 * n];
        values[3] = 200.0;
        values[n + 3] = 240.0;
        values[2 * n + 3] = 80.0;
        values[3 * n + 3] = 80.0;
        values[4 * n + 3] = 0.88;

        let faces = decode_predictions(&values, &[1, 5, n], &config);
        assert_eq!(faces, vec![face(160.0, 200.0, 240.0, 280.0, 0.88)]);
    }

    #[test]
    fn tiny_boxes_are_dropped() {
        let config = DetectorConfig::default();
        let values = vec![100.0, 100.0, 4.0, 4.0, 0.99];
        assert!(decode_predictions(&values, &[1, 5], &config).is_empty());
    }

    #[test]
    fn unexpected_shape_yields_nothing() {
        let config = DetectorConfig::default();
        assert!(decode_predictions(&[0.5; 5], &[5], &config).is_empty());
    }
}
