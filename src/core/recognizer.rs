use crate::common::{config::RecognizerConfig, FaceGateError, Result};
use crate::core::detector::FaceBox;
use crate::core::onnx::load_session;
use crate::core::signature::{normalize, Signature};
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;
use image::{DynamicImage, imageops::FilterType};
use ndarray::{Array4, CowArray};

/// Embedding model: cropped face in, unit-length signature out.
pub struct FaceRecognizer {
    session: Session,
    _environment: Arc<Environment>,
    config: RecognizerConfig,
}

impl FaceRecognizer {
    pub fn new(model_path: &Path, config: &RecognizerConfig, optimization_level: u32) -> Result<Self> {
        let (environment, session) = load_session("face_recognizer", model_path, optimization_level)?;
        Ok(Self {
            session,
            _environment: environment,
            config: config.clone(),
        })
    }

    pub fn get_signature(&self, image: &DynamicImage, face: &FaceBox) -> Result<Signature> {
        let face_img = crop_face(image, face)?;
        let size = self.config.input_size;
        let resized = face_img.resize_exact(size, size, FilterType::Triangle);

        let input_array = preprocess_face(&resized, self.config.normalization_value);
        let cow_array = CowArray::from(input_array.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let mut signature: Signature = outputs
            .first()
            .ok_or_else(|| FaceGateError::Model("Recognizer produced no outputs".into()))?
            .try_extract::<f32>()?
            .view()
            .iter()
            .copied()
            .collect();

        if signature.len() != self.config.signature_dim {
            return Err(FaceGateError::DimensionMismatch {
                expected: self.config.signature_dim,
                actual: signature.len(),
            });
        }
        if !normalize(&mut signature) {
            return Err(FaceGateError::Extraction("model produced a zero signature".into()));
        }
        Ok(signature)
    }
}

/// Crops `face` out of `image`, clamped to the image bounds.
pub fn crop_face(image: &DynamicImage, face: &FaceBox) -> Result<DynamicImage> {
    let (img_w, img_h) = (image.width() as f32, image.height() as f32);
    let x1 = face.x1.clamp(0.0, img_w);
    let y1 = face.y1.clamp(0.0, img_h);
    let x2 = face.x2.clamp(0.0, img_w);
    let y2 = face.y2.clamp(0.0, img_h);

    let width = (x2 - x1).floor() as u32;
    let height = (y2 - y1).floor() as u32;
    if width == 0 || height == 0 {
        return Err(FaceGateError::Extraction(format!(
            "degenerate face crop {}x{} at ({:.0}, {:.0})", width, height, face.x1, face.y1
        )));
    }

    Ok(image.crop_imm(x1 as u32, y1 as u32, width, height))
}

/// Single-channel input centred on `norm_val`.
fn preprocess_face(img: &DynamicImage, norm_val: f32) -> Array4<f32> {
    let gray = img.to_luma8();
    let (width, height) = (img.width() as usize, img.height() as usize);
    let mut array = Array4::<f32>::zeros((1, 1, height, width));

    for (x, y, pixel) in gray.enumerate_pixels() {
        array[[0, 0, y as usize, x as usize]] = (pixel[0] as f32 - norm_val) / norm_val;
    }

    array
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([128])))
    }

    fn face(x1: f32, y1: f32, x2: f32, y2: f32) -> FaceBox {
        FaceBox { x1, y1, x2, y2, confidence: 0.9 }
    }

    #[test]
    fn crop_is_clamped_to_image() {
        let crop = crop_face(&blank(100, 80), &face(-10.0, 20.0, 60.0, 200.0)).unwrap();
        assert_eq!((crop.width(), crop.height()), (60, 60));
    }

    #[test]
    fn zero_width_crop_fails() {
        let err = crop_face(&blank(100, 80), &face(40.0, 10.0, 40.0, 50.0)).unwrap_err();
        assert!(matches!(err, FaceGateError::Extraction(_)));
    }

    #[test]
    fn crop_outside_image_fails() {
        assert!(crop_face(&blank(100, 80), &face(150.0, 10.0, 190.0, 50.0)).is_err());
    }

    #[test]
    fn preprocessing_centres_pixels() {
        let array = preprocess_face(&blank(4, 4), 128.0);
        assert_eq!(array.shape(), &[1, 1, 4, 4]);
        assert!(array.iter().all(|v| v.abs() < 1e-6));
    }
}
