use crate::common::{Config, FaceGateError, Result};
use crate::core::detector::{FaceBox, FaceDetector};
use crate::core::onnx::resolve_model_path;
use crate::core::recognizer::FaceRecognizer;
use crate::core::signature::Signature;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

/// Face location and embedding, treated as a black box by the login flow.
pub trait SignatureExtractor {
    /// Every face found in `image`; may be empty.
    fn locate_faces(&self, image: &DynamicImage) -> Result<Vec<FaceBox>>;

    /// Unit-length signature of the face inside `face`.
    fn extract_signature(&self, image: &DynamicImage, face: &FaceBox) -> Result<Signature>;
}

/// Why a probe image did not yield a signature.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no face detected")]
    NoFace,

    #[error("{0} faces detected, exactly one is required")]
    MultipleFaces(usize),

    #[error("signature extraction failed: {0}")]
    Extraction(#[source] FaceGateError),
}

/// Signature of the only face in `image`. Zero or several faces are
/// ambiguous input and never reach extraction.
pub fn extract_single_face(
    extractor: &dyn SignatureExtractor,
    image: &DynamicImage,
) -> std::result::Result<Signature, ProbeError> {
    let faces = extractor.locate_faces(image).map_err(ProbeError::Extraction)?;
    match faces.as_slice() {
        [] => Err(ProbeError::NoFace),
        [face] => extractor
            .extract_signature(image, face)
            .map_err(ProbeError::Extraction),
        many => Err(ProbeError::MultipleFaces(many.len())),
    }
}

pub struct OnnxExtractor {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxExtractor {
    pub fn new(config: &Config, models_base: Option<&Path>) -> Result<Self> {
        let level = config.performance.optimization_level;
        let detector_path = resolve_model_path(&config.models.detector_path, models_base);
        let recognizer_path = resolve_model_path(&config.models.recognizer_path, models_base);

        Ok(Self {
            detector: FaceDetector::new(&detector_path, &config.detector, level)?,
            recognizer: FaceRecognizer::new(&recognizer_path, &config.recognizer, level)?,
        })
    }
}

impl SignatureExtractor for OnnxExtractor {
    fn locate_faces(&self, image: &DynamicImage) -> Result<Vec<FaceBox>> {
        self.detector.detect(image)
    }

    fn extract_signature(&self, image: &DynamicImage, face: &FaceBox) -> Result<Signature> {
        self.recognizer.get_signature(image, face)
    }
}
