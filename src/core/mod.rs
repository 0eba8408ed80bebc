pub mod annotate;
pub mod detector;
pub mod extractor;
pub mod frame;
pub mod matcher;
pub mod onnx;
pub mod pool;
pub mod recognizer;
pub mod signature;
pub mod similarity;

pub use annotate::annotate_faces;
pub use detector::{FaceBox, FaceDetector};
pub use extractor::{extract_single_face, OnnxExtractor, ProbeError, SignatureExtractor};
pub use frame::decode_image;
pub use matcher::{MatchEngine, MatchResult, MatchScan, MatchVerdict};
pub use pool::{Candidate, CandidatePool};
pub use recognizer::FaceRecognizer;
pub use signature::{normalize, Signature};
pub use similarity::{cosine_similarity, score};
