use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::common::error::{FaceGateError, Result};

pub const JWT_SECRET_ENV: &str = "FACEGATE_JWT_SECRET";
pub const ADMIN_PASSWORD_ENV: &str = "FACEGATE_ADMIN_PASSWORD";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    pub models: ModelConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Overrides the socket path chosen by the run mode.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
    #[serde(default = "default_max_frame")]
    pub max_frame_bytes: usize,
}

fn default_read_timeout() -> u64 { 30 }
fn default_write_timeout() -> u64 { 5 }
fn default_max_frame() -> usize { 8 * 1024 * 1024 }

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            read_timeout_secs: default_read_timeout(),
            write_timeout_secs: default_write_timeout(),
            max_frame_bytes: default_max_frame(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ModelConfig {
    pub detector_path: PathBuf,
    pub recognizer_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorConfig {
    #[serde(default = "default_detector_size")]
    pub input_width: u32,
    #[serde(default = "default_detector_size")]
    pub input_height: u32,
    #[serde(default = "default_detection_confidence")]
    pub detection_confidence: f32,
    #[serde(default = "default_nms_iou")]
    pub nms_iou_threshold: f32,
    #[serde(default = "default_min_face_size")]
    pub min_face_size: f32,
}

fn default_detector_size() -> u32 { 640 }
fn default_detection_confidence() -> f32 { 0.8 }
fn default_nms_iou() -> f32 { 0.45 }
fn default_min_face_size() -> f32 { 10.0 }

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_width: default_detector_size(),
            input_height: default_detector_size(),
            detection_confidence: default_detection_confidence(),
            nms_iou_threshold: default_nms_iou(),
            min_face_size: default_min_face_size(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecognizerConfig {
    #[serde(default = "default_recognizer_size")]
    pub input_size: u32,
    #[serde(default = "default_normalization_value")]
    pub normalization_value: f32,
    /// Length of every signature the embedding model produces.
    #[serde(default = "default_signature_dim")]
    pub signature_dim: usize,
}

fn default_recognizer_size() -> u32 { 112 }
fn default_normalization_value() -> f32 { 127.5 }
fn default_signature_dim() -> usize { 512 }

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            input_size: default_recognizer_size(),
            normalization_value: default_normalization_value(),
            signature_dim: default_signature_dim(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    /// Percentage in [0, 100]; a stored signature must score strictly above it.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,
    /// Prefer the `FACEGATE_JWT_SECRET` environment variable over this key.
    #[serde(default)]
    pub jwt_secret: Option<String>,
}

fn default_similarity_threshold() -> f32 { 70.0 }
fn default_token_ttl() -> i64 { 24 }
fn default_admin_username() -> String { "admin".to_string() }
fn default_password_iterations() -> u32 { 100_000 }

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            token_ttl_hours: default_token_ttl(),
            admin_username: default_admin_username(),
            password_iterations: default_password_iterations(),
            jwt_secret: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Overrides the data directory chosen by the run mode.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Log lines are appended here instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PerformanceConfig {
    #[serde(default = "default_optimization_level")]
    pub optimization_level: u32,
}

fn default_optimization_level() -> u32 { 3 }

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self { optimization_level: default_optimization_level() }
    }
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FaceGateError::Config(format!(
                "Config file not found: {}. Please create it from the example.", path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| FaceGateError::Config(format!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.auth.similarity_threshold) {
            return Err(FaceGateError::Config(format!(
                "Similarity threshold must be a percentage between 0 and 100, got {}",
                self.auth.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.detector.detection_confidence) {
            return Err(FaceGateError::Config(format!(
                "Detection confidence must be between 0.0 and 1.0, got {}",
                self.detector.detection_confidence
            )));
        }
        if !(0.0..=1.0).contains(&self.detector.nms_iou_threshold) {
            return Err(FaceGateError::Config(format!(
                "NMS IoU threshold must be between 0.0 and 1.0, got {}",
                self.detector.nms_iou_threshold
            )));
        }
        if self.detector.input_width == 0 || self.detector.input_width > 4096 {
            return Err(FaceGateError::Config(format!(
                "Detector input width must be between 1 and 4096, got {}",
                self.detector.input_width
            )));
        }
        if self.detector.input_height == 0 || self.detector.input_height > 4096 {
            return Err(FaceGateError::Config(format!(
                "Detector input height must be between 1 and 4096, got {}",
                self.detector.input_height
            )));
        }
        if self.recognizer.input_size == 0 || self.recognizer.input_size > 1024 {
            return Err(FaceGateError::Config(format!(
                "Recognizer input size must be between 1 and 1024, got {}",
                self.recognizer.input_size
            )));
        }
        if self.recognizer.signature_dim == 0 {
            return Err(FaceGateError::Config("Signature dimension must be positive".into()));
        }
        if self.auth.token_ttl_hours < 1 {
            return Err(FaceGateError::Config(format!(
                "Token lifetime must be at least one hour, got {}",
                self.auth.token_ttl_hours
            )));
        }
        if self.auth.admin_username.trim().is_empty() {
            return Err(FaceGateError::Config("Admin username must not be empty".into()));
        }
        if self.auth.password_iterations == 0 {
            return Err(FaceGateError::Config("Password iterations must be positive".into()));
        }
        if self.service.max_frame_bytes < 1024 {
            return Err(FaceGateError::Config(format!(
                "Maximum frame size must be at least 1024 bytes, got {}",
                self.service.max_frame_bytes
            )));
        }

        Ok(())
    }

    /// Signing secret for session tokens; the environment wins over the file.
    pub fn jwt_secret(&self) -> Result<String> {
        match std::env::var(JWT_SECRET_ENV) {
            Ok(secret) if !secret.is_empty() => Ok(secret),
            _ => self.auth.jwt_secret.clone()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| FaceGateError::Config(format!(
                    "No token secret configured; set ${} or auth.jwt_secret", JWT_SECRET_ENV
                ))),
        }
    }
}
