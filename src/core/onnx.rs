use crate::common::{FaceGateError, Result};
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolves `path` against `models_base` when it is relative.
pub fn resolve_model_path(path: &Path, models_base: Option<&Path>) -> PathBuf {
    match models_base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

pub fn optimization_level(level: u32) -> GraphOptimizationLevel {
    match level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

/// Loads one model into its own ONNX Runtime environment.
pub fn load_session(name: &str, model_path: &Path, level: u32) -> Result<(Arc<Environment>, Session)> {
    if !model_path.exists() {
        return Err(FaceGateError::Model(
            format!("{} model not found at: {:?}", name, model_path)
        ));
    }

    let environment = Arc::new(
        Environment::builder()
            .with_name(name)
            .build()
            .map_err(|e| FaceGateError::Model(format!("Failed to create environment: {}", e)))?
    );

    let session = SessionBuilder::new(&environment)?
        .with_optimization_level(optimization_level(level))?
        .with_model_from_file(model_path)?;

    tracing::info!("Loaded {} model from {}", name, model_path.display());
    Ok((environment, session))
}
