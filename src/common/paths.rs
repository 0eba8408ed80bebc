use std::path::PathBuf;
use std::fs;
use directories::ProjectDirs;
use crate::common::error::{FaceGateError, Result};

const SYSTEM_CONFIG: &str = "/etc/facegate/facegate.toml";
const SYSTEM_DATA_DIR: &str = "/var/lib/facegate";
const SYSTEM_SOCKET: &str = "/run/facegate/service.sock";
const SYSTEM_MODELS_DIR: &str = "/usr/share/facegate/models";
const DEV_SOCKET: &str = "/tmp/facegate.sock";
const SOCKET_NAME: &str = "service.sock";

#[derive(Debug, Clone)]
pub enum RunMode {
    Development(PathBuf),  // Base directory for dev mode
    System,
    User(PathBuf),         // Per-user data directory
}

#[derive(Debug, Clone)]
pub struct Paths {
    mode: RunMode,
    data_override: Option<PathBuf>,
}

impl Paths {
    pub fn new(dev: bool, system: bool) -> Result<Self> {
        match (dev, system) {
            (true, true) => Err(FaceGateError::Config(
                "Cannot use both --dev and --system flags".into()
            )),
            (true, false) => Self::development(PathBuf::from("./dev_data")),
            (false, true) => Ok(Self { mode: RunMode::System, data_override: None }),
            (false, false) => {
                let dirs = ProjectDirs::from("org", "facegate", "FaceGate")
                    .ok_or_else(|| FaceGateError::Storage("Failed to get project dirs".into()))?;
                Ok(Self {
                    mode: RunMode::User(dirs.data_dir().to_path_buf()),
                    data_override: None,
                })
            }
        }
    }

    pub fn development(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(base_dir.join("users"))?;
        tracing::debug!("Development mode - using local directory: {}", base_dir.display());
        Ok(Self { mode: RunMode::Development(base_dir), data_override: None })
    }

    /// Replaces the mode's data directory, e.g. from `storage.data_dir`.
    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if data_dir.is_some() {
            self.data_override = data_dir;
        }
        self
    }

    pub fn mode(&self) -> &RunMode {
        &self.mode
    }

    pub fn config_file(&self) -> PathBuf {
        match &self.mode {
            RunMode::Development(_) => PathBuf::from("configs/facegate.toml"),
            RunMode::System => PathBuf::from(SYSTEM_CONFIG),
            RunMode::User(_) => {
                let user_config = ProjectDirs::from("org", "facegate", "FaceGate")
                    .map(|dirs| dirs.config_dir().join("facegate.toml"));
                match user_config {
                    Some(path) if path.exists() => path,
                    _ => PathBuf::from(SYSTEM_CONFIG),
                }
            }
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_override {
            return dir.clone();
        }
        match &self.mode {
            RunMode::Development(base) => base.clone(),
            RunMode::System => PathBuf::from(SYSTEM_DATA_DIR),
            RunMode::User(base) => base.clone(),
        }
    }

    pub fn users_dir(&self) -> PathBuf {
        self.data_dir().join("users")
    }

    pub fn audit_log(&self) -> PathBuf {
        self.data_dir().join("failed_logins.jsonl")
    }

    /// Base for relative model paths; `None` means the working directory.
    pub fn models_dir(&self) -> Option<PathBuf> {
        match &self.mode {
            RunMode::Development(_) => None,
            RunMode::System => Some(PathBuf::from(SYSTEM_MODELS_DIR)),
            RunMode::User(base) => Some(base.join("models")),
        }
    }

    /// User mode prefers `$XDG_RUNTIME_DIR`, which only the owner can enter.
    pub fn socket_path(&self) -> PathBuf {
        match &self.mode {
            RunMode::System => PathBuf::from(SYSTEM_SOCKET),
            RunMode::Development(_) => PathBuf::from(DEV_SOCKET),
            RunMode::User(base) => ProjectDirs::from("org", "facegate", "FaceGate")
                .and_then(|dirs| dirs.runtime_dir().map(|dir| dir.join(SOCKET_NAME)))
                .unwrap_or_else(|| base.join(SOCKET_NAME)),
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self.mode, RunMode::Development(_))
    }
}
