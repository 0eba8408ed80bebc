use crate::common::{FaceGateError, Result};
use crate::core::signature::Signature;
use crate::storage::{IdentityRegistry, SignatureStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const STORAGE_VERSION: u32 = 1;
const RECORD_EXTENSION: &str = "bincode";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub version: u32,
    pub username: String,
    /// Opaque credential hash; only the password module interprets it.
    pub password_hash: String,
    pub signatures: Vec<Signature>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

impl IdentityRecord {
    pub fn new(username: &str, password_hash: String, signatures: Vec<Signature>) -> Self {
        Self {
            version: STORAGE_VERSION,
            username: username.to_string(),
            password_hash,
            signatures,
            created_at: Utc::now(),
            last_login: None,
        }
    }
}

/// Usernames double as file names, so they are kept to a safe alphabet.
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() || username.len() > 64 {
        return Err(FaceGateError::InvalidEnrollment(
            "username must be between 1 and 64 characters".into()
        ));
    }
    if username.starts_with('.') {
        return Err(FaceGateError::InvalidEnrollment("username must not start with '.'".into()));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@')) {
        return Err(FaceGateError::InvalidEnrollment(format!(
            "username '{}' contains unsupported characters", username
        )));
    }
    Ok(())
}

/// One bincode file per identity under a data directory.
pub struct FileIdentityStore {
    data_dir: PathBuf,
}

impl FileIdentityStore {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn record_path(&self, username: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", username, RECORD_EXTENSION))
    }

    fn write_record(&self, record: &IdentityRecord) -> Result<()> {
        let path = self.record_path(&record.username);
        let tmp = path.with_extension("tmp");
        let encoded = bincode::serialize(record)
            .map_err(|e| FaceGateError::Storage(format!("Failed to serialize: {}", e)))?;
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn read_record(path: &Path) -> Result<IdentityRecord> {
        let data = fs::read(path)?;
        let record: IdentityRecord = bincode::deserialize(&data)
            .map_err(|e| FaceGateError::Storage(format!(
                "Failed to deserialize {}: {}", path.display(), e
            )))?;

        if record.version > STORAGE_VERSION {
            return Err(FaceGateError::Storage(format!(
                "{} has storage version {}, newer than supported {}",
                path.display(), record.version, STORAGE_VERSION
            )));
        }

        Ok(record)
    }
}

impl SignatureStore for FileIdentityStore {
    fn fetch_all(&self) -> Result<Vec<IdentityRecord>> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            match Self::read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping unreadable identity record: {}", e),
            }
        }
        records.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(records)
    }

    fn fetch_by_username(&self, username: &str) -> Result<Option<IdentityRecord>> {
        if validate_username(username).is_err() {
            return Ok(None);
        }
        let path = self.record_path(username);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_record(&path).map(Some)
    }
}

impl IdentityRegistry for FileIdentityStore {
    fn insert(&self, record: &IdentityRecord) -> Result<()> {
        validate_username(&record.username)?;
        if self.record_path(&record.username).exists() {
            return Err(FaceGateError::AlreadyExists(record.username.clone()));
        }
        self.write_record(record)?;
        tracing::info!(
            "Stored identity '{}' with {} signature(s)",
            record.username, record.signatures.len()
        );
        Ok(())
    }

    fn record_login(&self, username: &str) -> Result<()> {
        let mut record = self
            .fetch_by_username(username)?
            .ok_or_else(|| FaceGateError::UserNotFound(username.to_string()))?;
        record.last_login = Some(Utc::now());
        self.write_record(&record)
    }
}
