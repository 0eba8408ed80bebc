use crate::common::{FaceGateError, Result};
use crate::storage::AuditLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Recorded in place of a username when the attempt did not name one.
pub const UNKNOWN_USER: &str = "UNKNOWN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAttempt {
    pub username: String,
    pub origin: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only JSON-lines file of failed login attempts.
pub struct FailedLoginLog {
    path: PathBuf,
}

impl FailedLoginLog {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Up to `limit` most recent attempts, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<FailedAttempt>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        let mut attempts: Vec<FailedAttempt> = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(attempt) => Some(attempt),
                Err(e) => {
                    tracing::warn!("Skipping malformed audit line: {}", e);
                    None
                }
            })
            .collect();

        attempts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        attempts.truncate(limit);
        Ok(attempts)
    }
}

impl AuditLog for FailedLoginLog {
    fn record_failure(&self, username: &str, origin: &str) -> Result<()> {
        let username = if username.trim().is_empty() { UNKNOWN_USER } else { username };
        let attempt = FailedAttempt {
            username: username.to_string(),
            origin: origin.to_string(),
            timestamp: Utc::now(),
        };

        let mut line = serde_json::to_string(&attempt)
            .map_err(|e| FaceGateError::Storage(format!("Failed to encode audit entry: {}", e)))?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;

        tracing::warn!("Failed login attempt: user '{}', origin {}", username, origin);
        Ok(())
    }
}
