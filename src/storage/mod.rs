pub mod audit;
pub mod identity_store;

pub use audit::{FailedAttempt, FailedLoginLog, UNKNOWN_USER};
pub use identity_store::{validate_username, FileIdentityStore, IdentityRecord};

use crate::common::Result;

/// Read side of the identity store, all the matcher needs.
pub trait SignatureStore {
    fn fetch_all(&self) -> Result<Vec<IdentityRecord>>;
    fn fetch_by_username(&self, username: &str) -> Result<Option<IdentityRecord>>;
}

pub trait IdentityRegistry: SignatureStore {
    /// Fails with `AlreadyExists` when the username is taken.
    fn insert(&self, record: &IdentityRecord) -> Result<()>;
    fn record_login(&self, username: &str) -> Result<()>;
}

pub trait AuditLog {
    fn record_failure(&self, username: &str, origin: &str) -> Result<()>;
}
