use crate::common::Result;
use crate::core::signature::Signature;
use crate::storage::{IdentityRecord, SignatureStore};

/// One identity and the signatures captured for it at enrollment.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub identity: String,
    pub signatures: Vec<Signature>,
}

impl From<IdentityRecord> for Candidate {
    fn from(record: IdentityRecord) -> Self {
        Self {
            identity: record.username,
            signatures: record.signatures,
        }
    }
}

/// Identities scanned for a single login attempt. Built per request.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
}

impl CandidatePool {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// With a hint the pool holds at most the named identity; without one it
    /// holds every enrolled identity. A blank hint counts as no hint.
    pub fn select<S>(store: &S, hint: Option<&str>) -> Result<Self>
    where
        S: SignatureStore + ?Sized,
    {
        match hint.map(str::trim).filter(|h| !h.is_empty()) {
            Some(username) => {
                let pool = match store.fetch_by_username(username)? {
                    Some(record) => Self::new(vec![record.into()]),
                    None => {
                        tracing::debug!("Hinted identity '{}' is not enrolled", username);
                        Self::empty()
                    }
                };
                Ok(pool)
            }
            None => {
                let records = store.fetch_all()?;
                Ok(Self::new(records.into_iter().map(Candidate::from).collect()))
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
