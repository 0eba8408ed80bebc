//! Login, enrollment and registration flows.
//!
//! `FaceGate` owns every collaborator explicitly: the signature extractor, the
//! identity registry, the failed-login audit log and the session issuer. A
//! rejected login is an ordinary outcome, reported as a [`Rejection`] and
//! recorded in the audit log; only infrastructure faults surface as errors.

use crate::auth::guard::Guard;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::SessionIssuer;
use crate::common::{Config, FaceGateError, Result};
use crate::core::extractor::{extract_single_face, ProbeError, SignatureExtractor};
use crate::core::frame::decode_image;
use crate::core::matcher::MatchEngine;
use crate::core::pool::CandidatePool;
use crate::core::signature::{normalize, Signature};
use crate::storage::{validate_username, AuditLog, IdentityRecord, IdentityRegistry, UNKNOWN_USER};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum Rejection {
    #[error("username and password are required")]
    MissingCredentials,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("image could not be decoded: {0}")]
    UndecodableImage(String),

    #[error("no face detected")]
    NoFace,

    #[error("{0} faces detected, exactly one is required")]
    MultipleFaces(usize),

    #[error("signature extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("face not recognized")]
    NoMatch,
}

impl From<ProbeError> for Rejection {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::NoFace => Rejection::NoFace,
            ProbeError::MultipleFaces(n) => Rejection::MultipleFaces(n),
            ProbeError::Extraction(e) => Rejection::ExtractionFailed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub token: String,
    pub username: String,
    /// Present for face logins, rounded to two decimals.
    pub similarity: Option<f32>,
}

pub type LoginAttempt = std::result::Result<LoginOutcome, Rejection>;

fn round2(score: f32) -> f32 {
    (score * 100.0).round() / 100.0
}

pub struct FaceGate {
    extractor: Box<dyn SignatureExtractor>,
    registry: Box<dyn IdentityRegistry>,
    audit: Box<dyn AuditLog>,
    sessions: SessionIssuer,
    engine: MatchEngine,
    admin_username: String,
    password_iterations: u32,
    signature_dim: usize,
}

impl FaceGate {
    pub fn new(
        config: &Config,
        extractor: Box<dyn SignatureExtractor>,
        registry: Box<dyn IdentityRegistry>,
        audit: Box<dyn AuditLog>,
        sessions: SessionIssuer,
    ) -> Self {
        Self {
            extractor,
            registry,
            audit,
            sessions,
            engine: MatchEngine::new(config.auth.similarity_threshold),
            admin_username: config.auth.admin_username.clone(),
            password_iterations: config.auth.password_iterations,
            signature_dim: config.recognizer.signature_dim,
        }
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    fn audit(&self, username: &str, origin: &str) {
        if let Err(e) = self.audit.record_failure(username, origin) {
            tracing::error!("Failed to record failed login: {}", e);
        }
    }

    fn reject(&self, rejection: Rejection, username: &str, origin: &str) -> LoginAttempt {
        tracing::info!("Login rejected ({}) for '{}' from {}", rejection, username, origin);
        self.audit(username, origin);
        Err(rejection)
    }

    /// The attempt still counts as a failed login when the store is unavailable.
    fn store_fault(&self, err: FaceGateError, username: &str, origin: &str) -> FaceGateError {
        tracing::error!("Identity store failed during login for '{}' from {}: {}", username, origin, err);
        self.audit(username, origin);
        err
    }

    fn accept(&self, username: &str, similarity: Option<f32>) -> Result<LoginAttempt> {
        let token = self.sessions.issue(username)?;
        if let Err(e) = self.registry.record_login(username) {
            tracing::warn!("Could not update last login for '{}': {}", username, e);
        }
        Ok(Ok(LoginOutcome {
            token,
            username: username.to_string(),
            similarity,
        }))
    }

    pub fn login_with_password(
        &self,
        username: &str,
        password: &str,
        origin: &str,
    ) -> Result<LoginAttempt> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            let recorded = if username.is_empty() { UNKNOWN_USER } else { username };
            return Ok(self.reject(Rejection::MissingCredentials, recorded, origin));
        }

        let record = self
            .registry
            .fetch_by_username(username)
            .map_err(|e| self.store_fault(e, username, origin))?;
        let verified = match record {
            Some(record) => verify_password(password, &record.password_hash),
            None => false,
        };
        if !verified {
            return Ok(self.reject(Rejection::InvalidCredentials, username, origin));
        }

        tracing::info!("Password login for '{}' from {}", username, origin);
        self.accept(username, None)
    }

    pub fn login_with_face(
        &self,
        image: &[u8],
        username_hint: Option<&str>,
        origin: &str,
    ) -> Result<LoginAttempt> {
        let probe = match self.probe(image) {
            Ok(signature) => signature,
            Err(rejection) => return Ok(self.reject(rejection, UNKNOWN_USER, origin)),
        };

        let pool = CandidatePool::select(self.registry.as_ref(), username_hint)
            .map_err(|e| self.store_fault(e, UNKNOWN_USER, origin))?;
        let scan = self.engine.scan(&probe, &pool);
        tracing::debug!(
            "Scanned {} signature(s) across {} identities",
            scan.comparisons, pool.len()
        );

        let verdict = scan.verdict();
        match verdict.identity {
            Some(identity) if verdict.matched => {
                tracing::info!("Face login for '{}' (score {:.2}) from {}", identity, verdict.score, origin);
                self.accept(&identity, Some(round2(verdict.score)))
            }
            _ => {
                // Callers never see the best score.
                tracing::info!(
                    "No identity above threshold {:.1}; best observed {:?}",
                    self.engine.threshold(), scan.best_observed
                );
                let recorded = username_hint
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .unwrap_or(UNKNOWN_USER);
                Ok(self.reject(Rejection::NoMatch, recorded, origin))
            }
        }
    }

    /// Signature of the single face in `image`, without logging anyone in.
    pub fn extract_signature(&self, image: &[u8]) -> std::result::Result<Signature, Rejection> {
        self.probe(image)
    }

    fn probe(&self, image: &[u8]) -> std::result::Result<Signature, Rejection> {
        let image = decode_image(image).map_err(|e| Rejection::UndecodableImage(e.to_string()))?;
        Ok(extract_single_face(self.extractor.as_ref(), &image)?)
    }

    pub fn register(
        &self,
        bearer: Option<&str>,
        username: &str,
        password: &str,
        signatures: Vec<Signature>,
    ) -> Result<()> {
        Guard::admin().wrap(&self.sessions, self.registry.as_ref(), bearer, |claims| {
            let record = self.prepare_record(username, password, signatures)?;
            self.registry.insert(&record)?;
            tracing::info!("'{}' registered '{}'", claims.sub, record.username);
            Ok(())
        })
    }

    fn prepare_record(
        &self,
        username: &str,
        password: &str,
        signatures: Vec<Signature>,
    ) -> Result<IdentityRecord> {
        let username = username.trim();
        validate_username(username)?;
        if password.is_empty() {
            return Err(FaceGateError::InvalidEnrollment("password must not be empty".into()));
        }
        if signatures.is_empty() {
            return Err(FaceGateError::InvalidEnrollment("at least one signature is required".into()));
        }

        let mut normalized = Vec::with_capacity(signatures.len());
        for mut signature in signatures {
            if signature.len() != self.signature_dim {
                return Err(FaceGateError::DimensionMismatch {
                    expected: self.signature_dim,
                    actual: signature.len(),
                });
            }
            if !normalize(&mut signature) {
                return Err(FaceGateError::InvalidEnrollment(
                    "signature has zero or non-finite norm".into()
                ));
            }
            normalized.push(signature);
        }

        let hash = hash_password(password, self.password_iterations)?;
        Ok(IdentityRecord::new(username, hash, normalized))
    }

    /// Creates the configured admin when missing. Returns whether it was created.
    pub fn bootstrap_admin(&self, password: Option<&str>) -> Result<bool> {
        if self.registry.fetch_by_username(&self.admin_username)?.is_some() {
            return Ok(false);
        }

        let Some(password) = password.filter(|p| !p.is_empty()) else {
            tracing::warn!(
                "Admin '{}' does not exist and no admin password was provided",
                self.admin_username
            );
            return Ok(false);
        };

        let mut rng = rand::thread_rng();
        let mut placeholder: Signature = (0..self.signature_dim).map(|_| rng.gen::<f32>()).collect();
        if !normalize(&mut placeholder) {
            placeholder = vec![0.0; self.signature_dim];
            placeholder[0] = 1.0;
        }

        let record = self.prepare_record(&self.admin_username, password, vec![placeholder])?;
        self.registry.insert(&record)?;
        tracing::info!("Created admin account '{}'", self.admin_username);
        Ok(true)
    }
}
