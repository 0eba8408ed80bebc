pub mod auth;
pub mod common;
pub mod core;
pub mod service;
pub mod storage;

pub use auth::{FaceGate, Guard, LoginAttempt, LoginOutcome, Rejection, SessionIssuer};
pub use common::{Config, FaceGateError, Paths, Result, RunMode};
pub use core::{
    FaceBox, MatchEngine, MatchResult, MatchVerdict, OnnxExtractor, Signature, SignatureExtractor,
};
pub use service::{ServiceClient, ServiceServer};
pub use storage::{AuditLog, FailedLoginLog, FileIdentityStore, IdentityRegistry, SignatureStore};
