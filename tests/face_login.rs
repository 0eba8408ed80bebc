mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{gate_in, harness, probe_png, PixelExtractor, ADMIN_PASSWORD, SECRET};
use facegate::auth::{FaceGate, Rejection, Role, SessionIssuer};
use facegate::common::{Config, FaceGateError, Result};
use facegate::storage::{
    FailedLoginLog, IdentityRecord, IdentityRegistry, SignatureStore, UNKNOWN_USER,
};
use tempfile::TempDir;

/// A registry whose backing storage is gone.
struct UnavailableStore;

impl SignatureStore for UnavailableStore {
    fn fetch_all(&self) -> Result<Vec<IdentityRecord>> {
        Err(FaceGateError::Storage("disk unavailable".into()))
    }

    fn fetch_by_username(&self, _username: &str) -> Result<Option<IdentityRecord>> {
        Err(FaceGateError::Storage("disk unavailable".into()))
    }
}

impl IdentityRegistry for UnavailableStore {
    fn insert(&self, _record: &IdentityRecord) -> Result<()> {
        Err(FaceGateError::Storage("disk unavailable".into()))
    }

    fn record_login(&self, _username: &str) -> Result<()> {
        Err(FaceGateError::Storage("disk unavailable".into()))
    }
}

#[test]
fn face_login_picks_the_enrolled_user() {
    let h = harness();
    let outcome = h
        .gate
        .login_with_face(&probe_png(1, [255, 0, 0]), None, "10.0.0.1")
        .unwrap()
        .expect("alice is recognized");

    assert_eq!(outcome.username, "alice");
    assert_eq!(outcome.similarity, Some(100.0));

    let claims = h.gate.sessions().verify(&outcome.token).unwrap();
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.role, Role::User);

    let record = h.store().fetch_by_username("alice").unwrap().unwrap();
    assert!(record.last_login.is_some());
    assert!(h.failures().is_empty());
}

#[test]
fn best_stored_signature_across_the_pool_wins() {
    let h = harness();
    // Normalizes to (0, 0.8, 0.6), bob's second signature.
    let outcome = h
        .gate
        .login_with_face(&probe_png(1, [0, 200, 150]), None, "10.0.0.1")
        .unwrap()
        .unwrap();

    assert_eq!(outcome.username, "bob");
    assert_eq!(outcome.similarity, Some(100.0));
}

#[test]
fn hint_restricts_the_pool() {
    let h = harness();
    let rejection = h
        .gate
        .login_with_face(&probe_png(1, [255, 0, 0]), Some("bob"), "10.0.0.2")
        .unwrap()
        .unwrap_err();

    assert_eq!(rejection, Rejection::NoMatch);

    let failures = h.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].username, "bob");
    assert_eq!(failures[0].origin, "10.0.0.2");
}

#[test]
fn unknown_hint_never_matches() {
    let h = harness();
    let rejection = h
        .gate
        .login_with_face(&probe_png(1, [255, 0, 0]), Some("mallory"), "10.0.0.3")
        .unwrap()
        .unwrap_err();

    assert_eq!(rejection, Rejection::NoMatch);
    assert_eq!(h.failures()[0].username, "mallory");
}

#[test]
fn below_threshold_probe_is_rejected() {
    let h = harness();
    // Orthogonal to alice's only signature.
    let rejection = h
        .gate
        .login_with_face(&probe_png(1, [0, 0, 255]), Some("alice"), "10.0.0.4")
        .unwrap()
        .unwrap_err();
    assert_eq!(rejection, Rejection::NoMatch);
}

#[test]
fn zero_or_several_faces_are_ambiguous() {
    let h = harness();

    let none = h.gate.login_with_face(&probe_png(0, [255, 0, 0]), None, "o").unwrap();
    assert_eq!(none.unwrap_err(), Rejection::NoFace);

    let two = h.gate.login_with_face(&probe_png(2, [255, 0, 0]), Some("alice"), "o").unwrap();
    assert_eq!(two.unwrap_err(), Rejection::MultipleFaces(2));

    let failures = h.failures();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(|f| f.username == UNKNOWN_USER));
}

#[test]
fn extraction_failure_is_a_rejection() {
    let h = harness();
    let rejection = h
        .gate
        .login_with_face(&probe_png(1, [0, 0, 0]), None, "o")
        .unwrap()
        .unwrap_err();
    assert!(matches!(rejection, Rejection::ExtractionFailed(_)));
}

#[test]
fn undecodable_image_is_rejected() {
    let h = harness();
    let rejection = h
        .gate
        .login_with_face(b"definitely not an image", None, "o")
        .unwrap()
        .unwrap_err();
    assert!(matches!(rejection, Rejection::UndecodableImage(_)));
    assert_eq!(h.failures()[0].username, UNKNOWN_USER);
}

#[test]
fn browser_data_url_is_accepted() {
    let h = harness();
    let url = format!("data:image/png;base64,{}", STANDARD.encode(probe_png(1, [255, 0, 0])));
    let outcome = h
        .gate
        .login_with_face(url.as_bytes(), None, "o")
        .unwrap()
        .unwrap();
    assert_eq!(outcome.username, "alice");
}

#[test]
fn password_login_paths() {
    let h = harness();

    let outcome = h.gate.login_with_password("alice", "alice-pass", "o").unwrap().unwrap();
    assert_eq!(outcome.username, "alice");
    assert_eq!(outcome.similarity, None);

    let wrong = h.gate.login_with_password("alice", "nope", "o").unwrap();
    assert_eq!(wrong.unwrap_err(), Rejection::InvalidCredentials);

    let unknown = h.gate.login_with_password("zed", "whatever", "o").unwrap();
    assert_eq!(unknown.unwrap_err(), Rejection::InvalidCredentials);

    let missing = h.gate.login_with_password("", "", "o").unwrap();
    assert_eq!(missing.unwrap_err(), Rejection::MissingCredentials);

    let names: Vec<_> = h.failures().into_iter().map(|f| f.username).collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains(&"alice".to_string()));
    assert!(names.contains(&"zed".to_string()));
    assert!(names.contains(&UNKNOWN_USER.to_string()));
}

#[test]
fn admin_session_carries_admin_role() {
    let h = harness();
    let claims = h.gate.sessions().verify(&h.admin_token).unwrap();
    assert_eq!(claims.role, Role::Admin);
}

#[test]
fn registration_requires_admin() {
    let h = harness();
    let alice = h.gate.login_with_password("alice", "alice-pass", "o").unwrap().unwrap();

    let err = h
        .gate
        .register(Some(&alice.token), "carol", "pw", vec![vec![1.0, 0.0, 0.0]])
        .unwrap_err();
    assert!(matches!(err, FaceGateError::AccessDenied(_)));

    let err = h.gate.register(None, "carol", "pw", vec![vec![1.0, 0.0, 0.0]]).unwrap_err();
    assert!(matches!(err, FaceGateError::AccessDenied(_)));

    assert!(h.store().fetch_by_username("carol").unwrap().is_none());
}

#[test]
fn registration_validates_input() {
    let h = harness();
    let token = Some(h.admin_token.as_str());

    match h.gate.register(token, "alice", "pw", vec![vec![1.0, 0.0, 0.0]]) {
        Err(FaceGateError::AlreadyExists(name)) => assert_eq!(name, "alice"),
        other => panic!("expected duplicate rejection, got {:?}", other),
    }

    match h.gate.register(token, "carol", "pw", vec![vec![1.0, 0.0]]) {
        Err(FaceGateError::DimensionMismatch { expected, actual }) => {
            assert_eq!((expected, actual), (3, 2));
        }
        other => panic!("expected dimension mismatch, got {:?}", other),
    }

    for (username, password, signatures) in [
        ("carol", "pw", vec![]),
        ("carol", "", vec![vec![1.0, 0.0, 0.0]]),
        ("", "pw", vec![vec![1.0, 0.0, 0.0]]),
        ("carol", "pw", vec![vec![0.0, 0.0, 0.0]]),
    ] {
        let err = h.gate.register(token, username, password, signatures).unwrap_err();
        assert!(matches!(err, FaceGateError::InvalidEnrollment(_)), "{:?}", err);
    }
}

#[test]
fn registered_signatures_are_normalized() {
    let h = harness();
    h.gate
        .register(Some(&h.admin_token), "carol", "pw", vec![vec![3.0, 4.0, 0.0]])
        .unwrap();

    let record = h.store().fetch_by_username("carol").unwrap().unwrap();
    let stored = &record.signatures[0];
    assert!((stored[0] - 0.6).abs() < 1e-6);
    assert!((stored[1] - 0.8).abs() < 1e-6);
    assert_ne!(record.password_hash, "pw");
}

#[test]
fn extract_signature_does_not_log_in() {
    let h = harness();
    let signature = h.gate.extract_signature(&probe_png(1, [0, 30, 40])).unwrap();
    assert!((signature[1] - 0.6).abs() < 1e-6);
    assert!((signature[2] - 0.8).abs() < 1e-6);

    assert_eq!(
        h.gate.extract_signature(&probe_png(3, [0, 30, 40])).unwrap_err(),
        Rejection::MultipleFaces(3)
    );
    assert!(h.failures().is_empty());
}

#[test]
fn admin_bootstrap_runs_once() {
    let tmp = TempDir::new().unwrap();
    let config = Config::from_toml(common::CONFIG).unwrap();
    let gate = gate_in(&tmp, &config);

    assert!(!gate.bootstrap_admin(None).unwrap());
    assert!(gate.bootstrap_admin(Some(ADMIN_PASSWORD)).unwrap());
    assert!(!gate.bootstrap_admin(Some("other")).unwrap());

    let store = facegate::storage::FileIdentityStore::new(tmp.path().join("users")).unwrap();
    let admin = store.fetch_by_username("admin").unwrap().unwrap();
    assert_eq!(admin.signatures.len(), 1);
    let norm: f32 = admin.signatures[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-5);

    assert!(gate.login_with_password("admin", ADMIN_PASSWORD, "o").unwrap().is_ok());
}

#[test]
fn store_faults_are_audited_before_surfacing() {
    let tmp = TempDir::new().unwrap();
    let config = Config::from_toml(common::CONFIG).unwrap();
    let audit_path = tmp.path().join("failed_logins.jsonl");
    let gate = FaceGate::new(
        &config,
        Box::new(PixelExtractor),
        Box::new(UnavailableStore),
        Box::new(FailedLoginLog::new(audit_path.clone()).unwrap()),
        SessionIssuer::new(SECRET, 24, &config.auth.admin_username).unwrap(),
    );

    let err = gate.login_with_password("alice", "alice-pass", "10.0.0.9").unwrap_err();
    assert!(matches!(err, FaceGateError::Storage(_)));
    let failures = FailedLoginLog::new(audit_path.clone()).unwrap().recent(10).unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].username, "alice");
    assert_eq!(failures[0].origin, "10.0.0.9");

    let err = gate
        .login_with_face(&probe_png(1, [255, 0, 0]), Some("alice"), "10.0.0.9")
        .unwrap_err();
    assert!(matches!(err, FaceGateError::Storage(_)));
    let failures = FailedLoginLog::new(audit_path).unwrap().recent(10).unwrap();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().any(|f| f.username == UNKNOWN_USER));
}
