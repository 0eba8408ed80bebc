#![allow(dead_code)]

use facegate::auth::{hash_password, FaceGate, SessionIssuer};
use facegate::common::{Config, FaceGateError, Result};
use facegate::core::{normalize, FaceBox, Signature, SignatureExtractor};
use facegate::storage::{FailedAttempt, FailedLoginLog, FileIdentityStore, IdentityRecord, IdentityRegistry};
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::PathBuf;
use tempfile::TempDir;

pub const CONFIG: &str = r#"
[service]
max_frame_bytes = 4096

[models]
detector_path = "detector.onnx"
recognizer_path = "recognizer.onnx"

[recognizer]
signature_dim = 3

[auth]
password_iterations = 64
"#;

pub const SECRET: &[u8] = b"integration-secret";
pub const ADMIN_PASSWORD: &str = "admin-pass";

/// Reads the probe from the top-left pixel: red is the face count, the other
/// three channels are the signature.
pub struct PixelExtractor;

fn corner(image: &DynamicImage) -> [u8; 4] {
    image.to_rgba8().get_pixel(0, 0).0
}

impl SignatureExtractor for PixelExtractor {
    fn locate_faces(&self, image: &DynamicImage) -> Result<Vec<FaceBox>> {
        let faces = corner(image)[0];
        Ok((0..faces)
            .map(|i| FaceBox {
                x1: 0.0,
                y1: 0.0,
                x2: 4.0,
                y2: 4.0,
                confidence: 0.9 - i as f32 * 0.1,
            })
            .collect())
    }

    fn extract_signature(&self, image: &DynamicImage, _face: &FaceBox) -> Result<Signature> {
        let px = corner(image);
        let mut signature = vec![px[1] as f32, px[2] as f32, px[3] as f32];
        if !normalize(&mut signature) {
            return Err(FaceGateError::Extraction("empty signature".into()));
        }
        Ok(signature)
    }
}

pub fn probe_png(faces: u8, signature: [u8; 3]) -> Vec<u8> {
    let pixel = Rgba([faces, signature[0], signature[1], signature[2]]);
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, pixel));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageOutputFormat::Png).unwrap();
    buf.into_inner()
}

pub struct Harness {
    pub tmp: TempDir,
    pub config: Config,
    pub gate: FaceGate,
    pub users_dir: PathBuf,
    pub audit_path: PathBuf,
    pub admin_token: String,
}

impl Harness {
    pub fn store(&self) -> FileIdentityStore {
        FileIdentityStore::new(self.users_dir.clone()).unwrap()
    }

    pub fn failures(&self) -> Vec<FailedAttempt> {
        FailedLoginLog::new(self.audit_path.clone()).unwrap().recent(100).unwrap()
    }
}

pub fn gate_in(tmp: &TempDir, config: &Config) -> FaceGate {
    let users = FileIdentityStore::new(tmp.path().join("users")).unwrap();
    let audit = FailedLoginLog::new(tmp.path().join("failed_logins.jsonl")).unwrap();
    let sessions = SessionIssuer::new(SECRET, 24, &config.auth.admin_username).unwrap();
    FaceGate::new(config, Box::new(PixelExtractor), Box::new(users), Box::new(audit), sessions)
}

/// Admin (signature pointing away from every probe), alice on the first axis,
/// bob with two signatures.
pub fn harness() -> Harness {
    let tmp = TempDir::new().unwrap();
    let config = Config::from_toml(CONFIG).unwrap();
    let users_dir = tmp.path().join("users");
    let audit_path = tmp.path().join("failed_logins.jsonl");

    let admin = IdentityRecord::new(
        "admin",
        hash_password(ADMIN_PASSWORD, 64).unwrap(),
        vec![vec![0.0, 0.0, -1.0]],
    );
    FileIdentityStore::new(users_dir.clone()).unwrap().insert(&admin).unwrap();

    let gate = gate_in(&tmp, &config);
    let admin_token = gate
        .login_with_password("admin", ADMIN_PASSWORD, "test")
        .unwrap()
        .unwrap()
        .token;

    gate.register(Some(&admin_token), "alice", "alice-pass", vec![vec![1.0, 0.0, 0.0]])
        .unwrap();
    gate.register(
        Some(&admin_token),
        "bob",
        "bob-pass",
        vec![vec![0.0, 1.0, 0.0], vec![0.0, 0.8, 0.6]],
    )
    .unwrap();

    Harness { tmp, config, gate, users_dir, audit_path, admin_token }
}
