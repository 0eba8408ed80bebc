use crate::auth::{LoginOutcome, Rejection};
use crate::core::Signature;
use serde::{Deserialize, Serialize};

/// One request per connection, sent as a single frame.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Request {
    PasswordLogin(PasswordLoginRequest),
    FaceLogin(FaceLoginRequest),
    ExtractSignature(ExtractRequest),
    Register(RegisterRequest),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PasswordLoginRequest {
    pub username: String,
    pub password: String,
    /// Address of the end user when the caller is a proxy.
    pub origin: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FaceLoginRequest {
    /// Encoded image bytes or a `data:` URL.
    pub image: Vec<u8>,
    pub username_hint: Option<String>,
    pub origin: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExtractRequest {
    pub image: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub token: String,
    pub username: String,
    pub password: String,
    pub signatures: Vec<Signature>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Response {
    Login(LoginOutcome),
    Signature(Signature),
    Registered { username: String },
    Rejected(Rejection),
    Error(String),
}
