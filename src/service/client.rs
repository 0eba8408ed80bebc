use crate::auth::{LoginAttempt, Rejection};
use crate::common::{FaceGateError, Result};
use crate::core::Signature;
use crate::service::framing::{read_frame, write_frame};
use crate::service::protocol::{
    ExtractRequest, FaceLoginRequest, PasswordLoginRequest, RegisterRequest, Request, Response,
};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONNECT_RETRIES: u32 = 3;

pub struct ServiceClient {
    socket_path: PathBuf,
    timeout: Duration,
    max_frame_bytes: usize,
}

impl ServiceClient {
    pub fn new(socket_path: &Path) -> Self {
        Self {
            socket_path: socket_path.to_path_buf(),
            timeout: Duration::from_secs(120),
            max_frame_bytes: 8 * 1024 * 1024,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn password_login(&self, username: &str, password: &str) -> Result<LoginAttempt> {
        let request = Request::PasswordLogin(PasswordLoginRequest {
            username: username.to_string(),
            password: password.to_string(),
            origin: None,
        });
        Self::login_response(self.request(&request)?)
    }

    pub fn face_login(&self, image: Vec<u8>, username_hint: Option<&str>) -> Result<LoginAttempt> {
        let request = Request::FaceLogin(FaceLoginRequest {
            image,
            username_hint: username_hint.map(str::to_string),
            origin: None,
        });
        Self::login_response(self.request(&request)?)
    }

    pub fn extract_signature(&self, image: Vec<u8>) -> Result<std::result::Result<Signature, Rejection>> {
        match self.request(&Request::ExtractSignature(ExtractRequest { image }))? {
            Response::Signature(signature) => Ok(Ok(signature)),
            Response::Rejected(rejection) => Ok(Err(rejection)),
            other => Err(Self::unexpected(other)),
        }
    }

    pub fn register(
        &self,
        token: &str,
        username: &str,
        password: &str,
        signatures: Vec<Signature>,
    ) -> Result<String> {
        let request = Request::Register(RegisterRequest {
            token: token.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            signatures,
        });
        match self.request(&request)? {
            Response::Registered { username } => Ok(username),
            other => Err(Self::unexpected(other)),
        }
    }

    pub fn request(&self, request: &Request) -> Result<Response> {
        let mut stream = self.connect_with_retry(CONNECT_RETRIES)?;
        write_frame(&mut stream, request)?;
        read_frame(&mut stream, self.max_frame_bytes)
    }

    fn login_response(response: Response) -> Result<LoginAttempt> {
        match response {
            Response::Login(outcome) => Ok(Ok(outcome)),
            Response::Rejected(rejection) => Ok(Err(rejection)),
            other => Err(Self::unexpected(other)),
        }
    }

    fn unexpected(response: Response) -> FaceGateError {
        match response {
            Response::Error(msg) => FaceGateError::Other(anyhow::anyhow!("Service error: {}", msg)),
            other => FaceGateError::Protocol(format!("Unexpected response: {:?}", other)),
        }
    }

    fn connect_with_retry(&self, max_retries: u32) -> Result<UnixStream> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match UnixStream::connect(&self.socket_path) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.timeout))?;
                    stream.set_write_timeout(Some(Duration::from_secs(10)))?;
                    return Ok(stream);
                }
                Err(e) if attempt < max_retries => {
                    tracing::debug!("Failed to connect (attempt {}): {}", attempt, e);
                    std::thread::sleep(Duration::from_millis(500));
                }
                Err(e) => {
                    return Err(FaceGateError::Other(anyhow::anyhow!(
                        "Failed to connect to service at {}: {}", self.socket_path.display(), e
                    )));
                }
            }
        }
    }
}
