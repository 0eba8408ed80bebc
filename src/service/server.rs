use crate::auth::FaceGate;
use crate::common::config::ServiceConfig;
use crate::common::{FaceGateError, Result};
use crate::service::framing::{read_frame, write_frame};
use crate::service::protocol::{Request, Response};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct PeerCredentials {
    pub pid: u32,
    pub uid: u32,
}

pub fn peer_credentials(stream: &UnixStream) -> Result<PeerCredentials> {
    use std::mem;
    use std::os::unix::io::AsRawFd;

    let mut cred: libc::ucred = unsafe { mem::zeroed() };
    let mut cred_len = mem::size_of::<libc::ucred>() as libc::socklen_t;

    let ret = unsafe {
        libc::getsockopt(
            stream.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_PEERCRED,
            &mut cred as *mut _ as *mut libc::c_void,
            &mut cred_len,
        )
    };

    if ret != 0 {
        return Err(FaceGateError::Io(std::io::Error::last_os_error()));
    }

    Ok(PeerCredentials {
        pid: cred.pid as u32,
        uid: cred.uid as u32,
    })
}

/// Caller-supplied origin when present, otherwise the connecting uid.
fn resolve_origin(supplied: Option<String>, peer: Option<PeerCredentials>) -> String {
    match supplied.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        Some(origin) => origin,
        None => match peer {
            Some(peer) => format!("uid:{}", peer.uid),
            None => "uid:unknown".to_string(),
        },
    }
}

/// Runs one request against the gate. Never fails: faults become `Response::Error`.
pub fn dispatch(gate: &FaceGate, request: Request, peer: Option<PeerCredentials>) -> Response {
    let login = |attempt: Result<crate::auth::LoginAttempt>| match attempt {
        Ok(Ok(outcome)) => Response::Login(outcome),
        Ok(Err(rejection)) => Response::Rejected(rejection),
        Err(e) => {
            tracing::error!("Login failed: {}", e);
            Response::Error(e.to_string())
        }
    };

    match request {
        Request::PasswordLogin(req) => {
            let origin = resolve_origin(req.origin, peer);
            login(gate.login_with_password(&req.username, &req.password, &origin))
        }
        Request::FaceLogin(req) => {
            let origin = resolve_origin(req.origin, peer);
            login(gate.login_with_face(&req.image, req.username_hint.as_deref(), &origin))
        }
        Request::ExtractSignature(req) => match gate.extract_signature(&req.image) {
            Ok(signature) => Response::Signature(signature),
            Err(rejection) => Response::Rejected(rejection),
        },
        Request::Register(req) => {
            match gate.register(Some(&req.token), &req.username, &req.password, req.signatures) {
                Ok(()) => Response::Registered { username: req.username.trim().to_string() },
                Err(e) => {
                    tracing::warn!("Registration of '{}' failed: {}", req.username, e);
                    Response::Error(e.to_string())
                }
            }
        }
    }
}

/// Unix socket front end. The socket file is removed when the server drops.
pub struct ServiceServer {
    listener: UnixListener,
    socket_path: PathBuf,
    read_timeout: Duration,
    write_timeout: Duration,
    max_frame_bytes: usize,
}

impl ServiceServer {
    pub fn bind(socket_path: &Path, config: &ServiceConfig) -> Result<Self> {
        if socket_path.exists() {
            fs::remove_file(socket_path)?;
        }
        if let Some(parent) = socket_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(socket_path)?;
        // Any local user may connect; privileged operations are guarded per request.
        fs::set_permissions(socket_path, fs::Permissions::from_mode(0o666))?;
        tracing::info!("Listening on {}", socket_path.display());

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
            read_timeout: Duration::from_secs(config.read_timeout_secs),
            write_timeout: Duration::from_secs(config.write_timeout_secs),
            max_frame_bytes: config.max_frame_bytes,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Serves connections one at a time; a failed connection is logged and skipped.
    pub fn serve(&self, gate: &FaceGate) -> Result<()> {
        loop {
            if let Err(e) = self.accept_one(gate) {
                tracing::error!("Client error: {}", e);
            }
        }
    }

    pub fn accept_one(&self, gate: &FaceGate) -> Result<()> {
        let (stream, _) = self.listener.accept()?;
        self.handle_client(stream, gate)
    }

    fn handle_client(&self, mut stream: UnixStream, gate: &FaceGate) -> Result<()> {
        let peer = match peer_credentials(&stream) {
            Ok(peer) => {
                tracing::debug!("Connection from UID: {}, PID: {}", peer.uid, peer.pid);
                Some(peer)
            }
            Err(e) => {
                tracing::warn!("Could not read peer credentials: {}", e);
                None
            }
        };

        stream.set_read_timeout(Some(self.read_timeout))?;
        stream.set_write_timeout(Some(self.write_timeout))?;

        let response = match read_frame::<_, Request>(&mut stream, self.max_frame_bytes) {
            Ok(request) => dispatch(gate, request, peer),
            Err(FaceGateError::Protocol(msg)) => Response::Error(msg),
            Err(e) => return Err(e),
        };

        write_frame(&mut stream, &response)
    }
}

impl Drop for ServiceServer {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.socket_path) {
            tracing::debug!("Could not remove socket {}: {}", self.socket_path.display(), e);
        }
    }
}
