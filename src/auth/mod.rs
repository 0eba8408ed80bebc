pub mod gate;
pub mod guard;
pub mod password;
pub mod session;

pub use gate::{FaceGate, LoginAttempt, LoginOutcome, Rejection};
pub use guard::Guard;
pub use password::{hash_password, verify_password};
pub use session::{Role, SessionClaims, SessionIssuer};
