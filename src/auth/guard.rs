use crate::auth::session::{Role, SessionClaims, SessionIssuer};
use crate::common::{FaceGateError, Result};
use crate::storage::SignatureStore;

/// Access check placed in front of a privileged operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    required_role: Option<Role>,
}

impl Guard {
    /// Any valid session whose subject is still enrolled.
    pub fn authenticated() -> Self {
        Self { required_role: None }
    }

    pub fn admin() -> Self {
        Self { required_role: Some(Role::Admin) }
    }

    pub fn check<S>(
        &self,
        sessions: &SessionIssuer,
        store: &S,
        bearer: Option<&str>,
    ) -> Result<SessionClaims>
    where
        S: SignatureStore + ?Sized,
    {
        let token = bearer
            .map(|b| b.trim())
            .map(|b| b.strip_prefix("Bearer ").unwrap_or(b).trim())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FaceGateError::AccessDenied("missing session token".into()))?;

        let claims = sessions.verify(token).map_err(|e| {
            tracing::debug!("Session token rejected: {}", e);
            FaceGateError::AccessDenied("invalid or expired session token".into())
        })?;

        if store.fetch_by_username(&claims.sub)?.is_none() {
            return Err(FaceGateError::AccessDenied(format!(
                "session subject '{}' no longer exists", claims.sub
            )));
        }

        if let Some(role) = self.required_role {
            if claims.role != role {
                return Err(FaceGateError::AccessDenied(format!(
                    "'{}' is not allowed to perform this operation", claims.sub
                )));
            }
        }

        Ok(claims)
    }

    /// Runs `handler` only when the bearer token passes this guard.
    pub fn wrap<S, T, F>(
        &self,
        sessions: &SessionIssuer,
        store: &S,
        bearer: Option<&str>,
        handler: F,
    ) -> Result<T>
    where
        S: SignatureStore + ?Sized,
        F: FnOnce(&SessionClaims) -> Result<T>,
    {
        let claims = self.check(sessions, store, bearer)?;
        handler(&claims)
    }
}
