use crate::common::{FaceGateError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and checks HS256 session tokens bound to an identity.
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    admin_username: String,
}

impl SessionIssuer {
    pub fn new(secret: &[u8], ttl_hours: i64, admin_username: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(FaceGateError::Config("Token secret must not be empty".into()));
        }
        if ttl_hours < 1 {
            return Err(FaceGateError::Config(format!(
                "Token lifetime must be at least one hour, got {}", ttl_hours
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: Duration::hours(ttl_hours),
            admin_username: admin_username.to_string(),
        })
    }

    pub fn role_of(&self, identity: &str) -> Role {
        if identity == self.admin_username {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn issue(&self, identity: &str) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: identity.to_string(),
            role: self.role_of(identity),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        tracing::debug!("Issued {:?} session for '{}'", claims.role, identity);
        Ok(token)
    }

    /// Claims of a well-signed, unexpired token.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}
