//! JWT verification
//!
//! Verifies HS256 bearer tokens and exposes the decoded header and claims.
//! Token issuance lives with the identity provider, not here.

use crate::auth::Role;
use crate::config::AuthConfig;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// User email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// User role
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
}

/// A bearer token whose signature and expiry have been checked.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    header: Header,
    raw: String,
}

impl DecodedToken {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn algorithm(&self) -> Algorithm {
        self.header.alg
    }

    /// The compact serialized form, as received.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Checks bearer tokens against the configured shared secret.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;

        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decode and validate a JWT token
    pub fn verify(&self, token: &str) -> Result<(DecodedToken, Claims), TokenError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        Ok((
            DecodedToken {
                header: data.header,
                raw: token.to_string(),
            },
            data.claims,
        ))
    }
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithms", &self.validation.algorithms)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}
