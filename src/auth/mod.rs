//! Authentication and authorization module
//!
//! Bearer-token verification, the claims model and role checks.

mod jwt;
pub mod middleware;

pub use jwt::{Claims, DecodedToken, JwtVerifier, TokenError};
pub use middleware::{authenticate, processing_context};

#[cfg(test)]
pub(crate) use jwt::test_support;

use serde::{Deserialize, Serialize};

/// Authorization level carried in the `role` claim.
///
/// `user` and `admin` are the levels the service acts on; any other value is
/// kept verbatim so newer token issuers do not break decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Regular signed-in user
    User,
    /// Administrator; a superset of `User`
    Admin,
    /// A role this service does not know about
    Other(String),
}

impl Role {
    /// Whether the role passes checks gated on "is a user".
    pub fn grants_user(&self) -> bool {
        matches!(self, Role::User | Role::Admin)
    }

    pub fn grants_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Other(other) => other,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => Role::User,
            "admin" => Role::Admin,
            _ => Role::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
