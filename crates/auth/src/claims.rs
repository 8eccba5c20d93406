use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::UserId;

use crate::{Claim, Permission, Principal, Role};

/// Token claims model (transport-agnostic).
///
/// This is the set of claims the storefront expects once a token has been
/// decoded/verified by whatever transport/security layer is in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorefrontClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// The user's single role.
    pub role: Role,

    /// Permissions granted at issuance time (from the catalog or per-user grants).
    #[serde(default)]
    pub permissions: Vec<Permission>,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

impl StorefrontClaims {
    /// Turn verified claims into a request principal.
    pub fn into_principal(self) -> Principal {
        let mut claims = Vec::with_capacity(self.permissions.len() + 1);
        claims.push(Claim::role(self.role.as_str()));
        claims.extend(
            self.permissions
                .iter()
                .map(|p| Claim::permission(p.as_str())),
        );
        Principal::authenticated(self.sub, claims)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Deterministically validate token claims.
///
/// Note: this validates the *claims* only. Signature verification / decoding is
/// intentionally outside this crate.
pub fn validate_claims(
    claims: &StorefrontClaims,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Decodes and verifies a bearer token into claims.
///
/// Implemented by the transport layer (e.g. an HS256 adapter); the core only
/// consumes the result.
pub trait ClaimsVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>)
    -> Result<StorefrontClaims, TokenValidationError>;
}
