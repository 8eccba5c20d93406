//! HS256 bearer-token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use storefront_auth::{ClaimsVerifier, StorefrontClaims, TokenValidationError, validate_claims};

/// Verifies HS256-signed tokens carrying [`StorefrontClaims`].
///
/// Only the signature is checked by `jsonwebtoken`; the time window comes
/// from the claims' own `issued_at`/`expires_at` via [`validate_claims`].
pub struct Hs256ClaimsVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256ClaimsVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl ClaimsVerifier for Hs256ClaimsVerifier {
    fn verify(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<StorefrontClaims, TokenValidationError> {
        let data = decode::<StorefrontClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
