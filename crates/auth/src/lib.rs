//! `storefront-auth`: pure authorization boundary (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage: it never
//! issues or verifies tokens, it only reads the claims handed to it.

pub mod authorize;
pub mod catalog;
pub mod claims;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{
    AuthorizationExplanation, AuthorizationGuard, AuthzError, DenialKind, Requirement, RoleMatch,
};
pub use catalog::PermissionCatalog;
pub use claims::{ClaimsVerifier, StorefrontClaims, TokenValidationError, validate_claims};
pub use permissions::Permission;
pub use principal::{Claim, PERMISSION_CLAIM, Principal, ROLE_CLAIM};
pub use roles::Role;
