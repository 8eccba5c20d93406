use serde::{Deserialize, Serialize};

use storefront_core::UserId;

/// Claim kind carrying the principal's single role.
pub const ROLE_CLAIM: &str = "role";
/// Claim kind carrying one granted permission (may repeat).
pub const PERMISSION_CLAIM: &str = "permission";

/// A key/value fact about a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub kind: String,
    pub value: String,
}

impl Claim {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn role(value: impl Into<String>) -> Self {
        Self::new(ROLE_CLAIM, value)
    }

    pub fn permission(value: impl Into<String>) -> Self {
        Self::new(PERMISSION_CLAIM, value)
    }
}

/// An authenticated caller and the claims its identity provider vouched for.
///
/// Built by the boundary from verified token claims and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    user_id: UserId,
    authenticated: bool,
    claims: Vec<Claim>,
}

impl Principal {
    pub fn authenticated(user_id: UserId, claims: Vec<Claim>) -> Self {
        Self {
            user_id,
            authenticated: true,
            claims,
        }
    }

    /// A principal the identity layer could not authenticate.
    pub fn unauthenticated(user_id: UserId) -> Self {
        Self {
            user_id,
            authenticated: false,
            claims: Vec::new(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// The role claim; when several are present the first one wins.
    pub fn role(&self) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.kind == ROLE_CLAIM)
            .map(|c| c.value.as_str())
    }

    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.claims
            .iter()
            .filter(|c| c.kind == PERMISSION_CLAIM)
            .map(|c| c.value.as_str())
    }
}
