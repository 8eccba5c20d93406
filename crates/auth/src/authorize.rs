use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use storefront_core::UserId;

use crate::{Permission, PermissionCatalog, Principal, Role};

/// How a principal's role claim is compared against a required role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleMatch {
    /// Case-sensitive equality.
    #[default]
    Exact,
    /// The role claim only has to contain the required role ("Users" satisfies
    /// "User"). Kept for deployments that still depend on the old filters.
    Substring,
}

impl RoleMatch {
    pub fn matches(self, actual: &str, required: &str) -> bool {
        match self {
            RoleMatch::Exact => actual == required,
            RoleMatch::Substring => actual.contains(required),
        }
    }
}

impl FromStr for RoleMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(RoleMatch::Exact),
            "substring" => Ok(RoleMatch::Substring),
            other => Err(format!("unknown role match strategy '{other}'")),
        }
    }
}

/// A single access requirement declared by an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Role(Role),
    Permission(Permission),
    /// Explicitly declared alternatives: satisfied when any one of them is.
    AnyOf(Vec<Requirement>),
}

impl Requirement {
    pub fn role(role: Role) -> Self {
        Self::Role(role)
    }

    pub fn permission(permission: Permission) -> Self {
        Self::Permission(permission)
    }

    pub fn any_of(alternatives: impl IntoIterator<Item = Requirement>) -> Self {
        Self::AnyOf(alternatives.into_iter().collect())
    }
}

impl core::fmt::Display for Requirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Requirement::Role(r) => write!(f, "role '{r}'"),
            Requirement::Permission(p) => write!(f, "permission '{p}'"),
            Requirement::AnyOf(alts) => {
                f.write_str("any of [")?;
                for (i, alt) in alts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{alt}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl AuthzError {
    pub fn kind(&self) -> DenialKind {
        match self {
            AuthzError::Unauthenticated => DenialKind::Unauthenticated,
            AuthzError::Forbidden(_) => DenialKind::Forbidden,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Unauthenticated,
    Forbidden,
}

/// Request-time policy evaluator.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
///
/// Effective permissions are the principal's `permission` claims plus
/// whatever the catalog grants its role.
#[derive(Debug, Clone)]
pub struct AuthorizationGuard {
    catalog: Arc<PermissionCatalog>,
    role_match: RoleMatch,
}

impl AuthorizationGuard {
    pub fn new(catalog: Arc<PermissionCatalog>) -> Self {
        Self {
            catalog,
            role_match: RoleMatch::Exact,
        }
    }

    pub fn with_role_match(mut self, role_match: RoleMatch) -> Self {
        self.role_match = role_match;
        self
    }

    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    pub fn role_match(&self) -> RoleMatch {
        self.role_match
    }

    /// Decide a single requirement.
    pub fn authorize(
        &self,
        principal: Option<&Principal>,
        requirement: &Requirement,
    ) -> Result<(), AuthzError> {
        let principal = authenticated(principal)?;
        self.check(principal, requirement)
    }

    /// Decide every requirement of an endpoint (logical AND, declaration order).
    ///
    /// An empty list only asks for an authenticated principal.
    pub fn authorize_all(
        &self,
        principal: Option<&Principal>,
        requirements: &[Requirement],
    ) -> Result<(), AuthzError> {
        let principal = authenticated(principal)?;
        requirements
            .iter()
            .try_for_each(|req| self.check(principal, req))
    }

    /// All permissions the principal holds, sorted.
    pub fn effective_permissions(&self, principal: &Principal) -> BTreeSet<String> {
        let mut perms: BTreeSet<String> = principal.permissions().map(str::to_string).collect();
        if let Some(role) = principal.role() {
            perms.extend(
                self.catalog
                    .permissions_for(role)
                    .into_iter()
                    .map(|p| p.as_str().to_string()),
            );
        }
        perms
    }

    fn check(&self, principal: &Principal, requirement: &Requirement) -> Result<(), AuthzError> {
        match requirement {
            Requirement::Role(required) => match principal.role() {
                None => Err(AuthzError::Forbidden(format!(
                    "missing role claim (requires role '{required}')"
                ))),
                Some(actual) if self.role_match.matches(actual, required.as_str()) => Ok(()),
                Some(actual) => Err(AuthzError::Forbidden(format!(
                    "role '{actual}' does not satisfy required role '{required}'"
                ))),
            },
            Requirement::Permission(required) => {
                let has_claim = principal.permissions().any(|p| p == required.as_str());
                let granted_by_role = principal
                    .role()
                    .is_some_and(|role| self.catalog.grants(role, required.as_str()));

                if has_claim || granted_by_role {
                    Ok(())
                } else {
                    Err(AuthzError::Forbidden(format!(
                        "missing permission '{required}'"
                    )))
                }
            }
            Requirement::AnyOf(alternatives) => {
                let mut reasons = Vec::with_capacity(alternatives.len());
                for alt in alternatives {
                    match self.check(principal, alt) {
                        Ok(()) => return Ok(()),
                        Err(AuthzError::Forbidden(reason)) => reasons.push(reason),
                        Err(other) => return Err(other),
                    }
                }
                if reasons.is_empty() {
                    return Err(AuthzError::Forbidden(
                        "no alternatives declared".to_string(),
                    ));
                }
                Err(AuthzError::Forbidden(reasons.join(" or ")))
            }
        }
    }

    /// Explain why a decision was made (or would be made).
    ///
    /// Answers "why was this request allowed/denied?" for audit logs and
    /// admin tooling. Always agrees with [`AuthorizationGuard::authorize`].
    pub fn explain(
        &self,
        principal: Option<&Principal>,
        requirement: &Requirement,
    ) -> AuthorizationExplanation {
        let decision = self.authorize(principal, requirement);
        let state = principal.filter(|p| p.is_authenticated()).map(|p| PrincipalState {
            user_id: p.user_id(),
            role: p.role().map(str::to_string),
            effective_permissions: self.effective_permissions(p).into_iter().collect(),
        });

        match decision {
            Ok(()) => AuthorizationExplanation {
                requirement: requirement.to_string(),
                granted: true,
                reason: format!("principal satisfies {requirement}"),
                principal: state,
                denial: None,
            },
            Err(err) => {
                let suggestions = match &err {
                    AuthzError::Unauthenticated => {
                        vec!["Sign in and retry with a valid bearer token".to_string()]
                    }
                    AuthzError::Forbidden(_) => self.suggestions_for(requirement),
                };
                AuthorizationExplanation {
                    requirement: requirement.to_string(),
                    granted: false,
                    reason: err.to_string(),
                    principal: state,
                    denial: Some(DenialReason {
                        kind: err.kind(),
                        message: err.to_string(),
                        suggestions,
                    }),
                }
            }
        }
    }

    fn suggestions_for(&self, requirement: &Requirement) -> Vec<String> {
        match requirement {
            Requirement::Role(role) => vec![format!("Assign the '{role}' role")],
            Requirement::Permission(perm) => {
                let holders: Vec<&str> = self
                    .catalog
                    .roles_granting(perm.as_str())
                    .into_iter()
                    .map(Role::as_str)
                    .collect();
                let mut out = vec![format!("Grant the '{perm}' permission directly")];
                if !holders.is_empty() {
                    out.insert(
                        0,
                        format!("Assign one of the roles granting it: {}", holders.join(", ")),
                    );
                }
                out
            }
            Requirement::AnyOf(alts) => alts
                .iter()
                .flat_map(|alt| self.suggestions_for(alt))
                .collect(),
        }
    }
}

fn authenticated(principal: Option<&Principal>) -> Result<&Principal, AuthzError> {
    match principal {
        Some(p) if p.is_authenticated() => Ok(p),
        _ => Err(AuthzError::Unauthenticated),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub requirement: String,
    pub granted: bool,
    pub reason: String,
    /// `None` when there was no authenticated principal to inspect.
    pub principal: Option<PrincipalState>,
    pub denial: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub user_id: UserId,
    pub role: Option<String>,
    pub effective_permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}
