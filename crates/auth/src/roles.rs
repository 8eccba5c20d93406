use std::borrow::{Borrow, Cow};

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Roles are opaque, case-sensitive strings. Which permissions a role carries
/// is decided by a [`crate::PermissionCatalog`], never by the role itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Role {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const ADMIN: Role = Role::from_static("Admin");
pub const USER: Role = Role::from_static("User");
/// Legacy plural spelling still carried by older accounts.
pub const USERS: Role = Role::from_static("Users");
pub const STAFF: Role = Role::from_static("Staff");
pub const SUPPLIER: Role = Role::from_static("Supplier");
