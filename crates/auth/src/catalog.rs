//! Role → permission table.

use std::collections::{BTreeMap, BTreeSet};

use crate::permissions::{self, Permission};
use crate::roles::{self, Role};

/// Read-only mapping from role name to the permissions it grants.
///
/// Built once at startup and handed to the [`crate::AuthorizationGuard`].
/// Changing grants means rebuilding the catalog (and re-issuing tokens whose
/// `permission` claims were derived from it).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCatalog {
    table: BTreeMap<Role, BTreeSet<Permission>>,
}

impl PermissionCatalog {
    /// Build a catalog from an explicit table. Repeated roles are merged.
    pub fn from_table<I, P>(table: I) -> Self
    where
        I: IntoIterator<Item = (Role, P)>,
        P: IntoIterator<Item = Permission>,
    {
        let mut out: BTreeMap<Role, BTreeSet<Permission>> = BTreeMap::new();
        for (role, perms) in table {
            out.entry(role).or_default().extend(perms);
        }
        Self { table: out }
    }

    /// The storefront's built-in roles and grants.
    pub fn seeded() -> Self {
        use permissions::*;

        let customer = vec![
            PRODUCTS_VIEW,
            CART_MANAGE,
            CHECKOUT_CREATE,
            ORDERS_VIEW,
        ];

        Self::from_table([
            (roles::ADMIN, permissions::all()),
            (roles::USER, customer.clone()),
            (roles::USERS, customer),
            (
                roles::STAFF,
                vec![
                    PRODUCTS_VIEW,
                    PRODUCTS_UPDATE,
                    PRODUCTS_STOCK_MANAGE,
                    ORDERS_VIEW,
                    ORDERS_VIEW_ALL,
                    ORDERS_UPDATE,
                    SUPPLIER_LISTINGS_VIEW,
                ],
            ),
            (
                roles::SUPPLIER,
                vec![
                    PRODUCTS_VIEW,
                    ORDERS_VIEW,
                    SUPPLIER_LISTINGS_VIEW,
                    SUPPLIER_LISTINGS_MANAGE,
                ],
            ),
        ])
    }

    /// Permissions granted to `role`; empty for roles the catalog does not know.
    pub fn permissions_for(&self, role: &str) -> BTreeSet<Permission> {
        self.table.get(role).cloned().unwrap_or_default()
    }

    pub fn grants(&self, role: &str, permission: &str) -> bool {
        self.table
            .get(role)
            .is_some_and(|perms| perms.contains(permission))
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.table.keys()
    }

    /// Roles whose grants include `permission` (sorted by role name).
    pub fn roles_granting(&self, permission: &str) -> Vec<&Role> {
        self.table
            .iter()
            .filter(|(_, perms)| perms.contains(permission))
            .map(|(role, _)| role)
            .collect()
    }
}
