use std::borrow::{Borrow, Cow};

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "orders.delete"). The
/// constants below are the permissions the seeded catalog knows about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
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

impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const PRODUCTS_VIEW: Permission = Permission::from_static("products.view");
pub const PRODUCTS_CREATE: Permission = Permission::from_static("products.create");
pub const PRODUCTS_UPDATE: Permission = Permission::from_static("products.update");
pub const PRODUCTS_DELETE: Permission = Permission::from_static("products.delete");
pub const PRODUCTS_STOCK_MANAGE: Permission = Permission::from_static("products.stock.manage");

pub const CART_MANAGE: Permission = Permission::from_static("cart.manage");
pub const CHECKOUT_CREATE: Permission = Permission::from_static("checkout.create");

pub const ORDERS_VIEW: Permission = Permission::from_static("orders.view");
pub const ORDERS_VIEW_ALL: Permission = Permission::from_static("orders.view.all");
pub const ORDERS_UPDATE: Permission = Permission::from_static("orders.update");
pub const ORDERS_DELETE: Permission = Permission::from_static("orders.delete");

pub const SUPPLIER_LISTINGS_VIEW: Permission = Permission::from_static("suppliers.listings.view");
pub const SUPPLIER_LISTINGS_MANAGE: Permission =
    Permission::from_static("suppliers.listings.manage");

pub const USERS_MANAGE: Permission = Permission::from_static("users.manage");

/// Every permission the storefront defines, in declaration order.
pub fn all() -> Vec<Permission> {
    vec![
        PRODUCTS_VIEW,
        PRODUCTS_CREATE,
        PRODUCTS_UPDATE,
        PRODUCTS_DELETE,
        PRODUCTS_STOCK_MANAGE,
        CART_MANAGE,
        CHECKOUT_CREATE,
        ORDERS_VIEW,
        ORDERS_VIEW_ALL,
        ORDERS_UPDATE,
        ORDERS_DELETE,
        SUPPLIER_LISTINGS_VIEW,
        SUPPLIER_LISTINGS_MANAGE,
        USERS_MANAGE,
    ]
}
