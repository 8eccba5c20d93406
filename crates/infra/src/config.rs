//! Storefront configuration loaded from the environment.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use storefront_auth::RoleMatch;
use storefront_cart::{PricingPolicy, ServiceFee, ShippingPolicy, TaxPolicy};
use storefront_core::BasisPoints;

pub const SERVICE_FEE_BPS: &str = "STOREFRONT_SERVICE_FEE_BPS";
pub const SERVICE_FEE_FLAT: &str = "STOREFRONT_SERVICE_FEE_FLAT";
pub const SHIPPING_FEE: &str = "STOREFRONT_SHIPPING_FEE";
pub const FREE_SHIPPING_THRESHOLD: &str = "STOREFRONT_FREE_SHIPPING_THRESHOLD";
pub const TAX_BPS: &str = "STOREFRONT_TAX_BPS";
pub const SUPPLIER_TIMEOUT_MS: &str = "STOREFRONT_SUPPLIER_TIMEOUT_MS";
pub const ROLE_MATCH: &str = "STOREFRONT_ROLE_MATCH";

const DEFAULT_SHIPPING_FEE: u64 = 20_000;
const DEFAULT_SUPPLIER_TIMEOUT: Duration = Duration::from_millis(2_000);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Checkout policies and collaborator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    pub pricing: PricingPolicy,
    pub shipping: ShippingPolicy,
    pub tax: TaxPolicy,
    /// Upper bound on one supplier or promotion lookup.
    pub supplier_timeout: Duration,
    pub role_match: RoleMatch,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy::default(),
            shipping: ShippingPolicy::Flat {
                fee: DEFAULT_SHIPPING_FEE,
            },
            tax: TaxPolicy::None,
            supplier_timeout: DEFAULT_SUPPLIER_TIMEOUT,
            role_match: RoleMatch::Exact,
        }
    }
}

impl StorefrontConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let flat_fee: Option<u64> = parse(SERVICE_FEE_FLAT, get(SERVICE_FEE_FLAT))?;
        let fee_bps: Option<u32> = parse(SERVICE_FEE_BPS, get(SERVICE_FEE_BPS))?;
        let service_fee = match (flat_fee, fee_bps) {
            (Some(fee), bps) => {
                if bps.is_some() {
                    tracing::warn!(
                        "{SERVICE_FEE_FLAT} and {SERVICE_FEE_BPS} both set; using the flat fee"
                    );
                }
                ServiceFee::Flat(fee)
            }
            (None, Some(bps)) => ServiceFee::Percentage(bps_in_range(SERVICE_FEE_BPS, bps)?),
            (None, None) => ServiceFee::None,
        };

        let fee = parse(SHIPPING_FEE, get(SHIPPING_FEE))?.unwrap_or(DEFAULT_SHIPPING_FEE);
        let shipping = match parse::<u64>(FREE_SHIPPING_THRESHOLD, get(FREE_SHIPPING_THRESHOLD))? {
            Some(threshold) => ShippingPolicy::FreeOver { fee, threshold },
            None if fee == 0 => ShippingPolicy::Free,
            None => ShippingPolicy::Flat { fee },
        };

        let tax = match parse::<u32>(TAX_BPS, get(TAX_BPS))? {
            None | Some(0) => TaxPolicy::None,
            Some(bps) => TaxPolicy::Percentage(bps_in_range(TAX_BPS, bps)?),
        };

        let supplier_timeout = match parse::<u64>(SUPPLIER_TIMEOUT_MS, get(SUPPLIER_TIMEOUT_MS))? {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    key: SUPPLIER_TIMEOUT_MS,
                    message: "must be greater than zero".to_string(),
                });
            }
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_SUPPLIER_TIMEOUT,
        };

        let role_match = match get(ROLE_MATCH) {
            Some(raw) => RoleMatch::from_str(&raw)
                .map_err(|message| ConfigError::Invalid { key: ROLE_MATCH, message })?,
            None => RoleMatch::Exact,
        };

        Ok(Self {
            pricing: PricingPolicy { service_fee },
            shipping,
            tax,
            supplier_timeout,
            role_match,
        })
    }
}

fn parse<T>(key: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            message: format!("'{value}': {e}"),
        })
    })
    .transpose()
}

fn bps_in_range(key: &'static str, bps: u32) -> Result<BasisPoints, ConfigError> {
    if bps > BasisPoints::FULL.get() {
        return Err(ConfigError::Invalid {
            key,
            message: format!("{bps} exceeds 10000 basis points"),
        });
    }
    Ok(BasisPoints::new(bps))
}
