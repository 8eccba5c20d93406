use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use storefront_cart::{DiscountPolicy, LookupError};

/// Resolves promo codes to discounts.
#[async_trait]
pub trait PromotionSource: Send + Sync {
    /// `None` for unknown or expired codes.
    async fn resolve(&self, code: &str) -> Result<Option<DiscountPolicy>, LookupError>;
}

/// Case-insensitive in-memory promo codes for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPromotions {
    codes: RwLock<HashMap<String, DiscountPolicy>>,
}

impl InMemoryPromotions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, code: &str, discount: DiscountPolicy) -> Result<(), LookupError> {
        self.write()?.insert(normalize(code), discount);
        Ok(())
    }

    pub fn remove(&self, code: &str) -> Result<(), LookupError> {
        self.write()?.remove(&normalize(code));
        Ok(())
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, DiscountPolicy>>, LookupError> {
        self.codes
            .write()
            .map_err(|_| LookupError::Unavailable("lock poisoned".to_string()))
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[async_trait]
impl PromotionSource for InMemoryPromotions {
    async fn resolve(&self, code: &str) -> Result<Option<DiscountPolicy>, LookupError> {
        let codes = self
            .codes
            .read()
            .map_err(|_| LookupError::Unavailable("lock poisoned".to_string()))?;
        Ok(codes.get(&normalize(code)).copied())
    }
}
