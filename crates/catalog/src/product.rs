//! Locally onboarded products and their Provider service mapping.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use chargeforge_core::{DomainError, GameCode, ProductId, ServiceCode};

/// One purchasable package exposed by the storefront, mapped to the Provider
/// service that fulfills it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub game: GameCode,
    pub service_code: ServiceCode,
}

impl Product {
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        game: GameCode,
        service_code: ServiceCode,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            game,
            service_code,
        })
    }
}

/// In-memory product directory. Rows are created at onboarding and live for
/// the product's lifetime.
#[derive(Debug, Default)]
pub struct ProductRegistry {
    inner: RwLock<HashMap<ProductId, Product>>,
}

impl ProductRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: Product) -> Result<Product, DomainError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| DomainError::conflict("registry lock poisoned"))?;
        if map.contains_key(&product.id) {
            return Err(DomainError::conflict("product already registered"));
        }
        map.insert(product.id, product.clone());
        Ok(product)
    }

    pub fn get(&self, product_id: &ProductId) -> Option<Product> {
        let map = self.inner.read().ok()?;
        map.get(product_id).cloned()
    }

    pub fn list(&self) -> Vec<Product> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let mut products: Vec<_> = map.values().cloned().collect();
        products.sort_by_key(|p| *p.id.as_uuid());
        products
    }

    pub fn list_for_game(&self, game: &GameCode) -> Vec<Product> {
        self.list().into_iter().filter(|p| p.game == *game).collect()
    }
}
