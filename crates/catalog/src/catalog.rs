//! Live availability: Provider-reported services combined with local stock.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use chargeforge_core::{GameCode, ProductId, ServiceCode};
use chargeforge_provider::{ProviderApi, ProviderError, PriceTier, ServiceFilter, ServiceStatus};
use chargeforge_stock::{StockLedger, StockRecord, StockStore};

use crate::product::{Product, ProductRegistry};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The Provider could not be reached (or timed out) for a live read.
    #[error("provider service unavailable")]
    ServiceUnavailable,

    #[error("unknown product")]
    UnknownProduct,
}

impl From<ProviderError> for CatalogError {
    fn from(_: ProviderError) -> Self {
        CatalogError::ServiceUnavailable
    }
}

/// One sellable package as shown to the checkout flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    pub code: ServiceCode,
    pub display_name: String,
    pub price: PriceTier,
    pub status: ServiceStatus,
}

/// Point-in-time Provider stock read. The Provider is authoritative for its
/// own sellable inventory; the local ledger for the locally exposed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockSnapshot {
    pub code: ServiceCode,
    pub provider_stock: i64,
}

/// Combined availability verdict for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchasability {
    pub product: Product,
    pub provider_stock: i64,
    pub local: StockRecord,
}

impl Purchasability {
    /// Sellable only if **both** sides say yes.
    pub fn purchasable(&self) -> bool {
        self.provider_stock > 0 && self.local.sellable()
    }
}

/// The storefront's read side over Provider services and local stock.
///
/// Generic over the Provider seam (`?Sized` so a type-erased
/// `dyn ProviderApi` works at the composition root).
pub struct ServiceCatalog<P: ?Sized, S: StockStore> {
    provider: Arc<P>,
    ledger: Arc<StockLedger<S>>,
    registry: Arc<ProductRegistry>,
}

impl<P: ProviderApi + ?Sized, S: StockStore> ServiceCatalog<P, S> {
    pub fn new(provider: Arc<P>, ledger: Arc<StockLedger<S>>, registry: Arc<ProductRegistry>) -> Self {
        Self {
            provider,
            ledger,
            registry,
        }
    }

    pub fn registry(&self) -> &ProductRegistry {
        &self.registry
    }

    /// List the Provider's services for a game. An empty list is a valid
    /// "no packages" answer, not an error.
    pub async fn list_available(&self, game: &GameCode) -> Result<Vec<Service>, CatalogError> {
        let listings = self
            .provider
            .list_services(&ServiceFilter::for_game(game.clone()))
            .await?;

        Ok(listings
            .into_iter()
            .map(|l| Service {
                code: l.code,
                display_name: l.name,
                price: l.price,
                status: l.status,
            })
            .collect())
    }

    /// Point-in-time Provider stock for one service code.
    pub async fn check_stock(&self, code: &ServiceCode) -> Result<StockSnapshot, CatalogError> {
        let level = self.provider.check_stock(code).await?;
        Ok(StockSnapshot {
            code: level.code,
            provider_stock: level.stock,
        })
    }

    /// The combined purchasability rule: Provider stock non-zero AND local
    /// record non-zero or unlimited.
    pub async fn purchasable(&self, product_id: &ProductId) -> Result<Purchasability, CatalogError> {
        let product = self
            .registry
            .get(product_id)
            .ok_or(CatalogError::UnknownProduct)?;

        let local = self
            .ledger
            .peek(&product.id)
            .map_err(|_| CatalogError::UnknownProduct)?;

        let snapshot = self.check_stock(&product.service_code).await?;

        Ok(Purchasability {
            product,
            provider_stock: snapshot.provider_stock,
            local,
        })
    }
}
