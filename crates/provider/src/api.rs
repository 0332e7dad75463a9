//! The Provider seam consumed by catalog and order flow.

use async_trait::async_trait;

use chargeforge_core::{GameCode, ServiceCode};

use crate::error::ProviderError;
use crate::types::{
    OrderReceipt, OrderRequest, ServiceFilter, ServiceListing, StockLevel, TransactionRecord,
};

/// Remote fulfillment Provider operations.
///
/// All calls are read-only except `submit_order`. Implementations must apply
/// a bounded transport timeout and surface it as
/// [`ProviderError::Unavailable`].
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// `GET services`: list sellable services, optionally filtered.
    async fn list_services(&self, filter: &ServiceFilter) -> Result<Vec<ServiceListing>, ProviderError>;

    /// `GET stock?code`: the Provider's own sellable quantity for a service.
    async fn check_stock(&self, code: &ServiceCode) -> Result<StockLevel, ProviderError>;

    /// `GET nickname`: resolve a player account to a display name.
    /// An unknown account is [`ProviderError::NotFound`].
    async fn lookup_nickname(
        &self,
        game: &GameCode,
        user_id: &str,
        zone_id: Option<&str>,
    ) -> Result<String, ProviderError>;

    /// `POST order`: submit one fulfillment order. Not safely repeatable.
    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderReceipt, ProviderError>;

    /// `GET status?trxid`: observations for a previously submitted order.
    async fn check_status(&self, trxid: &str) -> Result<Vec<TransactionRecord>, ProviderError>;

    /// `GET balance`: reseller account balance (admin reconciliation aid).
    async fn balance(&self) -> Result<f64, ProviderError>;
}

#[async_trait]
impl<T> ProviderApi for std::sync::Arc<T>
where
    T: ProviderApi + ?Sized,
{
    async fn list_services(&self, filter: &ServiceFilter) -> Result<Vec<ServiceListing>, ProviderError> {
        (**self).list_services(filter).await
    }

    async fn check_stock(&self, code: &ServiceCode) -> Result<StockLevel, ProviderError> {
        (**self).check_stock(code).await
    }

    async fn lookup_nickname(
        &self,
        game: &GameCode,
        user_id: &str,
        zone_id: Option<&str>,
    ) -> Result<String, ProviderError> {
        (**self).lookup_nickname(game, user_id, zone_id).await
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderReceipt, ProviderError> {
        (**self).submit_order(request).await
    }

    async fn check_status(&self, trxid: &str) -> Result<Vec<TransactionRecord>, ProviderError> {
        (**self).check_status(trxid).await
    }

    async fn balance(&self) -> Result<f64, ProviderError> {
        (**self).balance().await
    }
}
