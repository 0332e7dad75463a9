//! The state machine driving one purchase attempt end to end.

use std::sync::Arc;

use thiserror::Error;

use chargeforge_catalog::{CatalogError, ServiceCatalog};
use chargeforge_core::{AccountRef, DomainError, GameCode, OrderId, ProductId};
use chargeforge_provider::{OrderRequest, ProviderApi, ProviderError, TransactionStatus};
use chargeforge_stock::{AdjustmentType, StockLedger, StockStore};

use crate::account::{AccountValidator, GameRules, ValidationError};
use crate::order::{Order, OrderStatus, OrderStore};
use crate::poller::PollOutcome;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The package failed the combined availability pre-check; the order
    /// keeps its prior state and no Provider call was made.
    #[error("package unavailable: {0}")]
    PackageUnavailable(String),

    /// Local stock ran out between pre-check and decrement (or at it); the
    /// Provider was never called.
    #[error("insufficient stock")]
    InsufficientStock,

    #[error("provider unavailable")]
    ProviderUnavailable,

    /// The Provider processed and refused the submission; `note` is its own
    /// wording, reported to the user verbatim.
    #[error("provider rejected order: {note}")]
    ProviderRejected { note: String },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Result of a successful account validation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAccount {
    pub order: Order,
    pub display_name: String,
}

/// Coordinates catalog, ledger and Provider for single purchase attempts.
///
/// The one ordering that matters lives in [`OrderCoordinator::submit`]: the
/// local decrement strictly precedes the Provider call, and every failure
/// after the decrement compensates it with a `Restore` entry. Local stock is
/// therefore never oversold relative to orders the Provider actually
/// accepted.
pub struct OrderCoordinator<P: ?Sized, S: StockStore, O> {
    provider: Arc<P>,
    validator: AccountValidator<P>,
    catalog: Arc<ServiceCatalog<P, S>>,
    ledger: Arc<StockLedger<S>>,
    orders: Arc<O>,
    /// Serializes finalization so the live poller and the reconciliation
    /// worker cannot both compensate the same order. Never held across an
    /// await.
    finalize_lock: std::sync::Mutex<()>,
}

impl<P, S, O> OrderCoordinator<P, S, O>
where
    P: ProviderApi + ?Sized,
    S: StockStore,
    O: OrderStore,
{
    pub fn new(
        provider: Arc<P>,
        catalog: Arc<ServiceCatalog<P, S>>,
        ledger: Arc<StockLedger<S>>,
        orders: Arc<O>,
        rules: GameRules,
    ) -> Self {
        Self {
            validator: AccountValidator::new(provider.clone(), rules),
            provider,
            catalog,
            ledger,
            orders,
            finalize_lock: std::sync::Mutex::new(()),
        }
    }

    pub fn orders(&self) -> &Arc<O> {
        &self.orders
    }

    /// Open a draft order for a destination account.
    pub fn begin(&self, account: AccountRef, game: GameCode) -> Result<Order, OrderError> {
        let order = Order::draft(account, game);
        self.orders.insert(order.clone())?;
        tracing::info!(order_id = %order.id, "order drafted");
        Ok(order)
    }

    /// Resolve the destination account via the Provider. On validation
    /// failure the order stays `Draft` and the error is surfaced.
    pub async fn validate_account(&self, order_id: &OrderId) -> Result<ValidatedAccount, OrderError> {
        let mut order = self.load(order_id)?;
        if order.status != OrderStatus::Draft {
            return Err(DomainError::invariant("account already validated").into());
        }

        let display_name = self
            .validator
            .validate(
                &order.game,
                &order.account.external_id,
                order.account.zone_id.as_deref(),
            )
            .await?;

        order.mark_account_validated()?;
        self.orders.update(order.clone())?;
        tracing::info!(order_id = %order.id, "account validated");

        Ok(ValidatedAccount {
            order,
            display_name,
        })
    }

    /// Attach a package after checking combined availability. On rejection
    /// the order stays where it was.
    pub async fn select_package(
        &self,
        order_id: &OrderId,
        product_id: &ProductId,
        amount: i64,
    ) -> Result<Order, OrderError> {
        let mut order = self.load(order_id)?;
        if !matches!(
            order.status,
            OrderStatus::AccountValidated | OrderStatus::PackageSelected
        ) {
            return Err(DomainError::invariant("package selection requires a validated account").into());
        }

        let verdict = self.catalog.purchasable(product_id).await.map_err(|e| match e {
            CatalogError::ServiceUnavailable => OrderError::ProviderUnavailable,
            CatalogError::UnknownProduct => OrderError::PackageUnavailable("unknown product".to_string()),
        })?;

        if !verdict.purchasable() {
            let why = if verdict.provider_stock <= 0 {
                "provider out of stock"
            } else {
                "local stock exhausted"
            };
            return Err(OrderError::PackageUnavailable(why.to_string()));
        }

        order.select_package(verdict.product.id, verdict.product.service_code, amount)?;
        self.orders.update(order.clone())?;
        tracing::info!(order_id = %order.id, product_id = %product_id, "package selected");
        Ok(order)
    }

    /// Submit to the Provider, decrementing local stock first.
    ///
    /// At most once per order: any status other than `PackageSelected` is
    /// refused. The decrement is evaluated strictly before the Provider call;
    /// a clamped decrement means a concurrent order won the last unit, so the
    /// submission is aborted and the partial application (if any) restored.
    pub async fn submit(&self, order_id: &OrderId) -> Result<Order, OrderError> {
        let mut order = self.load(order_id)?;
        if order.status != OrderStatus::PackageSelected {
            return Err(DomainError::invariant(
                "submit requires a selected package and is not repeatable",
            )
            .into());
        }

        let product_id = order
            .product_id
            .ok_or_else(|| DomainError::invariant("selected order missing product"))?;
        let service_code = order
            .service_code
            .clone()
            .ok_or_else(|| DomainError::invariant("selected order missing service code"))?;

        // Pre-check, then decrement. The ledger serializes per product, so
        // a losing race shows up here as a clamped adjustment.
        let record = self
            .ledger
            .peek(&product_id)
            .map_err(|_| OrderError::InsufficientStock)?;
        if !record.sellable() {
            return Err(OrderError::InsufficientStock);
        }

        let reduction = self
            .ledger
            .adjust(
                product_id,
                -order.amount_requested,
                AdjustmentType::OrderReduction,
                None,
                None,
            )
            .map_err(|_| OrderError::InsufficientStock)?;

        if reduction.clamped() {
            if reduction.applied_delta != 0 {
                self.restore(product_id, reduction.applied_delta, &order);
            }
            order.mark_failed("insufficient stock")?;
            self.orders.update(order)?;
            tracing::warn!(order_id = %order_id, "stock decrement clamped; submission aborted");
            return Err(OrderError::InsufficientStock);
        }

        let request = OrderRequest {
            service_code,
            target: order.account.external_id.clone(),
            zone_id: order.account.zone_id.clone(),
        };

        match self.provider.submit_order(&request).await {
            Ok(receipt) if receipt.status == TransactionStatus::Error => {
                let note = receipt
                    .note
                    .unwrap_or_else(|| "order rejected".to_string());
                self.fail_submission(order, product_id, reduction.applied_delta, &note)?;
                Err(OrderError::ProviderRejected { note })
            }
            Ok(receipt) => {
                order.mark_submitted(receipt.trxid)?;
                order.mark_polling()?;
                self.orders.update(order.clone())?;
                tracing::info!(
                    order_id = %order.id,
                    trxid = order.provider_transaction_id.as_deref().unwrap_or_default(),
                    "order submitted, polling for completion"
                );
                Ok(order)
            }
            Err(ProviderError::Rejected { note }) => {
                self.fail_submission(order, product_id, reduction.applied_delta, &note)?;
                Err(OrderError::ProviderRejected { note })
            }
            Err(err) => {
                let note = "provider unavailable";
                tracing::warn!(order_id = %order_id, error = %err, "submission transport failure");
                self.fail_submission(order, product_id, reduction.applied_delta, note)?;
                Err(OrderError::ProviderUnavailable)
            }
        }
    }

    /// Apply a polling verdict. Soft timeout and cancellation change
    /// nothing; terminal verdicts finalize the order (and compensate on
    /// failure).
    pub fn finalize(&self, order_id: &OrderId, outcome: &PollOutcome) -> Result<Order, OrderError> {
        let _guard = self.finalize_lock.lock().unwrap();
        let mut order = self.load(order_id)?;

        match outcome {
            PollOutcome::Exhausted | PollOutcome::Cancelled => Ok(order),
            PollOutcome::Success { note } => {
                order.mark_success(note.clone())?;
                self.orders.update(order.clone())?;
                tracing::info!(order_id = %order.id, "order fulfilled");
                Ok(order)
            }
            PollOutcome::Failed { note } => {
                let note = note.clone().unwrap_or_else(|| "fulfillment failed".to_string());
                let product_id = order
                    .product_id
                    .ok_or_else(|| DomainError::invariant("polling order missing product"))?;
                order.mark_failed(note)?;
                self.restore(product_id, -order.amount_requested, &order);
                self.orders.update(order.clone())?;
                Ok(order)
            }
        }
    }

    fn load(&self, order_id: &OrderId) -> Result<Order, OrderError> {
        self.orders.get(order_id).ok_or(OrderError::NotFound)
    }

    /// Mark a failed submission and reverse its stock reduction.
    fn fail_submission(
        &self,
        mut order: Order,
        product_id: ProductId,
        applied_delta: i64,
        note: &str,
    ) -> Result<(), OrderError> {
        self.restore(product_id, applied_delta, &order);
        order.mark_failed(note)?;
        self.orders.update(order)?;
        Ok(())
    }

    /// Write the compensating `Restore` entry for an applied reduction.
    fn restore(&self, product_id: ProductId, applied_delta: i64, order: &Order) {
        if applied_delta == 0 {
            return;
        }
        match self.ledger.adjust(
            product_id,
            -applied_delta,
            AdjustmentType::Restore,
            None,
            None,
        ) {
            Ok(_) => {
                tracing::warn!(order_id = %order.id, restored = -applied_delta, "stock reduction compensated");
            }
            Err(err) => {
                // Leaves the ledger short one restore; surfaced loudly for
                // the admin reconciliation path.
                tracing::error!(order_id = %order.id, error = %err, "stock compensation failed");
            }
        }
    }
}
