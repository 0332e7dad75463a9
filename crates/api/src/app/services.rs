use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use chargeforge_catalog::{ProductRegistry, ServiceCatalog};
use chargeforge_core::OrderId;
use chargeforge_orders::{
    AccountValidator, GameRules, InMemoryOrderStore, Order, OrderCoordinator, PollerConfig,
    ReconcileConfig, ReconcileHandle, ReconcileWorker, StatusPoller,
};
use chargeforge_provider::{InMemoryProvider, ProviderApi, ProviderClient, ProviderConfig};
use chargeforge_stock::{InMemoryStockStore, StockLedger};

/// Type-erased Provider so the HTTP wiring can pick live vs. in-memory at
/// startup.
pub type ApiProvider = Arc<dyn ProviderApi>;
pub type ApiStockStore = Arc<InMemoryStockStore>;

pub type ApiCatalog = ServiceCatalog<dyn ProviderApi, ApiStockStore>;
pub type ApiCoordinator = OrderCoordinator<dyn ProviderApi, ApiStockStore, InMemoryOrderStore>;

/// Composition root shared by every route handler.
pub struct AppServices {
    provider: ApiProvider,
    ledger: Arc<StockLedger<ApiStockStore>>,
    registry: Arc<ProductRegistry>,
    catalog: Arc<ApiCatalog>,
    validator: Arc<AccountValidator<dyn ProviderApi>>,
    coordinator: Arc<ApiCoordinator>,
    poller: Arc<StatusPoller<dyn ProviderApi>>,
    /// Live polling cancel handles, keyed by order. Entries are removed when
    /// a run completes.
    poll_cancels: Mutex<HashMap<OrderId, watch::Sender<bool>>>,
    reconcile: Mutex<Option<ReconcileHandle>>,
}

/// Wire the full service graph. The Provider transport is selected by
/// `USE_LIVE_PROVIDER`; everything else is identical in both modes.
pub async fn build_services() -> Arc<AppServices> {
    let use_live = std::env::var("USE_LIVE_PROVIDER")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    let provider: ApiProvider = if use_live {
        let config = ProviderConfig::from_env();
        match ProviderClient::new(&config) {
            Ok(client) => Arc::new(client),
            Err(err) => {
                tracing::warn!(error = %err, "failed to build live provider client, falling back to in-memory");
                Arc::new(InMemoryProvider::new())
            }
        }
    } else {
        tracing::warn!("USE_LIVE_PROVIDER not set; using in-memory provider");
        Arc::new(InMemoryProvider::new())
    };

    let services = Arc::new(AppServices::with_provider(provider, PollerConfig::default()));
    services.start_reconcile(ReconcileConfig::default());
    services
}

impl AppServices {
    pub fn with_provider(provider: ApiProvider, poller_config: PollerConfig) -> Self {
        let ledger = Arc::new(StockLedger::new(Arc::new(InMemoryStockStore::new())));
        let registry = Arc::new(ProductRegistry::new());
        let catalog = Arc::new(ServiceCatalog::new(
            provider.clone(),
            ledger.clone(),
            registry.clone(),
        ));
        let validator = Arc::new(AccountValidator::new(provider.clone(), GameRules::standard()));
        let coordinator = Arc::new(OrderCoordinator::new(
            provider.clone(),
            catalog.clone(),
            ledger.clone(),
            Arc::new(InMemoryOrderStore::new()),
            GameRules::standard(),
        ));
        let poller = Arc::new(StatusPoller::new(provider.clone(), poller_config));

        Self {
            provider,
            ledger,
            registry,
            catalog,
            validator,
            coordinator,
            poller,
            poll_cancels: Mutex::new(HashMap::new()),
            reconcile: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> &ApiProvider {
        &self.provider
    }

    pub fn ledger(&self) -> &Arc<StockLedger<ApiStockStore>> {
        &self.ledger
    }

    pub fn registry(&self) -> &Arc<ProductRegistry> {
        &self.registry
    }

    pub fn catalog(&self) -> &Arc<ApiCatalog> {
        &self.catalog
    }

    pub fn validator(&self) -> &Arc<AccountValidator<dyn ProviderApi>> {
        &self.validator
    }

    pub fn coordinator(&self) -> &Arc<ApiCoordinator> {
        &self.coordinator
    }

    /// Start the background reconciliation worker (idempotent).
    pub fn start_reconcile(self: &Arc<Self>, config: ReconcileConfig) {
        let mut slot = self.reconcile.lock().unwrap();
        if slot.is_some() {
            return;
        }
        let worker = ReconcileWorker::new(self.provider.clone(), self.coordinator.clone(), config);
        *slot = Some(worker.spawn());
    }

    /// Stop the background reconciliation worker, waiting for it to exit.
    pub async fn shutdown_reconcile(&self) {
        let handle = self.reconcile.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    /// Drive a freshly submitted order to a terminal state in the
    /// background. Cancellable per order; cancellation leaves the order to
    /// the reconciliation worker.
    pub fn spawn_poll(self: &Arc<Self>, order: &Order) {
        let Some(trxid) = order.provider_transaction_id.clone() else {
            return;
        };
        let order_id = order.id;
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        self.poll_cancels.lock().unwrap().insert(order_id, cancel_tx);

        let services = self.clone();
        tokio::spawn(async move {
            let outcome = services.poller.poll(&trxid, &mut cancel_rx, None).await;
            services.poll_cancels.lock().unwrap().remove(&order_id);
            if let Err(err) = services.coordinator.finalize(&order_id, &outcome) {
                tracing::error!(order_id = %order_id, error = %err, "poll finalize failed");
            }
        });
    }

    /// Cancel a live polling run, if one exists for this order.
    pub fn cancel_poll(&self, order_id: &OrderId) -> bool {
        match self.poll_cancels.lock().unwrap().get(order_id) {
            Some(cancel) => cancel.send(true).is_ok(),
            None => false,
        }
    }
}
