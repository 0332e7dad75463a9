//! Out-of-band resolution of orders whose polling window expired.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use chargeforge_provider::ProviderApi;
use chargeforge_stock::StockStore;

use crate::coordinator::OrderCoordinator;
use crate::order::{OrderStatus, OrderStore};
use crate::poller::terminal_outcome;

/// Annotation given to orders that outlived the reconciliation window.
pub const REVIEW_NOTE: &str = "still processing; flagged for manual review";

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// How often the worker scans polling orders.
    pub interval: Duration,
    /// Polling orders older than this are flagged for manual review.
    pub max_age: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl ReconcileConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileStats {
    pub checked: usize,
    pub finalized: usize,
    pub flagged: usize,
}

/// Handle to control and join the background worker.
#[derive(Debug)]
pub struct ReconcileHandle {
    shutdown: watch::Sender<bool>,
    join: tokio::task::JoinHandle<()>,
}

impl ReconcileHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }
}

/// Periodically re-queries the Provider for orders stuck in `Polling` (the
/// soft-timeout leftovers) and finalizes them through the same coordinator
/// path the live poller uses, compensation included.
pub struct ReconcileWorker<P: ?Sized, S: StockStore, O> {
    provider: Arc<P>,
    coordinator: Arc<OrderCoordinator<P, S, O>>,
    config: ReconcileConfig,
}

impl<P, S, O> ReconcileWorker<P, S, O>
where
    P: ProviderApi + ?Sized + 'static,
    S: StockStore + 'static,
    O: OrderStore + 'static,
{
    pub fn new(
        provider: Arc<P>,
        coordinator: Arc<OrderCoordinator<P, S, O>>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            provider,
            coordinator,
            config,
        }
    }

    /// One scan over all polling orders.
    pub async fn run_cycle(&self) -> ReconcileStats {
        let mut stats = ReconcileStats::default();

        for order in self.coordinator.orders().list_by_status(OrderStatus::Polling) {
            stats.checked += 1;

            let Some(trxid) = order.provider_transaction_id.clone() else {
                tracing::error!(order_id = %order.id, "polling order without transaction id");
                continue;
            };

            let records = match self.provider.check_status(&trxid).await {
                Ok(records) => records,
                Err(err) => {
                    tracing::warn!(order_id = %order.id, error = %err, "reconcile status check failed");
                    continue;
                }
            };

            match terminal_outcome(&trxid, &records) {
                Some(outcome) => match self.coordinator.finalize(&order.id, &outcome) {
                    Ok(_) => {
                        stats.finalized += 1;
                        tracing::info!(order_id = %order.id, "order reconciled");
                    }
                    Err(err) => {
                        // Usually a lost race with the live poller, which
                        // finalized the order between listing and here.
                        tracing::warn!(order_id = %order.id, error = %err, "reconcile finalize skipped");
                    }
                },
                None => {
                    let age = chrono::Utc::now() - order.updated_at;
                    let too_old = chrono::Duration::from_std(self.config.max_age)
                        .map(|max| age > max)
                        .unwrap_or(false);
                    let already_flagged = order.note.as_deref() == Some(REVIEW_NOTE);

                    if too_old && !already_flagged {
                        let mut flagged = order.clone();
                        flagged.flag_for_review(REVIEW_NOTE);
                        if self.coordinator.orders().update(flagged).is_ok() {
                            stats.flagged += 1;
                            tracing::warn!(order_id = %order.id, "polling order flagged for manual review");
                        }
                    }
                }
            }
        }

        stats
    }

    /// Spawn the worker loop.
    pub fn spawn(self) -> ReconcileHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let interval = self.config.interval;

        let join = tokio::spawn(async move {
            tracing::info!("reconcile worker started");
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        let stats = self.run_cycle().await;
                        if stats.checked > 0 {
                            tracing::debug!(?stats, "reconcile cycle complete");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("reconcile worker stopped");
        });

        ReconcileHandle {
            shutdown: shutdown_tx,
            join,
        }
    }
}
