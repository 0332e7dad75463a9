//! Bounded, cancellable polling of Provider-side order completion.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;

use chargeforge_provider::{ProviderApi, TransactionRecord, TransactionStatus};

/// Injected time source so the loop is testable without real timers.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by the tokio timer.
#[derive(Debug, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Test clock: returns immediately and records requested sleeps.
#[derive(Debug, Default)]
pub struct ManualClock {
    sleeps: std::sync::Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Provider-recommended check interval.
    pub interval: Duration,
    /// Attempts before giving up (soft timeout).
    pub max_attempts: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 10,
        }
    }
}

impl PollerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// One status-check observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusObservation {
    pub attempt: u32,
    pub status: TransactionStatus,
    pub note: Option<String>,
}

/// Final verdict of one polling run.
///
/// `Exhausted` is a soft timeout, not an error: the order stays in its
/// polling state for the reconciliation worker. `Cancelled` likewise mutates
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Success { note: Option<String> },
    Failed { note: Option<String> },
    Exhausted,
    Cancelled,
}

/// Cancel side of a polling run. Dropping the handle does not cancel.
#[derive(Debug, Clone)]
pub struct PollHandle {
    cancel: watch::Sender<bool>,
}

impl PollHandle {
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }
}

/// Extract the terminal verdict (if any) from one status response.
/// The newest matching record wins.
pub(crate) fn terminal_outcome(trxid: &str, records: &[TransactionRecord]) -> Option<PollOutcome> {
    let latest = records.iter().rev().find(|r| r.trxid == trxid)?;
    match latest.status {
        TransactionStatus::Success => Some(PollOutcome::Success {
            note: latest.note.clone(),
        }),
        TransactionStatus::Error => Some(PollOutcome::Failed {
            note: latest.note.clone(),
        }),
        TransactionStatus::Pending => None,
    }
}

/// Drives a bounded sequence of Provider status checks for one transaction.
pub struct StatusPoller<P: ?Sized, C = TokioClock> {
    provider: Arc<P>,
    clock: Arc<C>,
    config: PollerConfig,
}

impl<P: ProviderApi + ?Sized + 'static> StatusPoller<P, TokioClock> {
    pub fn new(provider: Arc<P>, config: PollerConfig) -> Self {
        Self::with_clock(provider, Arc::new(TokioClock), config)
    }
}

impl<P: ProviderApi + ?Sized + 'static, C: Clock + 'static> StatusPoller<P, C> {
    pub fn with_clock(provider: Arc<P>, clock: Arc<C>, config: PollerConfig) -> Self {
        Self {
            provider,
            clock,
            config,
        }
    }

    /// Run the polling loop to completion, reporting each observation
    /// through `observer` (a closed receiver is fine; observation is
    /// best-effort).
    ///
    /// Transport errors during polling consume an attempt and continue; only
    /// an explicit Provider verdict ends the run early.
    pub async fn poll(
        &self,
        trxid: &str,
        cancel: &mut watch::Receiver<bool>,
        observer: Option<&mpsc::Sender<StatusObservation>>,
    ) -> PollOutcome {
        // Once the cancel sender is gone the run can no longer be cancelled;
        // fall back to plain sleeps instead of spinning on a closed channel.
        let mut cancellable = true;

        for attempt in 1..=self.config.max_attempts {
            if *cancel.borrow() {
                return PollOutcome::Cancelled;
            }

            if cancellable {
                tokio::select! {
                    _ = self.clock.sleep(self.config.interval) => {}
                    changed = cancel.changed() => {
                        match changed {
                            Ok(()) if *cancel.borrow() => return PollOutcome::Cancelled,
                            Ok(()) => self.clock.sleep(self.config.interval).await,
                            Err(_) => {
                                cancellable = false;
                                self.clock.sleep(self.config.interval).await;
                            }
                        }
                    }
                }
            } else {
                self.clock.sleep(self.config.interval).await;
            }

            let records = match self.provider.check_status(trxid).await {
                Ok(records) => records,
                Err(err) => {
                    tracing::warn!(trxid, attempt, error = %err, "status check failed");
                    continue;
                }
            };

            if let Some(latest) = records.iter().rev().find(|r| r.trxid == trxid) {
                if let Some(observer) = observer {
                    let _ = observer
                        .send(StatusObservation {
                            attempt,
                            status: latest.status,
                            note: latest.note.clone(),
                        })
                        .await;
                }
            }

            if let Some(outcome) = terminal_outcome(trxid, &records) {
                return outcome;
            }
        }

        PollOutcome::Exhausted
    }

    /// Spawn the loop as a task, exposing the lazy observation sequence and
    /// the final outcome.
    pub fn spawn(
        self: Arc<Self>,
        trxid: String,
    ) -> (
        PollHandle,
        ReceiverStream<StatusObservation>,
        tokio::task::JoinHandle<PollOutcome>,
    ) {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let (obs_tx, obs_rx) = mpsc::channel(self.config.max_attempts.max(1) as usize);

        let join = tokio::spawn(async move {
            self.poll(&trxid, &mut cancel_rx, Some(&obs_tx)).await
        });

        (
            PollHandle { cancel: cancel_tx },
            ReceiverStream::new(obs_rx),
            join,
        )
    }
}
