//! `chargeforge-orders` — account validation, the purchase state machine,
//! status polling, and out-of-band reconciliation.

pub mod account;
pub mod coordinator;
pub mod order;
pub mod poller;
pub mod reconcile;

pub use account::{AccountValidator, GameRules, ValidationError};
pub use coordinator::{OrderCoordinator, OrderError, ValidatedAccount};
pub use order::{InMemoryOrderStore, Order, OrderStatus, OrderStore};
pub use poller::{
    Clock, ManualClock, PollHandle, PollOutcome, PollerConfig, StatusObservation, StatusPoller,
    TokioClock,
};
pub use reconcile::{ReconcileConfig, ReconcileHandle, ReconcileStats, ReconcileWorker, REVIEW_NOTE};
