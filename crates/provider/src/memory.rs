//! Canned in-memory Provider for dev wiring and tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use chargeforge_core::{GameCode, ServiceCode};

use crate::api::ProviderApi;
use crate::error::ProviderError;
use crate::types::{
    OrderReceipt, OrderRequest, PriceTier, ServiceFilter, ServiceListing, ServiceStatus,
    StockLevel, TransactionRecord, TransactionStatus,
};

#[derive(Debug, Default)]
struct State {
    services: Vec<ServiceListing>,
    stock: HashMap<String, i64>,
    nicknames: HashMap<(String, String), String>,
    /// Scripted per-trxid observations; the last one repeats once reached.
    status_scripts: HashMap<String, VecDeque<TransactionStatus>>,
    submissions: Vec<OrderRequest>,
    balance: f64,
    outage: bool,
    reject_note: Option<String>,
    next_trxid: u64,
}

/// A Provider that answers from canned state. Stands in for the remote
/// Provider in dev mode and in tests; submissions are recorded for
/// inspection.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    state: Mutex<State>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent call fails as transport-unavailable.
    pub fn with_outage(self) -> Self {
        self.state.lock().unwrap().outage = true;
        self
    }

    /// Every subsequent submission is rejected with this note.
    pub fn with_rejection(self, note: impl Into<String>) -> Self {
        self.state.lock().unwrap().reject_note = Some(note.into());
        self
    }

    pub fn with_service(self, listing: ServiceListing) -> Self {
        self.state.lock().unwrap().services.push(listing);
        self
    }

    pub fn with_stock(self, code: impl Into<String>, stock: i64) -> Self {
        self.state.lock().unwrap().stock.insert(code.into(), stock);
        self
    }

    pub fn with_nickname(
        self,
        game: impl Into<String>,
        user_id: impl Into<String>,
        nickname: impl Into<String>,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .nicknames
            .insert((game.into(), user_id.into()), nickname.into());
        self
    }

    pub fn with_balance(self, balance: f64) -> Self {
        self.state.lock().unwrap().balance = balance;
        self
    }

    /// Script the status observations a trxid will produce, in order. The
    /// final status repeats on further polls.
    pub fn script_status(
        &self,
        trxid: impl Into<String>,
        statuses: impl IntoIterator<Item = TransactionStatus>,
    ) {
        self.state
            .lock()
            .unwrap()
            .status_scripts
            .insert(trxid.into(), statuses.into_iter().collect());
    }

    pub fn set_outage(&self, outage: bool) {
        self.state.lock().unwrap().outage = outage;
    }

    /// Orders submitted so far, in submission order.
    pub fn submissions(&self) -> Vec<OrderRequest> {
        self.state.lock().unwrap().submissions.clone()
    }

    /// Convenience listing for tests.
    pub fn listing(code: &str, name: &str, game: &str, status: ServiceStatus) -> ServiceListing {
        ServiceListing {
            code: ServiceCode::new(code).unwrap(),
            name: name.to_string(),
            game: GameCode::new(game).unwrap(),
            price: PriceTier {
                basic: 25_000,
                premium: 24_000,
            },
            status,
        }
    }

    fn fail_if_down(state: &State) -> Result<(), ProviderError> {
        if state.outage {
            return Err(ProviderError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderApi for InMemoryProvider {
    async fn list_services(&self, filter: &ServiceFilter) -> Result<Vec<ServiceListing>, ProviderError> {
        let state = self.state.lock().unwrap();
        Self::fail_if_down(&state)?;
        Ok(state
            .services
            .iter()
            .filter(|s| filter.game.as_ref().is_none_or(|g| s.game == *g))
            .filter(|s| filter.status.is_none_or(|st| s.status == st))
            .cloned()
            .collect())
    }

    async fn check_stock(&self, code: &ServiceCode) -> Result<StockLevel, ProviderError> {
        let state = self.state.lock().unwrap();
        Self::fail_if_down(&state)?;
        let stock = state
            .stock
            .get(code.as_str())
            .copied()
            .ok_or(ProviderError::NotFound)?;
        Ok(StockLevel {
            code: code.clone(),
            stock,
        })
    }

    async fn lookup_nickname(
        &self,
        game: &GameCode,
        user_id: &str,
        _zone_id: Option<&str>,
    ) -> Result<String, ProviderError> {
        let state = self.state.lock().unwrap();
        Self::fail_if_down(&state)?;
        state
            .nicknames
            .get(&(game.as_str().to_string(), user_id.to_string()))
            .cloned()
            .ok_or(ProviderError::NotFound)
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderReceipt, ProviderError> {
        let mut state = self.state.lock().unwrap();
        Self::fail_if_down(&state)?;

        if let Some(note) = state.reject_note.clone() {
            return Err(ProviderError::Rejected { note });
        }

        state.next_trxid += 1;
        let trxid = format!("TRX-{}", state.next_trxid);
        state.submissions.push(request.clone());

        Ok(OrderReceipt {
            trxid,
            status: TransactionStatus::Pending,
            note: None,
        })
    }

    async fn check_status(&self, trxid: &str) -> Result<Vec<TransactionRecord>, ProviderError> {
        let mut state = self.state.lock().unwrap();
        Self::fail_if_down(&state)?;

        let status = match state.status_scripts.get_mut(trxid) {
            Some(script) => {
                if script.len() > 1 {
                    script.pop_front().unwrap_or(TransactionStatus::Pending)
                } else {
                    script.front().copied().unwrap_or(TransactionStatus::Pending)
                }
            }
            None => TransactionStatus::Pending,
        };

        let note = match status {
            TransactionStatus::Success => Some("delivered".to_string()),
            TransactionStatus::Error => Some("fulfillment failed".to_string()),
            TransactionStatus::Pending => None,
        };

        Ok(vec![TransactionRecord {
            trxid: trxid.to_string(),
            status,
            note,
        }])
    }

    async fn balance(&self) -> Result<f64, ProviderError> {
        let state = self.state.lock().unwrap();
        Self::fail_if_down(&state)?;
        Ok(state.balance)
    }
}
