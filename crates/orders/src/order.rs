//! One purchase attempt and its forward-only status lifecycle.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chargeforge_core::{AccountRef, DomainError, DomainResult, GameCode, OrderId, ProductId, ServiceCode};

/// Order status lifecycle. Strictly forward-only; a failed attempt is never
/// resurrected, retrying creates a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    AccountValidated,
    PackageSelected,
    Submitted,
    Polling,
    Success,
    Failed,
}

impl OrderStatus {
    /// Position in the forward-only ordering. Both terminals share the top
    /// rank.
    pub fn rank(self) -> u8 {
        match self {
            OrderStatus::Draft => 0,
            OrderStatus::AccountValidated => 1,
            OrderStatus::PackageSelected => 2,
            OrderStatus::Submitted => 3,
            OrderStatus::Polling => 4,
            OrderStatus::Success | OrderStatus::Failed => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Success | OrderStatus::Failed)
    }
}

/// One purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account: AccountRef,
    pub game: GameCode,
    /// Set by package selection.
    pub product_id: Option<ProductId>,
    pub service_code: Option<ServiceCode>,
    /// Package units this order consumes from local stock.
    pub amount_requested: i64,
    pub status: OrderStatus,
    /// Set once the Provider accepts the submission; unique across orders.
    pub provider_transaction_id: Option<String>,
    /// Human-readable outcome detail (failure reason or confirmation text).
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn draft(account: AccountRef, game: GameCode) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            account,
            game,
            product_id: None,
            service_code: None,
            amount_requested: 0,
            status: OrderStatus::Draft,
            provider_transaction_id: None,
            note: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Guarded forward-only transition.
    fn transition(&mut self, to: OrderStatus, allowed_from: &[OrderStatus]) -> DomainResult<()> {
        if !allowed_from.contains(&self.status) {
            return Err(DomainError::invariant(format!(
                "cannot move order from {:?} to {:?}",
                self.status, to
            )));
        }
        debug_assert!(to.rank() >= self.status.rank());
        self.status = to;
        self.touch();
        Ok(())
    }

    pub fn mark_account_validated(&mut self) -> DomainResult<()> {
        self.transition(OrderStatus::AccountValidated, &[OrderStatus::Draft])
    }

    /// Record the selected package. Re-selection before submission is
    /// allowed; anything later is not.
    pub fn select_package(
        &mut self,
        product_id: ProductId,
        service_code: ServiceCode,
        amount: i64,
    ) -> DomainResult<()> {
        if amount <= 0 {
            return Err(DomainError::validation("amount must be positive"));
        }
        self.transition(
            OrderStatus::PackageSelected,
            &[OrderStatus::AccountValidated, OrderStatus::PackageSelected],
        )?;
        self.product_id = Some(product_id);
        self.service_code = Some(service_code);
        self.amount_requested = amount;
        Ok(())
    }

    pub fn mark_submitted(&mut self, trxid: impl Into<String>) -> DomainResult<()> {
        self.transition(OrderStatus::Submitted, &[OrderStatus::PackageSelected])?;
        self.provider_transaction_id = Some(trxid.into());
        Ok(())
    }

    pub fn mark_polling(&mut self) -> DomainResult<()> {
        self.transition(OrderStatus::Polling, &[OrderStatus::Submitted])
    }

    pub fn mark_success(&mut self, note: Option<String>) -> DomainResult<()> {
        self.transition(OrderStatus::Success, &[OrderStatus::Polling])?;
        self.note = note;
        Ok(())
    }

    /// Failure is reachable from the submission path only; validation and
    /// availability errors leave the order in its prior state instead.
    pub fn mark_failed(&mut self, note: impl Into<String>) -> DomainResult<()> {
        self.transition(
            OrderStatus::Failed,
            &[
                OrderStatus::PackageSelected,
                OrderStatus::Submitted,
                OrderStatus::Polling,
            ],
        )?;
        self.note = Some(note.into());
        Ok(())
    }

    /// Admin-facing annotation for soft-timed-out orders; not a transition.
    pub fn flag_for_review(&mut self, note: impl Into<String>) {
        self.note = Some(note.into());
        self.touch();
    }
}

/// Persistence seam for orders. Implementations must reject a second order
/// claiming an already-used provider transaction id.
pub trait OrderStore: Send + Sync {
    fn insert(&self, order: Order) -> DomainResult<()>;
    fn get(&self, id: &OrderId) -> Option<Order>;
    fn update(&self, order: Order) -> DomainResult<()>;
    fn list_by_status(&self, status: OrderStatus) -> Vec<Order>;
    fn find_by_trxid(&self, trxid: &str) -> Option<Order>;
}

impl<S> OrderStore for std::sync::Arc<S>
where
    S: OrderStore + ?Sized,
{
    fn insert(&self, order: Order) -> DomainResult<()> {
        (**self).insert(order)
    }

    fn get(&self, id: &OrderId) -> Option<Order> {
        (**self).get(id)
    }

    fn update(&self, order: Order) -> DomainResult<()> {
        (**self).update(order)
    }

    fn list_by_status(&self, status: OrderStatus) -> Vec<Order> {
        (**self).list_by_status(status)
    }

    fn find_by_trxid(&self, trxid: &str) -> Option<Order> {
        (**self).find_by_trxid(trxid)
    }
}

/// In-memory order store for dev/test, with the trxid uniqueness index.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
    by_trxid: RwLock<HashMap<String, OrderId>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_trxid(&self, order: &Order) -> DomainResult<()> {
        let Some(trxid) = &order.provider_transaction_id else {
            return Ok(());
        };
        let mut index = self
            .by_trxid
            .write()
            .map_err(|_| DomainError::conflict("order index lock poisoned"))?;
        match index.get(trxid) {
            Some(existing) if *existing != order.id => Err(DomainError::conflict(
                "provider transaction id already claimed by another order",
            )),
            _ => {
                index.insert(trxid.clone(), order.id);
                Ok(())
            }
        }
    }
}

impl OrderStore for InMemoryOrderStore {
    // Lock order is always `orders` then `by_trxid`.
    fn insert(&self, order: Order) -> DomainResult<()> {
        let mut map = self
            .orders
            .write()
            .map_err(|_| DomainError::conflict("order store lock poisoned"))?;
        if map.contains_key(&order.id) {
            return Err(DomainError::conflict("order already exists"));
        }
        self.index_trxid(&order)?;
        map.insert(order.id, order);
        Ok(())
    }

    fn get(&self, id: &OrderId) -> Option<Order> {
        let map = self.orders.read().ok()?;
        map.get(id).cloned()
    }

    fn update(&self, order: Order) -> DomainResult<()> {
        let mut map = self
            .orders
            .write()
            .map_err(|_| DomainError::conflict("order store lock poisoned"))?;
        if !map.contains_key(&order.id) {
            return Err(DomainError::not_found());
        }
        self.index_trxid(&order)?;
        map.insert(order.id, order);
        Ok(())
    }

    fn list_by_status(&self, status: OrderStatus) -> Vec<Order> {
        let map = match self.orders.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let mut orders: Vec<_> = map.values().filter(|o| o.status == status).cloned().collect();
        orders.sort_by_key(|o| *o.id.as_uuid());
        orders
    }

    fn find_by_trxid(&self, trxid: &str) -> Option<Order> {
        let id = *self.by_trxid.read().ok()?.get(trxid)?;
        self.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> Order {
        Order::draft(
            AccountRef::new("12345", Some("2001".to_string())).unwrap(),
            GameCode::new("mobile-legends").unwrap(),
        )
    }

    fn selected() -> Order {
        let mut order = draft();
        order.mark_account_validated().unwrap();
        order
            .select_package(ProductId::new(), ServiceCode::new("ml-86").unwrap(), 1)
            .unwrap();
        order
    }

    #[test]
    fn full_lifecycle_reaches_success() {
        let mut order = selected();
        order.mark_submitted("TRX-1").unwrap();
        order.mark_polling().unwrap();
        order.mark_success(Some("delivered".to_string())).unwrap();

        assert_eq!(order.status, OrderStatus::Success);
        assert_eq!(order.provider_transaction_id.as_deref(), Some("TRX-1"));
        assert_eq!(order.note.as_deref(), Some("delivered"));
    }

    #[test]
    fn status_never_regresses() {
        let mut order = selected();
        order.mark_submitted("TRX-1").unwrap();
        order.mark_polling().unwrap();

        assert!(order.mark_account_validated().is_err());
        assert!(order
            .select_package(ProductId::new(), ServiceCode::new("x").unwrap(), 1)
            .is_err());
        assert!(order.mark_submitted("TRX-2").is_err());
        assert_eq!(order.provider_transaction_id.as_deref(), Some("TRX-1"));
    }

    #[test]
    fn package_can_be_reselected_before_submission() {
        let mut order = selected();
        let other = ProductId::new();
        order
            .select_package(other, ServiceCode::new("ml-172").unwrap(), 2)
            .unwrap();
        assert_eq!(order.product_id, Some(other));
        assert_eq!(order.amount_requested, 2);
    }

    #[test]
    fn failure_is_unreachable_before_package_selection() {
        let mut order = draft();
        assert!(order.mark_failed("nope").is_err());

        order.mark_account_validated().unwrap();
        assert!(order.mark_failed("nope").is_err());
    }

    #[test]
    fn terminal_states_accept_nothing_further() {
        let mut order = selected();
        order.mark_failed("provider rejected").unwrap();
        assert!(order.status.is_terminal());
        assert!(order.mark_polling().is_err());
        assert!(order.mark_success(None).is_err());
    }

    #[test]
    fn trxid_is_absent_until_submission() {
        let mut order = selected();
        assert_eq!(order.provider_transaction_id, None);
        order.mark_submitted("TRX-9").unwrap();
        assert!(order.provider_transaction_id.is_some());
    }

    #[test]
    fn store_rejects_duplicate_trxid() {
        let store = InMemoryOrderStore::new();

        let mut a = selected();
        a.mark_submitted("TRX-1").unwrap();
        store.insert(a).unwrap();

        let mut b = selected();
        b.mark_submitted("TRX-1").unwrap();
        let err = store.insert(b).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn store_finds_orders_by_trxid_and_status() {
        let store = InMemoryOrderStore::new();

        let mut order = selected();
        order.mark_submitted("TRX-7").unwrap();
        order.mark_polling().unwrap();
        store.insert(order.clone()).unwrap();

        assert_eq!(store.find_by_trxid("TRX-7").unwrap().id, order.id);
        assert_eq!(store.list_by_status(OrderStatus::Polling).len(), 1);
        assert!(store.list_by_status(OrderStatus::Success).is_empty());
    }
}
