//! Typed Provider responses, one shape per endpoint.
//!
//! The Provider's wire format is validated here, at the boundary, so the rest
//! of the system only ever sees these types.

use serde::{Deserialize, Serialize};

use chargeforge_core::{GameCode, ServiceCode};

/// Provider-reported sellability of a service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Available,
    Unavailable,
    Maintenance,
}

/// Price pair in the smallest currency unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    pub basic: u64,
    pub premium: u64,
}

/// One row of `GET services`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceListing {
    pub code: ServiceCode,
    pub name: String,
    pub game: GameCode,
    pub price: PriceTier,
    pub status: ServiceStatus,
}

/// Response of `GET stock?code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub code: ServiceCode,
    pub stock: i64,
}

/// Response of `GET nickname?game&user_id&zone_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicknameResult {
    pub nickname: String,
}

/// Provider-side transaction state, shared by order submission and status
/// checks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Error,
}

/// Body of `POST order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub service_code: ServiceCode,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
}

/// Response of `POST order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub trxid: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// One row of `GET status?trxid` (the Provider returns an array).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub trxid: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// Response of `GET balance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub balance: f64,
}

/// Query filter for `GET services`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFilter {
    pub game: Option<GameCode>,
    pub category: Option<String>,
    pub status: Option<ServiceStatus>,
}

impl ServiceFilter {
    pub fn for_game(game: GameCode) -> Self {
        Self {
            game: Some(game),
            ..Self::default()
        }
    }
}
