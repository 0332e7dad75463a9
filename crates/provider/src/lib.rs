//! `chargeforge-provider` — the third-party fulfillment Provider boundary.
//!
//! Everything the rest of the system knows about the Provider goes through
//! the [`ProviderApi`] trait; [`ProviderClient`] is the HTTP implementation.
//! Response shapes are validated here, per endpoint, before entering the
//! core.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod types;

pub use api::ProviderApi;
pub use client::ProviderClient;
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use memory::InMemoryProvider;
pub use types::{
    BalanceInfo, NicknameResult, OrderReceipt, OrderRequest, PriceTier, ServiceFilter,
    ServiceListing, ServiceStatus, StockLevel, TransactionRecord, TransactionStatus,
};
