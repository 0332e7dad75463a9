//! `chargeforge-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod account;
pub mod error;
pub mod id;

pub use account::AccountRef;
pub use error::{DomainError, DomainResult};
pub use id::{ActorId, GameCode, OrderId, ProductId, ServiceCode};
