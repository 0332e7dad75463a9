//! Account validation: the gate into the purchase flow.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use chargeforge_core::GameCode;
use chargeforge_provider::{ProviderApi, ProviderError};

/// Recoverable validation failures, surfaced to the user for correction.
/// None of these mutate any state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("account id cannot be empty")]
    EmptyAccountId,

    #[error("a zone id is required for this game")]
    ZoneRequired,

    #[error("account not found")]
    AccountNotFound,

    #[error("provider unavailable")]
    ProviderUnavailable,
}

/// Static per-game validation rules.
///
/// Some games shard accounts by zone/server; for those the zone id is
/// mandatory. For every other game a supplied zone id is ignored.
#[derive(Debug, Clone, Default)]
pub struct GameRules {
    zone_required: HashSet<String>,
}

impl GameRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rule table for the games the storefront ships with.
    pub fn standard() -> Self {
        Self::new()
            .with_zone_required("mobile-legends")
            .with_zone_required("genshin-impact")
    }

    pub fn with_zone_required(mut self, game: impl Into<String>) -> Self {
        self.zone_required.insert(game.into());
        self
    }

    pub fn zone_required(&self, game: &GameCode) -> bool {
        self.zone_required.contains(game.as_str())
    }
}

/// Resolves a player-supplied account to a display name via the Provider.
///
/// Read-only and idempotent; callers may retry freely.
pub struct AccountValidator<P: ?Sized> {
    provider: Arc<P>,
    rules: GameRules,
}

impl<P: ProviderApi + ?Sized> AccountValidator<P> {
    pub fn new(provider: Arc<P>, rules: GameRules) -> Self {
        Self { provider, rules }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub async fn validate(
        &self,
        game: &GameCode,
        account_id: &str,
        zone_id: Option<&str>,
    ) -> Result<String, ValidationError> {
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(ValidationError::EmptyAccountId);
        }

        let zone_id = zone_id.map(str::trim).filter(|z| !z.is_empty());
        let zone_id = if self.rules.zone_required(game) {
            match zone_id {
                Some(z) => Some(z),
                None => return Err(ValidationError::ZoneRequired),
            }
        } else {
            None
        };

        match self.provider.lookup_nickname(game, account_id, zone_id).await {
            Ok(nickname) => Ok(nickname),
            Err(ProviderError::NotFound) => Err(ValidationError::AccountNotFound),
            Err(err) => {
                tracing::warn!(game = %game, error = %err, "nickname lookup failed");
                Err(ValidationError::ProviderUnavailable)
            }
        }
    }
}
