//! Destination game account reference.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The player-supplied destination account: an external identifier plus an
/// optional zone/server, for games that shard accounts by zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub external_id: String,
    pub zone_id: Option<String>,
}

impl AccountRef {
    pub fn new(external_id: impl Into<String>, zone_id: Option<String>) -> Result<Self, DomainError> {
        let external_id = external_id.into();
        if external_id.trim().is_empty() {
            return Err(DomainError::validation("account id cannot be empty"));
        }
        Ok(Self {
            external_id,
            zone_id: zone_id.filter(|z| !z.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_account_id_is_rejected() {
        assert!(AccountRef::new("", None).is_err());
        assert!(AccountRef::new("   ", None).is_err());
    }

    #[test]
    fn blank_zone_is_normalized_to_none() {
        let acc = AccountRef::new("12345", Some("  ".to_string())).unwrap();
        assert_eq!(acc.zone_id, None);
    }
}
