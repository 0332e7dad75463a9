//! Per-request actor identity, passed explicitly into every handler.

use chargeforge_core::ActorId;

/// Role attached to the acting identity by the (out-of-scope) auth
/// collaborator upstream of this service.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActorRole {
    Admin,
    Customer,
}

/// Actor context for a request.
///
/// This is immutable and must be present for all domain routes; it is never
/// read from ambient globals.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor_id: ActorId,
    role: ActorRole,
}

impl ActorContext {
    pub fn new(actor_id: ActorId, role: ActorRole) -> Self {
        Self { actor_id, role }
    }

    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    pub fn role(&self) -> ActorRole {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}
