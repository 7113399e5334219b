//! Session identity — explicit capability, never ambient.
//!
//! Core components (history loader, stream connection, controller) receive
//! the user identity as a value. The only place identity is *resolved* is
//! the controller's mount path, through a [`SessionProvider`] injected by
//! the application.

pub mod client;
pub mod wire;

use crate::shared::UserId;
use std::sync::RwLock;

/// Source of the current user identity.
///
/// Implemented by the application's session storage; [`MemorySession`] is
/// the provided process-local implementation.
pub trait SessionProvider: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct MemorySession {
    user_id: RwLock<Option<UserId>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user_id: UserId) -> Self {
        Self {
            user_id: RwLock::new(Some(user_id)),
        }
    }

    pub fn set_user(&self, user_id: UserId) {
        if let Ok(mut slot) = self.user_id.write() {
            *slot = Some(user_id);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.user_id.write() {
            *slot = None;
        }
    }
}

impl SessionProvider for MemorySession {
    fn current_user_id(&self) -> Option<UserId> {
        self.user_id.read().ok().and_then(|slot| *slot)
    }
}
