//! Cart additions deferred across a login redirect.

use crate::error::CartResult;
use serde::{Deserialize, Serialize};
use tailorink_core::storage::{keys, load_json, remove_all, save_json};
use tailorink_core::{DesignState, LocalStore, TextProps};

/// Every key a pending submission writes.
pub const PENDING_KEYS: [&str; 3] = [
    keys::PENDING_CART_ADD,
    keys::PENDING_DESIGN_STATE,
    keys::PENDING_PROPS_STATE,
];

/// State captured when an unauthenticated shopper adds to cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSubmission {
    pub design_state: DesignState,
    pub props_state: TextProps,
}

impl PendingSubmission {
    /// Write the submission and raise the pending flag.
    pub fn persist(&self, store: &dyn LocalStore) -> CartResult<()> {
        save_json(store, keys::PENDING_DESIGN_STATE, &self.design_state)?;
        save_json(store, keys::PENDING_PROPS_STATE, &self.props_state)?;
        save_json(store, keys::PENDING_CART_ADD, &true)?;
        Ok(())
    }

    /// Whether a submission is waiting to be replayed.
    pub fn is_flagged(store: &dyn LocalStore) -> bool {
        match load_json::<bool>(store, keys::PENDING_CART_ADD) {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => {
                log::warn!("Unreadable pending flag, treating as set: {}", e);
                true
            }
        }
    }

    /// Read the stored submission. A missing props state falls back to the
    /// default text style; a missing design state is an empty aggregate.
    pub fn load(store: &dyn LocalStore) -> CartResult<Self> {
        Ok(Self {
            design_state: load_json(store, keys::PENDING_DESIGN_STATE)?.unwrap_or_default(),
            props_state: load_json(store, keys::PENDING_PROPS_STATE)?.unwrap_or_default(),
        })
    }

    /// Remove the flag and both states.
    pub fn clear(store: &dyn LocalStore) {
        if let Err(e) = remove_all(store, &PENDING_KEYS) {
            log::error!("Failed to clear pending submission: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailorink_core::MemoryStore;

    #[test]
    fn test_persist_and_load() {
        let store = MemoryStore::new();
        assert!(!PendingSubmission::is_flagged(&store));

        let pending = PendingSubmission {
            design_state: DesignState {
                background_color: "#ffffff".to_string(),
                ..DesignState::default()
            },
            props_state: TextProps::default(),
        };
        pending.persist(&store).unwrap();

        assert!(PendingSubmission::is_flagged(&store));
        assert_eq!(PendingSubmission::load(&store).unwrap(), pending);

        PendingSubmission::clear(&store);
        for key in PENDING_KEYS {
            assert!(store.get(key).unwrap().is_none());
        }
    }

    #[test]
    fn test_corrupt_state_is_error() {
        let store = MemoryStore::new();
        store.set(keys::PENDING_DESIGN_STATE, "{nope").unwrap();
        assert!(PendingSubmission::load(&store).is_err());
    }
}
