//! Enforcement facade.
//!
//! The small surface an enforcement layer needs: may this player use this
//! resource, and what to tell them if not.

use crate::service::ProgressService;
use progression_core::PlayerId;
use std::sync::Arc;

/// Status text for resources without a condition.
pub const NOT_RESTRICTED_MESSAGE: &str = "This item is not restricted.";

/// Item-use checks over a [`ProgressService`].
#[derive(Clone)]
pub struct UnlockFacade {
    service: Arc<ProgressService>,
}

impl UnlockFacade {
    /// Create a facade over a service.
    pub fn new(service: Arc<ProgressService>) -> Self {
        Self { service }
    }

    /// Whether the resource has a condition.
    pub fn is_tracked_item(&self, resource: &str) -> bool {
        self.service.registry().contains(resource)
    }

    /// Whether the player may use the resource. `bypass` skips all checks.
    pub fn can_use_item(&self, player: PlayerId, resource: &str, bypass: bool) -> bool {
        bypass || !self.service.is_item_locked(player, resource)
    }

    /// Check an item use; the error carries the lock message.
    pub fn handle_item_use(&self, player: PlayerId, resource: &str, bypass: bool) -> Result<(), String> {
        if self.can_use_item(player, resource, bypass) {
            Ok(())
        } else {
            tracing::debug!(%player, item = %resource, "Blocked use of locked item");
            Err(self.service.lock_message(player, resource))
        }
    }

    /// One-line status of a resource for the player.
    pub fn status_message(&self, player: PlayerId, resource: &str) -> String {
        let Some(condition) = self.service.condition(resource) else {
            return NOT_RESTRICTED_MESSAGE.to_string();
        };

        if self.service.is_item_locked(player, resource) {
            return self.service.lock_message(player, resource);
        }

        let (current, required) = self
            .service
            .evaluate(player, |_, ctx| (condition.current_progress(ctx), condition.required_progress()));
        format!("You have unlocked this item! ({}/{})", current, required)
    }
}
