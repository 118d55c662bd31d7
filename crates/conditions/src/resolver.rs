//! External placeholder provider.

use progression_core::PlayerId;

/// Collaborator that substitutes `%name%` tokens for a player.
///
/// Backs the external-metric condition kind and the final pass over lock
/// messages. Calls are synchronous and made from the evaluation thread.
pub trait PlaceholderResolver: Send + Sync {
    /// Substitute every placeholder token in `text` for `player`.
    fn apply(&self, player: PlayerId, text: &str) -> String;

    /// Whether a provider is actually installed.
    fn is_available(&self) -> bool;
}

/// Resolver used when no provider is installed. Leaves text untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl PlaceholderResolver for NoResolver {
    fn apply(&self, _player: PlayerId, text: &str) -> String {
        text.to_string()
    }

    fn is_available(&self) -> bool {
        false
    }
}
