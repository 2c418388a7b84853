//! Runtime configuration for the singleton registry.
//!
//! Variants declare their duplicate handling at compile time through
//! [`Singleton::ON_DUPLICATE`]. A [`RegistryConfig`] can override that per variant, or set a
//! fallback for every variant that has no explicit override:
//!
//! ```rust,ignore
//! let config = RegistryConfig::new()
//!     .with_action::<AudioManager>(DuplicateAction::DiscardContainer)
//!     .with_default_action(DuplicateAction::DiscardDuplicate);
//! let registry = SingletonRegistry::with_config(config);
//! ```

use std::collections::HashMap;

use crate::{
    key::VariantKey,
    singleton::{DuplicateAction, Singleton},
};

/// Policy overrides for a [`SingletonRegistry`](crate::SingletonRegistry).
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    overrides: HashMap<VariantKey, DuplicateAction>,
    default_action: Option<DuplicateAction>,
}

impl RegistryConfig {
    /// A config with no overrides: every variant uses its declared action.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the duplicate action of variant `T`.
    pub fn with_action<T: Singleton>(mut self, action: DuplicateAction) -> Self {
        self.overrides.insert(VariantKey::of::<T>(), action);
        self
    }

    /// Use `action` for every variant without an explicit override, instead of the variant's
    /// declared action.
    pub fn with_default_action(mut self, action: DuplicateAction) -> Self {
        self.default_action = Some(action);
        self
    }

    /// The action to apply to a duplicate of variant `T`.
    ///
    /// Lookup order: explicit override, then the config default, then
    /// [`Singleton::ON_DUPLICATE`].
    pub fn action_for<T: Singleton>(&self) -> DuplicateAction {
        self.overrides
            .get(&VariantKey::of::<T>())
            .copied()
            .or(self.default_action)
            .unwrap_or(T::ON_DUPLICATE)
    }
}
