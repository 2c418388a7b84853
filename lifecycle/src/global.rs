//! Process-wide registries for the composition root.
//!
//! Library code takes registries by reference. These instances exist for the one place that
//! wires a host together and wants the convenience of a global:
//!
//! ```rust,ignore
//! let scene = Scene::new(Arc::clone(global::singletons()));
//! ```
//!
//! Both live for the whole process. Tests that touch them call [`reset`] first.

use std::sync::{Arc, LazyLock};

use crate::{identity::IdentityRegistry, singleton::SingletonRegistry};

static SINGLETONS: LazyLock<Arc<SingletonRegistry>> =
    LazyLock::new(|| Arc::new(SingletonRegistry::new()));

static IDENTITIES: LazyLock<IdentityRegistry> = LazyLock::new(IdentityRegistry::new);

/// The process-wide singleton registry.
pub fn singletons() -> &'static Arc<SingletonRegistry> {
    &SINGLETONS
}

/// The process-wide identity registry.
pub fn identities() -> &'static IdentityRegistry {
    &IDENTITIES
}

/// Clear both process-wide registries.
pub fn reset() {
    SINGLETONS.clear();
    IDENTITIES.clear();
}
