//! Singleton enforcement for host-attached behaviors.
//!
//! A variant opts in by implementing [`Singleton`], usually through
//! `#[derive(Singleton)]`. The [`SingletonRegistry`] then guarantees that at most one live
//! instance of the variant is registered, finds or creates one on demand, and resolves
//! duplicates with the variant's [`DuplicateAction`].
//!
//! # Example
//!
//! ```rust,ignore
//! use rusty_lifecycle::Singleton;
//!
//! #[derive(Singleton, Default)]
//! #[singleton(on_duplicate = "discard_container", persistent)]
//! struct AudioManager {
//!     volume: f32,
//! }
//!
//! let audio = registry.get_or_create::<AudioManager, _>(&scene, true);
//! ```
//!
//! # Singleton vs Identity
//!
//! | Aspect | Singleton | Identity |
//! |--------|-----------|----------|
//! | Key | Concrete variant | GUID string |
//! | Cardinality | One live instance | One canonical source, many clones |
//! | Duplicates | Rejected or discarded | Reference counted |

mod instance;
mod registry;

pub use instance::{Candidate, Instance, Precedence};
pub use registry::SingletonRegistry;

use std::fmt;

/// What happens when a second instance of a singleton variant becomes active.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DuplicateAction {
    /// Fail the duplicate's activation with a [`ConflictError`](crate::ConflictError).
    #[default]
    Reject,
    /// Remove the duplicate behavior; its container survives.
    DiscardDuplicate,
    /// Remove the duplicate's whole container, and everything attached to it.
    DiscardContainer,
}

impl fmt::Display for DuplicateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateAction::Reject => write!(f, "reject"),
            DuplicateAction::DiscardDuplicate => write!(f, "discard duplicate"),
            DuplicateAction::DiscardContainer => write!(f, "discard container"),
        }
    }
}

/// The outcome of a successful activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The instance is now (or already was) the registered singleton.
    Registered,
    /// The instance was a duplicate and was removed from the host.
    Discarded(DuplicateAction),
}

/// A behavior type that exists at most once.
///
/// # Derive Macro
///
/// ```rust,ignore
/// #[derive(Singleton, Default)]
/// #[singleton(on_duplicate = "discard_duplicate")]
/// struct InputRouter;
/// ```
///
/// # Trait Bounds
///
/// - `Default`: the registry can ask the host to create an instance on a miss
/// - `Send + Sync + 'static`: instances are shared across threads
pub trait Singleton: Default + Send + Sync + 'static {
    /// How a duplicate of this variant is handled, unless overridden by
    /// [`RegistryConfig`](crate::RegistryConfig).
    const ON_DUPLICATE: DuplicateAction = DuplicateAction::Reject;

    /// Whether a registered instance is moved under the host's persistent root.
    const PERSISTENT: bool = false;
}
