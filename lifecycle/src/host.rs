//! The host object model the registries depend on.
//!
//! The registries never own objects. Everything they need to know about the scene (which
//! objects of a variant exist, whether a handle is still alive, how to remove or relocate
//! objects) comes through the [`Host`] trait. [`Scene`](crate::scene::Scene) is an
//! in-memory implementation.
//!
//! # Lifecycle Hooks
//!
//! A host must call back into the registry at two points of a singleton behavior's life:
//!
//! - when the behavior becomes active: [`SingletonRegistry::activate`]
//! - when the behavior is destroyed: [`SingletonRegistry::deactivate`] (or
//!   [`deactivate_key`](SingletonRegistry::deactivate_key) when only the variant key is at hand)
//!
//! The registry never holds one of its own locks while calling into the host, so these hooks
//! may be fired from inside [`Host::instantiate`] or the removal methods.
//!
//! [`SingletonRegistry::activate`]: crate::SingletonRegistry::activate
//! [`SingletonRegistry::deactivate`]: crate::SingletonRegistry::deactivate

use crate::{
    object::ObjectId,
    singleton::{Candidate, Instance, Singleton},
};

/// Capabilities a host provides to the singleton registry.
pub trait Host: Send + Sync {
    /// All live objects of variant `T`, with their enabled state and structural precedence.
    ///
    /// Order of the returned list does not matter; the registry ranks by precedence.
    fn candidates<T: Singleton>(&self) -> Vec<Candidate<T>>;

    /// Create a container, attach a fresh `T` to it and run its activation hook.
    ///
    /// Returns `None` if the host could not create the object.
    fn instantiate<T: Singleton>(&self) -> Option<Instance<T>>;

    /// Returns `true` while the behavior or container `object` exists.
    fn is_alive(&self, object: ObjectId) -> bool;

    /// Remove a single behavior, leaving its container in place.
    fn remove_behavior(&self, object: ObjectId);

    /// Remove a container, its children and every behavior attached to them.
    fn remove_container(&self, container: ObjectId);

    /// The container whose lifetime spans context transitions.
    fn persistent_root(&self) -> ObjectId;

    /// The parent of `container`, or `None` for a root.
    fn parent_of(&self, container: ObjectId) -> Option<ObjectId>;

    /// Move `container` under `parent`.
    fn reparent(&self, container: ObjectId, parent: ObjectId);
}
