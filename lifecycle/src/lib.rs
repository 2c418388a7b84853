//! Object-lifecycle registries for component-model hosts.
//!
//! - [`SingletonRegistry`] keeps at most one live instance per behavior variant, finds or
//!   creates one on demand and resolves duplicates.
//! - [`IdentityRegistry`] maps GUIDs to a canonical source object with a reference count, so
//!   clones produced by an asset pipeline can find their original.
//!
//! Both sit under lifecycle hooks fired by a [`Host`]. [`scene::Scene`] is an in-memory host
//! used for tests, demos and benchmarks.

// Lets `#[derive(Singleton)]` refer to `::rusty_lifecycle` from inside this crate.
extern crate self as rusty_lifecycle;

pub mod config;
pub mod error;
pub mod global;
pub mod host;
pub mod identity;
pub mod key;
pub mod object;
pub mod scene;
pub mod singleton;

pub use config::RegistryConfig;
pub use error::{ConflictError, IdentityError};
pub use host::Host;
pub use identity::{
    AssetCheck, AssetDatabase, Guid, Identity, IdentityRegistry, check_unique_asset,
    project_instance,
};
pub use key::VariantKey;
pub use object::ObjectId;
pub use singleton::{
    Activation, Candidate, DuplicateAction, Instance, Precedence, Singleton, SingletonRegistry,
};

pub use rusty_lifecycle_macros::Singleton;
