//! Keys identifying the concrete variant of a registered object.

use std::{
    any::{self, TypeId},
    fmt,
    hash::{Hash, Hasher},
};

/// Identifies a concrete variant participating in a registry.
///
/// Equality and hashing use only the Rust [`TypeId`]; the type name is carried along for
/// log messages and errors.
#[derive(Debug, Clone, Copy)]
pub struct VariantKey {
    type_id: TypeId,
    name: &'static str,
}

impl VariantKey {
    /// Get the key for type `T`.
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
        }
    }

    /// The type name without its module path, e.g. `AudioManager` for
    /// `game::audio::AudioManager`.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for VariantKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for VariantKey {}

impl Hash for VariantKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
