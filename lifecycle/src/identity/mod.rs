//! GUID-based identity for asset-like objects.
//!
//! Asset pipelines often hand out clones of an object at load time. Embedding an
//! [`Identity`] in the object lets every clone find its way back to the canonical source:
//! the first object to enable under a guid becomes the source, later ones are counted
//! against it, and the entry disappears with the last holder.
//!
//! # Example
//!
//! ```rust,ignore
//! let registry = IdentityRegistry::new();
//!
//! let original = Arc::new(Palette::new("3f2a9c"));
//! let clone = Arc::new(original.duplicate());
//!
//! original.identity.lock().enable(&registry, &original);
//! clone.identity.lock().enable(&registry, &clone);
//!
//! let source = clone.identity.lock().source::<Palette>(&registry);
//! assert!(Arc::ptr_eq(&source.unwrap(), &original));
//! ```
//!
//! # Assigning Guids
//!
//! Guids are assigned once per canonical object, from its persistent storage location. That
//! is a host concern modelled by [`AssetDatabase`]; [`Identity::ensure_guid`] asks the
//! database once and never replaces a guid that is already set.
//!
//! # Singleton Assets
//!
//! [`check_unique_asset`] keeps a [`Singleton`](crate::Singleton) asset type down to one
//! persisted instance in the project, and [`project_instance`] loads that instance.

mod guid;
mod registry;
mod unique;

pub use guid::Guid;
pub use registry::IdentityRegistry;
pub use unique::{AssetCheck, check_unique_asset, project_instance};

use std::{any::Any, sync::Arc};

use log::debug;

use crate::{error::IdentityError, key::VariantKey, object::ObjectId};

/// Host capability over persisted assets.
pub trait AssetDatabase {
    /// Block until `object` has been written to persistent storage and return its storage
    /// location, or `None` if it never will be.
    fn wait_until_persisted(&self, object: ObjectId) -> Option<String>;

    /// The guid the database assigned to `location`.
    fn guid_at(&self, location: &str) -> Option<Guid>;

    /// Storage locations of the persisted assets filed under `variant`.
    fn find_assets(&self, variant: VariantKey) -> Vec<String>;

    /// Load the asset stored at `location`.
    fn load(&self, location: &str) -> Option<Arc<dyn Any + Send + Sync>>;

    /// Delete the asset stored at `location`. Returns `false` if nothing was stored there.
    fn delete_asset(&self, location: &str) -> bool;
}

/// Identity state embedded in an asset-like object.
///
/// Tracks whether this holder is currently counted in the registry, so enabling or disabling
/// twice never skews the reference count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    guid: Option<Guid>,
    active: bool,
}

impl Identity {
    /// An identity carrying `guid`, not yet enabled.
    pub fn new(guid: Guid) -> Self {
        Self {
            guid: Some(guid),
            active: false,
        }
    }

    /// An identity without a guid. It does not participate until one is assigned.
    pub fn unassigned() -> Self {
        Self::default()
    }

    #[inline]
    pub fn guid(&self) -> Option<&Guid> {
        self.guid.as_ref()
    }

    /// Returns `true` while this holder is counted in the registry.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// A copy for a clone of the owning object: same guid, not enabled.
    pub fn duplicate(&self) -> Self {
        Self {
            guid: self.guid.clone(),
            active: false,
        }
    }

    /// Enable hook. Registers `this` as a holder of the guid; the first holder becomes the
    /// canonical source. Does nothing without a guid or when already enabled.
    pub fn enable<T: Send + Sync + 'static>(
        &mut self,
        registry: &IdentityRegistry,
        this: &Arc<T>,
    ) {
        if self.active {
            return;
        }
        let Some(guid) = &self.guid else {
            debug!("skipping identity registration of an object without a guid");
            return;
        };
        registry.acquire(guid, Arc::clone(this));
        self.active = true;
    }

    /// Disable hook. Releases this holder if it was enabled.
    pub fn disable(&mut self, registry: &IdentityRegistry) {
        if !self.active {
            return;
        }
        if let Some(guid) = &self.guid {
            registry.release(guid);
        }
        self.active = false;
    }

    /// The canonical source for this identity's guid.
    pub fn source<T: Send + Sync + 'static>(
        &self,
        registry: &IdentityRegistry,
    ) -> Option<Arc<T>> {
        registry.resolve(self.guid.as_ref()?.as_str())
    }

    /// Set the guid. If this holder is enabled, it moves from the old guid to the new one.
    pub fn assign<T: Send + Sync + 'static>(
        &mut self,
        registry: &IdentityRegistry,
        guid: Guid,
        this: &Arc<T>,
    ) {
        if self.guid.as_ref() == Some(&guid) {
            return;
        }
        if self.active {
            match &self.guid {
                Some(old) => {
                    registry.reassign(old, &guid, Arc::clone(this));
                }
                None => {
                    registry.acquire(&guid, Arc::clone(this));
                }
            }
        }
        self.guid = Some(guid);
    }

    /// Assign a guid from `database` unless one is already set.
    ///
    /// Blocks until the database reports the object as persisted.
    ///
    /// # Errors
    ///
    /// [`IdentityError::NotPersisted`] if the object never reaches storage, and
    /// [`IdentityError::UnknownLocation`] if the database has no guid for its location.
    pub fn ensure_guid<T: Send + Sync + 'static, D: AssetDatabase>(
        &mut self,
        database: &D,
        object: ObjectId,
        registry: &IdentityRegistry,
        this: &Arc<T>,
    ) -> Result<Guid, IdentityError> {
        if let Some(guid) = &self.guid {
            return Ok(guid.clone());
        }
        let location = database
            .wait_until_persisted(object)
            .ok_or(IdentityError::NotPersisted(object))?;
        let guid = database
            .guid_at(&location)
            .ok_or_else(|| IdentityError::UnknownLocation(location.clone()))?;

        debug!("assigned guid {guid} to {object} stored at {location}");
        self.assign(registry, guid.clone(), this);
        Ok(guid)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;

    /// An asset-like object carrying an identity.
    struct Palette {
        identity: Mutex<Identity>,
    }

    impl Palette {
        fn new(identity: Identity) -> Arc<Self> {
            Arc::new(Self {
                identity: Mutex::new(identity),
            })
        }

        fn duplicate(&self) -> Arc<Self> {
            Self::new(self.identity.lock().duplicate())
        }

        fn enable(self: &Arc<Self>, registry: &IdentityRegistry) {
            self.identity.lock().enable(registry, self);
        }

        fn disable(&self, registry: &IdentityRegistry) {
            self.identity.lock().disable(registry);
        }

        fn source(&self, registry: &IdentityRegistry) -> Option<Arc<Palette>> {
            self.identity.lock().source(registry)
        }
    }

    struct FakeDatabase {
        persisted: HashMap<ObjectId, String>,
        guids: HashMap<String, Guid>,
    }

    impl AssetDatabase for FakeDatabase {
        fn wait_until_persisted(&self, object: ObjectId) -> Option<String> {
            self.persisted.get(&object).cloned()
        }

        fn guid_at(&self, location: &str) -> Option<Guid> {
            self.guids.get(location).cloned()
        }

        fn find_assets(&self, _variant: VariantKey) -> Vec<String> {
            Vec::new()
        }

        fn load(&self, _location: &str) -> Option<Arc<dyn Any + Send + Sync>> {
            None
        }

        fn delete_asset(&self, _location: &str) -> bool {
            false
        }
    }

    fn database() -> FakeDatabase {
        FakeDatabase {
            persisted: HashMap::from([
                (ObjectId::new(1), "assets/palette.asset".to_string()),
                (ObjectId::new(2), "assets/orphan.asset".to_string()),
            ]),
            guids: HashMap::from([("assets/palette.asset".to_string(), Guid::new("pal-1"))]),
        }
    }

    #[test]
    fn clones_resolve_to_canonical_source() {
        // Given
        let registry = IdentityRegistry::new();
        let original = Palette::new(Identity::new(Guid::new("pal-1")));
        let clone = original.duplicate();

        // When
        original.enable(&registry);
        clone.enable(&registry);

        // Then
        assert!(Arc::ptr_eq(&clone.source(&registry).unwrap(), &original));
        assert_eq!(registry.ref_count("pal-1"), 2);
    }

    #[test]
    fn double_enable_and_disable_do_not_skew_count() {
        // Given
        let registry = IdentityRegistry::new();
        let palette = Palette::new(Identity::new(Guid::new("pal-2")));

        // When
        palette.enable(&registry);
        palette.enable(&registry);

        // Then
        assert_eq!(registry.ref_count("pal-2"), 1);

        // When
        palette.disable(&registry);
        palette.disable(&registry);

        // Then
        assert!(!registry.contains("pal-2"));
        assert!(!palette.identity.lock().is_active());
    }

    #[test]
    fn source_survives_until_last_holder_disables() {
        // Given
        let registry = IdentityRegistry::new();
        let original = Palette::new(Identity::new(Guid::new("pal-3")));
        let clone = original.duplicate();
        original.enable(&registry);
        clone.enable(&registry);

        // When
        original.disable(&registry);

        // Then - the source reference is fixed while anyone still holds the guid
        assert!(Arc::ptr_eq(&clone.source(&registry).unwrap(), &original));

        // When
        clone.disable(&registry);

        // Then
        assert!(clone.source(&registry).is_none());
    }

    #[test]
    fn unassigned_identity_does_not_participate() {
        // Given
        let registry = IdentityRegistry::new();
        let palette = Palette::new(Identity::unassigned());

        // When
        palette.enable(&registry);

        // Then
        assert!(registry.is_empty());
        assert!(palette.source(&registry).is_none());
        assert!(!palette.identity.lock().is_active());
    }

    #[test]
    fn assign_while_active_moves_registration() {
        // Given
        let registry = IdentityRegistry::new();
        let palette = Palette::new(Identity::new(Guid::new("before")));
        palette.enable(&registry);

        // When
        palette
            .identity
            .lock()
            .assign(&registry, Guid::new("after"), &palette);

        // Then
        assert!(!registry.contains("before"));
        assert_eq!(registry.ref_count("after"), 1);
        assert!(Arc::ptr_eq(&palette.source(&registry).unwrap(), &palette));
    }

    #[test]
    fn assign_while_inactive_only_sets_guid() {
        // Given
        let registry = IdentityRegistry::new();
        let palette = Palette::new(Identity::unassigned());

        // When
        palette
            .identity
            .lock()
            .assign(&registry, Guid::new("late"), &palette);

        // Then
        assert!(registry.is_empty());
        assert_eq!(palette.identity.lock().guid(), Some(&Guid::new("late")));
    }

    #[test]
    fn ensure_guid_assigns_from_database_once() {
        // Given
        let registry = IdentityRegistry::new();
        let database = database();
        let palette = Palette::new(Identity::unassigned());

        // When
        let guid = palette
            .identity
            .lock()
            .ensure_guid(&database, ObjectId::new(1), &registry, &palette);

        // Then
        assert_eq!(guid, Ok(Guid::new("pal-1")));

        // When - a second call keeps the existing guid even for another storage location
        let again = palette
            .identity
            .lock()
            .ensure_guid(&database, ObjectId::new(2), &registry, &palette);

        // Then
        assert_eq!(again, Ok(Guid::new("pal-1")));
    }

    #[test]
    fn ensure_guid_reports_database_failures() {
        // Given
        let registry = IdentityRegistry::new();
        let database = database();
        let palette = Palette::new(Identity::unassigned());
        let mut identity = palette.identity.lock();

        // When
        let unsaved = identity.ensure_guid(&database, ObjectId::new(9), &registry, &palette);
        let orphan = identity.ensure_guid(&database, ObjectId::new(2), &registry, &palette);

        // Then
        assert_eq!(unsaved, Err(IdentityError::NotPersisted(ObjectId::new(9))));
        assert_eq!(
            orphan,
            Err(IdentityError::UnknownLocation("assets/orphan.asset".to_string()))
        );
        assert_eq!(identity.guid(), None);
    }
}
