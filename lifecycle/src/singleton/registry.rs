//! The process-wide singleton registry.
//!
//! # Thread Safety
//!
//! Entries live in a `DashMap`, so lookups, registrations and evictions from different
//! threads need no external locking. The registry never holds a map guard while calling into
//! the host: it snapshots what it needs, drops the guard, then acts. Hooks fired by the host
//! from inside [`Host::instantiate`] or the removal methods therefore re-enter the registry
//! freely.
//!
//! Creation on a miss is serialized per variant by a creation gate, so concurrent
//! `get_or_create` calls for the same missing variant create exactly one instance. The
//! cached fast path never touches the gate.

use std::{
    any::Any,
    sync::{Arc, Weak},
};

use dashmap::{DashMap, mapref::entry::Entry};
use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::{
    config::RegistryConfig,
    error::ConflictError,
    host::Host,
    key::VariantKey,
    object::ObjectId,
    singleton::{Activation, Candidate, DuplicateAction, Instance, Singleton},
};

/// A registered instance, with its variant erased.
struct Registration {
    object: ObjectId,
    container: ObjectId,
    /// A `Weak<T>` for the registered variant `T`.
    value: Box<dyn Any + Send + Sync>,
    /// Checks whether `value` can still be upgraded.
    held_fn: fn(&(dyn Any + Send + Sync)) -> bool,
}

impl Registration {
    fn new<T: Singleton>(instance: &Instance<T>) -> Self {
        Self {
            object: instance.object(),
            container: instance.container(),
            value: Box::new(instance.weak()),
            held_fn: Self::held_impl::<T>,
        }
    }

    fn held_impl<T: 'static>(value: &(dyn Any + Send + Sync)) -> bool {
        value
            .downcast_ref::<Weak<T>>()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    #[inline]
    fn is_held(&self) -> bool {
        (self.held_fn)(self.value.as_ref())
    }

    fn instance<T: 'static>(&self) -> Option<Instance<T>> {
        self.value
            .downcast_ref::<Weak<T>>()
            .map(|weak| Instance::from_weak(self.object, self.container, Weak::clone(weak)))
    }
}

/// What [`SingletonRegistry::claim`] found.
enum Claim {
    /// The instance is the registered one.
    Registered,
    /// Another live instance holds the registration.
    Occupied(ObjectId),
}

/// Maps each singleton variant to at most one live instance.
///
/// Construct one at the composition root and pass it by reference to every host, or use the
/// process-wide instance from [`global::singletons`](crate::global::singletons).
#[derive(Default)]
pub struct SingletonRegistry {
    entries: DashMap<VariantKey, Registration>,
    gates: DashMap<VariantKey, Arc<Mutex<()>>>,
    config: RegistryConfig,
}

impl SingletonRegistry {
    /// Create an empty registry using each variant's declared duplicate action.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with policy overrides.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The registry's configuration.
    #[inline]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Look up the live instance of `T`, without creating one.
    #[inline]
    pub fn get<T: Singleton, H: Host>(&self, host: &H) -> Option<Instance<T>> {
        self.get_or_create(host, false)
    }

    /// Look up the live instance of `T`, finding or creating one on a miss.
    ///
    /// 1. A cached registration that is still alive is returned as is. A stale one is
    ///    evicted.
    /// 2. Otherwise the host's live, enabled objects of `T` are scanned and the one with the
    ///    lowest structural precedence is registered.
    /// 3. Otherwise, if `create_if_missing` is set, the host instantiates a new `T`.
    ///
    /// Returns `None` when nothing was found and nothing was created.
    pub fn get_or_create<T: Singleton, H: Host>(
        &self,
        host: &H,
        create_if_missing: bool,
    ) -> Option<Instance<T>> {
        if let Some(instance) = self.cached::<T, H>(host) {
            return Some(instance);
        }

        let key = VariantKey::of::<T>();
        let gate = Arc::clone(self.gates.entry(key).or_default().value());
        let _guard = gate.lock();

        // Another caller may have finished while we waited on the gate.
        if let Some(instance) = self.cached::<T, H>(host) {
            return Some(instance);
        }

        if let Some(found) = Self::scan::<T, H>(host) {
            return match self.claim(host, &found) {
                Claim::Registered => {
                    debug!("found {} for singleton {}", found.object(), key.short_name());
                    self.on_registered(host, &found);
                    Some(found)
                }
                Claim::Occupied(_) => self.cached::<T, H>(host),
            };
        }

        if !create_if_missing {
            return None;
        }

        match host.instantiate::<T>() {
            Some(created) if matches!(self.claim(host, &created), Claim::Registered) => {
                debug!("created {} for singleton {}", created.object(), key.short_name());
                self.on_registered(host, &created);
                Some(created)
            }
            _ => self.cached::<T, H>(host),
        }
    }

    /// Activation hook: call when an instance of `T` becomes active.
    ///
    /// Resolution goes through the same lookup as [`get`](Self::get): with no live
    /// registration, the host's candidates are scanned and the one with the lowest structural
    /// precedence is registered, whichever instance happens to activate first. The instance
    /// is registered if it is that winner (or the host does not report it). Otherwise the
    /// variant's [`DuplicateAction`] (after config overrides) is applied to it.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError`] when the action is [`DuplicateAction::Reject`]. The caller
    /// must abort the instance's activation.
    pub fn activate<T: Singleton, H: Host>(
        &self,
        host: &H,
        instance: &Instance<T>,
    ) -> Result<Activation, ConflictError> {
        let existing = match self.cached::<T, H>(host) {
            Some(current) => current.object(),
            None => match Self::scan::<T, H>(host) {
                Some(best) if best.object() != instance.object() => {
                    match self.claim(host, &best) {
                        Claim::Registered => {
                            debug!(
                                "{} precedes {} for singleton {}",
                                best.object(),
                                instance.object(),
                                VariantKey::of::<T>().short_name()
                            );
                            self.on_registered(host, &best);
                            best.object()
                        }
                        Claim::Occupied(existing) => existing,
                    }
                }
                _ => instance.object(),
            },
        };

        if existing != instance.object() {
            return self.resolve_duplicate(host, existing, instance);
        }
        match self.claim(host, instance) {
            Claim::Registered => {
                self.on_registered(host, instance);
                Ok(Activation::Registered)
            }
            Claim::Occupied(existing) => self.resolve_duplicate(host, existing, instance),
        }
    }

    /// Deactivation hook: call when an instance of `T` is destroyed.
    ///
    /// Removes the registration only if it still points at `object`, so destroying a
    /// superseded instance leaves the current one in place. Returns `true` if an entry was
    /// removed.
    #[inline]
    pub fn deactivate<T: Singleton>(&self, object: ObjectId) -> bool {
        self.deactivate_key(VariantKey::of::<T>(), object)
    }

    /// Type-erased form of [`deactivate`](Self::deactivate).
    pub fn deactivate_key(&self, key: VariantKey, object: ObjectId) -> bool {
        let removed = self.evict(key, object);
        if removed {
            debug!("deregistered {object} from singleton {}", key.short_name());
        }
        removed
    }

    /// Move `container` under the host's persistent root.
    ///
    /// Skipped when the persistent root is already the container or one of its ancestors.
    /// Returns `true` if the container was moved.
    pub fn make_persistent<H: Host>(&self, host: &H, container: ObjectId) -> bool {
        let root = host.persistent_root();
        if Self::is_under(host, container, root) {
            return false;
        }
        host.reparent(container, root);
        info!("moved {container} under persistent root {root}");
        true
    }

    /// The registered instance of `T`, without checking it against the host.
    pub fn current<T: Singleton>(&self) -> Option<Instance<T>> {
        self.entries
            .get(&VariantKey::of::<T>())
            .and_then(|registration| registration.instance::<T>())
    }

    /// Returns `true` if a registration exists for `T`, alive or not.
    #[inline]
    pub fn contains<T: Singleton>(&self) -> bool {
        self.entries.contains_key(&VariantKey::of::<T>())
    }

    /// The number of registered variants.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every registration. Intended for test isolation; not meant to race with
    /// lookups.
    pub fn clear(&self) {
        self.entries.clear();
        self.gates.clear();
    }

    /// The cached instance of `T` if it is still alive. A dead registration is evicted.
    fn cached<T: Singleton, H: Host>(&self, host: &H) -> Option<Instance<T>> {
        let instance = self.current::<T>()?;
        if instance.is_held() && host.is_alive(instance.object()) {
            return Some(instance);
        }
        if self.evict(VariantKey::of::<T>(), instance.object()) {
            debug!(
                "evicted stale {} from singleton {}",
                instance.object(),
                VariantKey::of::<T>().short_name()
            );
        }
        None
    }

    /// The best live, enabled candidate the host knows about.
    fn scan<T: Singleton, H: Host>(host: &H) -> Option<Instance<T>> {
        host.candidates::<T>()
            .into_iter()
            .filter(|c| c.enabled && c.instance.is_held() && host.is_alive(c.instance.object()))
            .min_by_key(Candidate::rank)
            .map(|c| c.instance)
    }

    /// Register `instance` unless another live instance holds the registration. Stale
    /// registrations found on the way are evicted.
    fn claim<T: Singleton, H: Host>(&self, host: &H, instance: &Instance<T>) -> Claim {
        let key = VariantKey::of::<T>();
        loop {
            let snapshot = self.entries.get(&key).map(|r| (r.object, r.is_held()));
            match snapshot {
                None => {
                    if let Entry::Vacant(vacant) = self.entries.entry(key) {
                        vacant.insert(Registration::new(instance));
                        return Claim::Registered;
                    }
                }
                Some((object, _)) if object == instance.object() => return Claim::Registered,
                Some((object, held)) => {
                    if held && host.is_alive(object) {
                        return Claim::Occupied(object);
                    }
                    debug!("evicted stale {object} from singleton {}", key.short_name());
                    self.evict(key, object);
                }
            }
        }
    }

    /// Remove the registration for `key` if it still points at `object`.
    #[inline]
    fn evict(&self, key: VariantKey, object: ObjectId) -> bool {
        self.entries
            .remove_if(&key, |_, registration| registration.object == object)
            .is_some()
    }

    /// Returns `true` if `ancestor` is `container` or sits above it.
    fn is_under<H: Host>(host: &H, container: ObjectId, ancestor: ObjectId) -> bool {
        let mut current = Some(container);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = host.parent_of(id);
        }
        false
    }

    fn on_registered<T: Singleton, H: Host>(&self, host: &H, instance: &Instance<T>) {
        if T::PERSISTENT {
            self.make_persistent(host, instance.container());
        }
    }

    /// Apply the duplicate action of `T` to `duplicate`. The action is always taken from the
    /// incoming instance's variant.
    fn resolve_duplicate<T: Singleton, H: Host>(
        &self,
        host: &H,
        existing: ObjectId,
        duplicate: &Instance<T>,
    ) -> Result<Activation, ConflictError> {
        let key = VariantKey::of::<T>();
        let action = self.config.action_for::<T>();
        match action {
            DuplicateAction::Reject => {
                let conflict = ConflictError {
                    variant: key,
                    existing,
                    duplicate: duplicate.object(),
                };
                error!("{conflict}");
                return Err(conflict);
            }
            DuplicateAction::DiscardDuplicate => host.remove_behavior(duplicate.object()),
            DuplicateAction::DiscardContainer => host.remove_container(duplicate.container()),
        }
        warn!(
            "{action}: {} is a duplicate of singleton {} (registered: {existing})",
            duplicate.object(),
            key.short_name()
        );
        Ok(Activation::Discarded(action))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Barrier, thread};

    use super::*;
    use crate::scene::{Scene, SceneError};

    #[derive(crate::Singleton, Default)]
    struct GameManager;

    #[derive(crate::Singleton, Default)]
    #[singleton(on_duplicate = "discard_duplicate")]
    struct InputRouter;

    #[derive(crate::Singleton, Default)]
    #[singleton(on_duplicate = "discard_container")]
    struct AudioManager;

    #[derive(crate::Singleton, Default)]
    #[singleton(persistent)]
    struct SaveSystem;

    #[derive(Default)]
    struct Marker;

    fn scene() -> Scene {
        Scene::new(Arc::new(SingletonRegistry::new()))
    }

    // ==================== Lookup ====================

    #[test]
    fn get_on_empty_host_returns_none() {
        let scene = scene();

        assert!(scene.registry().get::<GameManager, _>(&scene).is_none());
        assert!(scene.registry().is_empty());
    }

    #[test]
    fn repeated_get_returns_same_instance() {
        // Given
        let scene = scene();
        let container = scene.spawn("manager");
        let (manager, _) = scene.attach_singleton(container, GameManager).unwrap();
        let registry = scene.registry();

        // When
        let first = registry.get::<GameManager, _>(&scene);
        let second = registry.get::<GameManager, _>(&scene);

        // Then
        assert_eq!(first, Some(manager.clone()));
        assert_eq!(second, Some(manager));
    }

    #[test]
    fn get_or_create_creates_exactly_once() {
        // Given
        let scene = scene();
        let registry = scene.registry();

        // When
        let created = registry.get_or_create::<GameManager, _>(&scene, true).unwrap();
        let again = registry.get_or_create::<GameManager, _>(&scene, true).unwrap();

        // Then
        assert_eq!(created, again);
        assert_eq!(scene.candidates::<GameManager>().len(), 1);
        assert_eq!(registry.len(), 1);
        assert!(created.upgrade().is_some());
    }

    #[test]
    fn scan_ignores_disabled_candidates() {
        // Given - an unregistered disabled candidate and an unregistered enabled one
        let scene = scene();
        let registry = scene.registry();
        let first = scene.spawn("first");
        let second = scene.spawn("second");
        let (a, _) = scene.attach_singleton(first, GameManager).unwrap();
        let b = scene.attach(second, GameManager).unwrap();
        registry.clear();
        scene.set_enabled(a.object(), false);

        // When
        let found = registry.get::<GameManager, _>(&scene).unwrap();

        // Then
        assert_eq!(found.object(), b);
    }

    #[test]
    fn scan_prefers_earliest_structural_precedence() {
        // Given - three unregistered candidates, nested and in separate roots
        let scene = scene();
        let registry = scene.registry();
        let level = scene.spawn("level");
        let nested = scene.spawn_child("nested", level).unwrap();
        let late = scene.spawn("late");
        let in_late = scene.attach(late, GameManager).unwrap();
        let in_nested = scene.attach(nested, GameManager).unwrap();
        scene.attach(level, Marker).unwrap();

        // When
        let found = registry.get::<GameManager, _>(&scene).unwrap();
        registry.clear();
        let found_again = registry.get::<GameManager, _>(&scene).unwrap();

        // Then - nested sits under the first root, so it precedes the later root
        assert_eq!(found.object(), in_nested);
        assert_eq!(found_again.object(), in_nested);
        assert_ne!(found.object(), in_late);
    }

    #[test]
    fn stale_entry_is_evicted_and_rescanned() {
        // Given - a registry the scene does not report to
        let scene = scene();
        let detached = SingletonRegistry::new();
        let first = scene.spawn("first");
        let second = scene.spawn("second");
        let (current, _) = scene.attach_singleton(first, GameManager).unwrap();
        detached.activate(&scene, &current).unwrap();
        let replacement = scene.attach(second, GameManager).unwrap();

        // When - the object dies without the detached registry hearing about it
        scene.destroy_behavior(current.object());

        // Then
        assert!(detached.contains::<GameManager>());
        let found = detached.get::<GameManager, _>(&scene).unwrap();
        assert_eq!(found.object(), replacement);
    }

    // ==================== Deactivation ====================

    #[test]
    fn destroying_current_instance_falls_back_to_other_candidate() {
        // Given
        let scene = scene();
        let registry = scene.registry();
        let first = scene.spawn("first");
        let second = scene.spawn("second");
        let (current, _) = scene.attach_singleton(first, GameManager).unwrap();
        let waiting = scene.attach(second, GameManager).unwrap();

        // When
        scene.destroy_container(first);

        // Then
        assert!(!registry.contains::<GameManager>());
        let found = registry.get::<GameManager, _>(&scene).unwrap();
        assert_eq!(found.object(), waiting);
        assert_ne!(found, current);
    }

    #[test]
    fn destroying_superseded_instance_keeps_current() {
        // Given
        let scene = scene();
        let registry = scene.registry();
        let first = scene.spawn("first");
        let (current, _) = scene.attach_singleton(first, GameManager).unwrap();
        let second = scene.spawn("second");
        let superseded = scene.attach(second, GameManager).unwrap();

        // When
        let removed = registry.deactivate::<GameManager>(superseded);
        scene.destroy_behavior(superseded);

        // Then
        assert!(!removed);
        assert_eq!(registry.current::<GameManager>(), Some(current));
    }

    // ==================== Duplicates ====================

    #[test]
    fn reject_policy_raises_conflict() {
        // Given
        let scene = scene();
        let first = scene.spawn("first");
        let second = scene.spawn("second");
        let (current, _) = scene.attach_singleton(first, GameManager).unwrap();

        // When
        let result = scene.attach_singleton(second, GameManager);

        // Then
        let conflict = match result {
            Err(SceneError::Conflict(conflict)) => conflict,
            other => panic!("expected a conflict, got {other:?}"),
        };
        assert_eq!(conflict.variant, VariantKey::of::<GameManager>());
        assert_eq!(conflict.existing, current.object());
        assert!(scene.behaviors_of(second).is_empty());
        assert_eq!(scene.registry().current::<GameManager>(), Some(current));
    }

    #[test]
    fn reject_conflict_message_names_variant() {
        let conflict = ConflictError {
            variant: VariantKey::of::<GameManager>(),
            existing: ObjectId::new(1),
            duplicate: ObjectId::new(2),
        };

        let message = conflict.to_string();

        assert!(message.contains("GameManager"));
        assert!(message.contains("#1v0"));
        assert!(message.contains("#2v0"));
    }

    #[test]
    fn discard_duplicate_keeps_container() {
        // Given
        let scene = scene();
        let first = scene.spawn("first");
        let second = scene.spawn("second");
        let (current, _) = scene.attach_singleton(first, InputRouter).unwrap();
        let kept = scene.attach(second, Marker).unwrap();

        // When
        let (duplicate, activation) = scene.attach_singleton(second, InputRouter).unwrap();

        // Then
        assert_eq!(activation, Activation::Discarded(DuplicateAction::DiscardDuplicate));
        assert!(!scene.is_alive(duplicate.object()));
        assert!(scene.is_alive(second));
        assert!(scene.roots().contains(&second));
        assert_eq!(scene.behaviors_of(second), vec![kept]);
        assert_eq!(scene.registry().current::<InputRouter>(), Some(current));
    }

    #[test]
    fn discard_container_removes_whole_container() {
        // Given
        let scene = scene();
        let first = scene.spawn("first");
        let second = scene.spawn("second");
        let (current, _) = scene.attach_singleton(first, AudioManager).unwrap();
        let doomed = scene.attach(second, Marker).unwrap();

        // When
        let (duplicate, activation) = scene.attach_singleton(second, AudioManager).unwrap();

        // Then
        assert_eq!(activation, Activation::Discarded(DuplicateAction::DiscardContainer));
        assert!(!scene.is_alive(duplicate.object()));
        assert!(!scene.is_alive(doomed));
        assert!(!scene.is_alive(second));
        assert!(!scene.roots().contains(&second));
        assert_eq!(scene.registry().current::<AudioManager>(), Some(current));
    }

    #[test]
    fn config_override_replaces_declared_action() {
        // Given
        let config =
            RegistryConfig::new().with_action::<GameManager>(DuplicateAction::DiscardDuplicate);
        let scene = Scene::new(Arc::new(SingletonRegistry::with_config(config)));
        let first = scene.spawn("first");
        let second = scene.spawn("second");
        scene.attach_singleton(first, GameManager).unwrap();

        // When
        let (_, activation) = scene.attach_singleton(second, GameManager).unwrap();

        // Then
        assert_eq!(activation, Activation::Discarded(DuplicateAction::DiscardDuplicate));
    }

    #[test]
    fn reactivating_registered_instance_is_accepted() {
        // Given
        let scene = scene();
        let container = scene.spawn("manager");
        let (manager, _) = scene.attach_singleton(container, GameManager).unwrap();

        // When
        let activation = scene.registry().activate(&scene, &manager);

        // Then
        assert_eq!(activation, Ok(Activation::Registered));
    }

    #[test]
    fn activation_replaces_dead_registration() {
        // Given - a registration whose object died without a deactivation hook
        let scene = scene();
        let registry = SingletonRegistry::new();
        let first = scene.spawn("first");
        let (dead, _) = scene.attach_singleton(first, GameManager).unwrap();
        registry.activate(&scene, &dead).unwrap();
        scene.destroy_container(first);
        let second = scene.spawn("second");
        let (fresh, _) = scene.attach_singleton(second, GameManager).unwrap();

        // When
        let activation = registry.activate(&scene, &fresh);

        // Then
        assert_eq!(activation, Ok(Activation::Registered));
        assert_eq!(registry.current::<GameManager>(), Some(fresh));
    }

    #[test]
    fn activation_defers_to_earlier_enabled_candidate() {
        // Given - an enabled, unregistered instance precedes the activating one
        let scene = scene();
        let first = scene.spawn("first");
        let second = scene.spawn("second");
        let earlier = scene.attach(first, GameManager).unwrap();

        // When
        let result = scene.attach_singleton(second, GameManager);

        // Then
        let conflict = match result {
            Err(SceneError::Conflict(conflict)) => conflict,
            other => panic!("expected a conflict, got {other:?}"),
        };
        assert_eq!(conflict.existing, earlier);
        assert!(scene.behaviors_of(second).is_empty());
        assert_eq!(
            scene.registry().current::<GameManager>().map(|i| i.object()),
            Some(earlier)
        );
    }

    #[test]
    fn activation_order_does_not_change_winner() {
        // Given - two unregistered instances
        let scene = scene();
        let registry = scene.registry();
        let first = scene.spawn("first");
        let second = scene.spawn("second");
        scene.attach(first, InputRouter).unwrap();
        scene.attach(second, InputRouter).unwrap();
        let mut candidates = scene.candidates::<InputRouter>().into_iter();
        let earlier = candidates.next().unwrap().instance;
        let later = candidates.next().unwrap().instance;

        // When - the later one activates first
        let later_activation = registry.activate(&scene, &later);
        let earlier_activation = registry.activate(&scene, &earlier);

        // Then
        assert_eq!(
            later_activation,
            Ok(Activation::Discarded(DuplicateAction::DiscardDuplicate))
        );
        assert_eq!(earlier_activation, Ok(Activation::Registered));
        assert_eq!(registry.current::<InputRouter>(), Some(earlier));
        assert!(!scene.is_alive(later.object()));
    }

    #[test]
    fn disabled_earlier_candidate_does_not_block_activation() {
        // Given
        let scene = scene();
        let first = scene.spawn("first");
        let second = scene.spawn("second");
        let earlier = scene.attach(first, GameManager).unwrap();
        scene.set_enabled(earlier, false);

        // When
        let (manager, activation) = scene.attach_singleton(second, GameManager).unwrap();

        // Then
        assert_eq!(activation, Activation::Registered);
        assert_eq!(scene.registry().current::<GameManager>(), Some(manager));
    }

    // ==================== Persistence ====================

    #[test]
    fn make_persistent_keeps_nested_persistent_container_in_place() {
        // Given - persistent / kept / holder
        let scene = scene();
        let registry = scene.registry();
        let kept = scene.spawn("kept");
        registry.make_persistent(&scene, kept);
        let holder = scene.spawn_child("holder", kept).unwrap();

        // When
        let moved = registry.make_persistent(&scene, holder);
        let (save, _) = scene.attach_singleton(holder, SaveSystem).unwrap();

        // Then
        assert!(!moved);
        assert_eq!(scene.parent_of(holder), Some(kept));
        assert_eq!(scene.parent_of(kept), Some(scene.persistent_root()));
        assert_eq!(registry.current::<SaveSystem>(), Some(save));
    }

    #[test]
    fn persistent_singleton_moves_under_persistent_root_and_survives_unload() {
        // Given
        let scene = scene();
        let level = scene.spawn("level");
        let holder = scene.spawn_child("holder", level).unwrap();

        // When
        let (save, _) = scene.attach_singleton(holder, SaveSystem).unwrap();
        scene.unload();

        // Then
        assert_eq!(scene.parent_of(holder), Some(scene.persistent_root()));
        assert!(scene.is_alive(save.object()));
        assert_eq!(scene.registry().get::<SaveSystem, _>(&scene), Some(save));
    }

    #[test]
    fn make_persistent_is_idempotent() {
        // Given
        let scene = scene();
        let registry = scene.registry();
        let container = scene.spawn("holder");

        // When
        let moved = registry.make_persistent(&scene, container);
        let moved_again = registry.make_persistent(&scene, container);

        // Then
        assert!(moved);
        assert!(!moved_again);
        assert_eq!(scene.parent_of(container), Some(scene.persistent_root()));
        assert_eq!(scene.roots(), vec![scene.persistent_root()]);
    }

    #[test]
    fn non_persistent_singleton_is_lost_on_unload() {
        // Given
        let scene = scene();
        let level = scene.spawn("level");
        scene.attach_singleton(level, GameManager).unwrap();

        // When
        scene.unload();

        // Then
        assert!(!scene.registry().contains::<GameManager>());
        assert!(scene.registry().get::<GameManager, _>(&scene).is_none());
    }

    // ==================== Invariants ====================

    #[test]
    fn at_most_one_registration_after_mixed_lifecycle() {
        // Given
        let scene = scene();
        let registry = scene.registry();
        let containers: Vec<_> = (0..6).map(|i| scene.spawn(format!("c{i}"))).collect();

        // When
        for (i, &container) in containers.iter().enumerate() {
            let _ = scene.attach_singleton(container, InputRouter);
            if i % 2 == 0 {
                scene.destroy_container(container);
            }
        }

        // Then
        assert!(registry.len() <= 1);
        let live = scene
            .candidates::<InputRouter>()
            .into_iter()
            .filter(|c| scene.is_alive(c.instance.object()))
            .count();
        assert_eq!(live, 1);
        assert!(registry.get::<InputRouter, _>(&scene).is_some());
    }

    #[test]
    fn clear_resets_registry() {
        // Given
        let scene = scene();
        let registry = scene.registry();
        registry.get_or_create::<GameManager, _>(&scene, true);
        registry.get_or_create::<AudioManager, _>(&scene, true);

        // When
        registry.clear();

        // Then
        assert!(registry.is_empty());
        assert!(registry.current::<GameManager>().is_none());
    }

    // ==================== Concurrency ====================

    #[test]
    fn concurrent_get_or_create_creates_one_instance() {
        // Given
        let scene = Arc::new(scene());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let scene = Arc::clone(&scene);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    scene.registry().get_or_create::<GameManager, _>(&*scene, true)
                })
            })
            .collect();

        // When
        let results = handles
            .into_iter()
            .map(|h| h.join())
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        // Then
        let first = results[0].clone().unwrap();
        assert!(results.iter().all(|r| r.as_ref() == Some(&first)));
        assert_eq!(scene.candidates::<GameManager>().len(), 1);
        assert_eq!(scene.registry().len(), 1);
    }

    #[test]
    fn concurrent_lookups_and_destroys_keep_single_registration() {
        // Given
        let scene = Arc::new(scene());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let scene = Arc::clone(&scene);
                thread::spawn(move || {
                    for _ in 0..50 {
                        if i % 2 == 0 {
                            if let Some(found) =
                                scene.registry().get_or_create::<AudioManager, _>(&*scene, true)
                            {
                                scene.destroy_container(found.container());
                            }
                        } else {
                            let container = scene.spawn("spare");
                            let _ = scene.attach_singleton(container, AudioManager);
                        }
                    }
                })
            })
            .collect();

        // When
        for handle in handles {
            handle.join().unwrap();
        }

        // Then
        assert!(scene.registry().len() <= 1);
        if let Some(current) = scene.registry().get::<AudioManager, _>(&*scene) {
            assert!(scene.is_alive(current.object()));
        }
    }
}
