//! An in-memory host.
//!
//! [`Scene`] is a small container hierarchy with behaviors attached to containers. It
//! implements [`Host`] and fires the singleton lifecycle hooks itself, so it can stand in for
//! a real engine in tests, benchmarks and demos.
//!
//! # Model
//!
//! - Containers form a forest. A persistent root is created with the scene and survives
//!   [`Scene::unload`].
//! - Behaviors are attached to containers and hold an `Arc` of any `Send + Sync` value.
//! - A behavior is enabled when its own flag is set and every container up to its root is
//!   active.
//! - Structural precedence is the depth-first pre-order position of a behavior: roots in
//!   creation order (persistent root first), a container's behaviors before its children.
//!
//! # Example
//!
//! ```rust,ignore
//! let scene = Scene::new(Arc::new(SingletonRegistry::new()));
//! let level = scene.spawn("level");
//! let (audio, _) = scene.attach_singleton(level, AudioManager::default())?;
//!
//! assert_eq!(scene.registry().get::<AudioManager, _>(&scene), Some(audio));
//! ```

mod graph;

use std::{any::Any, sync::Arc};

use log::{debug, warn};
use parking_lot::RwLock;
use thiserror::Error;

use crate::{
    error::ConflictError,
    host::Host,
    key::VariantKey,
    object::{Allocator, ObjectId},
    singleton::{Activation, Candidate, Instance, Precedence, Singleton, SingletonRegistry},
};

use graph::{Behavior, Graph, Removed};

/// Name given to the persistent root container.
pub const PERSISTENT_ROOT_NAME: &str = "persistent";

/// Failures of scene glue operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("container {0} does not exist")]
    MissingContainer(ObjectId),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
}

/// An in-memory container hierarchy that drives a [`SingletonRegistry`].
pub struct Scene {
    registry: Arc<SingletonRegistry>,
    allocator: Allocator,
    graph: RwLock<Graph>,
    persistent_root: ObjectId,
}

impl Scene {
    /// Create an empty scene reporting to `registry`.
    pub fn new(registry: Arc<SingletonRegistry>) -> Self {
        let allocator = Allocator::new();
        let persistent_root = allocator.alloc();
        let mut graph = Graph::default();
        graph.insert_container(persistent_root, PERSISTENT_ROOT_NAME.to_string(), None);

        Self {
            registry,
            allocator,
            graph: RwLock::new(graph),
            persistent_root,
        }
    }

    /// The registry this scene reports lifecycle events to.
    #[inline]
    pub fn registry(&self) -> &Arc<SingletonRegistry> {
        &self.registry
    }

    /// Spawn a root container.
    pub fn spawn(&self, name: impl Into<String>) -> ObjectId {
        let container = self.allocator.alloc();
        self.graph.write().insert_container(container, name.into(), None);
        container
    }

    /// Spawn a container under `parent`.
    pub fn spawn_child(
        &self,
        name: impl Into<String>,
        parent: ObjectId,
    ) -> Result<ObjectId, SceneError> {
        let mut graph = self.graph.write();
        if !graph.containers.contains_key(&parent) {
            return Err(SceneError::MissingContainer(parent));
        }
        let container = self.allocator.alloc();
        graph.insert_container(container, name.into(), Some(parent));
        Ok(container)
    }

    /// Attach a behavior without running the activation hook.
    ///
    /// The behavior is still reported as a candidate to registry scans, and destroying it
    /// runs the deactivation hook like any other behavior.
    pub fn attach<T: Send + Sync + 'static>(
        &self,
        container: ObjectId,
        value: T,
    ) -> Result<ObjectId, SceneError> {
        self.insert(container, Arc::new(value)).map(|(object, _)| object)
    }

    /// Attach a singleton behavior and run its activation hook.
    ///
    /// On a conflict the behavior is removed again and the error is returned. A discarded
    /// duplicate is reported through the returned [`Activation`]; its handle is already dead.
    pub fn attach_singleton<T: Singleton>(
        &self,
        container: ObjectId,
        value: T,
    ) -> Result<(Instance<T>, Activation), SceneError> {
        let (object, value) = self.insert(container, Arc::new(value))?;
        let instance = Instance::new(object, container, &value);

        match self.registry.activate(self, &instance) {
            Ok(activation) => Ok((instance, activation)),
            Err(conflict) => {
                self.destroy_behavior(object);
                Err(conflict.into())
            }
        }
    }

    fn insert<T: Send + Sync + 'static>(
        &self,
        container: ObjectId,
        value: Arc<T>,
    ) -> Result<(ObjectId, Arc<T>), SceneError> {
        let mut graph = self.graph.write();
        if !graph.containers.contains_key(&container) {
            return Err(SceneError::MissingContainer(container));
        }
        let object = self.allocator.alloc();
        graph.insert_behavior(
            object,
            Behavior {
                container,
                enabled: true,
                key: VariantKey::of::<T>(),
                value: value.clone(),
            },
        );
        Ok((object, value))
    }

    /// Get the value of behavior `object`, if it is alive and of type `T`.
    pub fn get<T: Send + Sync + 'static>(&self, object: ObjectId) -> Option<Arc<T>> {
        let value: Arc<dyn Any + Send + Sync> =
            Arc::clone(&self.graph.read().behaviors.get(&object)?.value);
        value.downcast::<T>().ok()
    }

    /// The container a behavior is attached to.
    pub fn container_of(&self, object: ObjectId) -> Option<ObjectId> {
        self.graph.read().behaviors.get(&object).map(|b| b.container)
    }

    /// The name of a container.
    pub fn name(&self, container: ObjectId) -> Option<String> {
        self.graph.read().containers.get(&container).map(|n| n.name.clone())
    }

    /// The behaviors attached to a container, in attach order.
    pub fn behaviors_of(&self, container: ObjectId) -> Vec<ObjectId> {
        self.graph
            .read()
            .containers
            .get(&container)
            .map(|node| node.behaviors.clone())
            .unwrap_or_default()
    }

    /// The root containers, in creation order.
    pub fn roots(&self) -> Vec<ObjectId> {
        self.graph.read().roots.clone()
    }

    /// Set a container's active flag. Returns `false` if it does not exist.
    pub fn set_active(&self, container: ObjectId, active: bool) -> bool {
        match self.graph.write().containers.get_mut(&container) {
            Some(node) => {
                node.active = active;
                true
            }
            None => false,
        }
    }

    /// Set a behavior's enabled flag. Returns `false` if it does not exist.
    pub fn set_enabled(&self, object: ObjectId, enabled: bool) -> bool {
        match self.graph.write().behaviors.get_mut(&object) {
            Some(behavior) => {
                behavior.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Destroy a single behavior. Returns `false` if it was already gone.
    pub fn destroy_behavior(&self, object: ObjectId) -> bool {
        let removed = self.graph.write().remove_behavior(object);
        match removed {
            Some(behavior) => {
                self.finish_removal(Removed {
                    containers: Vec::new(),
                    behaviors: vec![(object, behavior.key)],
                });
                true
            }
            None => false,
        }
    }

    /// Destroy a container with its descendants and behaviors. Returns `false` if it did not
    /// exist. The persistent root cannot be destroyed.
    pub fn destroy_container(&self, container: ObjectId) -> bool {
        if container == self.persistent_root {
            warn!("refusing to destroy the persistent root {container}");
            return false;
        }
        let removed = self.graph.write().remove_subtree(container);
        if removed.containers.is_empty() {
            return false;
        }
        self.finish_removal(removed);
        true
    }

    /// Destroy every root container except the persistent root, as a context transition
    /// would. Returns the number of containers destroyed.
    pub fn unload(&self) -> usize {
        let roots: Vec<_> = self
            .roots()
            .into_iter()
            .filter(|&root| root != self.persistent_root)
            .collect();

        let mut destroyed = 0;
        for root in roots {
            let removed = self.graph.write().remove_subtree(root);
            destroyed += removed.containers.len();
            self.finish_removal(removed);
        }
        debug!("unloaded {destroyed} containers");
        destroyed
    }

    /// Free handles and fire deactivation hooks. Must run without the graph lock held.
    ///
    /// Every removed behavior is reported; the registry ignores objects it does not hold.
    fn finish_removal(&self, removed: Removed) {
        for (object, key) in removed.behaviors {
            self.allocator.free(object);
            self.registry.deactivate_key(key, object);
        }
        for container in removed.containers {
            self.allocator.free(container);
        }
    }
}

impl Host for Scene {
    fn candidates<T: Singleton>(&self) -> Vec<Candidate<T>> {
        let key = VariantKey::of::<T>();
        let graph = self.graph.read();
        graph
            .walk()
            .into_iter()
            .filter(|visit| visit.behavior.key == key)
            .filter_map(|visit| {
                let value = Arc::clone(&visit.behavior.value).downcast::<T>().ok()?;
                Some(Candidate {
                    instance: Instance::new(visit.object, visit.behavior.container, &value),
                    enabled: visit.enabled,
                    precedence: Precedence(visit.order),
                })
            })
            .collect()
    }

    fn instantiate<T: Singleton>(&self) -> Option<Instance<T>> {
        let key = VariantKey::of::<T>();
        let container = self.spawn(key.short_name());
        debug!("instantiating singleton {key} in {container}");

        match self.attach_singleton(container, T::default()) {
            Ok((instance, Activation::Registered)) => Some(instance),
            _ => {
                self.destroy_container(container);
                None
            }
        }
    }

    fn is_alive(&self, object: ObjectId) -> bool {
        self.graph.read().contains(object)
    }

    fn remove_behavior(&self, object: ObjectId) {
        self.destroy_behavior(object);
    }

    fn remove_container(&self, container: ObjectId) {
        self.destroy_container(container);
    }

    fn persistent_root(&self) -> ObjectId {
        self.persistent_root
    }

    fn parent_of(&self, container: ObjectId) -> Option<ObjectId> {
        self.graph.read().containers.get(&container)?.parent
    }

    fn reparent(&self, container: ObjectId, parent: ObjectId) {
        let mut graph = self.graph.write();
        if !graph.containers.contains_key(&container) || !graph.containers.contains_key(&parent) {
            warn!("cannot move {container} under {parent}: container missing");
            return;
        }
        if graph.is_ancestor(container, parent) {
            warn!("cannot move {container} under its own descendant {parent}");
            return;
        }
        graph.reparent(container, parent);
    }
}
