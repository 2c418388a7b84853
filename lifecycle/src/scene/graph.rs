use std::{any::Any, collections::HashMap, sync::Arc};

use crate::{key::VariantKey, object::ObjectId};

/// A container in the hierarchy.
pub(super) struct Node {
    pub(super) name: String,
    pub(super) parent: Option<ObjectId>,
    pub(super) children: Vec<ObjectId>,
    pub(super) active: bool,
    pub(super) behaviors: Vec<ObjectId>,
}

impl Node {
    fn new(name: String, parent: Option<ObjectId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            active: true,
            behaviors: Vec::new(),
        }
    }
}

/// A behavior attached to a container.
pub(super) struct Behavior {
    pub(super) container: ObjectId,
    pub(super) enabled: bool,
    pub(super) key: VariantKey,
    pub(super) value: Arc<dyn Any + Send + Sync>,
}

/// A behavior visited during a pre-order walk.
pub(super) struct Visit<'a> {
    pub(super) object: ObjectId,
    pub(super) behavior: &'a Behavior,
    /// The behavior is enabled and every container up to the root is active.
    pub(super) enabled: bool,
    /// Position in traversal order.
    pub(super) order: u64,
}

/// Everything removed by a destroy call, for the caller to free and notify.
#[derive(Default)]
pub(super) struct Removed {
    pub(super) containers: Vec<ObjectId>,
    /// Behavior handles with their variant keys.
    pub(super) behaviors: Vec<(ObjectId, VariantKey)>,
}

/// The container hierarchy of a [`Scene`](super::Scene). Pure data; locking and lifecycle
/// hooks are the scene's job.
#[derive(Default)]
pub(super) struct Graph {
    pub(super) roots: Vec<ObjectId>,
    pub(super) containers: HashMap<ObjectId, Node>,
    pub(super) behaviors: HashMap<ObjectId, Behavior>,
}

impl Graph {
    pub(super) fn insert_container(
        &mut self,
        container: ObjectId,
        name: String,
        parent: Option<ObjectId>,
    ) {
        match parent.and_then(|parent| self.containers.get_mut(&parent)) {
            Some(node) => node.children.push(container),
            None => self.roots.push(container),
        }
        let parent = parent.filter(|parent| self.containers.contains_key(parent));
        self.containers.insert(container, Node::new(name, parent));
    }

    pub(super) fn insert_behavior(&mut self, object: ObjectId, behavior: Behavior) -> bool {
        let Some(node) = self.containers.get_mut(&behavior.container) else {
            return false;
        };
        node.behaviors.push(object);
        self.behaviors.insert(object, behavior);
        true
    }

    pub(super) fn contains(&self, object: ObjectId) -> bool {
        self.containers.contains_key(&object) || self.behaviors.contains_key(&object)
    }

    /// Returns `true` if `ancestor` is `container` or one of its ancestors.
    pub(super) fn is_ancestor(&self, ancestor: ObjectId, container: ObjectId) -> bool {
        let mut current = Some(container);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.containers.get(&id).and_then(|node| node.parent);
        }
        false
    }

    /// Unlink `container` from its parent (or the root list) without removing it.
    fn detach(&mut self, container: ObjectId) {
        let parent = self.containers.get(&container).and_then(|node| node.parent);
        let siblings = match parent.and_then(|parent| self.containers.get_mut(&parent)) {
            Some(node) => &mut node.children,
            None => &mut self.roots,
        };
        siblings.retain(|&child| child != container);
    }

    /// Move `container` to the end of `parent`'s children.
    pub(super) fn reparent(&mut self, container: ObjectId, parent: ObjectId) {
        self.detach(container);
        if let Some(node) = self.containers.get_mut(&parent) {
            node.children.push(container);
        }
        if let Some(node) = self.containers.get_mut(&container) {
            node.parent = Some(parent);
        }
    }

    pub(super) fn remove_behavior(&mut self, object: ObjectId) -> Option<Behavior> {
        let behavior = self.behaviors.remove(&object)?;
        if let Some(node) = self.containers.get_mut(&behavior.container) {
            node.behaviors.retain(|&b| b != object);
        }
        Some(behavior)
    }

    /// Remove `container`, its descendants and their behaviors.
    pub(super) fn remove_subtree(&mut self, container: ObjectId) -> Removed {
        let mut removed = Removed::default();
        if !self.containers.contains_key(&container) {
            return removed;
        }
        self.detach(container);

        let mut stack = vec![container];
        while let Some(id) = stack.pop() {
            let Some(node) = self.containers.remove(&id) else {
                continue;
            };
            for object in node.behaviors {
                if let Some(behavior) = self.behaviors.remove(&object) {
                    removed.behaviors.push((object, behavior.key));
                }
            }
            stack.extend(node.children);
            removed.containers.push(id);
        }
        removed
    }

    /// Walk every behavior in depth-first pre-order: roots in creation order, each container's
    /// behaviors in attach order before its children.
    pub(super) fn walk(&self) -> Vec<Visit<'_>> {
        let mut visits = Vec::new();
        let mut stack: Vec<(ObjectId, bool)> = self.roots.iter().rev().map(|&r| (r, true)).collect();

        while let Some((id, parent_active)) = stack.pop() {
            let Some(node) = self.containers.get(&id) else {
                continue;
            };
            let active = parent_active && node.active;
            for &object in &node.behaviors {
                if let Some(behavior) = self.behaviors.get(&object) {
                    visits.push(Visit {
                        object,
                        behavior,
                        enabled: active && behavior.enabled,
                        order: visits.len() as u64,
                    });
                }
            }
            stack.extend(node.children.iter().rev().map(|&child| (child, active)));
        }
        visits
    }
}
