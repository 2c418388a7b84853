use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::object::ObjectId;

/// A non-owning reference to a live singleton behavior.
///
/// The host owns the behavior value; an `Instance` only remembers where it lives and holds a
/// [`Weak`] to it. Two instances are equal when they name the same behavior object.
pub struct Instance<T> {
    object: ObjectId,
    container: ObjectId,
    value: Weak<T>,
}

impl<T> Instance<T> {
    /// Construct an instance from the host's strong reference.
    pub fn new(object: ObjectId, container: ObjectId, value: &Arc<T>) -> Self {
        Self {
            object,
            container,
            value: Arc::downgrade(value),
        }
    }

    pub(crate) fn from_weak(object: ObjectId, container: ObjectId, value: Weak<T>) -> Self {
        Self {
            object,
            container,
            value,
        }
    }

    pub(crate) fn weak(&self) -> Weak<T> {
        Weak::clone(&self.value)
    }

    /// The behavior object.
    #[inline]
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// The container the behavior is attached to.
    #[inline]
    pub fn container(&self) -> ObjectId {
        self.container
    }

    /// Get the behavior value, if the host still holds it.
    #[inline]
    pub fn upgrade(&self) -> Option<Arc<T>> {
        self.value.upgrade()
    }

    /// Returns `true` while the host still holds the behavior value.
    #[inline]
    pub fn is_held(&self) -> bool {
        self.value.strong_count() > 0
    }
}

impl<T> Clone for Instance<T> {
    fn clone(&self) -> Self {
        Self {
            object: self.object,
            container: self.container,
            value: Weak::clone(&self.value),
        }
    }
}

impl<T> PartialEq for Instance<T> {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object
    }
}

impl<T> Eq for Instance<T> {}

impl<T> fmt::Debug for Instance<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("object", &self.object)
            .field("container", &self.container)
            .finish()
    }
}

/// Host-defined structural precedence. Lower values come first in traversal order and win
/// when several candidates are eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Precedence(pub u64);

/// A live object of a singleton variant, as reported by the host during a scan.
pub struct Candidate<T> {
    pub instance: Instance<T>,
    pub enabled: bool,
    pub precedence: Precedence,
}

impl<T> fmt::Debug for Candidate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("instance", &self.instance)
            .field("enabled", &self.enabled)
            .field("precedence", &self.precedence)
            .finish()
    }
}

impl<T> Candidate<T> {
    /// The ordering key used to pick among eligible candidates. The object handle breaks ties
    /// so the choice never depends on enumeration order.
    #[inline]
    pub(crate) fn rank(&self) -> (Precedence, ObjectId) {
        (self.precedence, self.instance.object())
    }
}
