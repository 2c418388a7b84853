//! Reference-counted GUID to canonical source mapping.
//!
//! Each guid moves through a small state machine:
//!
//! ```text
//! Absent --acquire(S)--> Active(1, S)
//! Active(n) --acquire--> Active(n + 1)      source unchanged
//! Active(n) --release--> Active(n - 1)      n > 1
//! Active(1) --release--> Absent             entry dropped
//! Absent --release--> Absent                no-op
//! ```
//!
//! Acquire and release are single `DashMap` entry operations, so the registry can be shared
//! between threads like the singleton registry.

use std::{any::Any, sync::Arc};

use dashmap::{DashMap, mapref::entry::Entry};
use log::{debug, warn};

use crate::identity::Guid;

struct IdentityEntry {
    source: Arc<dyn Any + Send + Sync>,
    ref_count: usize,
}

/// Maps guids to the first object registered under them.
#[derive(Default)]
pub struct IdentityRegistry {
    entries: DashMap<Guid, IdentityEntry>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical source registered under `guid`, or `None` if no holder is active.
    ///
    /// Also `None` if the source is not a `T`.
    ///
    /// # Panics
    ///
    /// Panics if `guid` is empty.
    pub fn resolve<T: Send + Sync + 'static>(&self, guid: &str) -> Option<Arc<T>> {
        assert!(!guid.is_empty(), "cannot resolve an empty guid");
        let source = Arc::clone(&self.entries.get(guid)?.source);
        match source.downcast::<T>() {
            Ok(source) => Some(source),
            Err(_) => {
                warn!(
                    "source for guid {guid} is not a {}",
                    std::any::type_name::<T>()
                );
                None
            }
        }
    }

    /// Record an active holder of `guid`. The first holder becomes the canonical source;
    /// later holders only raise the count. Returns the new count.
    pub fn acquire<T: Send + Sync + 'static>(&self, guid: &Guid, source: Arc<T>) -> usize {
        match self.entries.entry(guid.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.ref_count += 1;
                entry.ref_count
            }
            Entry::Vacant(vacant) => {
                vacant.insert(IdentityEntry {
                    source,
                    ref_count: 1,
                });
                debug!("registered canonical source for guid {guid}");
                1
            }
        }
    }

    /// Drop an active holder of `guid`. The entry goes away with its last holder. Releasing
    /// an unknown guid does nothing. Returns the remaining count.
    pub fn release(&self, guid: &Guid) -> usize {
        match self.entries.entry(guid.clone()) {
            Entry::Occupied(mut occupied) if occupied.get().ref_count > 1 => {
                let entry = occupied.get_mut();
                entry.ref_count -= 1;
                entry.ref_count
            }
            Entry::Occupied(occupied) => {
                occupied.remove();
                debug!("dropped canonical source for guid {guid}");
                0
            }
            Entry::Vacant(_) => 0,
        }
    }

    /// Move a holder from `old` to `new`: a release of `old` followed by an acquire of `new`.
    /// Returns the count of `new`.
    pub fn reassign<T: Send + Sync + 'static>(
        &self,
        old: &Guid,
        new: &Guid,
        source: Arc<T>,
    ) -> usize {
        self.release(old);
        self.acquire(new, source)
    }

    /// The number of active holders of `guid`.
    pub fn ref_count(&self, guid: &str) -> usize {
        self.entries.get(guid).map_or(0, |entry| entry.ref_count)
    }

    #[inline]
    pub fn contains(&self, guid: &str) -> bool {
        self.entries.contains_key(guid)
    }

    /// The number of guids with at least one active holder.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Intended for test isolation.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
