//! Handles for host-owned objects.
//!
//! Every object the registries talk about (a behavior attached to a container, or the
//! container itself) is owned by the host. The registries only ever hold an [`ObjectId`],
//! a lightweight handle combining a slot [`Id`] and a [`Generation`].
//!
//! # Generation Tracking
//!
//! When a host frees an object, the slot's generation is bumped before the id goes back into
//! the dead pool. A handle captured before the free keeps the old generation, so it can never
//! be confused with whatever object reuses the slot later:
//!
//! ```rust,ignore
//! let first = allocator.alloc();  // ObjectId { id: 0, generation: 0 }
//! allocator.free(first);
//! let reused = allocator.alloc(); // ObjectId { id: 0, generation: 1 }
//! assert!(!allocator.is_current(first));
//! ```
//!
//! This is what lets the singleton registry detect stale entries without owning the objects.

use std::{
    fmt,
    sync::{
        RwLock,
        atomic::{AtomicU32, Ordering},
    },
};

use crossbeam::queue::SegQueue;

/// The generation of an object slot. Starts at `FIRST` and is incremented every time the slot
/// is freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u32);

impl Generation {
    /// The first generation of a slot.
    const FIRST: Self = Self(0);

    /// Get the next generation from the current.
    #[inline]
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// The slot identifier of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl From<u32> for Id {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A non-owning handle to a host object.
///
/// Handles are ordered by id and then generation, which gives the registries a stable
/// secondary key when the host reports equal precedence for two objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    id: Id,
    generation: Generation,
}

impl ObjectId {
    /// Construct a handle for a fresh slot. Primarily used for testing.
    #[inline]
    pub fn new(id: impl Into<Id>) -> Self {
        Self::new_with_generation(id.into(), Generation::FIRST)
    }

    #[inline]
    pub(crate) const fn new_with_generation(id: Id, generation: Generation) -> Self {
        Self { id, generation }
    }

    /// Get the slot id of this handle.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the generation of this handle.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.id.0, self.generation.0)
    }
}

const CHUNK_SIZE: usize = 1024;

/// Growable array of atomic generations, indexed by slot id.
#[derive(Default, Debug)]
struct Generations {
    chunks: RwLock<Vec<Box<[AtomicU32; CHUNK_SIZE]>>>,
}

impl Generations {
    const fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }

    fn get(&self, id: Id) -> Generation {
        let chunk_idx = id.0 as usize / CHUNK_SIZE;
        let slot_idx = id.0 as usize % CHUNK_SIZE;

        let chunks = self.chunks.read().unwrap_or_else(|e| e.into_inner());
        Generation(if chunk_idx < chunks.len() {
            chunks[chunk_idx][slot_idx].load(Ordering::Acquire)
        } else {
            0
        })
    }

    fn increment(&self, id: Id) {
        self.ensure_capacity(id);
        let chunk_idx = id.0 as usize / CHUNK_SIZE;
        let slot_idx = id.0 as usize % CHUNK_SIZE;

        let chunks = self.chunks.read().unwrap_or_else(|e| e.into_inner());
        chunks[chunk_idx][slot_idx].fetch_add(1, Ordering::Release);
    }

    fn ensure_capacity(&self, id: Id) {
        let chunk_idx = id.0 as usize / CHUNK_SIZE;
        let chunks_len = self.chunks.read().unwrap_or_else(|e| e.into_inner()).len();

        if chunk_idx >= chunks_len {
            let mut chunks = self.chunks.write().unwrap_or_else(|e| e.into_inner());
            while chunks.len() <= chunk_idx {
                chunks.push(Box::new(std::array::from_fn(|_| AtomicU32::new(0))));
            }
        }
    }
}

/// Allocates object handles for a host, recycling freed slots.
///
/// All operations take `&self`: a host may allocate from whichever thread fires the
/// lifecycle callback.
#[derive(Default, Debug)]
pub struct Allocator {
    generations: Generations,
    dead_pool: SegQueue<Id>,
    next_id: AtomicU32,
}

impl Allocator {
    /// Construct a new allocator starting from slot 0.
    #[inline]
    pub const fn new() -> Self {
        Self {
            generations: Generations::new(),
            dead_pool: SegQueue::new(),
            next_id: AtomicU32::new(0),
        }
    }

    /// Allocate a handle, reusing a freed slot when one is available.
    pub fn alloc(&self) -> ObjectId {
        if let Some(id) = self.dead_pool.pop() {
            return ObjectId::new_with_generation(id, self.generations.get(id));
        }

        let id = Id(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.generations.ensure_capacity(id);
        ObjectId::new(id)
    }

    /// Free a handle. Its slot's generation is bumped so the handle goes stale.
    ///
    /// Freeing a handle that is already stale is ignored.
    pub fn free(&self, object: ObjectId) {
        if !self.is_current(object) {
            return;
        }
        self.generations.increment(object.id());
        self.dead_pool.push(object.id());
    }

    /// Returns `true` if `object` was handed out by this allocator and has not been freed.
    pub fn is_current(&self, object: ObjectId) -> bool {
        object.id.0 < self.next_id.load(Ordering::Relaxed)
            && self.generations.get(object.id()) == object.generation()
    }
}
