//! Cyclic collector cooperation
//!
//! Objects that may participate in reference cycles enroll in a per-thread
//! registry for their whole lifetime and expose their owned children
//! through `Trace`. The registry does not reclaim anything itself; it is
//! the seam an external tracing collector hooks into.

use std::cell::RefCell;

use hashbrown::HashMap;
use tracing::trace;

use crate::runtime::coroutine::Coroutine;
use crate::runtime::exception::Exception;
use crate::runtime::frame::Frame;
use crate::runtime::value::{ClosureCell, Value};

/// Identity of a tracked object (its heap address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub usize);

impl ObjectId {
    /// Identity of the allocation behind `ptr`.
    pub fn of<T: ?Sized>(ptr: *const T) -> Self {
        ObjectId(ptr as *const () as usize)
    }
}

/// A child reported during traversal.
#[derive(Clone, Copy)]
pub enum GcRef<'a> {
    Value(&'a Value),
    Cell(&'a ClosureCell),
    Frame(&'a Frame),
    Exception(&'a Exception),
    Coroutine(&'a Coroutine),
}

impl GcRef<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            GcRef::Value(v) => v.type_name(),
            GcRef::Cell(_) => "cell",
            GcRef::Frame(_) => "frame",
            GcRef::Exception(_) => "exception",
            GcRef::Coroutine(_) => "compiled_coroutine",
        }
    }
}

/// Enumerate owned children for a tracing collector.
pub trait Trace {
    fn trace(
        &self,
        visit: &mut dyn FnMut(GcRef<'_>),
    );
}

/// Registry statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    /// Objects currently tracked.
    pub tracked: usize,
    /// Objects ever tracked.
    pub total_tracked: usize,
    /// Objects untracked at teardown.
    pub total_untracked: usize,
}

#[derive(Default)]
struct Registry {
    objects: HashMap<ObjectId, &'static str>,
    stats: GcStats,
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::default());
}

/// Enroll an object.
pub fn track(
    id: ObjectId,
    kind: &'static str,
) {
    REGISTRY.with(|r| {
        let mut r = r.borrow_mut();
        if r.objects.insert(id, kind).is_none() {
            r.stats.total_tracked += 1;
        }
        r.stats.tracked = r.objects.len();
    });
    trace!(id = id.0, kind, "gc track");
}

/// Withdraw an object; returns false if it was not tracked.
pub fn untrack(id: ObjectId) -> bool {
    let removed = REGISTRY.with(|r| {
        let mut r = r.borrow_mut();
        let removed = r.objects.remove(&id).is_some();
        if removed {
            r.stats.total_untracked += 1;
        }
        r.stats.tracked = r.objects.len();
        removed
    });
    trace!(id = id.0, removed, "gc untrack");
    removed
}

pub fn is_tracked(id: ObjectId) -> bool {
    REGISTRY.with(|r| r.borrow().objects.contains_key(&id))
}

pub fn tracked_count() -> usize {
    REGISTRY.with(|r| r.borrow().objects.len())
}

pub fn stats() -> GcStats {
    REGISTRY.with(|r| r.borrow().stats)
}

/// Kinds of the children `object` reports, in traversal order.
pub fn children_of(object: &dyn Trace) -> Vec<&'static str> {
    let mut kinds = Vec::new();
    object.trace(&mut |child| kinds.push(child.kind()));
    kinds
}
