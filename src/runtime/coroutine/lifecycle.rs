//! Finalization and teardown
//!
//! Releasing a coroutine happens in two phases:
//!
//! 1. Logical close, when the last strong handle of a started coroutine is
//!    dropped: the coroutine is closed while the handle still keeps it
//!    alive. Errors go to the unraisable channel. If the body stored a new
//!    handle somewhere while closing, the coroutine survives. This runs at
//!    most once per coroutine.
//! 2. Physical release, when the object itself is freed: a coroutine still
//!    suspended is closed once more (a revived one included), then parameters,
//!    closure cells, frame and fiber stack are released in that order and
//!    the collector stops tracking it.
//!
//! Neither phase lets an error escape or disturbs the ambient error state.

use std::rc::{Rc, Weak};

use tracing::debug;

use super::{Coroutine, CoroutineObject, CoroutineStatus};
use crate::runtime::gc::{self, GcRef, Trace};
use crate::runtime::thread_state;

impl CoroutineObject {
    /// Started, not yet finished and not switched in right now.
    fn is_suspended(&self) -> bool {
        self.status.get() == CoroutineStatus::Running && !self.running.get()
    }

    /// Close on behalf of a releaser that has nobody to report to.
    fn close_unraisable(&self) {
        self.finalized.set(true);
        let saved = thread_state::fetch_error();
        if let Err(e) = self.close() {
            thread_state::write_unraisable(self.repr(), e);
        }
        thread_state::restore_error(saved);
    }
}

impl Drop for Coroutine {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) != 1 || self.inner.finalized.get() || !self.inner.is_suspended() {
            return;
        }
        debug!(qualname = %self.inner.qualname.borrow(), "finalizing unclosed coroutine");
        self.inner.close_unraisable();
        if Rc::strong_count(&self.inner) > 1 {
            debug!(qualname = %self.inner.qualname.borrow(), "coroutine revived during finalization");
        }
    }
}

impl Drop for CoroutineObject {
    fn drop(&mut self) {
        let saved = thread_state::fetch_error();

        // Runs even after a finalization that revived the coroutine.
        if self.is_suspended() {
            self.close_unraisable();
        }

        let store = self.store.get_mut();
        store.release_parameters();
        store.release_closure();
        self.frame.get_mut().take();
        if let Some(mut fiber) = self.fiber.get_mut().take() {
            fiber.release();
        }

        gc::untrack(self.id);
        debug!(qualname = %self.qualname.get_mut(), "coroutine released");
        thread_state::restore_error(saved);
    }
}

impl Trace for Coroutine {
    fn trace(
        &self,
        visit: &mut dyn FnMut(GcRef<'_>),
    ) {
        let object = &self.inner;
        if !object.report_children {
            return;
        }
        object.store.borrow().trace(visit);
        if let Some(frame) = object.frame.borrow().as_ref() {
            visit(GcRef::Frame(frame));
        }
        if let Some(awaited) = object.awaiting.borrow().as_ref() {
            visit(GcRef::Value(awaited));
        }
        if let Some(value) = object.pending.borrow().as_ref().and_then(|p| p.value()) {
            visit(GcRef::Exception(value));
        }
    }
}

/// A non-owning reference to a coroutine.
#[derive(Clone)]
pub struct WeakCoroutine(Weak<CoroutineObject>);

impl WeakCoroutine {
    pub(super) fn from_object(object: Weak<CoroutineObject>) -> Self {
        WeakCoroutine(object)
    }

    /// A strong handle, unless the coroutine has been torn down.
    pub fn upgrade(&self) -> Option<Coroutine> {
        self.0.upgrade().map(|inner| Coroutine { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl std::fmt::Debug for WeakCoroutine {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("WeakCoroutine")
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl Coroutine {
    pub fn downgrade(&self) -> WeakCoroutine {
        WeakCoroutine(Rc::downgrade(&self.inner))
    }
}
