//! Per-thread ambient state
//!
//! Everything a native driver and a coroutine body implicitly share lives
//! here: the "currently raised" error slot, the "currently handled"
//! exception shadow, the top of the frame stack and the unraisable-error
//! hook. The coroutine engine saves and restores these around every fiber
//! switch; nothing else touches them implicitly.
//!
//! Values replaced in the state are always dropped after the thread-local
//! borrow ends, since dropping a coroutine may run its finalizer, which in
//! turn consults this state.

use std::cell::RefCell;
use std::fmt;

use tracing::warn;

use crate::runtime::exception::{Exception, PendingException};
use crate::runtime::frame::{CodeRef, Frame};

/// Receives errors that cannot be propagated to any caller.
pub type UnraisableHook = Box<dyn FnMut(&UnraisableReport)>;

/// An error raised during finalization or teardown.
#[derive(Clone)]
pub struct UnraisableReport {
    /// repr of the object being finalized
    pub object: String,
    /// The swallowed exception
    pub exception: Exception,
}

impl fmt::Debug for UnraisableReport {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("UnraisableReport")
            .field("object", &self.object)
            .field("exception", &self.exception)
            .finish()
    }
}

/// The ambient state of one thread.
#[derive(Default)]
pub struct ThreadState {
    error: Option<PendingException>,
    handled: Option<Exception>,
    frame: Option<Frame>,
    unraisable_hook: Option<UnraisableHook>,
}

thread_local! {
    static STATE: RefCell<ThreadState> = RefCell::new(ThreadState::default());
}

fn with_state<R>(f: impl FnOnce(&mut ThreadState) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

// ---------------------------------------------------------------------------
// Error slot
// ---------------------------------------------------------------------------

/// Take the currently raised error, leaving the slot empty.
pub fn fetch_error() -> Option<PendingException> {
    with_state(|ts| ts.error.take())
}

/// Put back a previously fetched error (or clear the slot with `None`).
pub fn restore_error(error: Option<PendingException>) {
    let previous = with_state(|ts| std::mem::replace(&mut ts.error, error));
    drop(previous);
}

/// Raise `exception` into the ambient slot.
pub fn set_error(exception: Exception) {
    restore_error(Some(PendingException::from_exception(exception)));
}

pub fn error_occurred() -> bool {
    with_state(|ts| ts.error.is_some())
}

/// Peek at the currently raised error without clearing it.
pub fn current_error() -> Option<PendingException> {
    with_state(|ts| ts.error.clone())
}

// ---------------------------------------------------------------------------
// Handled-exception shadow
// ---------------------------------------------------------------------------

/// The exception being handled by the innermost active `except` block.
pub fn handled_exception() -> Option<Exception> {
    with_state(|ts| ts.handled.clone())
}

/// Replace the handled exception, returning the previous one.
pub fn set_handled_exception(exception: Option<Exception>) -> Option<Exception> {
    with_state(|ts| std::mem::replace(&mut ts.handled, exception))
}

// ---------------------------------------------------------------------------
// Frame stack
// ---------------------------------------------------------------------------

pub fn current_frame() -> Option<Frame> {
    with_state(|ts| ts.frame.clone())
}

/// Install a new top frame, returning the previous top.
pub fn set_current_frame(frame: Option<Frame>) -> Option<Frame> {
    with_state(|ts| std::mem::replace(&mut ts.frame, frame))
}

/// Enter a plain (non-coroutine) activation of `code`.
pub fn push_frame(code: CodeRef) -> Frame {
    let frame = Frame::new(code);
    frame.set_back(current_frame());
    set_current_frame(Some(frame.clone()));
    frame
}

/// Leave the top activation, restoring its caller.
pub fn pop_frame() -> Option<Frame> {
    let top = current_frame()?;
    let caller = top.set_back(None);
    set_current_frame(caller);
    Some(top)
}

/// Number of frames on this thread's stack.
pub fn frame_depth() -> usize {
    current_frame().map(|f| f.depth()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Unraisable channel
// ---------------------------------------------------------------------------

/// Install a hook receiving unraisable errors, returning the previous one.
pub fn set_unraisable_hook(hook: Option<UnraisableHook>) -> Option<UnraisableHook> {
    with_state(|ts| std::mem::replace(&mut ts.unraisable_hook, hook))
}

/// Report an error that has no caller to propagate to.
///
/// The hook runs outside the state borrow, so it may itself use the ambient
/// state (or even drop coroutines).
pub fn write_unraisable(
    object: impl Into<String>,
    exception: Exception,
) {
    let report = UnraisableReport {
        object: object.into(),
        exception,
    };
    match with_state(|ts| ts.unraisable_hook.take()) {
        Some(mut hook) => {
            hook(&report);
            with_state(|ts| {
                if ts.unraisable_hook.is_none() {
                    ts.unraisable_hook = Some(hook);
                }
            });
        }
        None => {
            warn!(
                object = %report.object,
                "Exception ignored in finalizer: {}",
                report.exception
            );
        }
    }
}

#[cfg(test)]
mod tests;
