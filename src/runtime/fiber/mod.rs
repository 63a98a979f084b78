//! Fiber primitive
//!
//! An opaque capability to create an independent native stack, switch into
//! it and release it. The coroutine engine never inspects stack contents; it
//! only hands a value in, gets a value (or the body's completion) back, and
//! eventually releases the stack.
//!
//! The default implementation is backed by `corosensei`, whose stacks carry
//! a guard page and whose suspended stacks are unwound safely when released.

use std::fmt;

use corosensei::stack::DefaultStack;
use corosensei::{Coroutine as NativeCoroutine, CoroutineResult, Yielder};
use thiserror::Error;
use tracing::trace;

/// Fiber primitive errors
#[derive(Debug, Error)]
pub enum FiberError {
    #[error("failed to allocate a fiber stack of {size} bytes: {source}")]
    StackAllocation {
        /// Requested stack size
        size: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("fiber has already been released")]
    Released,

    #[error("fiber has already completed")]
    Completed,
}

/// Outcome of one switch into a fiber.
#[derive(Debug)]
pub enum Switch<Y, R> {
    /// The fiber suspended itself, handing out a value.
    Suspended(Y),
    /// The entry point returned.
    Completed(R),
}

/// The side of the switch that runs on the fiber: suspends back to whoever
/// switched in.
pub trait Suspend<I, Y> {
    fn suspend(
        &self,
        value: Y,
    ) -> I;
}

impl<I, Y> Suspend<I, Y> for Yielder<I, Y> {
    fn suspend(
        &self,
        value: Y,
    ) -> I {
        Yielder::suspend(self, value)
    }
}

/// Entry point run on the new stack: gets the suspender and the first input.
pub type EntryPoint<I, Y, R> = Box<dyn FnOnce(&dyn Suspend<I, Y>, I) -> R>;

/// A created execution context.
pub trait Fiber<I, Y, R> {
    /// Transfer control into the fiber until it suspends or completes.
    fn switch_into(
        &mut self,
        input: I,
    ) -> Result<Switch<Y, R>, FiberError>;

    fn is_started(&self) -> bool;

    fn is_completed(&self) -> bool;

    /// Free the native stack. Idempotent.
    fn release(&mut self);
}

/// Creates fibers bound to an entry point.
pub trait FiberFactory<I, Y, R> {
    fn create(
        &self,
        entry: EntryPoint<I, Y, R>,
    ) -> Result<Box<dyn Fiber<I, Y, R>>, FiberError>;
}

/// Default stack size for coroutine fibers.
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

/// A fiber running on its own guard-paged native stack.
pub struct StackFiber<I, Y, R> {
    native: Option<NativeCoroutine<I, Y, R, DefaultStack>>,
    stack_size: usize,
}

impl<I: 'static, Y: 'static, R: 'static> StackFiber<I, Y, R> {
    /// Allocate a stack of `stack_size` bytes and bind `entry` to it.
    pub fn create(
        stack_size: usize,
        entry: EntryPoint<I, Y, R>,
    ) -> Result<Self, FiberError> {
        let stack = DefaultStack::new(stack_size).map_err(|source| FiberError::StackAllocation {
            size: stack_size,
            source,
        })?;
        let native = NativeCoroutine::with_stack(stack, move |yielder: &Yielder<I, Y>, input: I| {
            entry(yielder, input)
        });
        trace!(stack_size, "fiber created");
        Ok(Self {
            native: Some(native),
            stack_size,
        })
    }

    #[inline]
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }
}

impl<I, Y, R> Fiber<I, Y, R> for StackFiber<I, Y, R> {
    fn switch_into(
        &mut self,
        input: I,
    ) -> Result<Switch<Y, R>, FiberError> {
        let native = self.native.as_mut().ok_or(FiberError::Released)?;
        if native.done() {
            return Err(FiberError::Completed);
        }
        Ok(match native.resume(input) {
            CoroutineResult::Yield(value) => Switch::Suspended(value),
            CoroutineResult::Return(result) => Switch::Completed(result),
        })
    }

    fn is_started(&self) -> bool {
        self.native.as_ref().is_some_and(|n| n.started())
    }

    fn is_completed(&self) -> bool {
        self.native.as_ref().map_or(true, |n| n.done())
    }

    fn release(&mut self) {
        // Dropping a suspended native coroutine unwinds its stack first.
        if let Some(native) = self.native.take() {
            trace!(
                stack_size = self.stack_size,
                suspended = native.started() && !native.done(),
                "fiber released"
            );
            drop(native);
        }
    }
}

impl<I, Y, R> Drop for StackFiber<I, Y, R> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<I, Y, R> fmt::Debug for StackFiber<I, Y, R> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("StackFiber")
            .field("stack_size", &self.stack_size)
            .field("started", &self.is_started())
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// Factory producing `StackFiber`s of a fixed stack size.
#[derive(Debug, Clone, Copy)]
pub struct StackFiberFactory {
    stack_size: usize,
}

impl StackFiberFactory {
    pub fn new(stack_size: usize) -> Self {
        Self { stack_size }
    }

    #[inline]
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }
}

impl Default for StackFiberFactory {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_SIZE)
    }
}

impl<I: 'static, Y: 'static, R: 'static> FiberFactory<I, Y, R> for StackFiberFactory {
    fn create(
        &self,
        entry: EntryPoint<I, Y, R>,
    ) -> Result<Box<dyn Fiber<I, Y, R>>, FiberError> {
        Ok(Box::new(StackFiber::create(self.stack_size, entry)?))
    }
}

#[cfg(test)]
mod tests;
