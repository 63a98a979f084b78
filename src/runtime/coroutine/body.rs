//! The body side of a coroutine
//!
//! A compiled body receives a `BodyContext` and uses it to suspend, to
//! delegate to another awaitable and to reach its inputs.

use super::channel::Transfer;
use super::errors::{CoroResult, CoroutineError};
use super::lifecycle::WeakCoroutine;
use super::{Coroutine, CoroutineWrapper};
use crate::runtime::exception::Exception;
use crate::runtime::fiber::Suspend;
use crate::runtime::frame::{CodeRef, Frame};
use crate::runtime::thread_state;
use crate::runtime::value::{ClosureCell, Value};

/// Something an `await` can delegate to.
pub trait Awaitable {
    fn send(
        &self,
        value: Value,
    ) -> CoroResult<Value>;

    fn throw_exception(
        &self,
        exception: Exception,
    ) -> CoroResult<Value>;

    fn close(&self) -> CoroResult<Value>;
}

impl Awaitable for Coroutine {
    fn send(
        &self,
        value: Value,
    ) -> CoroResult<Value> {
        Coroutine::send(self, value)
    }

    fn throw_exception(
        &self,
        exception: Exception,
    ) -> CoroResult<Value> {
        Coroutine::throw_exception(self, exception)
    }

    fn close(&self) -> CoroResult<Value> {
        Coroutine::close(self)
    }
}

impl Awaitable for CoroutineWrapper {
    fn send(
        &self,
        value: Value,
    ) -> CoroResult<Value> {
        CoroutineWrapper::send(self, value)
    }

    fn throw_exception(
        &self,
        exception: Exception,
    ) -> CoroResult<Value> {
        CoroutineWrapper::throw_exception(self, exception)
    }

    fn close(&self) -> CoroResult<Value> {
        CoroutineWrapper::close(self)
    }
}

/// Resolve the delegate behind an awaited value.
fn awaitable_of(value: &Value) -> CoroResult<Box<dyn Awaitable>> {
    match value {
        Value::Coroutine(c) => Ok(Box::new(c.clone())),
        Value::CoroutineWrapper(w) => Ok(Box::new(w.clone())),
        other => Err(CoroutineError::NotAwaitable(other.type_name()).into()),
    }
}

/// Handed to a compiled body for the duration of its run.
pub struct BodyContext<'a> {
    suspender: &'a dyn Suspend<Transfer, Value>,
    coroutine: WeakCoroutine,
    code: CodeRef,
    frame: Frame,
}

impl<'a> BodyContext<'a> {
    pub(super) fn new(
        suspender: &'a dyn Suspend<Transfer, Value>,
        coroutine: WeakCoroutine,
        code: CodeRef,
        frame: Frame,
    ) -> Self {
        Self {
            suspender,
            coroutine,
            code,
            frame,
        }
    }

    /// Suspend, handing `value` to the driver.
    ///
    /// Returns the next sent value, or `Err` with the exception thrown in
    /// by `throw`/`close`.
    pub fn yield_value(
        &mut self,
        value: Value,
    ) -> CoroResult<Value> {
        self.suspender.suspend(value).into_result()
    }

    /// `await awaitable`: delegate until it completes.
    ///
    /// Values the delegate yields go straight to our driver, and what the
    /// driver sends or throws goes straight to the delegate. On GeneratorExit
    /// the delegate is closed and the exit re-raised here. `cr_await` shows
    /// the delegate for the whole delegation.
    pub fn await_on(
        &mut self,
        awaitable: &Value,
    ) -> CoroResult<Value> {
        let delegate = awaitable_of(awaitable)?;
        // No strong handle may live on this stack across a suspension.
        if let Some(c) = self.coroutine() {
            c.inner.awaiting.replace(Some(awaitable.clone()));
        }

        let result = self.delegate(delegate.as_ref());

        if let Some(c) = self.coroutine() {
            c.inner.awaiting.take();
        }
        result
    }

    fn delegate(
        &mut self,
        delegate: &dyn Awaitable,
    ) -> CoroResult<Value> {
        let mut step = delegate.send(Value::None);
        loop {
            let yielded = match step {
                Ok(value) => value,
                Err(e) if e.is_stop_iteration() => return Ok(e.stop_value()),
                Err(e) => return Err(e),
            };

            let transfer = self.suspender.suspend(yielded);
            step = match transfer.exception {
                None => delegate.send(transfer.value),
                Some(pending) => {
                    let exception = pending.into_exception();
                    if exception.is_generator_exit() {
                        delegate.close()?;
                        return Err(exception);
                    }
                    delegate.throw_exception(exception)
                }
            };
        }
    }

    /// Positional parameter `index`, while the body runs.
    pub fn parameter(
        &self,
        index: usize,
    ) -> Option<Value> {
        let coroutine = self.coroutine()?;
        let value = coroutine.inner.store.borrow().parameter(index);
        value
    }

    /// Closure cell `index`.
    pub fn closure_cell(
        &self,
        index: usize,
    ) -> Option<ClosureCell> {
        let coroutine = self.coroutine()?;
        let cell = coroutine.inner.store.borrow().closure_cell(index);
        cell
    }

    /// A strong handle to the running coroutine, unless it is being torn down.
    pub fn coroutine(&self) -> Option<Coroutine> {
        self.coroutine.upgrade()
    }

    #[inline]
    pub fn code(&self) -> &CodeRef {
        &self.code
    }

    #[inline]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Record the line about to execute.
    pub fn set_line(
        &self,
        line: u32,
    ) {
        self.frame.set_lineno(line);
    }

    pub fn handled_exception(&self) -> Option<Exception> {
        thread_state::handled_exception()
    }

    /// Enter an `except` block for `exception`; returns what to restore.
    pub fn enter_handler(
        &self,
        exception: Exception,
    ) -> Option<Exception> {
        thread_state::set_handled_exception(Some(exception))
    }

    /// Leave an `except` block entered with `enter_handler`.
    pub fn leave_handler(
        &self,
        previous: Option<Exception>,
    ) {
        let current = thread_state::set_handled_exception(previous);
        drop(current);
    }
}
