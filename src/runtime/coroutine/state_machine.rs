//! The send/throw/close protocol
//!
//! Every request goes through `send`: `throw` primes a pending exception and
//! resumes with no value, `close` throws GeneratorExit. Around each switch
//! the coroutine frame is spliced on top of the driver's frame stack and the
//! ambient error state is swapped, and both are put back on the way out,
//! including when the body panics.

use tracing::{debug, trace, warn};

use super::channel::{self, AmbientSnapshot, Transfer};
use super::errors::{CoroResult, CoroutineError};
use super::{Coroutine, CoroutineObject, CoroutineStatus};
use crate::runtime::exception::{Exception, ExceptionClass, PendingException};
use crate::runtime::fiber::{EntryPoint, Switch};
use crate::runtime::frame::{BodyResult, Frame};
use crate::runtime::thread_state;
use crate::runtime::value::Value;

use super::body::BodyContext;
use super::lifecycle::WeakCoroutine;

/// Frame linkage and ambient state for one switch into the fiber.
struct SwitchGuard<'a> {
    object: &'a CoroutineObject,
    frame: Frame,
    caller: Option<Frame>,
    ambient: Option<AmbientSnapshot>,
    returned: bool,
}

impl<'a> SwitchGuard<'a> {
    fn enter(
        object: &'a CoroutineObject,
        frame: Frame,
    ) -> Self {
        let caller = thread_state::set_current_frame(Some(frame.clone()));
        frame.set_back(caller.clone());
        let ambient = channel::enter(object.exc_state.take());
        object.running.set(true);
        trace!(qualname = %object.qualname.borrow(), "switch into coroutine");
        Self {
            object,
            frame,
            caller,
            ambient: Some(ambient),
            returned: false,
        }
    }

    /// Control came back from the fiber normally.
    fn leave(mut self) {
        self.returned = true;
    }
}

impl Drop for SwitchGuard<'_> {
    fn drop(&mut self) {
        self.object.running.set(false);
        if let Some(ambient) = self.ambient.take() {
            let handled = channel::leave(ambient);
            self.object.exc_state.replace(handled);
        }
        self.frame.set_back(None);
        let ours = thread_state::set_current_frame(self.caller.take());
        drop(ours);

        if !self.returned {
            // The body panicked through the switch; its fiber is gone.
            warn!(qualname = %self.object.qualname.borrow(), "coroutine body panicked");
            self.object.finish();
        }
    }
}

impl CoroutineObject {
    pub(super) fn send(
        &self,
        value: Value,
    ) -> CoroResult<Value> {
        let status = self.status.get();
        if status == CoroutineStatus::Unused && !value.is_none() {
            return Err(CoroutineError::SendToUnstarted.into());
        }
        if status == CoroutineStatus::Finished {
            return Err(Exception::stop_iteration(Value::None));
        }
        if self.running.get() {
            return Err(CoroutineError::AlreadyExecuting.into());
        }
        if status == CoroutineStatus::Unused {
            self.materialize()?;
        }

        // A primed exception is only ever paired with a `None` send.
        let transfer = match self.pending.take() {
            Some(pending) => Transfer::exception(pending),
            None => Transfer::value(value),
        };
        self.resume(transfer)
    }

    pub(super) fn throw_pending(
        &self,
        pending: PendingException,
    ) -> CoroResult<Value> {
        if self.running.get() {
            return Err(CoroutineError::AlreadyExecuting.into());
        }
        if self.status.get() == CoroutineStatus::Finished {
            return Err(pending.into_exception());
        }

        self.pending.replace(Some(pending));
        let result = self.send(Value::None);
        // Never leave a primed exception behind, e.g. after a failed allocation.
        self.pending.take();
        result
    }

    pub(super) fn close(&self) -> CoroResult<Value> {
        if self.status.get() != CoroutineStatus::Running {
            return Ok(Value::None);
        }
        match self.throw_pending(PendingException::new(ExceptionClass::generator_exit())) {
            Ok(_) => Err(CoroutineError::IgnoredGeneratorExit.into()),
            Err(e) if e.is_generator_exit() || e.is_stop_iteration() => Ok(Value::None),
            Err(e) => Err(e),
        }
    }

    /// Create the fiber and frame on first resumption.
    fn materialize(&self) -> CoroResult<()> {
        let frame = Frame::new(self.code.clone());
        let coroutine = WeakCoroutine::from_object(self.this.clone());
        let code = self.code.clone();
        let body_frame = frame.clone();

        let entry: EntryPoint<Transfer, Value, BodyResult> = Box::new(move |suspender, first: Transfer| {
            // Thrown into before starting: the body never runs.
            if let Some(pending) = first.exception {
                return Err(pending.into_exception());
            }
            let body = code.body();
            let mut ctx = BodyContext::new(suspender, coroutine, code, body_frame);
            body(&mut ctx)
        });

        let fiber = self.factory.create(entry).map_err(|e| {
            warn!(qualname = %self.qualname.borrow(), error = %e, "fiber allocation failed");
            CoroutineError::Allocation(e).into_exception()
        })?;

        self.fiber.replace(Some(fiber));
        self.frame.replace(Some(frame));
        self.set_status(CoroutineStatus::Running);
        debug!(qualname = %self.qualname.borrow(), "coroutine started");
        Ok(())
    }

    fn resume(
        &self,
        transfer: Transfer,
    ) -> CoroResult<Value> {
        let frame = self.frame.borrow().clone().ok_or(CoroutineError::ContextLost)?;
        let mut fiber = self.fiber.take().ok_or(CoroutineError::ContextLost)?;

        let guard = SwitchGuard::enter(self, frame.clone());
        let outcome = fiber.switch_into(transfer);
        guard.leave();

        self.fiber.replace(Some(fiber));

        match outcome {
            Ok(Switch::Suspended(value)) => Ok(value),
            Ok(Switch::Completed(result)) => {
                self.finish();
                self.surface_completion(result, &frame)
            }
            Err(e) => {
                warn!(qualname = %self.qualname.borrow(), error = %e, "switch into coroutine failed");
                self.finish();
                Err(CoroutineError::ContextLost.into())
            }
        }
    }

    /// Running -> Finished: drop the frame, the parameters, any delegate
    /// and any exception still primed for delivery.
    fn finish(&self) {
        self.set_status(CoroutineStatus::Finished);
        self.frame.take();
        let parameters = self.store.borrow_mut().release_parameters();
        drop(parameters);
        self.awaiting.take();
        self.pending.take();
        debug!(qualname = %self.qualname.borrow(), "coroutine finished");
    }

    fn surface_completion(
        &self,
        result: BodyResult,
        frame: &Frame,
    ) -> CoroResult<Value> {
        let exception = match result {
            Ok(value) => return Err(Exception::stop_iteration(value)),
            Err(exception) => exception,
        };
        exception.push_traceback(frame);

        if exception.is_stop_iteration() && self.code.flags().generator_stop {
            let wrapped = CoroutineError::LeakedStopIteration.into_exception();
            wrapped.set_cause(exception.clone());
            wrapped.set_context(exception);
            return Err(wrapped);
        }
        Err(exception)
    }
}

impl Coroutine {
    /// Resume the body with `value`.
    ///
    /// Returns the next yielded value. Completion surfaces as `Err` carrying
    /// StopIteration (with the return value) or the body's exception.
    pub fn send(
        &self,
        value: Value,
    ) -> CoroResult<Value> {
        self.inner.send(value)
    }

    /// Raise an exception at the suspension point.
    ///
    /// `kind` is an exception class or instance, `value` its argument(s) and
    /// `traceback` either `None` or a traceback.
    pub fn throw(
        &self,
        kind: Value,
        value: Value,
        traceback: Value,
    ) -> CoroResult<Value> {
        let pending = channel::normalize_throw(&kind, value, &traceback)?;
        self.inner.throw_pending(pending)
    }

    /// Raise an already-built exception at the suspension point.
    pub fn throw_exception(
        &self,
        exception: Exception,
    ) -> CoroResult<Value> {
        self.inner.throw_pending(PendingException::from_exception(exception))
    }

    /// Cancel a started coroutine by raising GeneratorExit inside it.
    pub fn close(&self) -> CoroResult<Value> {
        self.inner.close()
    }
}
