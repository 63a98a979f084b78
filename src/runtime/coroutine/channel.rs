//! Exception channel
//!
//! Carries sent values and pending exceptions into the fiber (`Transfer`)
//! and keeps the driver's ambient error state apart from the coroutine's
//! across every switch.

use tracing::debug;

use super::errors::{CoroResult, CoroutineError};
use crate::runtime::exception::{Exception, PendingException};
use crate::runtime::thread_state;
use crate::runtime::value::Value;

/// What the driver hands to the body on each switch.
#[derive(Debug, Default)]
pub struct Transfer {
    /// The sent value (`None` when resuming with an exception).
    pub value: Value,
    /// An exception to raise at the suspension point.
    pub exception: Option<PendingException>,
}

impl Transfer {
    pub fn value(value: Value) -> Self {
        Self {
            value,
            exception: None,
        }
    }

    pub fn exception(exception: PendingException) -> Self {
        Self {
            value: Value::None,
            exception: Some(exception),
        }
    }

    /// What the body observes: the sent value, or the delivered exception.
    pub fn into_result(self) -> CoroResult<Value> {
        match self.exception {
            Some(pending) => Err(pending.into_exception()),
            None => Ok(self.value),
        }
    }
}

/// The driver's ambient error state while the coroutine runs.
#[must_use]
pub(crate) struct AmbientSnapshot {
    error: Option<PendingException>,
    handled: Option<Exception>,
}

/// Park the driver's error slot and handled exception, and install the
/// coroutine's own handled exception.
pub(crate) fn enter(coroutine_handled: Option<Exception>) -> AmbientSnapshot {
    let error = thread_state::fetch_error();
    let handled = thread_state::set_handled_exception(coroutine_handled);
    AmbientSnapshot { error, handled }
}

/// Undo `enter`, returning the coroutine's handled exception to keep for
/// the next resumption.
pub(crate) fn leave(snapshot: AmbientSnapshot) -> Option<Exception> {
    if let Some(stray) = thread_state::fetch_error() {
        debug!(kind = stray.kind().name(), "discarding error left by coroutine body");
    }
    thread_state::restore_error(snapshot.error);
    thread_state::set_handled_exception(snapshot.handled)
}

/// Normalize `throw(kind, value, traceback)` arguments the way a raise
/// statement does.
pub fn normalize_throw(
    kind: &Value,
    value: Value,
    traceback: &Value,
) -> CoroResult<PendingException> {
    let traceback = match traceback {
        Value::None => None,
        Value::Traceback(tb) => Some(tb.clone()),
        _ => return Err(CoroutineError::BadTraceback.into()),
    };

    let exception = match kind {
        Value::ExceptionClass(class) => match value {
            Value::None => class.instantiate([]),
            Value::Tuple(items) => class.instantiate(items.iter().cloned()),
            Value::Exception(instance) if instance.matches(class) => instance,
            other => class.instantiate([other]),
        },
        Value::Exception(instance) => {
            if !value.is_none() {
                return Err(CoroutineError::InstanceWithValue.into());
            }
            instance.clone()
        }
        other => return Err(CoroutineError::NotAnException(other.type_name()).into()),
    };

    if traceback.is_some() {
        exception.set_traceback(traceback);
    }
    Ok(PendingException::from_exception(exception))
}
