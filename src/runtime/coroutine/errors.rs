//! Coroutine engine errors
//!
//! Everything the engine itself raises. Each error maps onto the exception
//! class a driver observes, so callers only ever see `Exception` values.

use thiserror::Error;

use crate::runtime::exception::{Exception, ExceptionClass};
use crate::runtime::fiber::FiberError;

/// Result of a coroutine protocol operation.
pub type CoroResult<T> = Result<T, Exception>;

/// Coarse classification of engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller drove the coroutine in a way the protocol forbids.
    ProtocolViolation,
    /// Bad arguments to `throw` or an attribute setter.
    ArgumentError,
    /// The execution context could not be created.
    AllocationFailure,
    /// The body let its own exhaustion signal escape.
    LeakedExhaustionSignal,
}

/// Coroutine engine errors
#[derive(Debug, Error)]
pub enum CoroutineError {
    #[error("coroutine already executing")]
    AlreadyExecuting,

    #[error("can't send non-None value to a just-started coroutine")]
    SendToUnstarted,

    #[error("coroutine ignored GeneratorExit")]
    IgnoredGeneratorExit,

    #[error("coroutine execution context was lost")]
    ContextLost,

    #[error("instance exception may not have a separate value")]
    InstanceWithValue,

    #[error("exceptions must be classes or instances deriving from BaseException, not {0}")]
    NotAnException(&'static str),

    #[error("object {0} can't be used in 'await' expression")]
    NotAwaitable(&'static str),

    #[error("throw() third argument must be a traceback object")]
    BadTraceback,

    #[error("{0} must be set to a string object")]
    NotAString(&'static str),

    #[error("coroutine cannot be allocated")]
    Allocation(#[source] FiberError),

    #[error("coroutine raised StopIteration")]
    LeakedStopIteration,
}

impl CoroutineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoroutineError::AlreadyExecuting
            | CoroutineError::SendToUnstarted
            | CoroutineError::IgnoredGeneratorExit
            | CoroutineError::ContextLost => ErrorCategory::ProtocolViolation,
            CoroutineError::InstanceWithValue
            | CoroutineError::NotAnException(_)
            | CoroutineError::NotAwaitable(_)
            | CoroutineError::BadTraceback
            | CoroutineError::NotAString(_) => ErrorCategory::ArgumentError,
            CoroutineError::Allocation(_) => ErrorCategory::AllocationFailure,
            CoroutineError::LeakedStopIteration => ErrorCategory::LeakedExhaustionSignal,
        }
    }

    /// The class of the exception this error surfaces as.
    pub fn exception_class(&self) -> ExceptionClass {
        match self {
            CoroutineError::AlreadyExecuting => ExceptionClass::value_error(),
            CoroutineError::SendToUnstarted
            | CoroutineError::InstanceWithValue
            | CoroutineError::NotAnException(_)
            | CoroutineError::NotAwaitable(_)
            | CoroutineError::BadTraceback
            | CoroutineError::NotAString(_) => ExceptionClass::type_error(),
            CoroutineError::Allocation(_) => ExceptionClass::memory_error(),
            CoroutineError::IgnoredGeneratorExit
            | CoroutineError::ContextLost
            | CoroutineError::LeakedStopIteration => ExceptionClass::runtime_error(),
        }
    }

    pub fn into_exception(self) -> Exception {
        Exception::with_message(&self.exception_class(), self.to_string())
    }
}

impl From<CoroutineError> for Exception {
    fn from(error: CoroutineError) -> Self {
        error.into_exception()
    }
}
