//! The awaiter of a coroutine
//!
//! Awaiting a coroutine yields a wrapper that steps it one suspension at a
//! time. The wrapper owns one strong handle and nothing else.

use std::fmt;
use std::rc::Rc;

use super::errors::CoroResult;
use super::Coroutine;
use crate::runtime::exception::Exception;
use crate::runtime::gc::{self, GcRef, ObjectId, Trace};
use crate::runtime::value::Value;

struct WrapperObject {
    coroutine: Coroutine,
}

impl Drop for WrapperObject {
    fn drop(&mut self) {
        gc::untrack(ObjectId::of(self as *const WrapperObject));
    }
}

/// `coroutine.__await__()`
#[derive(Clone)]
pub struct CoroutineWrapper(Rc<WrapperObject>);

impl CoroutineWrapper {
    pub fn new(coroutine: Coroutine) -> Self {
        let wrapper = CoroutineWrapper(Rc::new(WrapperObject { coroutine }));
        gc::track(ObjectId::of(Rc::as_ptr(&wrapper.0)), "compiled_coroutine_wrapper");
        wrapper
    }

    /// The wrapped coroutine.
    #[inline]
    pub fn coroutine(&self) -> &Coroutine {
        &self.0.coroutine
    }

    /// One step: `send(None)`. Exhaustion surfaces as StopIteration.
    pub fn step(&self) -> CoroResult<Value> {
        self.0.coroutine.send(Value::None)
    }

    pub fn send(
        &self,
        value: Value,
    ) -> CoroResult<Value> {
        self.0.coroutine.send(value)
    }

    pub fn throw(
        &self,
        kind: Value,
        value: Value,
        traceback: Value,
    ) -> CoroResult<Value> {
        self.0.coroutine.throw(kind, value, traceback)
    }

    pub fn throw_exception(
        &self,
        exception: Exception,
    ) -> CoroResult<Value> {
        self.0.coroutine.throw_exception(exception)
    }

    pub fn close(&self) -> CoroResult<Value> {
        self.0.coroutine.close()
    }

    pub fn is_same(
        &self,
        other: &CoroutineWrapper,
    ) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Yields until the coroutine is exhausted; the return value is dropped.
impl Iterator for CoroutineWrapper {
    type Item = CoroResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(value) => Some(Ok(value)),
            Err(e) if e.is_stop_iteration() => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl Trace for CoroutineWrapper {
    fn trace(
        &self,
        visit: &mut dyn FnMut(GcRef<'_>),
    ) {
        visit(GcRef::Coroutine(&self.0.coroutine));
    }
}

impl fmt::Debug for CoroutineWrapper {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "<compiled_coroutine_wrapper object of {}>", self.0.coroutine.qualname())
    }
}

impl Coroutine {
    /// `__await__`: a wrapper stepping this coroutine.
    pub fn await_(&self) -> CoroutineWrapper {
        CoroutineWrapper::new(self.clone())
    }
}
