//! Exception instances

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use smallvec::SmallVec;

use super::{ExceptionClass, Traceback};
use crate::runtime::frame::Frame;
use crate::runtime::value::Value;

struct ExceptionObject {
    class: ExceptionClass,
    args: SmallVec<[Value; 2]>,
    cause: OnceCell<Exception>,
    context: OnceCell<Exception>,
    suppress_context: Cell<bool>,
    traceback: RefCell<Option<Traceback>>,
}

/// A raised (or raisable) exception instance.
#[derive(Clone)]
pub struct Exception(Rc<ExceptionObject>);

impl Exception {
    /// Instantiate `class` with `args`.
    pub fn new(
        class: &ExceptionClass,
        args: impl IntoIterator<Item = Value>,
    ) -> Self {
        Exception(Rc::new(ExceptionObject {
            class: class.clone(),
            args: args.into_iter().collect(),
            cause: OnceCell::new(),
            context: OnceCell::new(),
            suppress_context: Cell::new(false),
            traceback: RefCell::new(None),
        }))
    }

    /// Instantiate `class` with a single message argument.
    pub fn with_message(
        class: &ExceptionClass,
        message: impl AsRef<str>,
    ) -> Self {
        Exception::new(class, [Value::str(message)])
    }

    pub fn type_error(message: impl AsRef<str>) -> Self {
        Exception::with_message(&ExceptionClass::type_error(), message)
    }

    pub fn value_error(message: impl AsRef<str>) -> Self {
        Exception::with_message(&ExceptionClass::value_error(), message)
    }

    pub fn runtime_error(message: impl AsRef<str>) -> Self {
        Exception::with_message(&ExceptionClass::runtime_error(), message)
    }

    pub fn memory_error(message: impl AsRef<str>) -> Self {
        Exception::with_message(&ExceptionClass::memory_error(), message)
    }

    pub fn attribute_error(message: impl AsRef<str>) -> Self {
        Exception::with_message(&ExceptionClass::attribute_error(), message)
    }

    /// The exhaustion signal, carrying the body's return value.
    pub fn stop_iteration(value: Value) -> Self {
        let class = ExceptionClass::stop_iteration();
        if value.is_none() {
            Exception::new(&class, [])
        } else {
            Exception::new(&class, [value])
        }
    }

    /// The cancellation signal delivered by `close()`.
    pub fn generator_exit() -> Self {
        Exception::new(&ExceptionClass::generator_exit(), [])
    }

    #[inline]
    pub fn class(&self) -> &ExceptionClass {
        &self.0.class
    }

    #[inline]
    pub fn args(&self) -> &[Value] {
        &self.0.args
    }

    /// `isinstance(self, class)`
    #[inline]
    pub fn matches(
        &self,
        class: &ExceptionClass,
    ) -> bool {
        self.0.class.is_subclass_of(class)
    }

    pub fn is_stop_iteration(&self) -> bool {
        self.matches(&ExceptionClass::stop_iteration())
    }

    pub fn is_generator_exit(&self) -> bool {
        self.matches(&ExceptionClass::generator_exit())
    }

    /// The `value` attribute of a StopIteration: first argument or None.
    pub fn stop_value(&self) -> Value {
        self.0.args.first().cloned().unwrap_or_default()
    }

    /// Text form of the arguments, as `str(exc)` would show it.
    pub fn message(&self) -> String {
        match self.0.args.as_slice() {
            [] => String::new(),
            [single] => single.to_string(),
            many => format!("{:?}", Value::tuple(many.iter().cloned())),
        }
    }

    pub fn cause(&self) -> Option<&Exception> {
        self.0.cause.get()
    }

    /// Set `__cause__` (`raise ... from cause`); also suppresses context
    /// display. Returns false if a cause was already attached.
    pub fn set_cause(
        &self,
        cause: Exception,
    ) -> bool {
        self.0.suppress_context.set(true);
        self.0.cause.set(cause).is_ok()
    }

    pub fn context(&self) -> Option<&Exception> {
        self.0.context.get()
    }

    /// Set `__context__`. Returns false if a context was already attached.
    pub fn set_context(
        &self,
        context: Exception,
    ) -> bool {
        self.0.context.set(context).is_ok()
    }

    pub fn suppress_context(&self) -> bool {
        self.0.suppress_context.get()
    }

    pub fn traceback(&self) -> Option<Traceback> {
        self.0.traceback.borrow().clone()
    }

    pub fn set_traceback(
        &self,
        traceback: Option<Traceback>,
    ) {
        *self.0.traceback.borrow_mut() = traceback;
    }

    /// Record that the exception is propagating out of `frame`.
    pub fn push_traceback(
        &self,
        frame: &Frame,
    ) {
        let next = self.traceback();
        self.set_traceback(Some(Traceback::from_frame(frame, next)));
    }

    pub fn is_same(
        &self,
        other: &Exception,
    ) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// `repr(exc)`, e.g. `ValueError('boom')`.
    pub fn repr(&self) -> String {
        let args: Vec<String> = self
            .0
            .args
            .iter()
            .map(|a| match a {
                Value::Str(s) => format!("'{}'", s),
                other => format!("{:?}", other),
            })
            .collect();
        format!("{}({})", self.0.class.name(), args.join(", "))
    }
}

impl fmt::Debug for Exception {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.repr())
    }
}

impl fmt::Display for Exception {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let message = self.message();
        if message.is_empty() {
            write!(f, "{}", self.0.class.name())
        } else {
            write!(f, "{}: {}", self.0.class.name(), message)
        }
    }
}

impl std::error::Error for Exception {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}
