//! Exception classes

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::Exception;
use crate::runtime::value::Value;

struct ClassDef {
    name: String,
    base: Option<ExceptionClass>,
}

/// An exception class.
///
/// Classes compare by identity: two classes with the same name but created
/// separately are distinct.
#[derive(Clone)]
pub struct ExceptionClass(Arc<ClassDef>);

struct Builtins {
    base_exception: ExceptionClass,
    exception: ExceptionClass,
    type_error: ExceptionClass,
    value_error: ExceptionClass,
    runtime_error: ExceptionClass,
    memory_error: ExceptionClass,
    attribute_error: ExceptionClass,
    stop_iteration: ExceptionClass,
    generator_exit: ExceptionClass,
}

static BUILTINS: Lazy<Builtins> = Lazy::new(|| {
    let base_exception = ExceptionClass::root("BaseException");
    let exception = ExceptionClass::new("Exception", &base_exception);
    Builtins {
        type_error: ExceptionClass::new("TypeError", &exception),
        value_error: ExceptionClass::new("ValueError", &exception),
        runtime_error: ExceptionClass::new("RuntimeError", &exception),
        memory_error: ExceptionClass::new("MemoryError", &exception),
        attribute_error: ExceptionClass::new("AttributeError", &exception),
        stop_iteration: ExceptionClass::new("StopIteration", &exception),
        // Not an `Exception`: a bare `except Exception` must not swallow it.
        generator_exit: ExceptionClass::new("GeneratorExit", &base_exception),
        exception,
        base_exception,
    }
});

impl ExceptionClass {
    fn root(name: &str) -> Self {
        ExceptionClass(Arc::new(ClassDef {
            name: name.to_string(),
            base: None,
        }))
    }

    /// Define a new class deriving from `base`.
    pub fn new(
        name: impl Into<String>,
        base: &ExceptionClass,
    ) -> Self {
        ExceptionClass(Arc::new(ClassDef {
            name: name.into(),
            base: Some(base.clone()),
        }))
    }

    pub fn base_exception() -> Self {
        BUILTINS.base_exception.clone()
    }

    pub fn exception() -> Self {
        BUILTINS.exception.clone()
    }

    pub fn type_error() -> Self {
        BUILTINS.type_error.clone()
    }

    pub fn value_error() -> Self {
        BUILTINS.value_error.clone()
    }

    pub fn runtime_error() -> Self {
        BUILTINS.runtime_error.clone()
    }

    pub fn memory_error() -> Self {
        BUILTINS.memory_error.clone()
    }

    pub fn attribute_error() -> Self {
        BUILTINS.attribute_error.clone()
    }

    pub fn stop_iteration() -> Self {
        BUILTINS.stop_iteration.clone()
    }

    pub fn generator_exit() -> Self {
        BUILTINS.generator_exit.clone()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    pub fn base(&self) -> Option<&ExceptionClass> {
        self.0.base.as_ref()
    }

    /// True if `self` is `other` or derives from it.
    pub fn is_subclass_of(
        &self,
        other: &ExceptionClass,
    ) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class == other {
                return true;
            }
            current = class.base();
        }
        false
    }

    /// Create an instance with the given arguments.
    pub fn instantiate(
        &self,
        args: impl IntoIterator<Item = Value>,
    ) -> Exception {
        Exception::new(self, args)
    }
}

impl PartialEq for ExceptionClass {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ExceptionClass {}

impl fmt::Debug for ExceptionClass {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "<class '{}'>", self.name())
    }
}

impl fmt::Display for ExceptionClass {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
