//! The (type, value, traceback) triple

use std::fmt;

use super::{Exception, ExceptionClass, Traceback};

/// An exception waiting to be raised.
///
/// The type is always present; an absent triple is `Option::None` at the
/// use site, so "value without type" cannot be represented.
#[derive(Clone)]
pub struct PendingException {
    kind: ExceptionClass,
    value: Option<Exception>,
    traceback: Option<Traceback>,
}

impl PendingException {
    /// A triple carrying only a class, instantiated lazily on delivery.
    pub fn new(kind: ExceptionClass) -> Self {
        Self {
            kind,
            value: None,
            traceback: None,
        }
    }

    pub fn from_parts(
        kind: ExceptionClass,
        value: Option<Exception>,
        traceback: Option<Traceback>,
    ) -> Self {
        Self {
            kind,
            value,
            traceback,
        }
    }

    pub fn from_exception(exception: Exception) -> Self {
        Self {
            kind: exception.class().clone(),
            traceback: exception.traceback(),
            value: Some(exception),
        }
    }

    #[inline]
    pub fn kind(&self) -> &ExceptionClass {
        &self.kind
    }

    #[inline]
    pub fn value(&self) -> Option<&Exception> {
        self.value.as_ref()
    }

    #[inline]
    pub fn traceback(&self) -> Option<&Traceback> {
        self.traceback.as_ref()
    }

    pub fn matches(
        &self,
        class: &ExceptionClass,
    ) -> bool {
        self.kind.is_subclass_of(class)
    }

    /// Produce the instance that will actually be raised.
    pub fn into_exception(self) -> Exception {
        let exception = self.value.unwrap_or_else(|| self.kind.instantiate([]));
        if self.traceback.is_some() {
            exception.set_traceback(self.traceback);
        }
        exception
    }
}

impl From<Exception> for PendingException {
    fn from(exception: Exception) -> Self {
        PendingException::from_exception(exception)
    }
}

impl fmt::Debug for PendingException {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("PendingException")
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("traceback", &self.traceback)
            .finish()
    }
}
