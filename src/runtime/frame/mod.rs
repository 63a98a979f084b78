//! Code descriptors and frames
//!
//! A `CodeObject` describes a compiled coroutine body: its names, flags and
//! the native entry point. A `Frame` is the paused call position of one
//! activation; frames link to their caller through a back-pointer to form
//! the per-thread frame stack.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::runtime::coroutine::BodyContext;
use crate::runtime::exception::Exception;
use crate::runtime::value::Value;

/// What a body returns: its return value, or the exception it raised.
pub type BodyResult = Result<Value, Exception>;

/// Native entry point of a compiled body.
pub type BodyFn = Rc<dyn Fn(&mut BodyContext<'_>) -> BodyResult>;

/// Compiler-provided flags of a code object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeFlags {
    /// A StopIteration raised inside the body is turned into RuntimeError.
    pub generator_stop: bool,
}

impl Default for CodeFlags {
    fn default() -> Self {
        Self {
            generator_stop: true,
        }
    }
}

/// Shared handle to a code object.
pub type CodeRef = Rc<CodeObject>;

/// A compiled coroutine body.
pub struct CodeObject {
    name: Rc<str>,
    qualname: Rc<str>,
    first_line: u32,
    flags: CodeFlags,
    body: BodyFn,
}

impl CodeObject {
    /// Create a code object; the qualified name defaults to `name`.
    pub fn new<F>(
        name: &str,
        body: F,
    ) -> Self
    where
        F: Fn(&mut BodyContext<'_>) -> BodyResult + 'static,
    {
        Self {
            name: Rc::from(name),
            qualname: Rc::from(name),
            first_line: 1,
            flags: CodeFlags::default(),
            body: Rc::new(body),
        }
    }

    pub fn with_qualname(
        mut self,
        qualname: &str,
    ) -> Self {
        self.qualname = Rc::from(qualname);
        self
    }

    pub fn with_first_line(
        mut self,
        line: u32,
    ) -> Self {
        self.first_line = line;
        self
    }

    pub fn with_flags(
        mut self,
        flags: CodeFlags,
    ) -> Self {
        self.flags = flags;
        self
    }

    /// Finish building and share.
    pub fn into_ref(self) -> CodeRef {
        Rc::new(self)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    pub(crate) fn name_rc(&self) -> Rc<str> {
        self.name.clone()
    }

    pub(crate) fn qualname_rc(&self) -> Rc<str> {
        self.qualname.clone()
    }

    #[inline]
    pub fn first_line(&self) -> u32 {
        self.first_line
    }

    #[inline]
    pub fn flags(&self) -> CodeFlags {
        self.flags
    }

    pub(crate) fn body(&self) -> BodyFn {
        self.body.clone()
    }
}

impl fmt::Debug for CodeObject {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("CodeObject")
            .field("name", &self.name)
            .field("qualname", &self.qualname)
            .field("first_line", &self.first_line)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

struct FrameObject {
    code: CodeRef,
    back: RefCell<Option<Frame>>,
    lineno: Cell<u32>,
}

/// One activation record.
#[derive(Clone)]
pub struct Frame(Rc<FrameObject>);

impl Frame {
    pub fn new(code: CodeRef) -> Self {
        let lineno = code.first_line();
        Frame(Rc::new(FrameObject {
            code,
            back: RefCell::new(None),
            lineno: Cell::new(lineno),
        }))
    }

    #[inline]
    pub fn code(&self) -> &CodeRef {
        &self.0.code
    }

    /// The frame this one returns to, if linked into a stack.
    pub fn back(&self) -> Option<Frame> {
        self.0.back.borrow().clone()
    }

    /// Relink the back-pointer, returning the previous link.
    pub fn set_back(
        &self,
        back: Option<Frame>,
    ) -> Option<Frame> {
        std::mem::replace(&mut *self.0.back.borrow_mut(), back)
    }

    #[inline]
    pub fn lineno(&self) -> u32 {
        self.0.lineno.get()
    }

    #[inline]
    pub fn set_lineno(
        &self,
        line: u32,
    ) {
        self.0.lineno.set(line);
    }

    /// Number of frames from this one to the bottom of its stack.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.back();
        while let Some(frame) = current {
            depth += 1;
            current = frame.back();
        }
        depth
    }

    pub fn is_same(
        &self,
        other: &Frame,
    ) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Frame {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "<frame {} line {}>", self.0.code.qualname(), self.lineno())
    }
}
