//! Runtime value representation
//!
//! `Value` is the unit of data exchanged between a driver and a coroutine
//! body: sent values, yielded values, exception arguments, parameters and
//! closure cell contents. Scalars compare structurally, heap objects compare
//! by identity.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::runtime::coroutine::{Coroutine, CoroutineWrapper};
use crate::runtime::exception::{Exception, ExceptionClass, Traceback};
use crate::runtime::frame::{CodeRef, Frame};

/// A runtime value
#[derive(Clone, Default)]
pub enum Value {
    /// The "no value" sentinel
    #[default]
    None,
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Immutable string
    Str(Rc<str>),
    /// Immutable tuple
    Tuple(Rc<[Value]>),
    /// An exception class (usable as the first argument of `throw`)
    ExceptionClass(ExceptionClass),
    /// An exception instance
    Exception(Exception),
    /// A traceback chain
    Traceback(Traceback),
    /// A closure cell
    Cell(ClosureCell),
    /// A code descriptor
    Code(CodeRef),
    /// A frame snapshot
    Frame(Frame),
    /// A compiled coroutine
    Coroutine(Coroutine),
    /// The awaiter produced by awaiting a coroutine
    CoroutineWrapper(CoroutineWrapper),
}

impl Value {
    /// Build a string value.
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    /// Build a tuple value.
    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(items.into_iter().collect::<Vec<_>>().into())
    }

    /// Name of the value's type, as shown in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::ExceptionClass(_) => "type",
            Value::Exception(_) => "exception",
            Value::Traceback(_) => "traceback",
            Value::Cell(_) => "cell",
            Value::Code(_) => "code",
            Value::Frame(_) => "frame",
            Value::Coroutine(_) => "compiled_coroutine",
            Value::CoroutineWrapper(_) => "compiled_coroutine_wrapper",
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_exception(&self) -> Option<&Exception> {
        match self {
            Value::Exception(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_coroutine(&self) -> Option<&Coroutine> {
        match self {
            Value::Coroutine(c) => Some(c),
            _ => None,
        }
    }

    /// Identity check for heap objects, equality for scalars.
    pub fn is(
        &self,
        other: &Value,
    ) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            _ => self == other,
        }
    }
}

impl PartialEq for Value {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::ExceptionClass(a), Value::ExceptionClass(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => a.is_same(b),
            (Value::Traceback(a), Value::Traceback(b)) => a.is_same(b),
            (Value::Cell(a), Value::Cell(b)) => a.is_same(b),
            (Value::Code(a), Value::Code(b)) => Rc::ptr_eq(a, b),
            (Value::Frame(a), Value::Frame(b)) => a.is_same(b),
            (Value::Coroutine(a), Value::Coroutine(b)) => a.is_same(b),
            (Value::CoroutineWrapper(a), Value::CoroutineWrapper(b)) => a.is_same(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", item)?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::ExceptionClass(c) => write!(f, "<class '{}'>", c.name()),
            Value::Exception(e) => write!(f, "{}", e.repr()),
            Value::Traceback(tb) => write!(f, "<traceback depth={}>", tb.depth()),
            Value::Cell(c) => write!(f, "{:?}", c),
            Value::Code(code) => write!(f, "<code object {}>", code.name()),
            Value::Frame(frame) => write!(f, "{:?}", frame),
            Value::Coroutine(c) => write!(f, "{}", c.repr()),
            Value::CoroutineWrapper(w) => write!(f, "{:?}", w),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Exception(e) => write!(f, "{}", e.message()),
            other => write!(f, "{:?}", other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<Exception> for Value {
    fn from(e: Exception) -> Self {
        Value::Exception(e)
    }
}

impl From<ExceptionClass> for Value {
    fn from(c: ExceptionClass) -> Self {
        Value::ExceptionClass(c)
    }
}

impl From<Traceback> for Value {
    fn from(tb: Traceback) -> Self {
        Value::Traceback(tb)
    }
}

impl From<Coroutine> for Value {
    fn from(c: Coroutine) -> Self {
        Value::Coroutine(c)
    }
}

impl From<CoroutineWrapper> for Value {
    fn from(w: CoroutineWrapper) -> Self {
        Value::CoroutineWrapper(w)
    }
}

impl From<ClosureCell> for Value {
    fn from(c: ClosureCell) -> Self {
        Value::Cell(c)
    }
}

/// A free-variable cell shared between an enclosing function and a
/// coroutine body.
#[derive(Clone, Default)]
pub struct ClosureCell(Rc<RefCell<Option<Value>>>);

impl ClosureCell {
    /// Create a cell holding `value`.
    pub fn new(value: Value) -> Self {
        ClosureCell(Rc::new(RefCell::new(Some(value))))
    }

    /// Create an empty (unbound) cell.
    pub fn empty() -> Self {
        ClosureCell::default()
    }

    pub fn get(&self) -> Option<Value> {
        self.0.borrow().clone()
    }

    /// Store a value, returning the previous content.
    pub fn set(
        &self,
        value: Value,
    ) -> Option<Value> {
        self.0.borrow_mut().replace(value)
    }

    /// Unbind the cell, returning the previous content.
    pub fn clear(&self) -> Option<Value> {
        self.0.borrow_mut().take()
    }

    pub fn is_same(
        &self,
        other: &ClosureCell,
    ) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of owners sharing this cell.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl fmt::Debug for ClosureCell {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(content) => match content.as_ref() {
                Some(v) => write!(f, "<cell: {:?}>", v),
                None => write!(f, "<cell: empty>"),
            },
            Err(_) => write!(f, "<cell: borrowed>"),
        }
    }
}
