//! Compiled coroutines
//!
//! A `Coroutine` gives an ahead-of-time compiled body containing suspend
//! points the observable behavior of an interpreted coroutine object. Each
//! coroutine owns one fiber, created on first resumption; `send`, `throw`
//! and `close` switch into it and back.
//!
//! Layout:
//! - `state_machine`: the send/throw/close protocol and frame splicing
//! - `channel`: values and exceptions crossing the fiber boundary
//! - `store`: parameters and closure cells
//! - `lifecycle`: finalization, teardown and collector cooperation
//! - `body`: the context handed to a running body
//! - `wrapper`: the awaiter produced by `await_()`

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::runtime::exception::{Exception, PendingException};
use crate::runtime::fiber::{Fiber, FiberFactory, StackFiberFactory};
use crate::runtime::frame::{BodyResult, CodeRef, Frame};
use crate::runtime::gc::{self, ObjectId};
use crate::runtime::value::{ClosureCell, Value};
use crate::util::config;

mod body;
mod channel;
mod errors;
mod lifecycle;
mod state_machine;
mod store;
mod wrapper;

pub use body::{Awaitable, BodyContext};
pub use channel::{normalize_throw, Transfer};
pub use errors::{CoroResult, CoroutineError, ErrorCategory};
pub use lifecycle::WeakCoroutine;
pub use store::FunctionStore;
pub use wrapper::CoroutineWrapper;

/// The fiber a coroutine body runs on.
pub type CoroutineFiber = Box<dyn Fiber<Transfer, Value, BodyResult>>;

/// Creates coroutine fibers.
pub type CoroutineFiberFactory = Rc<dyn FiberFactory<Transfer, Value, BodyResult>>;

/// Coroutine status. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CoroutineStatus {
    /// Built, never resumed; no fiber exists yet.
    Unused,
    /// Started and not yet completed.
    Running,
    /// The body completed; the coroutine is exhausted.
    Finished,
}

impl fmt::Display for CoroutineStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            CoroutineStatus::Unused => write!(f, "unused"),
            CoroutineStatus::Running => write!(f, "running"),
            CoroutineStatus::Finished => write!(f, "finished"),
        }
    }
}

struct CoroutineObject {
    this: Weak<CoroutineObject>,
    id: ObjectId,
    name: RefCell<Rc<str>>,
    qualname: RefCell<Rc<str>>,
    code: CodeRef,
    status: Cell<CoroutineStatus>,
    /// Set only while a switch into the fiber is in flight.
    running: Cell<bool>,
    /// The logical close on last release has run.
    finalized: Cell<bool>,
    fiber: RefCell<Option<CoroutineFiber>>,
    factory: CoroutineFiberFactory,
    pending: RefCell<Option<PendingException>>,
    frame: RefCell<Option<Frame>>,
    awaiting: RefCell<Option<Value>>,
    /// The body's handled exception while it is switched out.
    exc_state: RefCell<Option<Exception>>,
    store: RefCell<FunctionStore>,
    /// Whether collector traversal reports owned children.
    report_children: bool,
}

impl CoroutineObject {
    fn set_status(
        &self,
        status: CoroutineStatus,
    ) {
        debug_assert!(status >= self.status.get(), "coroutine status moved backwards");
        self.status.set(status);
    }

    fn repr(&self) -> String {
        format!(
            "<compiled_coroutine object {} at {:#x}>",
            self.qualname.borrow(),
            self.id.0
        )
    }
}

/// A compiled coroutine object.
#[derive(Clone)]
pub struct Coroutine {
    inner: Rc<CoroutineObject>,
}

impl Coroutine {
    /// Build a coroutine for `code` with no arguments and the default fiber.
    pub fn new(code: CodeRef) -> Self {
        CoroutineBuilder::new(code).build()
    }

    pub fn builder(code: CodeRef) -> CoroutineBuilder {
        CoroutineBuilder::new(code)
    }

    #[inline]
    pub fn status(&self) -> CoroutineStatus {
        self.inner.status.get()
    }

    /// `cr_running`
    #[inline]
    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// Whether the logical close on last release has already happened.
    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.inner.finalized.get()
    }

    pub fn name(&self) -> Rc<str> {
        self.inner.name.borrow().clone()
    }

    /// Set `__name__`; only strings are accepted.
    pub fn set_name(
        &self,
        value: Value,
    ) -> CoroResult<()> {
        let name = match value {
            Value::Str(s) => s,
            _ => return Err(CoroutineError::NotAString("__name__").into()),
        };
        self.inner.name.replace(name);
        Ok(())
    }

    pub fn qualname(&self) -> Rc<str> {
        self.inner.qualname.borrow().clone()
    }

    /// Set `__qualname__`; only strings are accepted.
    pub fn set_qualname(
        &self,
        value: Value,
    ) -> CoroResult<()> {
        let qualname = match value {
            Value::Str(s) => s,
            _ => return Err(CoroutineError::NotAString("__qualname__").into()),
        };
        self.inner.qualname.replace(qualname);
        Ok(())
    }

    /// `cr_code`
    #[inline]
    pub fn code(&self) -> &CodeRef {
        &self.inner.code
    }

    /// `cr_frame`: present only between first resumption and completion.
    pub fn frame(&self) -> Option<Frame> {
        self.inner.frame.borrow().clone()
    }

    /// `cr_await`: the object currently delegated to, or `None`.
    pub fn awaiting(&self) -> Value {
        self.inner.awaiting.borrow().clone().unwrap_or_default()
    }

    /// Number of parameters still held (zero once finished).
    pub fn parameter_count(&self) -> usize {
        self.inner.store.borrow().parameter_count()
    }

    pub fn closure_count(&self) -> usize {
        self.inner.store.borrow().closure_count()
    }

    /// Read an attribute by name.
    pub fn get_attribute(
        &self,
        name: &str,
    ) -> CoroResult<Value> {
        match name {
            "__name__" => Ok(Value::Str(self.name())),
            "__qualname__" => Ok(Value::Str(self.qualname())),
            "cr_await" => Ok(self.awaiting()),
            "cr_code" => Ok(Value::Code(self.code().clone())),
            "cr_frame" => Ok(self.frame().map(Value::Frame).unwrap_or_default()),
            "cr_running" => Ok(Value::Bool(self.is_running())),
            other => Err(Exception::attribute_error(format!(
                "'compiled_coroutine' object has no attribute '{}'",
                other
            ))),
        }
    }

    /// Write an attribute by name.
    pub fn set_attribute(
        &self,
        name: &str,
        value: Value,
    ) -> CoroResult<()> {
        match name {
            "__name__" => self.set_name(value),
            "__qualname__" => self.set_qualname(value),
            "cr_code" | "cr_frame" => Err(Exception::runtime_error(format!("{} is not writable", name))),
            "cr_running" => Err(Exception::attribute_error("readonly attribute")),
            "cr_await" => Err(Exception::attribute_error(
                "attribute 'cr_await' of 'compiled_coroutine' objects is not writable",
            )),
            other => Err(Exception::attribute_error(format!(
                "'compiled_coroutine' object has no attribute '{}'",
                other
            ))),
        }
    }

    /// `<compiled_coroutine object QUALNAME at 0x...>`
    pub fn repr(&self) -> String {
        self.inner.repr()
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    pub fn is_same(
        &self,
        other: &Coroutine,
    ) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of strong handles.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

impl fmt::Debug for Coroutine {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Coroutine")
            .field("qualname", &self.qualname())
            .field("status", &self.status())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Builds a coroutine from a code object and its captured inputs.
pub struct CoroutineBuilder {
    code: CodeRef,
    name: Option<Rc<str>>,
    qualname: Option<Rc<str>>,
    parameters: Vec<Value>,
    closure: Vec<ClosureCell>,
    stack_size: Option<usize>,
    factory: Option<CoroutineFiberFactory>,
    report_children: Option<bool>,
}

impl CoroutineBuilder {
    pub fn new(code: CodeRef) -> Self {
        Self {
            code,
            name: None,
            qualname: None,
            parameters: Vec::new(),
            closure: Vec::new(),
            stack_size: None,
            factory: None,
            report_children: None,
        }
    }

    /// Override the name taken from the code object.
    pub fn name(
        mut self,
        name: &str,
    ) -> Self {
        self.name = Some(Rc::from(name));
        self
    }

    /// Override the qualified name taken from the code object.
    pub fn qualname(
        mut self,
        qualname: &str,
    ) -> Self {
        self.qualname = Some(Rc::from(qualname));
        self
    }

    pub fn parameters(
        mut self,
        parameters: Vec<Value>,
    ) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn closure(
        mut self,
        cells: Vec<ClosureCell>,
    ) -> Self {
        self.closure = cells;
        self
    }

    /// Stack size for the default fiber factory.
    pub fn stack_size(
        mut self,
        size: usize,
    ) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Use a custom fiber factory instead of `StackFiberFactory`.
    pub fn fiber_factory(
        mut self,
        factory: CoroutineFiberFactory,
    ) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Override `gc.report_owned_children` for this coroutine.
    pub fn report_children(
        mut self,
        report: bool,
    ) -> Self {
        self.report_children = Some(report);
        self
    }

    pub fn build(self) -> Coroutine {
        let config = config::active();
        let factory = self.factory.unwrap_or_else(|| {
            let size = self.stack_size.unwrap_or(config.fiber.stack_size);
            Rc::new(StackFiberFactory::new(size))
        });
        let report_children = self.report_children.unwrap_or(config.gc.report_owned_children);
        let name = self.name.unwrap_or_else(|| self.code.name_rc());
        let qualname = self.qualname.unwrap_or_else(|| self.code.qualname_rc());
        let code = self.code;
        let store = FunctionStore::new(self.parameters, self.closure);

        let inner = Rc::new_cyclic(|this: &Weak<CoroutineObject>| CoroutineObject {
            this: this.clone(),
            id: ObjectId::of(this.as_ptr()),
            name: RefCell::new(name),
            qualname: RefCell::new(qualname),
            code,
            status: Cell::new(CoroutineStatus::Unused),
            running: Cell::new(false),
            finalized: Cell::new(false),
            fiber: RefCell::new(None),
            factory,
            pending: RefCell::new(None),
            frame: RefCell::new(None),
            awaiting: RefCell::new(None),
            exc_state: RefCell::new(None),
            store: RefCell::new(store),
            report_children,
        });

        gc::track(inner.id, "compiled_coroutine");
        debug!(qualname = %inner.qualname.borrow(), "coroutine created");
        Coroutine { inner }
    }
}

#[cfg(test)]
mod tests;
