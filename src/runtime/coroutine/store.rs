//! Parameter and closure storage
//!
//! Arguments and free-variable cells are handed over once, when the
//! coroutine is built. Parameters are released as soon as the body finishes;
//! closure cells live until teardown.

use crate::runtime::gc::GcRef;
use crate::runtime::value::{ClosureCell, Value};

/// Owned inputs of one coroutine body.
#[derive(Debug, Default)]
pub struct FunctionStore {
    parameters: Vec<Value>,
    closure: Vec<ClosureCell>,
    parameters_released: bool,
}

impl FunctionStore {
    pub fn new(
        parameters: Vec<Value>,
        closure: Vec<ClosureCell>,
    ) -> Self {
        Self {
            parameters,
            closure,
            parameters_released: false,
        }
    }

    pub fn parameter(
        &self,
        index: usize,
    ) -> Option<Value> {
        self.parameters.get(index).cloned()
    }

    pub fn closure_cell(
        &self,
        index: usize,
    ) -> Option<ClosureCell> {
        self.closure.get(index).cloned()
    }

    #[inline]
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    #[inline]
    pub fn closure_count(&self) -> usize {
        self.closure.len()
    }

    #[inline]
    pub fn parameters_released(&self) -> bool {
        self.parameters_released
    }

    /// Give up the parameters. The caller drops them once no borrow is held.
    pub fn release_parameters(&mut self) -> Vec<Value> {
        self.parameters_released = true;
        std::mem::take(&mut self.parameters)
    }

    /// Give up the closure cells.
    pub fn release_closure(&mut self) -> Vec<ClosureCell> {
        std::mem::take(&mut self.closure)
    }

    pub(crate) fn trace(
        &self,
        visit: &mut dyn FnMut(GcRef<'_>),
    ) {
        for cell in &self.closure {
            visit(GcRef::Cell(cell));
        }
        for value in &self.parameters {
            visit(GcRef::Value(value));
        }
    }
}
