//! Coroutine 单元测试
//!
//! 协议状态机、异常通道、生命周期、await 包装器与属性

use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::coroutine::{BodyContext, Coroutine};
use crate::runtime::frame::{BodyResult, CodeObject, CodeRef};
use crate::runtime::thread_state::{self, UnraisableReport};
use crate::runtime::value::Value;


fn code<F>(
    name: &str,
    body: F,
) -> CodeRef
where
    F: Fn(&mut BodyContext<'_>) -> BodyResult + 'static,
{
    CodeObject::new(name, body).into_ref()
}

/// Yields 1 and 2, then returns "done".
fn one_two() -> Coroutine {
    Coroutine::new(code("one_two", |ctx| {
        ctx.yield_value(Value::Int(1))?;
        ctx.yield_value(Value::Int(2))?;
        Ok(Value::str("done"))
    }))
}

/// Yields forever, letting every thrown exception propagate.
fn ticker(name: &str) -> Coroutine {
    Coroutine::new(code(name, |ctx| loop {
        ctx.yield_value(Value::str("tick"))?;
    }))
}

/// Collects unraisable reports for the duration of a test.
struct UnraisableCapture {
    reports: Rc<RefCell<Vec<UnraisableReport>>>,
    previous: Option<thread_state::UnraisableHook>,
}

impl UnraisableCapture {
    fn install() -> Self {
        let reports: Rc<RefCell<Vec<UnraisableReport>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = reports.clone();
        let previous = thread_state::set_unraisable_hook(Some(Box::new(move |report: &UnraisableReport| {
            sink.borrow_mut().push(report.clone());
        })));
        Self { reports, previous }
    }

    fn reports(&self) -> Vec<UnraisableReport> {
        self.reports.borrow().clone()
    }
}

impl Drop for UnraisableCapture {
    fn drop(&mut self) {
        thread_state::set_unraisable_hook(self.previous.take());
    }
}
