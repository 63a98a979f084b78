//! Canned coroutine scenarios
//!
//! Each demo builds a small compiled body by hand, drives it through the
//! coroutine protocol and prints every step. The `yieldfiber demo` command
//! runs them.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use anyhow::Result;
use clap::ValueEnum;

use crate::runtime::coroutine::{CoroResult, Coroutine};
use crate::runtime::exception::{Exception, ExceptionClass};
use crate::runtime::frame::{CodeObject, CodeRef};
use crate::runtime::thread_state;
use crate::runtime::value::Value;

/// Available scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoKind {
    /// Yield a countdown, then return
    Countdown,
    /// Close a cooperative and a stubborn coroutine
    Close,
    /// Throw into a body that recovers once
    Throw,
    /// Delegate to an inner coroutine with await
    Await,
    /// Drop a suspended coroutine without closing it
    Leak,
}

impl fmt::Display for DemoKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            DemoKind::Countdown => "countdown",
            DemoKind::Close => "close",
            DemoKind::Throw => "throw",
            DemoKind::Await => "await",
            DemoKind::Leak => "leak",
        };
        write!(f, "{}", name)
    }
}

/// Run one scenario, writing its transcript to `out`.
pub fn run(
    kind: DemoKind,
    out: &mut dyn Write,
) -> Result<()> {
    writeln!(out, "== {} ==", kind)?;
    match kind {
        DemoKind::Countdown => countdown(out),
        DemoKind::Close => close(out),
        DemoKind::Throw => throw(out),
        DemoKind::Await => await_delegate(out),
        DemoKind::Leak => leak(out),
    }
}

fn report(
    out: &mut dyn Write,
    label: &str,
    result: &CoroResult<Value>,
) -> Result<()> {
    match result {
        Ok(value) => writeln!(out, "{:<28} -> yielded {:?}", label, value)?,
        Err(e) if e.is_stop_iteration() => writeln!(out, "{:<28} -> StopIteration({:?})", label, e.stop_value())?,
        Err(e) => writeln!(out, "{:<28} -> raised {}", label, e)?,
    }
    Ok(())
}

fn countdown_code() -> CodeRef {
    CodeObject::new("countdown", |ctx| {
        let mut n = ctx.parameter(0).and_then(|v| v.as_int()).unwrap_or(0);
        while n > 0 {
            ctx.set_line(3);
            ctx.yield_value(Value::Int(n))?;
            n -= 1;
        }
        ctx.set_line(5);
        Ok(Value::str("liftoff"))
    })
    .with_first_line(1)
    .into_ref()
}

fn countdown(out: &mut dyn Write) -> Result<()> {
    let coro = Coroutine::builder(countdown_code())
        .parameters(vec![Value::Int(3)])
        .build();
    writeln!(out, "{}", coro.repr())?;
    loop {
        let result = coro.send(Value::None);
        let line = coro.frame().map(|f| f.lineno());
        report(out, &format!("send(None) [{}]", coro.status()), &result)?;
        if let Some(line) = line {
            writeln!(out, "{:<28}    suspended at line {}", "", line)?;
        }
        if result.is_err() {
            break;
        }
    }
    report(out, "send(None) again", &coro.send(Value::None))?;
    Ok(())
}

fn yielder_code(
    name: &str,
    ignore_exit: bool,
) -> CodeRef {
    CodeObject::new(name, move |ctx| loop {
        match ctx.yield_value(Value::str("tick")) {
            Ok(_) => continue,
            Err(e) if e.is_generator_exit() && ignore_exit => {
                ctx.yield_value(Value::str("still here"))?;
            }
            Err(e) => return Err(e),
        }
    })
    .into_ref()
}

fn close(out: &mut dyn Write) -> Result<()> {
    let polite = Coroutine::new(yielder_code("polite", false));
    report(out, "polite: send(None)", &polite.send(Value::None))?;
    report(out, "polite: close()", &polite.close())?;
    writeln!(out, "polite status: {}", polite.status())?;

    let stubborn = Coroutine::new(yielder_code("stubborn", true));
    report(out, "stubborn: send(None)", &stubborn.send(Value::None))?;
    report(out, "stubborn: close()", &stubborn.close())?;
    writeln!(out, "stubborn status: {}", stubborn.status())?;
    Ok(())
}

fn guarded_code() -> CodeRef {
    CodeObject::new("guarded", |ctx| match ctx.yield_value(Value::str("ready")) {
        Ok(_) => Ok(Value::None),
        Err(e) if e.matches(&ExceptionClass::value_error()) => {
            let previous = ctx.enter_handler(e.clone());
            let next = ctx.yield_value(Value::str(format!("recovered from {}", e)));
            ctx.leave_handler(previous);
            next?;
            Ok(Value::str("finished"))
        }
        Err(e) => Err(e),
    })
    .into_ref()
}

fn throw(out: &mut dyn Write) -> Result<()> {
    let coro = Coroutine::new(guarded_code());
    report(out, "send(None)", &coro.send(Value::None))?;

    let value_error = Value::ExceptionClass(ExceptionClass::value_error());
    report(
        out,
        "throw(ValueError, 'bad')",
        &coro.throw(value_error, Value::str("bad"), Value::None),
    )?;

    let type_error = Value::ExceptionClass(ExceptionClass::type_error());
    let result = coro.throw(type_error, Value::None, Value::None);
    report(out, "throw(TypeError)", &result)?;
    if let Err(e) = &result {
        if let Some(tb) = e.traceback() {
            write!(out, "{}", tb.format())?;
        }
    }
    writeln!(out, "status: {}", coro.status())?;
    Ok(())
}

fn await_delegate(out: &mut dyn Write) -> Result<()> {
    let inner_code = CodeObject::new("inner", |ctx| {
        ctx.yield_value(Value::str("inner step"))?;
        Ok(Value::Int(42))
    })
    .into_ref();
    let outer_code = CodeObject::new("outer", |ctx| {
        let awaited = ctx.parameter(0).unwrap_or_default();
        let result = ctx.await_on(&awaited)?;
        ctx.yield_value(Value::str(format!("inner returned {:?}", result)))?;
        Ok(result)
    })
    .into_ref();

    let inner = Coroutine::new(inner_code);
    let outer = Coroutine::builder(outer_code)
        .parameters(vec![Value::Coroutine(inner)])
        .build();

    report(out, "outer.send(None)", &outer.send(Value::None))?;
    writeln!(out, "cr_await: {:?}", outer.awaiting())?;
    report(out, "outer.send(None)", &outer.send(Value::None))?;
    writeln!(out, "cr_await: {:?}", outer.awaiting())?;
    report(out, "outer.send(None)", &outer.send(Value::None))?;
    Ok(())
}

fn leak(out: &mut dyn Write) -> Result<()> {
    let reports: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = reports.clone();
    let previous = thread_state::set_unraisable_hook(Some(Box::new(move |report: &thread_state::UnraisableReport| {
        sink.borrow_mut()
            .push(format!("Exception ignored in: {}\n{}", report.object, report.exception));
    })));

    let code = CodeObject::new("leaky", |ctx| match ctx.yield_value(Value::Int(1)) {
        Err(e) if e.is_generator_exit() => Err(Exception::runtime_error("cleanup failed")),
        other => other.map(|_| Value::None),
    })
    .into_ref();

    let coro = Coroutine::new(code);
    report(out, "send(None)", &coro.send(Value::None))?;
    writeln!(out, "dropping {} without close()", coro.repr())?;
    drop(coro);

    thread_state::set_unraisable_hook(previous);
    for line in reports.borrow().iter() {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
