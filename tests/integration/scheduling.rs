//! Driving many coroutines the way an event loop would

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use yieldfiber::{CodeObject, Coroutine, CoroutineStatus, Value};

/// A worker that yields `steps` times, logging each step, then returns its id.
fn worker(
    id: i64,
    steps: i64,
    log: Rc<RefCell<Vec<(i64, i64)>>>,
) -> Coroutine {
    let body = CodeObject::new("worker", move |ctx| {
        for step in 0..steps {
            log.borrow_mut().push((id, step));
            ctx.yield_value(Value::Int(step))?;
        }
        Ok(Value::Int(id))
    })
    .into_ref();
    Coroutine::new(body)
}

#[test]
fn test_round_robin_interleaves_workers() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut ready: VecDeque<Coroutine> = (0..3).map(|id| worker(id, 2, log.clone())).collect();
    let mut results = Vec::new();

    while let Some(coro) = ready.pop_front() {
        match coro.send(Value::None) {
            Ok(_) => ready.push_back(coro),
            Err(e) if e.is_stop_iteration() => results.push(e.stop_value()),
            Err(e) => panic!("worker failed: {}", e),
        }
    }

    assert_eq!(
        *log.borrow(),
        vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]
    );
    assert_eq!(results, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_many_live_coroutines() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let workers: Vec<Coroutine> = (0..200).map(|id| worker(id, 1, log.clone())).collect();
    for coro in &workers {
        assert_eq!(coro.send(Value::None).unwrap(), Value::Int(0));
    }
    assert!(workers.iter().all(|c| c.status() == CoroutineStatus::Running));

    // Abandon half mid-flight; teardown closes them.
    let (kept, dropped): (Vec<_>, Vec<_>) = workers.into_iter().enumerate().partition(|(i, _)| i % 2 == 0);
    drop(dropped);
    for (_, coro) in kept {
        assert!(coro.send(Value::None).unwrap_err().is_stop_iteration());
    }
    assert_eq!(log.borrow().len(), 200);
}

#[test]
fn test_ping_pong_between_coroutines() {
    let pong = Coroutine::new(
        CodeObject::new("pong", |ctx| {
            let mut received = ctx.yield_value(Value::None)?;
            loop {
                let n = received.as_int().unwrap_or(0);
                received = ctx.yield_value(Value::Int(n + 1))?;
            }
        })
        .into_ref(),
    );
    pong.send(Value::None).unwrap();

    let partner = pong.clone();
    let ping = Coroutine::new(
        CodeObject::new("ping", move |ctx| {
            let mut n = 0;
            while n < 10 {
                n = partner.send(Value::Int(n))?.as_int().unwrap_or(0);
                ctx.yield_value(Value::Int(n))?;
            }
            partner.close()?;
            Ok(Value::Int(n))
        })
        .into_ref(),
    );

    let seen: Vec<Value> = ping.await_().map(|v| v.unwrap()).collect();
    assert_eq!(seen.len(), 10);
    assert_eq!(seen.last(), Some(&Value::Int(10)));
    assert_eq!(pong.status(), CoroutineStatus::Finished);
}

#[test]
fn test_nested_await_chain() {
    fn leaf() -> Coroutine {
        Coroutine::new(
            CodeObject::new("leaf", |ctx| {
                let sent = ctx.yield_value(Value::str("leaf"))?;
                Ok(sent)
            })
            .into_ref(),
        )
    }

    fn link(inner: Coroutine) -> Coroutine {
        let inner = Value::from(inner);
        Coroutine::new(
            CodeObject::new("link", move |ctx| {
                let value = ctx.await_on(&inner)?;
                Ok(Value::Int(value.as_int().unwrap_or(0) * 2))
            })
            .into_ref(),
        )
    }

    let top = (0..5).fold(leaf(), |inner, _| link(inner));
    assert_eq!(top.send(Value::None).unwrap(), Value::str("leaf"));
    let stop = top.send(Value::Int(1)).unwrap_err();
    assert_eq!(stop.stop_value(), Value::Int(32));
}
