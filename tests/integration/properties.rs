//! Property tests over random driver operation sequences

use proptest::prelude::*;
use yieldfiber::{CodeObject, Coroutine, CoroutineStatus, Exception, Value};

#[derive(Debug, Clone)]
enum Op {
    Send(i64),
    Throw,
    Close,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<i64>().prop_map(Op::Send),
        1 => Just(Op::Throw),
        1 => Just(Op::Close),
    ]
}

/// Echoes sent values for `limit` steps, swallowing ValueError once.
fn echo(limit: usize) -> Coroutine {
    Coroutine::new(
        CodeObject::new("echo", move |ctx| {
            let mut last = Value::None;
            let mut forgiven = false;
            for _ in 0..limit {
                last = match ctx.yield_value(last) {
                    Ok(value) => value,
                    Err(e) if !forgiven && e.message() == "once" => {
                        forgiven = true;
                        Value::str("forgiven")
                    }
                    Err(e) => return Err(e),
                };
            }
            Ok(last)
        })
        .into_ref(),
    )
}

fn apply(
    coro: &Coroutine,
    op: &Op,
) -> Result<Value, Exception> {
    match op {
        // A fresh coroutine only accepts None.
        Op::Send(_) if coro.status() == CoroutineStatus::Unused => coro.send(Value::None),
        Op::Send(n) => coro.send(Value::Int(*n)),
        Op::Throw => coro.throw_exception(Exception::value_error("once")),
        Op::Close => coro.close(),
    }
}

proptest! {
    #[test]
    fn status_never_moves_backwards(
        limit in 0usize..6,
        ops in proptest::collection::vec(op_strategy(), 0..24),
    ) {
        let coro = echo(limit);
        let mut status = coro.status();
        for op in &ops {
            let _ = apply(&coro, op);
            prop_assert!(coro.status() >= status);
            prop_assert!(!coro.is_running());
            status = coro.status();
        }
    }

    #[test]
    fn finished_coroutine_only_stops(
        limit in 0usize..4,
        sent in any::<i64>(),
    ) {
        let coro = echo(limit);
        while coro.status() != CoroutineStatus::Finished {
            let _ = coro.send(Value::None);
        }
        let err = coro.send(Value::Int(sent)).unwrap_err();
        prop_assert!(err.is_stop_iteration());
        prop_assert_eq!(err.stop_value(), Value::None);
        prop_assert_eq!(coro.close().unwrap(), Value::None);
        prop_assert!(coro.frame().is_none());
        prop_assert_eq!(coro.parameter_count(), 0);
    }

    #[test]
    fn yielded_values_echo_sent_values(values in proptest::collection::vec(any::<i64>(), 1..8)) {
        let coro = echo(values.len());
        prop_assert_eq!(coro.send(Value::None).unwrap(), Value::None);
        for v in &values {
            match coro.send(Value::Int(*v)) {
                Ok(yielded) => prop_assert_eq!(yielded, Value::Int(*v)),
                Err(e) => {
                    prop_assert!(e.is_stop_iteration());
                    prop_assert_eq!(e.stop_value(), Value::Int(*v));
                }
            }
        }
    }
}
