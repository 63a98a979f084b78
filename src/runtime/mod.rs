//! Runtime system
//!
//! The coroutine engine and the object model it needs: values, exceptions,
//! frames, per-thread ambient state, fibers and collector cooperation.

pub mod coroutine;
pub mod exception;
pub mod fiber;
pub mod frame;
pub mod gc;
pub mod thread_state;
pub mod value;
