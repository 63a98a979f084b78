//! yieldfiber
//!
//! Fiber-backed compiled coroutines. A compiled body with suspend points
//! runs on its own native stack and is driven through the same
//! send/throw/close protocol an interpreted coroutine object offers.
//!
//! # Example
//!
//! ```
//! use yieldfiber::runtime::coroutine::Coroutine;
//! use yieldfiber::runtime::frame::CodeObject;
//! use yieldfiber::runtime::value::Value;
//!
//! let code = CodeObject::new("pair", |ctx| {
//!     ctx.yield_value(Value::Int(1))?;
//!     ctx.yield_value(Value::Int(2))?;
//!     Ok(Value::str("done"))
//! })
//! .into_ref();
//!
//! let coro = Coroutine::new(code);
//! assert_eq!(coro.send(Value::None).unwrap(), Value::Int(1));
//! assert_eq!(coro.send(Value::None).unwrap(), Value::Int(2));
//! let stop = coro.send(Value::None).unwrap_err();
//! assert!(stop.is_stop_iteration());
//! assert_eq!(stop.stop_value(), Value::str("done"));
//! ```

#![doc(html_root_url = "https://docs.rs/yieldfiber")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod demo;
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use runtime::coroutine::{Coroutine, CoroutineBuilder, CoroutineStatus, CoroutineWrapper};
pub use runtime::exception::{Exception, ExceptionClass};
pub use runtime::frame::{CodeObject, CodeRef};
pub use runtime::value::Value;
pub use thiserror::Error;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "yieldfiber";
