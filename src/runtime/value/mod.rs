//! Core value types exchanged across the coroutine boundary

pub mod runtime_value;
pub use runtime_value::*;

#[cfg(test)]
mod tests;
