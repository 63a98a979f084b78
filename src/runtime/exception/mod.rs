//! Exception model
//!
//! Classes form a single-inheritance hierarchy rooted at `BaseException`.
//! Instances carry their arguments, chaining (`__cause__`, `__context__`)
//! and a traceback. `PendingException` is the (type, value, traceback)
//! triple that crosses the fiber boundary and sits in the ambient error
//! slot.

mod class;
mod object;
mod pending;
mod traceback;

pub use class::ExceptionClass;
pub use object::Exception;
pub use pending::PendingException;
pub use traceback::Traceback;

#[cfg(test)]
mod tests;
