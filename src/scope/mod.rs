//! Store definitions and the boundaries that scope their instances.
//!
//! A [`ScopedStore`] is mounted into any number of [`ScopeBoundary`] values,
//! each owning an isolated instance. Code running inside
//! [`ScopeBoundary::enter`] resolves the nearest enclosing instance of a
//! definition through a thread-local boundary stack.

mod boundary;
mod context;
mod definition;
mod options;

pub use boundary::ScopeBoundary;
pub use definition::{create_scoped_store, ScopedStore};
pub use options::StoreOptions;
