//! Selector subscriptions: the read path that only reacts to changes in the
//! slice of state a reader selected.

mod selection;

pub use selection::Selection;
