//! # Scopestore
//!
//! Scoped, observable state containers with selector-based subscriptions.
//!
//! A store definition is mounted into any number of boundaries. Each
//! boundary owns one isolated instance, and readers subscribe to just the
//! slice of state they select, so writes that leave that slice unchanged
//! never reach them.
//!
//! ## Store instances
//!
//! - `StoreHandle<T>` - State snapshot, shallow-merge writes, subscribers
//! - `ShallowMerge` - How a partial update is folded into state
//! - `Subscription` - RAII guard removing a subscriber
//!
//! ## Scopes and readers
//!
//! - `ScopedStore<T>` - Immutable definition (initial state + options)
//! - `ScopeBoundary<T>` - A mounted boundary owning one instance
//! - `Selection<T, U>` - Selector subscription with tearing-safe render passes
//! - `Setter<T>` - The write half handed to readers
//!
//! ```
//! use scopestore::{create_scoped_store, StoreOptions};
//! use std::collections::BTreeMap;
//!
//! let store = create_scoped_store(BTreeMap::from([("a", 1), ("b", 2)]), StoreOptions::default());
//! let boundary = store.mount(None);
//!
//! boundary.enter(|| {
//!     let (a, set) = store.use_store(|s| s["a"]).unwrap();
//!     set.set(|_| BTreeMap::from([("b", 3)]));
//!     assert!(!a.needs_render());
//!     set.set(|_| BTreeMap::from([("a", 4)]));
//!     assert_eq!(a.get(), 4);
//! });
//! ```

pub mod error;
pub mod scope;
pub mod selector;
pub mod store;

// Re-export main types for convenience
pub use error::ScopeResolutionError;
pub use scope::{create_scoped_store, ScopeBoundary, ScopedStore, StoreOptions};
pub use selector::Selection;
pub use store::{Setter, ShallowMerge, StoreHandle, Subscription};
