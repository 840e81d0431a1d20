//! Error types raised when resolving a store from the ambient scope.

use thiserror::Error;

/// # Errors produced while resolving the nearest enclosing boundary.
///
/// Raised synchronously by [`ScopedStore::use_store`](crate::ScopedStore::use_store)
/// and [`ScopedStore::use_set_store`](crate::ScopedStore::use_set_store) when
/// the caller is not running inside a live boundary of that store definition.
/// Never retried; callers propagate it to their own failure handling.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeResolutionError {
    /// No boundary of this definition encloses the caller.
    #[error("store {store_id} not found: no enclosing scope boundary")]
    NoEnclosingBoundary {
        /// Identifier of the store definition that was looked up.
        store_id: u64,
    },

    /// The nearest boundary of this definition has already been unmounted.
    #[error("store {store_id} not found: enclosing scope boundary was unmounted")]
    TornDown {
        /// Identifier of the store definition that was looked up.
        store_id: u64,
    },
}

impl ScopeResolutionError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use scopestore::ScopeResolutionError;
    ///
    /// let err = ScopeResolutionError::NoEnclosingBoundary { store_id: 3 };
    /// assert_eq!(err.as_label(), "scope_no_enclosing_boundary");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ScopeResolutionError::NoEnclosingBoundary { .. } => "scope_no_enclosing_boundary",
            ScopeResolutionError::TornDown { .. } => "scope_torn_down",
        }
    }

    /// Identifier of the store definition the lookup was made for.
    pub fn store_id(&self) -> u64 {
        match self {
            ScopeResolutionError::NoEnclosingBoundary { store_id }
            | ScopeResolutionError::TornDown { store_id } => *store_id,
        }
    }
}
