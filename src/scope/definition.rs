use super::boundary::ScopeBoundary;
use super::context;
use super::options::StoreOptions;
use crate::error::ScopeResolutionError;
use crate::selector::Selection;
use crate::store::{next_id, Setter, ShallowMerge, StoreHandle};
use std::fmt;
use std::sync::Arc;

struct Definition<T> {
    id: u64,
    initial: T,
    options: StoreOptions,
}

/// An immutable store definition: initial state plus options.
///
/// A definition is a template. Each [`mount`](Self::mount) creates a fresh,
/// isolated store instance, and readers inside a boundary resolve the
/// nearest enclosing instance of *this* definition with
/// [`use_store`](Self::use_store) and [`use_set_store`](Self::use_set_store).
///
/// Cloning a definition is cheap and keeps its identity.
pub struct ScopedStore<T> {
    inner: Arc<Definition<T>>,
}

/// Create a store definition.
///
/// # Example
///
/// ```
/// use scopestore::{create_scoped_store, StoreOptions};
/// use std::collections::BTreeMap;
///
/// let store = create_scoped_store(BTreeMap::from([("count", 0)]), StoreOptions::default());
/// let boundary = store.mount(None);
///
/// let (count, set_count) = boundary.enter(|| store.use_store(|s| s["count"])).unwrap();
/// assert_eq!(count.get(), 0);
///
/// set_count.set(|s| BTreeMap::from([("count", s["count"] + 1)]));
/// assert_eq!(count.get(), 1);
/// ```
pub fn create_scoped_store<T: ShallowMerge>(initial: T, options: StoreOptions) -> ScopedStore<T> {
    ScopedStore::new(initial, options)
}

impl<T: ShallowMerge> ScopedStore<T> {
    /// Create a definition with its own id. Same as [`create_scoped_store`].
    pub fn new(initial: T, options: StoreOptions) -> Self {
        Self {
            inner: Arc::new(Definition {
                id: next_id(),
                initial,
                options,
            }),
        }
    }

    /// Identifier shared by every instance mounted from this definition.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Options every boundary of this definition is mounted with.
    pub fn options(&self) -> StoreOptions {
        self.inner.options
    }

    /// State each mount starts from before props are overlaid.
    pub fn initial_state(&self) -> &T {
        &self.inner.initial
    }

    /// Mount a new boundary seeded with the initial state, overlaid with
    /// `props` when given.
    pub fn mount(&self, props: Option<T::Patch>) -> ScopeBoundary<T>
    where
        T::Patch: Clone + PartialEq,
    {
        ScopeBoundary::mount(self.inner.id, &self.inner.initial, self.inner.options, props)
    }

    /// The nearest enclosing live instance of this definition.
    pub fn resolve(&self) -> Result<StoreHandle<T>, ScopeResolutionError> {
        context::resolve(self.inner.id)
    }

    /// Subscribe to the slice of state picked by `selector` in the nearest
    /// enclosing instance.
    ///
    /// Returns the selection and the instance's writer. The selection is
    /// only marked for re-render when a write changes the selected value.
    ///
    /// # Errors
    ///
    /// [`ScopeResolutionError`] when no live boundary of this definition
    /// encloses the caller.
    pub fn use_store<U, S>(
        &self,
        selector: S,
    ) -> Result<(Selection<T, U>, Setter<T>), ScopeResolutionError>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        S: Fn(&T) -> U + Send + Sync + 'static,
    {
        let store = self.resolve()?;
        let setter = store.setter();
        Ok((Selection::new(store, selector), setter))
    }

    /// The writer of the nearest enclosing instance, without subscribing.
    ///
    /// # Errors
    ///
    /// [`ScopeResolutionError`] when no live boundary of this definition
    /// encloses the caller.
    pub fn use_set_store(&self) -> Result<Setter<T>, ScopeResolutionError> {
        Ok(self.resolve()?.setter())
    }
}

impl<T> Clone for ScopedStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ScopedStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedStore")
            .field("id", &self.inner.id)
            .field("options", &self.inner.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    type State = HashMap<&'static str, i32>;

    #[test]
    fn use_store_outside_boundary_fails() {
        let store: ScopedStore<State> = ScopedStore::new(HashMap::new(), StoreOptions::default());

        for _ in 0..3 {
            let err = store.use_store(|s| s.get("a").copied()).unwrap_err();
            assert_eq!(err, ScopeResolutionError::NoEnclosingBoundary { store_id: store.id() });
            assert!(store.use_set_store().is_err());
        }
    }

    #[test]
    fn boundary_of_other_definition_does_not_resolve() {
        let mine: ScopedStore<State> = ScopedStore::new(HashMap::new(), StoreOptions::default());
        let other: ScopedStore<State> = ScopedStore::new(HashMap::new(), StoreOptions::default());
        let boundary = other.mount(None);

        boundary.enter(|| {
            assert!(mine.use_set_store().is_err());
            assert!(other.use_set_store().is_ok());
        });
    }

    #[test]
    fn siblings_are_isolated() {
        let store: ScopedStore<State> =
            ScopedStore::new(HashMap::from([("a", 0)]), StoreOptions::default());
        let left = store.mount(None);
        let right = store.mount(None);

        left.enter(|| {
            store
                .use_set_store()
                .unwrap()
                .set(|_| HashMap::from([("a", 5)]));
        });

        assert_eq!(left.handle().get()["a"], 5);
        assert_eq!(right.handle().get()["a"], 0);
        assert!(!left.handle().ptr_eq(right.handle()));
    }

    #[test]
    fn use_set_store_does_not_subscribe() {
        let store: ScopedStore<State> =
            ScopedStore::new(HashMap::from([("a", 0), ("b", 0)]), StoreOptions::default());
        let boundary = store.mount(None);

        let (reader, setter) = boundary.enter(|| {
            let (reader, _) = store.use_store(|s| s["a"]).unwrap();
            (reader, store.use_set_store().unwrap())
        });
        // Only the selection registered a subscriber
        assert_eq!(boundary.handle().subscriber_count(), 1);

        setter.set(|_| HashMap::from([("b", 1)]));
        assert_eq!(boundary.handle().subscriber_count(), 1);
        assert!(!reader.needs_render());
        assert_eq!(reader.change_count(), 0);
        assert_eq!(boundary.handle().get()["b"], 1);
    }

    #[test]
    fn setter_identity_is_stable_across_lookups() {
        let store: ScopedStore<State> = ScopedStore::new(HashMap::new(), StoreOptions::default());
        let boundary = store.mount(None);

        let (first, second) = boundary.enter(|| {
            let (_, first) = store.use_store(|s| s.len()).unwrap();
            (first, store.use_set_store().unwrap())
        });
        assert!(first.same_store(&second));
    }
}
