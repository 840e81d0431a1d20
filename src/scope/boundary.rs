use super::context;
use super::options::StoreOptions;
use crate::store::{ShallowMerge, StoreHandle};
use std::fmt;
use tracing::{debug, trace};

/// A mounted scope boundary owning exactly one store instance.
///
/// Created by [`ScopedStore::mount`](crate::ScopedStore::mount). The instance
/// lives as long as the boundary: re-rendering with [`render`](Self::render)
/// never replaces it, and unmounting (or dropping) the boundary tears it
/// down.
///
/// # Examples
///
/// ```
/// use scopestore::{create_scoped_store, StoreOptions};
/// use std::collections::BTreeMap;
///
/// let counter = create_scoped_store(BTreeMap::from([("count", 0)]), StoreOptions::default());
/// let boundary = counter.mount(None);
///
/// boundary.enter(|| {
///     let setter = counter.use_set_store().unwrap();
///     setter.set(|s| BTreeMap::from([("count", s["count"] + 1)]));
/// });
///
/// assert_eq!(boundary.handle().get()["count"], 1);
/// ```
pub struct ScopeBoundary<T: ShallowMerge> {
    store: StoreHandle<T>,
    options: StoreOptions,
    last_props: Option<T::Patch>,
}

impl<T> ScopeBoundary<T>
where
    T: ShallowMerge,
    T::Patch: Clone + PartialEq,
{
    pub(crate) fn mount(
        store_id: u64,
        initial: &T,
        options: StoreOptions,
        props: Option<T::Patch>,
    ) -> Self {
        let state = match &props {
            Some(props) => initial.merge(props.clone()),
            None => initial.clone(),
        };
        let store = StoreHandle::with_store_id(store_id, state);

        debug!(
            store_id,
            instance_id = store.instance_id(),
            with_props = props.is_some(),
            "scope boundary mounted"
        );

        Self {
            store,
            options,
            last_props: props,
        }
    }

    /// Re-render the boundary with new external input.
    ///
    /// When the definition was created with
    /// [`update_on_props_change`](StoreOptions::update_on_props_change) and
    /// `props` differ from the last input, they are folded into state with
    /// one ordinary `set`, notifying subscribers as any write does. Returns
    /// whether a write happened.
    pub fn render(&mut self, props: T::Patch) -> bool {
        if self.last_props.as_ref() == Some(&props) {
            return false;
        }
        self.last_props = Some(props.clone());

        if !self.options.updates_on_props_change() {
            trace!(
                store_id = self.store.store_id(),
                "props changed; not applied to store"
            );
            return false;
        }

        debug!(
            store_id = self.store.store_id(),
            instance_id = self.store.instance_id(),
            "syncing props into store"
        );
        self.store.set(move |_| props);
        true
    }
}

impl<T: ShallowMerge> ScopeBoundary<T> {
    /// Run `f` with this boundary as the nearest enclosing one for its
    /// definition, so `use_store`/`use_set_store` inside `f` resolve to it.
    pub fn enter<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        trace!(
            store_id = self.store.store_id(),
            depth = context::depth(),
            "entering scope boundary"
        );
        context::with_boundary(&self.store, f)
    }

    /// The instance owned by this boundary, for explicit handle passing.
    pub fn handle(&self) -> &StoreHandle<T> {
        &self.store
    }

    /// Unmount the boundary and tear its instance down.
    pub fn unmount(self) {}
}

impl<T: ShallowMerge> Drop for ScopeBoundary<T> {
    fn drop(&mut self) {
        debug!(
            store_id = self.store.store_id(),
            instance_id = self.store.instance_id(),
            "scope boundary unmounted"
        );
        self.store.teardown();
    }
}

impl<T: ShallowMerge> fmt::Debug for ScopeBoundary<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeBoundary")
            .field("store", &self.store)
            .field("options", &self.options)
            .finish()
    }
}
