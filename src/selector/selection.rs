use crate::store::lock::{read, write};
use crate::store::{Setter, ShallowMerge, StoreHandle, Subscription};
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::trace;

type Selector<T, U> = Arc<dyn Fn(&T) -> U + Send + Sync>;
type Rerender = Arc<dyn Fn() + Send + Sync>;

/// The last selected value and the bookkeeping a host needs to re-render.
struct Selected<U> {
    value: U,
    version: u64,
    needs_render: bool,
    changes: usize,
}

/// A selector subscription on one store instance.
///
/// On every write the selector is re-run against the new snapshot; only when
/// its result differs (`PartialEq`) from the previous one is the selection
/// marked for re-render and its [`on_change`](Self::on_change) callback
/// invoked. Writes that leave the selected slice equal are invisible here.
///
/// A selector that builds a fresh, unequal value on every call (for example
/// one embedding a counter or a random id) will report a change on every
/// write; no deeper comparison is attempted.
///
/// Dropping the selection removes its subscription.
pub struct Selection<T, U> {
    store: StoreHandle<T>,
    selector: Selector<T, U>,
    cell: Arc<RwLock<Selected<U>>>,
    on_change: Arc<RwLock<Option<Rerender>>>,
    _subscription: Subscription,
}

impl<T, U> Selection<T, U>
where
    T: ShallowMerge,
    U: Clone + PartialEq + Send + Sync + 'static,
{
    /// Subscribe `selector` to `store`.
    pub fn new<S>(store: StoreHandle<T>, selector: S) -> Self
    where
        S: Fn(&T) -> U + Send + Sync + 'static,
    {
        let selector: Selector<T, U> = Arc::new(selector);
        let (version, state) = store.snapshot();
        let cell = Arc::new(RwLock::new(Selected {
            value: selector(&state),
            version,
            needs_render: false,
            changes: 0,
        }));
        let on_change: Arc<RwLock<Option<Rerender>>> = Arc::new(RwLock::new(None));

        let subscription = store.subscribe({
            let store = store.clone();
            let selector = Arc::clone(&selector);
            let cell = Arc::clone(&cell);
            let on_change = Arc::clone(&on_change);
            move || {
                let (version, state) = store.snapshot();
                let next = selector(&state);

                let changed = {
                    let mut cell = write(&cell);
                    cell.version = version;
                    if cell.value == next {
                        false
                    } else {
                        cell.value = next;
                        cell.needs_render = true;
                        cell.changes += 1;
                        true
                    }
                };

                if changed {
                    trace!(store_id = store.store_id(), version, "selected value changed");
                    let callback = read(&on_change).clone();
                    if let Some(callback) = callback {
                        callback();
                    }
                }
            }
        });

        Self {
            store,
            selector,
            cell,
            on_change,
            _subscription: subscription,
        }
    }

    /// The selected value as of the last notification or read.
    pub fn get(&self) -> U {
        read(&self.cell).value.clone()
    }

    /// Re-run the selector against the current snapshot.
    ///
    /// When the result equals the cached value the cached value is kept;
    /// otherwise it replaces it. This is the snapshot half of a tearing-safe
    /// read and never notifies.
    pub fn read(&self) -> U {
        self.read_versioned().1
    }

    fn read_versioned(&self) -> (u64, U) {
        let (version, state) = self.store.snapshot();
        let next = (self.selector)(&state);

        let mut cell = write(&self.cell);
        cell.version = version;
        if cell.value != next {
            cell.value = next;
        }
        (version, cell.value.clone())
    }

    /// Run one render pass over the selected value.
    ///
    /// `view` receives a value read from a single committed snapshot. If a
    /// write commits while `view` runs (including a write `view` makes
    /// itself), the output is discarded and the pass re-run against the new
    /// snapshot, so the returned output never mixes two states. `view` must
    /// not write on every pass, or the pass never settles.
    pub fn render<F, R>(&self, mut view: F) -> R
    where
        F: FnMut(&U) -> R,
    {
        loop {
            let (version, value) = self.read_versioned();
            let output = view(&value);

            if self.store.version() == version {
                write(&self.cell).needs_render = false;
                return output;
            }
            trace!(
                store_id = self.store.store_id(),
                version,
                "render pass observed a newer snapshot; retrying"
            );
        }
    }

    /// Register the re-render trigger, replacing any previous one.
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *write(&self.on_change) = Some(Arc::new(callback));
    }

    /// Whether a write changed the selected value since the last render pass.
    pub fn needs_render(&self) -> bool {
        read(&self.cell).needs_render
    }

    /// Number of notifications that changed the selected value.
    pub fn change_count(&self) -> usize {
        read(&self.cell).changes
    }

    /// Store version the cached value was last computed at.
    pub fn version(&self) -> u64 {
        read(&self.cell).version
    }

    /// Writer of the underlying instance.
    pub fn setter(&self) -> Setter<T> {
        self.store.setter()
    }

    pub fn store(&self) -> &StoreHandle<T> {
        &self.store
    }
}

impl<T, U> fmt::Debug for Selection<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = read(&self.cell);
        f.debug_struct("Selection")
            .field("store", &self.store)
            .field("version", &cell.version)
            .field("needs_render", &cell.needs_render)
            .finish()
    }
}

impl<T: ShallowMerge> StoreHandle<T> {
    /// Subscribe a selector to this instance directly, without going through
    /// the ambient boundary lookup.
    pub fn select<U, S>(&self, selector: S) -> Selection<T, U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        S: Fn(&T) -> U + Send + Sync + 'static,
    {
        Selection::new(self.clone(), selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type State = HashMap<&'static str, i32>;

    fn store() -> StoreHandle<State> {
        StoreHandle::new(HashMap::from([("a", 1), ("b", 2)]))
    }

    #[test]
    fn ignores_writes_to_other_keys() {
        let store = store();
        let a = store.select(|s| s["a"]);
        let rerenders = Arc::new(AtomicUsize::new(0));
        a.on_change({
            let rerenders = rerenders.clone();
            move || {
                rerenders.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.set(|_| HashMap::from([("b", 3)]));
        assert_eq!(rerenders.load(Ordering::SeqCst), 0);
        assert!(!a.needs_render());

        store.set(|_| HashMap::from([("a", 5)]));
        assert_eq!(rerenders.load(Ordering::SeqCst), 1);
        assert!(a.needs_render());
        assert_eq!(a.get(), 5);
        assert_eq!(a.change_count(), 1);
    }

    #[test]
    fn equal_rewrite_is_not_a_change() {
        let store = store();
        let a = store.select(|s| s["a"]);

        store.set(|_| HashMap::from([("a", 1)]));

        assert_eq!(a.change_count(), 0);
        assert_eq!(a.version(), 1);
    }

    #[test]
    fn render_retries_after_concurrent_write() {
        let store = store();
        let a = store.select(|s| s["a"]);
        let passes = AtomicUsize::new(0);

        let output = a.render(|value| {
            if passes.fetch_add(1, Ordering::SeqCst) == 0 {
                // A write lands while the first pass is in flight
                store.set(|_| HashMap::from([("a", 10), ("b", 20)]));
            }
            format!("a={value}")
        });

        assert_eq!(output, "a=10");
        assert_eq!(passes.load(Ordering::SeqCst), 2);
        assert!(!a.needs_render());
    }

    #[test]
    fn render_clears_pending_rerender() {
        let store = store();
        let a = store.select(|s| s["a"]);

        store.set(|_| HashMap::from([("a", 2)]));
        assert!(a.needs_render());

        assert_eq!(a.render(|v| *v), 2);
        assert!(!a.needs_render());
    }

    #[test]
    fn drop_unsubscribes() {
        let store = store();
        let a = store.select(|s| s["a"]);
        assert_eq!(store.subscriber_count(), 1);

        drop(a);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn read_tracks_latest_snapshot() {
        let store = store();
        let sum = store.select(|s| s["a"] + s["b"]);

        store.set(|_| HashMap::from([("a", 4)]));
        assert_eq!(sum.read(), 6);
        assert_eq!(sum.get(), 6);
    }
}
