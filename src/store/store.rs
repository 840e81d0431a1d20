use super::lock::{lock, read, write};
use super::ShallowMerge;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use tracing::{debug, trace};

type Callback = Arc<dyn Fn() + Send + Sync>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-wide unique id for a store definition or instance.
pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

// Instances whose update function is running on this thread
thread_local! {
    static UPDATING: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// Marks an instance as running an update function on this thread.
///
/// A second `set` on the same instance from inside its own update function
/// would wait on the write gate forever; it panics here instead.
struct UpdateGuard {
    instance_id: u64,
}

impl UpdateGuard {
    fn enter(instance_id: u64) -> Self {
        let reentered = UPDATING.with(|ids| {
            let mut ids = ids.borrow_mut();
            if ids.contains(&instance_id) {
                true
            } else {
                ids.push(instance_id);
                false
            }
        });
        if reentered {
            panic!(
                "store instance {instance_id}: `set` called from inside its own update function; \
                 return the change as part of the patch or call `set` from a subscriber"
            );
        }
        Self { instance_id }
    }
}

impl Drop for UpdateGuard {
    fn drop(&mut self) {
        UPDATING.with(|ids| {
            let mut ids = ids.borrow_mut();
            if let Some(pos) = ids.iter().rposition(|id| *id == self.instance_id) {
                ids.remove(pos);
            }
        });
    }
}

/// A committed state snapshot and the write counter it was committed at.
struct Snapshot<T> {
    version: u64,
    state: Arc<T>,
}

/// Subscriber callbacks keyed by registration id.
///
/// Ids are never reused, so removing one registration can not affect another
/// that happens to hold an equal callback.
#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback>,
}

struct Instance<T> {
    store_id: u64,
    instance_id: u64,
    snapshot: RwLock<Snapshot<T>>,
    subscribers: Arc<RwLock<Registry>>,
    // Serializes compute-merge-commit of writes; never held during fan-out.
    write_gate: Mutex<()>,
    live: AtomicBool,
}

/// A handle to one live store instance.
///
/// The instance owns the current state snapshot and the subscriber registry.
/// Every write replaces the snapshot with a shallow merge of the previous
/// state and the update's patch, then synchronously notifies every
/// subscriber registered when the fan-out started.
///
/// Handles are cheap to clone; clones refer to the same instance.
///
/// # Examples
///
/// ```
/// use scopestore::StoreHandle;
/// use std::collections::BTreeMap;
///
/// let store = StoreHandle::new(BTreeMap::from([("a", 1), ("b", 2)]));
/// store.set(|_| BTreeMap::from([("b", 3)]));
/// assert_eq!(*store.get(), BTreeMap::from([("a", 1), ("b", 3)]));
/// ```
pub struct StoreHandle<T> {
    inner: Arc<Instance<T>>,
}

impl<T: ShallowMerge> StoreHandle<T> {
    /// Create a standalone instance that belongs to no store definition.
    pub fn new(initial: T) -> Self {
        Self::with_store_id(next_id(), initial)
    }

    pub(crate) fn with_store_id(store_id: u64, initial: T) -> Self {
        Self {
            inner: Arc::new(Instance {
                store_id,
                instance_id: next_id(),
                snapshot: RwLock::new(Snapshot {
                    version: 0,
                    state: Arc::new(initial),
                }),
                subscribers: Arc::new(RwLock::new(Registry::default())),
                write_gate: Mutex::new(()),
                live: AtomicBool::new(true),
            }),
        }
    }

    /// Get the most recently committed snapshot.
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&read(&self.inner.snapshot).state)
    }

    /// Get the current snapshot together with the write counter it was
    /// committed at. Both are read under one lock, so they always match.
    pub fn snapshot(&self) -> (u64, Arc<T>) {
        let snapshot = read(&self.inner.snapshot);
        (snapshot.version, Arc::clone(&snapshot.state))
    }

    /// Number of writes committed to this instance so far.
    pub fn version(&self) -> u64 {
        read(&self.inner.snapshot).version
    }

    /// Apply `update` to the current state and notify subscribers.
    ///
    /// `update` receives the current snapshot and returns a patch that is
    /// shallow-merged into it. The merged state replaces the snapshot before
    /// any subscriber runs, so a `get` from inside a subscriber (or right
    /// after `set` returns) observes the new state.
    ///
    /// Subscribers added or removed during the fan-out only affect later
    /// writes. Subscribers may call `set` again.
    ///
    /// After [`teardown`](Self::teardown) this is a no-op.
    ///
    /// # Panics
    ///
    /// If `update` calls `set` on this same instance. The outer write is not
    /// committed and the instance stays usable.
    pub fn set<F>(&self, update: F)
    where
        F: FnOnce(&T) -> T::Patch,
    {
        if !self.is_live() {
            debug!(
                store_id = self.inner.store_id,
                instance_id = self.inner.instance_id,
                "ignoring write to torn-down store"
            );
            return;
        }

        let version = {
            let _updating = UpdateGuard::enter(self.inner.instance_id);
            let _gate = lock(&self.inner.write_gate);
            let current = self.get();
            let next = Arc::new(current.merge(update(&current)));
            let mut snapshot = write(&self.inner.snapshot);
            snapshot.version += 1;
            snapshot.state = next;
            snapshot.version
        };

        let callbacks: Vec<Callback> = read(&self.inner.subscribers)
            .callbacks
            .values()
            .cloned()
            .collect();

        trace!(
            store_id = self.inner.store_id,
            instance_id = self.inner.instance_id,
            version,
            subscribers = callbacks.len(),
            "committed write"
        );

        for callback in callbacks {
            // A subscriber may unmount the boundary mid fan-out.
            if !self.is_live() {
                break;
            }
            callback();
        }
    }

    /// Register `callback` to run after every committed write.
    ///
    /// The returned guard removes exactly this registration when
    /// [`Subscription::unsubscribe`] is called or when it is dropped.
    /// Subscribing to a torn-down instance returns an inert guard.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        if !self.is_live() {
            return Subscription::inert();
        }

        let mut registry = write(&self.inner.subscribers);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.insert(id, Arc::new(callback));

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner.subscribers),
            active: AtomicBool::new(true),
        }
    }

    /// Number of callbacks currently registered.
    pub fn subscriber_count(&self) -> usize {
        read(&self.inner.subscribers).callbacks.len()
    }

    /// A writer bound to this instance.
    pub fn setter(&self) -> Setter<T> {
        Setter {
            store: self.clone(),
        }
    }
}

impl<T> StoreHandle<T> {
    /// Move the instance to the torn-down state.
    ///
    /// All subscriber callbacks are released, later writes are ignored and
    /// later subscriptions are inert. Reads keep returning the last snapshot.
    pub fn teardown(&self) {
        if self.inner.live.swap(false, Ordering::SeqCst) {
            let released = std::mem::take(&mut write(&self.inner.subscribers).callbacks);
            debug!(
                store_id = self.inner.store_id,
                instance_id = self.inner.instance_id,
                released = released.len(),
                "store torn down"
            );
        }
    }

    /// Whether the instance still accepts writes.
    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// Identifier of the store definition this instance was created from.
    pub fn store_id(&self) -> u64 {
        self.inner.store_id
    }

    /// Identifier unique to this instance.
    pub fn instance_id(&self) -> u64 {
        self.inner.instance_id
    }

    /// Whether both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for StoreHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for StoreHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("store_id", &self.inner.store_id)
            .field("instance_id", &self.inner.instance_id)
            .field("live", &self.is_live())
            .finish()
    }
}

/// The write half of a store instance.
///
/// Every setter obtained from the same instance is interchangeable; use
/// [`Setter::same_store`] to check that identity.
pub struct Setter<T> {
    store: StoreHandle<T>,
}

impl<T: ShallowMerge> Setter<T> {
    /// Same as [`StoreHandle::set`].
    pub fn set<F>(&self, update: F)
    where
        F: FnOnce(&T) -> T::Patch,
    {
        self.store.set(update);
    }
}

impl<T> Setter<T> {
    /// Whether both setters write to the same instance.
    pub fn same_store(&self, other: &Self) -> bool {
        self.store.ptr_eq(&other.store)
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Setter").field(&self.store).finish()
    }
}

/// RAII guard for a store subscription.
pub struct Subscription {
    id: u64,
    registry: Weak<RwLock<Registry>>,
    active: AtomicBool,
}

impl Subscription {
    fn inert() -> Self {
        Self {
            id: 0,
            registry: Weak::new(),
            active: AtomicBool::new(false),
        }
    }

    /// Remove this registration. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            write(&registry).callbacks.remove(&self.id);
        }
    }

    /// Whether the callback is still registered by this guard.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
