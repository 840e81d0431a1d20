use crate::error::ScopeResolutionError;
use crate::store::{ShallowMerge, StoreHandle};
use std::any::Any;
use std::cell::RefCell;

/// One entered boundary: the definition it belongs to and its instance.
struct Frame {
    store_id: u64,
    handle: Box<dyn Any>,
}

// Thread-local stack of entered boundaries, innermost last
thread_local! {
    static BOUNDARY_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Run `f` with `handle` as the innermost boundary for its definition.
///
/// The frame is popped when `f` returns, including when it panics.
pub(crate) fn with_boundary<T, F, R>(handle: &StoreHandle<T>, f: F) -> R
where
    T: ShallowMerge,
    F: FnOnce() -> R,
{
    BOUNDARY_STACK.with(|stack| {
        stack.borrow_mut().push(Frame {
            store_id: handle.store_id(),
            handle: Box::new(handle.clone()),
        });
    });

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    BOUNDARY_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });

    match result {
        Ok(r) => r,
        Err(e) => std::panic::resume_unwind(e),
    }
}

/// Find the nearest entered boundary of definition `store_id`.
///
/// Boundaries of other definitions are skipped, like nested providers of
/// unrelated contexts.
pub(crate) fn resolve<T: ShallowMerge>(
    store_id: u64,
) -> Result<StoreHandle<T>, ScopeResolutionError> {
    let handle = BOUNDARY_STACK.with(|stack| {
        stack
            .borrow()
            .iter()
            .rev()
            .find(|frame| frame.store_id == store_id)
            .and_then(|frame| frame.handle.downcast_ref::<StoreHandle<T>>())
            .cloned()
    });

    match handle {
        Some(handle) if handle.is_live() => Ok(handle),
        Some(_) => Err(ScopeResolutionError::TornDown { store_id }),
        None => Err(ScopeResolutionError::NoEnclosingBoundary { store_id }),
    }
}

/// Number of boundaries entered on this thread.
pub(crate) fn depth() -> usize {
    BOUNDARY_STACK.with(|stack| stack.borrow().len())
}
