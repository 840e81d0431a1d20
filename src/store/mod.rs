//! Store instances: the state snapshot, shallow-merge writes and the
//! subscriber registry.

pub(crate) mod lock;
mod state;
mod store;

pub use state::ShallowMerge;
pub(crate) use store::next_id;
pub use store::{Setter, StoreHandle, Subscription};
