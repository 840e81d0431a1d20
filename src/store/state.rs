use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// State that can absorb a partial update by shallow merge.
///
/// Top-level entries named by the patch replace the current ones wholesale;
/// everything the patch does not mention is kept. Nested values are never
/// merged recursively.
///
/// # Examples
///
/// ```
/// use scopestore::ShallowMerge;
/// use std::collections::BTreeMap;
///
/// let state = BTreeMap::from([("a", 1), ("b", 2)]);
/// let next = state.merge(BTreeMap::from([("b", 3)]));
/// assert_eq!(next, BTreeMap::from([("a", 1), ("b", 3)]));
/// ```
pub trait ShallowMerge: Clone + Send + Sync + 'static {
    /// The partial state produced by an update function.
    type Patch: Send + Sync + 'static;

    /// Build the next snapshot from `self` and `patch`.
    fn merge(&self, patch: Self::Patch) -> Self;
}

impl<K, V> ShallowMerge for HashMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Patch = HashMap<K, V>;

    fn merge(&self, patch: Self::Patch) -> Self {
        let mut next = self.clone();
        next.extend(patch);
        next
    }
}

impl<K, V> ShallowMerge for BTreeMap<K, V>
where
    K: Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Patch = BTreeMap<K, V>;

    fn merge(&self, patch: Self::Patch) -> Self {
        let mut next = self.clone();
        next.extend(patch);
        next
    }
}

impl ShallowMerge for serde_json::Map<String, serde_json::Value> {
    type Patch = serde_json::Map<String, serde_json::Value>;

    fn merge(&self, patch: Self::Patch) -> Self {
        let mut next = self.clone();
        for (key, value) in patch {
            next.insert(key, value);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overwrites_only_named_keys() {
        let state = HashMap::from([("a", 1), ("b", 2)]);
        let next = state.merge(HashMap::from([("b", 3)]));

        assert_eq!(next, HashMap::from([("a", 1), ("b", 3)]));
        // Previous snapshot is untouched
        assert_eq!(state, HashMap::from([("a", 1), ("b", 2)]));
    }

    #[test]
    fn merge_is_not_deep() {
        let state = json!({ "user": { "name": "John", "isOnline": false }, "count": 0 });
        let state = state.as_object().cloned().unwrap_or_default();
        let patch = json!({ "user": { "isOnline": true } });
        let patch = patch.as_object().cloned().unwrap_or_default();

        let next = state.merge(patch);

        assert_eq!(next["user"], json!({ "isOnline": true }));
        assert_eq!(next["count"], json!(0));
    }

    #[test]
    fn empty_patch_keeps_everything() {
        let state = BTreeMap::from([("a", 1)]);
        assert_eq!(state.merge(BTreeMap::new()), state);
    }
}
