/// Options fixed when a store definition is created.
///
/// # Examples
///
/// ```
/// use scopestore::StoreOptions;
///
/// let options = StoreOptions::new().update_on_props_change(true);
/// assert!(options.updates_on_props_change());
/// assert!(!StoreOptions::default().updates_on_props_change());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    update_on_props_change: bool,
}

impl StoreOptions {
    /// Options with every switch off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold new external input into state each time a boundary receives
    /// props that differ from the previous ones. When off, props only seed
    /// the initial state at mount.
    pub fn update_on_props_change(mut self, enabled: bool) -> Self {
        self.update_on_props_change = enabled;
        self
    }

    pub fn updates_on_props_change(&self) -> bool {
        self.update_on_props_change
    }
}
