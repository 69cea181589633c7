//! Allocation limits for a `ChainTable`.

/// Limits applied on top of the global allocator.
///
/// Exceeding a limit is reported exactly like the corresponding allocation
/// failing: `max_entries` guards new entries, `max_buckets` guards every
/// bucket array the table allocates (including the initial one).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TableConfig {
    pub(crate) max_buckets: usize,
    pub(crate) max_entries: usize,
}

impl TableConfig {
    pub const fn new() -> Self {
        Self {
            max_buckets: usize::MAX,
            max_entries: usize::MAX,
        }
    }

    /// Largest bucket array the table may allocate.
    pub const fn max_buckets(mut self, n: usize) -> Self {
        self.max_buckets = n;
        self
    }

    /// Largest number of live entries.
    pub const fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    pub fn bucket_limit(&self) -> usize {
        self.max_buckets
    }

    pub fn entry_limit(&self) -> usize {
        self.max_entries
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new()
    }
}
