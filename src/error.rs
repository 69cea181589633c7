//! Error kinds reported by `ChainTable` operations.

use thiserror::Error;

/// Which allocation could not be satisfied.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AllocTarget {
    /// Arena slot for a new entry. The table is unchanged.
    Entry,
    /// Owned copy of a new key. The table is unchanged.
    KeyStorage,
    /// Resized bucket array. The insert or delete that triggered the
    /// resize has already been applied; size and mask are unchanged.
    BucketArray,
}

#[derive(Clone, Copy, Debug, Error, Eq, PartialEq, Hash)]
pub enum TableError {
    #[error("key not found")]
    NotFound,
    #[error("allocation failed for {0:?}")]
    AllocationFailure(AllocTarget),
}

impl TableError {
    /// Numeric error code: 1 for not found, 2 for allocation failure.
    /// Success is 0, see [`status_code`].
    pub fn code(&self) -> u8 {
        match self {
            TableError::NotFound => 1,
            TableError::AllocationFailure(_) => 2,
        }
    }

    /// True when the operation that produced this error still modified the
    /// table (only a failed resize after a committed insert or delete).
    pub fn committed(&self) -> bool {
        matches!(self, TableError::AllocationFailure(AllocTarget::BucketArray))
    }
}

/// Error code of any operation outcome, 0 on success.
pub fn status_code<T>(res: &Result<T, TableError>) -> u8 {
    match res {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}
