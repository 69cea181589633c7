//! chained-htable: a single-threaded hash table from byte-string keys to
//! `i32` values, resolving collisions with per-bucket chains.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: amortized O(1) get/set/delete with a bucket array that tracks
//!   the number of live entries.
//! - Layers:
//!   - `hash`: the unkeyed one-at-a-time digest. Each entry caches its
//!     32-bit hash, so a key is hashed once per operation and never again
//!     during a resize.
//!   - `ChainTable`: owns an arena of entries (`SlotMap`) plus a bucket
//!     array of chain heads. Chains link entries by arena index.
//!   - `shell`: the text command loop used by the `htable-shell` binary.
//!
//! Constraints
//! - Single-threaded: mutation goes through `&mut self`; there is no
//!   interior mutability and no locking.
//! - Bucket array length is a power of two, never below `MIN_SIZE` (8);
//!   the bucket of an entry is `hash & (size - 1)`.
//! - Keys are unique; setting an existing key overwrites its value in
//!   place without touching the structure.
//!
//! Resize policy
//! - Runs after every insert of a new key and every successful delete,
//!   and only when at least `MIN_SIZE` entries are live.
//! - Grow: when `items > size`, double the array. Entries whose hash
//!   gains a high bit move to the upper half; the rest stay put.
//! - Shrink: when `items <= size / 2` and `size > MIN_SIZE`, halve the
//!   array and append each upper chain to the tail of its lower twin.
//! - Both steps relink arena indices only; entries are never copied.
//!
//! Errors
//! - Every operation returns a `Result`; there is no sticky last-error
//!   state. `TableError::NotFound` for a missing key,
//!   `TableError::AllocationFailure` when an entry, its key copy, or a
//!   resized bucket array cannot be allocated.
//! - A failed entry or key allocation leaves the table unchanged. A
//!   failed bucket array allocation aborts only the resize: the triggering
//!   insert or delete stays applied and the old array stays in use, so the
//!   load factor may sit outside its range until a later resize succeeds.
//! - `TableConfig` limits are reported exactly like allocator failures,
//!   which makes those paths reachable on demand.
//!
//! Notes and non-goals
//! - No iteration, no persistence, no thread-safety.
//! - The hash is unkeyed and deterministic; adversarial keys can force
//!   long chains. This is a known limitation.

pub mod chain_table;
mod chain_table_proptest;
pub mod config;
pub mod error;
pub mod hash;
pub mod logger;
pub mod shell;

// Public surface
pub use chain_table::{ChainTable, MIN_SIZE};
pub use config::TableConfig;
pub use error::{status_code, AllocTarget, TableError};
