//! ChainTable: separately chained buckets over an entry arena.
//!
//! Entries live in a `SlotMap` and buckets hold the arena index of their
//! chain head; each entry links to the next one in its bucket. Relinking an
//! entry during a resize only rewrites indices, entries never move or get
//! reallocated.

use crate::config::TableConfig;
use crate::error::{AllocTarget, TableError};
use crate::hash::one_at_a_time;
use core::fmt;
use log::{debug, trace, warn};
use slotmap::{new_key_type, SlotMap};

/// Smallest (and initial) bucket array length.
pub const MIN_SIZE: usize = 1 << 3;

new_key_type! {
    /// Arena index of a chain entry.
    struct EntryKey;
}

#[derive(Debug)]
struct Entry {
    hash: u32,
    key: Vec<u8>,
    value: i32,
    next: Option<EntryKey>,
}

type Buckets = Vec<Option<EntryKey>>;

pub struct ChainTable {
    size: usize,
    mask: usize,
    buckets: Buckets,
    slots: SlotMap<EntryKey, Entry>, // every live entry, reachable from exactly one chain
    config: TableConfig,
}

impl ChainTable {
    /// Empty table with `MIN_SIZE` buckets and no limits.
    pub fn new() -> Self {
        Self::from_buckets(vec![None; MIN_SIZE], TableConfig::default())
    }

    /// Empty table with `MIN_SIZE` buckets, honoring the limits in `config`.
    pub fn with_config(config: TableConfig) -> Result<Self, TableError> {
        let mut buckets = alloc_buckets(&config, MIN_SIZE)?;
        buckets.resize(MIN_SIZE, None);
        Ok(Self::from_buckets(buckets, config))
    }

    fn from_buckets(buckets: Buckets, config: TableConfig) -> Self {
        debug!("creating table with {} buckets ({:?})", buckets.len(), config);
        Self {
            size: buckets.len(),
            mask: buckets.len() - 1,
            buckets,
            slots: SlotMap::with_key(),
            config,
        }
    }

    /// Current bucket array length.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn mask(&self) -> usize {
        self.mask
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    #[inline]
    fn bucket_of(&self, hash: u32) -> usize {
        hash as usize & self.mask
    }

    fn find(&self, hash: u32, key: &[u8]) -> Option<EntryKey> {
        let mut cur = self.buckets[self.bucket_of(hash)];
        while let Some(k) = cur {
            let e = &self.slots[k];
            if e.hash == hash && e.key.as_slice() == key {
                return Some(k);
            }
            cur = e.next;
        }
        None
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.find(one_at_a_time(key), key).is_some()
    }

    /// Value stored under `key`, or `NotFound`.
    pub fn get(&self, key: &[u8]) -> Result<i32, TableError> {
        let hash = one_at_a_time(key);
        match self.find(hash, key) {
            Some(k) => Ok(self.slots[k].value),
            None => {
                trace!("get: {:?} not found", key);
                Err(TableError::NotFound)
            }
        }
    }

    /// Insert `key` or overwrite its value.
    ///
    /// Overwriting never changes the structure. A new key becomes the head of
    /// its bucket chain and may trigger a resize. If the entry or its key copy
    /// cannot be allocated the table is left untouched. If only the resize
    /// fails, the entry stays inserted and the error is
    /// `AllocationFailure(BucketArray)`.
    pub fn set(&mut self, key: &[u8], value: i32) -> Result<(), TableError> {
        let hash = one_at_a_time(key);
        if let Some(k) = self.find(hash, key) {
            trace!("set: overwrite {:?}", key);
            self.slots[k].value = value;
            return Ok(());
        }

        if self.slots.len() >= self.config.max_entries {
            warn!(
                "set: entry limit {} reached, rejecting {:?}",
                self.config.max_entries, key
            );
            return Err(TableError::AllocationFailure(AllocTarget::Entry));
        }
        let owned = copy_key(key)?;

        let idx = self.bucket_of(hash);
        let next = self.buckets[idx];
        let k = self.slots.insert(Entry {
            hash,
            key: owned,
            value,
            next,
        });
        self.buckets[idx] = Some(k);
        trace!("set: inserted {:?} into bucket {}", key, idx);
        self.resize()
    }

    /// Remove `key`, or fail with `NotFound` without side effects.
    pub fn delete(&mut self, key: &[u8]) -> Result<(), TableError> {
        let hash = one_at_a_time(key);
        let idx = self.bucket_of(hash);
        let mut prev: Option<EntryKey> = None;
        let mut cur = self.buckets[idx];
        while let Some(k) = cur {
            let e = &self.slots[k];
            let next = e.next;
            if e.hash == hash && e.key.as_slice() == key {
                match prev {
                    Some(p) => self.slots[p].next = next,
                    None => self.buckets[idx] = next,
                }
                self.slots.remove(k);
                trace!("delete: removed {:?} from bucket {}", key, idx);
                return self.resize();
            }
            prev = cur;
            cur = next;
        }
        trace!("delete: {:?} not found", key);
        Err(TableError::NotFound)
    }

    /// Re-evaluate the bucket array length after a structural change.
    fn resize(&mut self) -> Result<(), TableError> {
        let items = self.slots.len();
        if items < MIN_SIZE {
            return Ok(());
        }
        if items > self.size {
            self.grow()
        } else if items <= self.size / 2 && self.size > MIN_SIZE {
            self.shrink()
        } else {
            Ok(())
        }
    }

    /// Double the bucket array. Slot `i` of the old array keeps the entries
    /// whose hash still maps to `i`; the rest move to `i + old_size`.
    fn grow(&mut self) -> Result<(), TableError> {
        let old_size = self.size;
        let old_mask = self.mask;
        let new_size = old_size
            .checked_mul(2)
            .ok_or(TableError::AllocationFailure(AllocTarget::BucketArray))?;
        let new_mask = new_size - 1;

        let mut buckets = alloc_buckets(&self.config, new_size)?;
        buckets.extend_from_slice(&self.buckets);
        buckets.resize(new_size, None);

        for i in 0..old_size {
            let mut prev: Option<EntryKey> = None;
            let mut cur = buckets[i];
            while let Some(k) = cur {
                let e = &self.slots[k];
                let (hash, next) = (e.hash as usize, e.next);
                if hash & old_mask != hash & new_mask {
                    match prev {
                        Some(p) => self.slots[p].next = next,
                        None => buckets[i] = next,
                    }
                    let dst = hash & new_mask;
                    self.slots[k].next = buckets[dst];
                    buckets[dst] = Some(k);
                } else {
                    prev = cur;
                }
                cur = next;
            }
        }

        self.install(buckets);
        debug!(
            "grew table {} -> {} buckets ({} items)",
            old_size,
            self.size,
            self.slots.len()
        );
        Ok(())
    }

    /// Halve the bucket array. The chain of old slot `i + new_size` is
    /// appended to the tail of slot `i`.
    fn shrink(&mut self) -> Result<(), TableError> {
        let old_size = self.size;
        let new_size = old_size / 2;

        let mut buckets = alloc_buckets(&self.config, new_size)?;
        buckets.extend_from_slice(&self.buckets[..new_size]);

        for i in new_size..old_size {
            let Some(head) = self.buckets[i] else {
                continue;
            };
            let dst = i - new_size;
            match buckets[dst] {
                None => buckets[dst] = Some(head),
                Some(mut tail) => {
                    while let Some(n) = self.slots[tail].next {
                        tail = n;
                    }
                    self.slots[tail].next = Some(head);
                }
            }
        }

        self.install(buckets);
        debug!(
            "shrank table {} -> {} buckets ({} items)",
            old_size,
            self.size,
            self.slots.len()
        );
        Ok(())
    }

    fn install(&mut self, buckets: Buckets) {
        self.size = buckets.len();
        self.mask = self.size - 1;
        self.buckets = buckets;
    }

    /// Keys of one bucket chain, head first.
    #[cfg(test)]
    pub(crate) fn chain_keys(&self, bucket: usize) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            out.push(self.slots[k].key.clone());
            cur = self.slots[k].next;
        }
        out
    }

    /// Structural invariants: power-of-two size, mask, bucket placement,
    /// unique keys, and every arena entry reachable from exactly one chain.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        use std::collections::HashSet;

        if !self.size.is_power_of_two() || self.size < MIN_SIZE {
            return Err(format!("bad size {}", self.size));
        }
        if self.mask != self.size - 1 || self.buckets.len() != self.size {
            return Err(format!(
                "mask {} / buckets {} disagree with size {}",
                self.mask,
                self.buckets.len(),
                self.size
            ));
        }
        let mut seen_entries = HashSet::new();
        let mut seen_keys = HashSet::new();
        for (i, head) in self.buckets.iter().enumerate() {
            let mut cur = *head;
            while let Some(k) = cur {
                let e = self
                    .slots
                    .get(k)
                    .ok_or_else(|| format!("dangling index in bucket {i}"))?;
                if self.bucket_of(e.hash) != i {
                    return Err(format!("{:?} in bucket {i}", e.key));
                }
                if e.hash != one_at_a_time(&e.key) {
                    return Err(format!("stale hash for {:?}", e.key));
                }
                if !seen_entries.insert(k) {
                    return Err(format!("entry linked twice via bucket {i}"));
                }
                if !seen_keys.insert(e.key.clone()) {
                    return Err(format!("duplicate key {:?}", e.key));
                }
                cur = e.next;
            }
        }
        if seen_entries.len() != self.slots.len() {
            return Err(format!(
                "{} reachable entries, {} live",
                seen_entries.len(),
                self.slots.len()
            ));
        }
        Ok(())
    }
}

impl Default for ChainTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChainTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainTable")
            .field("size", &self.size)
            .field("items", &self.slots.len())
            .field("config", &self.config)
            .finish()
    }
}

fn alloc_buckets(config: &TableConfig, len: usize) -> Result<Buckets, TableError> {
    let err = TableError::AllocationFailure(AllocTarget::BucketArray);
    if len > config.max_buckets {
        warn!(
            "bucket array of {} exceeds limit {}",
            len, config.max_buckets
        );
        return Err(err);
    }
    let mut buckets = Vec::new();
    buckets.try_reserve_exact(len).map_err(|e| {
        warn!("bucket array of {} not allocated: {}", len, e);
        err
    })?;
    Ok(buckets)
}

fn copy_key(key: &[u8]) -> Result<Vec<u8>, TableError> {
    let mut owned = Vec::new();
    owned.try_reserve_exact(key.len()).map_err(|e| {
        warn!("key of {} bytes not allocated: {}", key.len(), e);
        TableError::AllocationFailure(AllocTarget::KeyStorage)
    })?;
    owned.extend_from_slice(key);
    Ok(owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(i: usize) -> Vec<u8> {
        format!("key-{i}").into_bytes()
    }

    fn assert_valid(t: &ChainTable) {
        if let Err(e) = t.check_invariants() {
            panic!("invariant violated: {e} in {t:?}");
        }
    }

    #[test]
    fn new_table_is_empty_with_min_size() {
        let t = ChainTable::new();
        assert_eq!(t.size(), MIN_SIZE);
        assert_eq!(t.mask(), MIN_SIZE - 1);
        assert_eq!(t.len(), 0);
        assert!(t.is_empty());
        assert_eq!(t.get(b"a"), Err(TableError::NotFound));
        assert_valid(&t);
    }

    /// Create, set "a", then "b".."i" grows to 16; deleting 7 shrinks back to 8.
    #[test]
    fn grow_and_shrink_scenario() {
        let mut t = ChainTable::new();
        t.set(b"a", 1).unwrap();
        assert_eq!(t.get(b"a"), Ok(1));
        assert_eq!((t.size(), t.len()), (8, 1));

        let keys: [&[u8]; 8] = [b"b", b"c", b"d", b"e", b"f", b"g", b"h", b"i"];
        for (i, k) in keys.iter().enumerate() {
            t.set(k, 10 + i as i32).unwrap();
            assert_valid(&t);
        }
        assert_eq!((t.size(), t.len()), (16, 9));
        assert_eq!(t.get(b"a"), Ok(1));
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(t.get(k), Ok(10 + i as i32));
        }

        for k in &keys[..7] {
            t.delete(k).unwrap();
            assert_valid(&t);
        }
        assert_eq!((t.size(), t.len()), (8, 2));
        assert_eq!(t.get(b"a"), Ok(1));
        assert_eq!(t.get(b"i"), Ok(17));
    }

    #[test]
    fn grow_happens_only_past_size() {
        let mut t = ChainTable::new();
        for i in 0..8 {
            t.set(&key(i), i as i32).unwrap();
        }
        assert_eq!(t.size(), 8);
        t.set(&key(8), 8).unwrap();
        assert_eq!(t.size(), 16);
        for i in 9..16 {
            t.set(&key(i), i as i32).unwrap();
        }
        assert_eq!(t.size(), 16);
        t.set(&key(16), 16).unwrap();
        assert_eq!(t.size(), 32);
        for i in 0..17 {
            assert_eq!(t.get(&key(i)), Ok(i as i32));
        }
        assert_valid(&t);
    }

    /// Shrinking is triggered once items fall to half the size.
    #[test]
    fn shrink_from_16_with_9_items() {
        let mut t = ChainTable::new();
        for i in 0..9 {
            t.set(&key(i), i as i32).unwrap();
        }
        assert_eq!(t.size(), 16);
        t.delete(&key(0)).unwrap();
        assert_eq!((t.size(), t.len()), (8, 8));
        for i in 1..5 {
            t.delete(&key(i)).unwrap();
        }
        assert_eq!((t.size(), t.len()), (8, 4));
        for i in 5..9 {
            assert_eq!(t.get(&key(i)), Ok(i as i32));
        }
        assert_valid(&t);
    }

    #[test]
    fn load_factor_stays_bounded() {
        let mut t = ChainTable::new();
        for i in 0..300 {
            t.set(&key(i), i as i32).unwrap();
            let (size, items) = (t.size(), t.len());
            assert!(items <= size, "{items} > {size}");
            assert!(size == MIN_SIZE || items > size / 2, "{items} / {size}");
        }
        assert_eq!(t.size(), 512);
        for i in (0..300).rev() {
            t.delete(&key(i)).unwrap();
            let (size, items) = (t.size(), t.len());
            assert!(items <= size);
            assert!(size == MIN_SIZE || items > size / 2, "{items} / {size}");
        }
        assert_eq!((t.size(), t.len()), (MIN_SIZE, 0));
        assert_valid(&t);
    }

    #[test]
    fn overwrite_keeps_count_and_size() {
        let mut t = ChainTable::new();
        for i in 0..8 {
            t.set(&key(i), 0).unwrap();
        }
        for i in 0..8 {
            t.set(&key(i), 100 + i as i32).unwrap();
        }
        assert_eq!((t.size(), t.len()), (8, 8));
        for i in 0..8 {
            assert_eq!(t.get(&key(i)), Ok(100 + i as i32));
        }
    }

    #[test]
    fn delete_missing_is_a_no_op() {
        let mut t = ChainTable::new();
        t.set(b"x", 1).unwrap();
        assert_eq!(t.delete(b"y"), Err(TableError::NotFound));
        assert_eq!((t.size(), t.len()), (8, 1));
        t.delete(b"x").unwrap();
        assert_eq!(t.delete(b"x"), Err(TableError::NotFound));
        assert_eq!(t.get(b"x"), Err(TableError::NotFound));
        assert!(t.is_empty());
    }

    #[test]
    fn empty_and_binary_keys() {
        let mut t = ChainTable::new();
        t.set(b"", 7).unwrap();
        t.set(&[0, 0xff, 0x80], -3).unwrap();
        assert_eq!(t.get(b""), Ok(7));
        assert_eq!(t.get(&[0, 0xff, 0x80]), Ok(-3));
        assert_eq!(t.get(&[0, 0xff]), Err(TableError::NotFound));
        assert!(t.contains_key(b""));
        assert_valid(&t);
    }

    /// "a" and "h" both hash to bucket 2 of 8; new entries become the chain head.
    #[test]
    fn insert_prepends_to_chain() {
        let mut t = ChainTable::new();
        t.set(b"a", 1).unwrap();
        t.set(b"h", 2).unwrap();
        assert_eq!(t.chain_keys(2), vec![b"h".to_vec(), b"a".to_vec()]);

        // deleting the head relinks the bucket to the tail
        t.delete(b"h").unwrap();
        assert_eq!(t.chain_keys(2), vec![b"a".to_vec()]);
        t.set(b"h", 3).unwrap();
        // deleting the tail fixes the previous link
        t.delete(b"a").unwrap();
        assert_eq!(t.chain_keys(2), vec![b"h".to_vec()]);
    }

    /// After a shrink, the upper chain is appended after the lower one.
    #[test]
    fn shrink_appends_upper_chain() {
        let mut t = ChainTable::new();
        let keys: [&[u8]; 9] = [b"a", b"b", b"c", b"d", b"e", b"f", b"g", b"h", b"i"];
        for k in keys {
            t.set(k, 0).unwrap();
        }
        // in 16 buckets: "a" -> 2, "h" -> 10; "b", "g" -> 11
        assert_eq!(t.size(), 16);
        assert_eq!(t.chain_keys(2), vec![b"a".to_vec()]);
        assert_eq!(t.chain_keys(10), vec![b"h".to_vec()]);

        t.delete(b"c").unwrap();
        assert_eq!(t.size(), 8);
        assert_eq!(t.chain_keys(2), vec![b"a".to_vec(), b"h".to_vec()]);
        let mut three = t.chain_keys(3);
        three.sort();
        assert_eq!(three, vec![b"b".to_vec(), b"g".to_vec()]);
        assert_valid(&t);
    }

    #[test]
    fn entry_limit_rejects_without_side_effects() {
        let cfg = TableConfig::new().max_entries(2);
        let mut t = ChainTable::with_config(cfg).unwrap();
        t.set(b"a", 1).unwrap();
        t.set(b"b", 2).unwrap();
        let err = t.set(b"c", 3).unwrap_err();
        assert_eq!(err, TableError::AllocationFailure(AllocTarget::Entry));
        assert!(!err.committed());
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(b"c"), Err(TableError::NotFound));

        // overwrites need no allocation
        t.set(b"a", 10).unwrap();
        assert_eq!(t.get(b"a"), Ok(10));
        assert_valid(&t);
    }

    #[test]
    fn failed_grow_commits_insert_and_keeps_size() {
        let cfg = TableConfig::new().max_buckets(16);
        let mut t = ChainTable::with_config(cfg).unwrap();
        for i in 0..16 {
            t.set(&key(i), i as i32).unwrap();
        }
        assert_eq!(t.size(), 16);

        let err = t.set(&key(16), 16).unwrap_err();
        assert_eq!(err, TableError::AllocationFailure(AllocTarget::BucketArray));
        assert!(err.committed());
        assert_eq!((t.size(), t.len()), (16, 17));
        for i in 0..17 {
            assert_eq!(t.get(&key(i)), Ok(i as i32));
        }
        assert_valid(&t);

        // every further structural change retries the grow while items > size
        assert!(t.set(&key(17), 17).unwrap_err().committed());
        assert_eq!(t.len(), 18);
        assert!(t.delete(&key(17)).unwrap_err().committed());
        assert_eq!(t.get(&key(17)), Err(TableError::NotFound));

        t.delete(&key(16)).unwrap();
        assert_eq!((t.size(), t.len()), (16, 16));
        assert_valid(&t);
    }

    #[test]
    fn create_fails_when_min_size_exceeds_limit() {
        let err = ChainTable::with_config(TableConfig::new().max_buckets(4)).unwrap_err();
        assert_eq!(err, TableError::AllocationFailure(AllocTarget::BucketArray));
    }
}
