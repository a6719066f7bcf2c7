use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::sync::Mutex;

use super::HashTable;

/// A fixed-capacity bucket holding unordered key/value pairs. `depth` is
/// the bucket's local depth: the number of low hash bits all resident keys
/// share with the directory slots that point here.
struct Bucket<K, V> {
    size: usize,
    depth: usize,
    items: Vec<(K, V)>,
}

impl<K: Eq, V> Bucket<K, V> {
    fn new(size: usize, depth: usize) -> Self {
        Bucket { size, depth, items: Vec::with_capacity(size) }
    }

    fn is_full(&self) -> bool {
        self.items.len() == self.size
    }

    fn find(&self, key: &K) -> Option<&V> {
        self.items.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn remove(&mut self, key: &K) -> bool {
        match self.items.iter().position(|(k, _)| k == key) {
            Some(i) => {
                self.items.swap_remove(i);
                true
            }
            None => false,
        }
    }

    /// Overwrite the value if the key is resident, else append if there is
    /// room. A full bucket hands the pair back so the caller can split and
    /// retry.
    fn try_insert(&mut self, key: K, value: V) -> std::result::Result<(), (K, V)> {
        if let Some(i) = self.items.iter().position(|(k, _)| *k == key) {
            self.items[i].1 = value;
            return Ok(());
        }
        if self.is_full() {
            return Err((key, value));
        }
        self.items.push((key, value));
        Ok(())
    }
}

/// An in-memory hash table using the extendible hashing scheme: a directory
/// of `2^global_depth` slots indexed by the low bits of the key hash, each
/// pointing at a bucket. A full bucket is split by one more hash bit,
/// doubling the directory when the bucket is already at full depth, so
/// insertion never fails. Removal never shrinks or merges.
///
/// Buckets live in an arena and directory slots hold arena indices; several
/// slots alias the same bucket whenever its local depth is below the global
/// depth. The hash function is pluggable so callers (and tests) can control
/// which directory slot a key lands in.
pub struct ExtendibleHashTable<K, V, S = RandomState> {
    global_depth: usize,
    bucket_size: usize,
    num_buckets: usize,
    dir: Vec<usize>,
    buckets: Vec<Bucket<K, V>>,
    hash_builder: S,
}

impl<K: Hash + Eq, V: Clone> ExtendibleHashTable<K, V> {
    /// Create a table with a single empty bucket of the given capacity and
    /// a directory of one slot (global depth 0).
    pub fn new(bucket_size: usize) -> Self {
        Self::with_hasher(bucket_size, RandomState::new())
    }
}

impl<K: Hash + Eq, V: Clone, S: BuildHasher> ExtendibleHashTable<K, V, S> {
    pub fn with_hasher(bucket_size: usize, hash_builder: S) -> Self {
        assert!(bucket_size > 0, "bucket size must be larger than zero");
        ExtendibleHashTable {
            global_depth: 0,
            bucket_size,
            num_buckets: 1,
            dir: vec![0],
            buckets: vec![Bucket::new(bucket_size, 0)],
            hash_builder,
        }
    }

    /// Directory slot the key hashes to: the low global_depth bits.
    fn index_of(&self, key: &K) -> usize {
        let mask = (1usize << self.global_depth) - 1;
        self.hash_builder.hash_one(key) as usize & mask
    }

    pub fn find(&self, key: &K) -> Option<V> {
        self.buckets[self.dir[self.index_of(key)]].find(key).cloned()
    }

    pub fn remove(&mut self, key: &K) -> bool {
        let bucket = self.dir[self.index_of(key)];
        self.buckets[bucket].remove(key)
    }

    /// Insert the pair, overwriting the value if the key is present.
    /// Splits the target bucket (growing the directory when necessary)
    /// until it accepts the pair. Termination relies on the hash spreading
    /// keys across low bits; a bucket full of identically-hashing keys
    /// would split forever, which is accepted as an external hazard.
    pub fn insert(&mut self, key: K, value: V) {
        let (mut key, mut value) = (key, value);
        loop {
            let bucket = self.dir[self.index_of(&key)];
            match self.buckets[bucket].try_insert(key, value) {
                Ok(()) => return,
                Err(pair) => {
                    (key, value) = pair;
                    self.split(bucket);
                }
            }
        }
    }

    /// Split a full bucket: raise its local depth by one, move the entries
    /// whose newly significant hash bit is set into a fresh bucket, and
    /// retarget the aliasing directory slots. Doubles the directory first
    /// when the bucket is already at global depth.
    fn split(&mut self, bucket: usize) {
        if self.buckets[bucket].depth == self.global_depth {
            self.global_depth += 1;
            let old_size = self.dir.len();
            // the appended half mirrors the existing half: slot j + old_size
            // aliases the same bucket as slot j
            self.dir.extend_from_within(0..old_size);
        }

        let mask = 1usize << self.buckets[bucket].depth;
        self.buckets[bucket].depth += 1;
        let depth = self.buckets[bucket].depth;
        let sibling = self.buckets.len();
        self.num_buckets += 1;

        let mut new_bucket = Bucket::new(self.bucket_size, depth);
        let items = std::mem::take(&mut self.buckets[bucket].items);
        for (k, v) in items {
            if self.hash_builder.hash_one(&k) as usize & mask != 0 {
                new_bucket.items.push((k, v));
            } else {
                self.buckets[bucket].items.push((k, v));
            }
        }
        self.buckets.push(new_bucket);

        for slot in 0..self.dir.len() {
            if self.dir[slot] == bucket && slot & mask != 0 {
                self.dir[slot] = sibling;
            }
        }
    }

    /// Number of low hash bits indexing the directory.
    pub fn global_depth(&self) -> usize {
        self.global_depth
    }

    /// Local depth of the bucket the given directory slot points to.
    pub fn local_depth(&self, dir_index: usize) -> usize {
        self.buckets[self.dir[dir_index]].depth
    }

    /// Count of distinct buckets.
    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }
}

/// SyncExtendibleHashTable is the thread-safe version of the extendible
/// hash table, all the heavy lifting happens in ExtendibleHashTable.
pub struct SyncExtendibleHashTable<K, V, S = RandomState> {
    inner: Mutex<ExtendibleHashTable<K, V, S>>,
}

impl<K: Hash + Eq, V: Clone> SyncExtendibleHashTable<K, V> {
    pub fn new(bucket_size: usize) -> Self {
        SyncExtendibleHashTable { inner: Mutex::new(ExtendibleHashTable::new(bucket_size)) }
    }
}

impl<K, V, S> HashTable<K, V> for SyncExtendibleHashTable<K, V, S>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
    S: BuildHasher + Send,
{
    fn find(&self, key: &K) -> Option<V> {
        let guard = self.inner.lock().unwrap();
        guard.find(key)
    }

    fn insert(&self, key: K, value: V) {
        let mut guard = self.inner.lock().unwrap();
        guard.insert(key, value)
    }

    fn remove(&self, key: &K) -> bool {
        let mut guard = self.inner.lock().unwrap();
        guard.remove(key)
    }
}
