pub mod extendible;

/// A mutable key/value map behind a shared reference, used by the buffer
/// pool as its page table. Lookup misses are values, not errors, and
/// insert never fails: the table grows as needed.
pub trait HashTable<K, V>: Send + Sync {
    /// Return the value associated with the key, if any.
    fn find(&self, key: &K) -> Option<V>;

    /// Insert the key/value pair, overwriting the value if the key is
    /// already present.
    fn insert(&self, key: K, value: V);

    /// Remove the key. Return true if it was present.
    fn remove(&self, key: &K) -> bool;
}
