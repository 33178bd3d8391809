//! Hashers tuned for small keys; hash-flooding resistance is irrelevant here.

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<T> = rustc_hash::FxHashSet<T>;
