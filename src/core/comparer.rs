//! Identifier equality strategies and the map built on top of them.
//!
//! State and trigger identifiers are opaque to the engine. Hosts decide how
//! two identifiers compare by supplying an [`IdComparer`]; every internal
//! container hashes and compares keys exclusively through that strategy.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Equality and hashing strategy for identifiers.
///
/// Implementations must be consistent: `equals(a, b)` implies
/// `hash_of(a) == hash_of(b)`.
///
/// # Example
///
/// ```rust
/// use arbor_hsm::core::IdComparer;
///
/// /// Compares state names without regard to ASCII case.
/// struct CaseInsensitive;
///
/// impl IdComparer<String> for CaseInsensitive {
///     fn equals(&self, a: &String, b: &String) -> bool {
///         a.eq_ignore_ascii_case(b)
///     }
///
///     fn hash_of(&self, value: &String) -> u64 {
///         use std::hash::{Hash, Hasher};
///         let mut hasher = std::collections::hash_map::DefaultHasher::new();
///         value.to_ascii_lowercase().hash(&mut hasher);
///         hasher.finish()
///     }
/// }
///
/// assert!(CaseInsensitive.equals(&"Idle".to_string(), &"IDLE".to_string()));
/// ```
pub trait IdComparer<T> {
    fn equals(&self, a: &T, b: &T) -> bool;
    fn hash_of(&self, value: &T) -> u64;
}

/// Comparer delegating to the identifier's own `Eq` and `Hash`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaturalEq;

impl<T: Eq + Hash> IdComparer<T> for NaturalEq {
    fn equals(&self, a: &T, b: &T) -> bool {
        a == b
    }

    fn hash_of(&self, value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }
}

/// Shared handle to a comparer, captured once per machine.
pub type SharedComparer<T> = Rc<dyn IdComparer<T>>;

/// Insertion-ordered map whose keys are hashed and compared through an
/// [`IdComparer`] instead of the key type's own `Eq`/`Hash`.
pub struct IdMap<K, V> {
    comparer: SharedComparer<K>,
    buckets: HashMap<u64, Vec<usize>>,
    entries: Vec<(K, V)>,
}

impl<K, V> IdMap<K, V> {
    pub fn new(comparer: SharedComparer<K>) -> Self {
        Self {
            comparer,
            buckets: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn comparer(&self) -> &SharedComparer<K> {
        &self.comparer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &K) -> Option<usize> {
        let hash = self.comparer.hash_of(key);
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|&index| self.comparer.equals(&self.entries[index].0, key))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.position(key).map(|index| &self.entries[index].1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.position(key).map(|index| &mut self.entries[index].1)
    }

    /// Inserts or replaces; returns the replaced value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(index) = self.position(&key) {
            return Some(std::mem::replace(&mut self.entries[index].1, value));
        }
        let hash = self.comparer.hash_of(&key);
        self.buckets
            .entry(hash)
            .or_default()
            .push(self.entries.len());
        self.entries.push((key, value));
        None
    }

    /// Returns the value for `key`, inserting `default()` first if absent.
    pub fn get_or_insert_with(&mut self, key: K, default: impl FnOnce() -> V) -> &mut V {
        let index = match self.position(&key) {
            Some(index) => index,
            None => {
                self.insert(key, default());
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    pub fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let index = self.position(key)?;
        let hash = self.comparer.hash_of(key);
        if let Some(bucket) = self.buckets.get_mut(&hash) {
            bucket.retain(|&slot| slot != index);
            if bucket.is_empty() {
                self.buckets.remove(&hash);
            }
        }
        let removed = self.entries.remove(index);
        for bucket in self.buckets.values_mut() {
            for slot in bucket.iter_mut() {
                if *slot > index {
                    *slot -= 1;
                }
            }
        }
        Some(removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, value)| value)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for IdMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
