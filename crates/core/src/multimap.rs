//! Insertion-ordered multimap.
//!
//! Grouping results must come out in the same order on every run, whatever
//! the hashing seed, so keys are kept in a `Vec` in first-seen order and the
//! `HashMap` only stores each key's slot.

use std::collections::HashMap;
use std::hash::Hash;

/// Maps each key to an ordered sequence of values.
///
/// Keys iterate in first-insertion order; values for a key iterate in
/// insertion order.
#[derive(Debug, Clone)]
pub struct OrderedMultimap<K, V> {
    slots: Vec<(K, Vec<V>)>,
    index: HashMap<K, usize>,
}

impl<K, V> Default for OrderedMultimap<K, V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> OrderedMultimap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the sequence stored under `key`.
    pub fn insert(&mut self, key: K, value: V) {
        match self.index.get(&key) {
            Some(&slot) => self.slots[slot].1.push(value),
            None => {
                self.index.insert(key.clone(), self.slots.len());
                self.slots.push((key, vec![value]));
            }
        }
    }

    /// Values stored under `key`, if any.
    pub fn get(&self, key: &K) -> Option<&[V]> {
        self.index
            .get(key)
            .map(|&slot| self.slots[slot].1.as_slice())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate `(key, values)` in first-seen key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[V])> {
        self.slots.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.slots.iter().map(|(k, _)| k)
    }

    /// Keep only the keys whose value sequence satisfies `keep`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &[V]) -> bool,
    {
        self.slots.retain(|(k, v)| keep(k, v.as_slice()));
        self.index = self
            .slots
            .iter()
            .enumerate()
            .map(|(slot, (k, _))| (k.clone(), slot))
            .collect();
    }
}

impl<K, V> IntoIterator for OrderedMultimap<K, V> {
    type Item = (K, Vec<V>);
    type IntoIter = std::vec::IntoIter<(K, Vec<V>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter()
    }
}

impl<K: Eq + Hash + Clone, V> FromIterator<(K, V)> for OrderedMultimap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_keep_first_seen_order() {
        let map: OrderedMultimap<&str, u32> =
            [("b", 1), ("a", 2), ("b", 3), ("c", 4), ("a", 5)]
                .into_iter()
                .collect();

        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(map.get(&"b"), Some(&[1, 3][..]));
        assert_eq!(map.get(&"a"), Some(&[2, 5][..]));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_retain_rebuilds_index() {
        let mut map: OrderedMultimap<u32, char> =
            [(1, 'x'), (2, 'y'), (2, 'z'), (3, 'w')].into_iter().collect();
        map.retain(|_, values| values.len() > 1);

        assert_eq!(map.len(), 1);
        assert!(!map.contains_key(&1));
        assert_eq!(map.get(&2), Some(&['y', 'z'][..]));

        map.insert(7, 'q');
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![2, 7]);
    }

    #[test]
    fn test_empty() {
        let map: OrderedMultimap<String, u8> = OrderedMultimap::new();
        assert!(map.is_empty());
        assert_eq!(map.get(&"missing".to_string()), None);
    }
}
