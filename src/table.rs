use hashbrown::HashMap;
use std::sync::Arc;

#[cfg(feature = "fast-hash")]
use rustc_hash::FxHasher;
#[cfg(feature = "fast-hash")]
use std::hash::BuildHasherDefault;

#[cfg(not(feature = "fast-hash"))]
use ahash::RandomState;

#[cfg(feature = "fast-hash")]
type Build = BuildHasherDefault<FxHasher>;
#[cfg(not(feature = "fast-hash"))]
type Build = RandomState;

/// Hash map used for member lookups.
pub type FastHashMap<K, V> = HashMap<K, V, Build>;

/// Member → score lookup, sharing member strings with the score index.
#[derive(Debug, Default)]
pub struct MemberTable {
    map: FastHashMap<Arc<str>, f64>,
}

impl MemberTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: FastHashMap::with_capacity_and_hasher(capacity, Build::default()),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn get(&self, member: &str) -> Option<f64> {
        self.map.get(member).copied()
    }

    #[inline]
    pub fn contains(&self, member: &str) -> bool {
        self.map.contains_key(member)
    }

    /// Stored key and score. The key is the same allocation the score index
    /// holds, so a re-scored member is relinked without copying its name.
    #[inline]
    pub fn entry(&self, member: &str) -> Option<(Arc<str>, f64)> {
        self.map
            .get_key_value(member)
            .map(|(k, s)| (Arc::clone(k), *s))
    }

    /// Stores `score`, returning the previous score if the member existed.
    #[inline]
    pub fn insert(&mut self, member: Arc<str>, score: f64) -> Option<f64> {
        self.map.insert(member, score)
    }

    #[inline]
    pub fn remove(&mut self, member: &str) -> Option<f64> {
        self.map.remove(member)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.map.iter().map(|(m, s)| (&**m, *s))
    }
}
