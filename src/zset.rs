//! The sorted set: a score index plus a member table behind one
//! reader–writer guard.
//!
//! Every mutation updates both structures under the exclusive guard, so
//! readers only ever see a state in which the table and the index agree.
//! Ranks are 1-based throughout.

use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use std::fmt;
use std::iter::Take;
use std::sync::Arc;
use tracing::debug;

use crate::config::{Config, DEFAULT_TABLE_CAPACITY};
use crate::error::ConfigError;
use crate::format::{fmt_score, with_fmt_buf};
use crate::level::LevelGenerator;
use crate::skiplist::{Direction, SkipList, Walk};
use crate::table::MemberTable;

/// What [`ZSet::add`] did with its argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// The member was not present and has been inserted.
    Added,
    /// The member moved to a new score.
    Updated,
    /// The member already held this score.
    Unchanged,
}

struct Inner {
    index: SkipList,
    table: MemberTable,
}

impl Inner {
    fn new(levels: LevelGenerator, table_capacity: usize) -> Self {
        Self {
            index: SkipList::new(levels),
            table: MemberTable::with_capacity(table_capacity),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        debug_assert_eq!(self.index.len(), self.table.len());
        self.index.len()
    }

    fn add(&mut self, score: f64, member: &str) -> AddOutcome {
        match self.table.entry(member) {
            Some((_, old)) if OrderedFloat(old) == OrderedFloat(score) => AddOutcome::Unchanged,
            Some((key, old)) => {
                let unlinked = self.index.delete(old, member);
                debug_assert!(unlinked.is_some(), "table member missing from index");
                self.index.insert(score, Arc::clone(&key));
                self.table.insert(key, score);
                AddOutcome::Updated
            }
            None => {
                let key: Arc<str> = Arc::from(member);
                self.index.insert(score, Arc::clone(&key));
                self.table.insert(key, score);
                AddOutcome::Added
            }
        }
    }

    fn remove(&mut self, member: &str) -> bool {
        let Some(score) = self.table.remove(member) else {
            return false;
        };
        let unlinked = self.index.delete(score, member);
        debug_assert!(unlinked.is_some(), "table member missing from index");
        true
    }

    fn rank(&self, member: &str) -> Option<usize> {
        let score = self.table.get(member)?;
        self.index.rank(score, member)
    }

    /// Walk over 1-based ranks `r1..=r2`, descending when `r1 > r2`.
    fn range(&self, r1: isize, r2: isize) -> Take<Walk<'_>> {
        if r1 < 1 || r2 < 1 {
            return self.index.walk(None, Direction::Forward).take(0);
        }
        let (direction, len) = if r1 <= r2 {
            (Direction::Forward, r2 - r1 + 1)
        } else {
            (Direction::Backward, r1 - r2 + 1)
        };
        let start = self.index.node_at_rank(r1 as usize);
        self.index.walk(start, direction).take(len as usize)
    }

    /// [`Inner::range`] over ranks mirrored through the set's length.
    fn rev_range(&self, r1: isize, r2: isize) -> Take<Walk<'_>> {
        let count = self.len() as isize;
        let r2 = r2.min(count);
        self.range(mirror(count, r1), mirror(count, r2))
    }

    /// Walk over scores between `s1` and `s2` inclusive, descending when
    /// `s1 > s2`.
    fn range_by_score(&self, s1: f64, s2: f64) -> impl Iterator<Item = (&str, f64)> + '_ {
        let forward = s1 <= s2;
        let (start, direction) = if forward {
            (self.index.first_in_range(s1, s2), Direction::Forward)
        } else {
            (self.index.last_in_range(s2, s1), Direction::Backward)
        };
        self.index
            .walk(start, direction)
            .take_while(move |&(_, score)| if forward { score <= s2 } else { score >= s2 })
    }

    /// Drops ranks `start..=end` from both structures.
    fn trim(&mut self, start: usize, end: usize) -> usize {
        let evicted = self.index.delete_range_by_rank(start, end);
        for member in &evicted {
            self.table.remove(member);
        }
        evicted.len()
    }

    fn clear(&mut self) {
        self.index.clear();
        self.table.clear();
    }
}

#[inline]
fn mirror(count: isize, rank: isize) -> isize {
    count.saturating_sub(rank).saturating_add(1)
}

/// Concurrent sorted set of unique string members ordered by `f64` score.
///
/// Members with equal scores are ordered lexicographically. Scores compare
/// as [`OrderedFloat`], so NaN sorts after `+inf`; score windows use IEEE
/// comparisons and never match a NaN score.
///
/// All methods take `&self`. Writers (`add`, `remove`, `limit`,
/// `rev_limit`, `clear`) hold the guard exclusively, readers share it, and
/// every call runs under a single acquisition.
pub struct ZSet {
    inner: RwLock<Inner>,
}

impl ZSet {
    /// Empty set seeded from OS entropy.
    pub fn new() -> Self {
        Self::from_levels(LevelGenerator::with_seed(None), DEFAULT_TABLE_CAPACITY)
    }

    /// Empty set whose tower layout is fully determined by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_levels(LevelGenerator::with_seed(Some(seed)), DEFAULT_TABLE_CAPACITY)
    }

    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        let levels = LevelGenerator::new(config.seed, config.max_level, config.probability)?;
        if let Some(seed) = config.seed {
            debug!(seed, max_level = config.max_level, "building seeded sorted set");
        }
        Ok(Self::from_levels(levels, config.table_capacity))
    }

    fn from_levels(levels: LevelGenerator, table_capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::new(levels, table_capacity)),
        }
    }

    /// Replays `(member, score)` pairs through [`ZSet::add`].
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let set = Self::new();
        set.add_all(entries);
        set
    }

    /// Adds every pair under one exclusive acquisition.
    pub fn add_all<I, S>(&self, entries: I)
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut inner = self.inner.write();
        for (member, score) in entries {
            inner.add(score, member.as_ref());
        }
    }

    /// Inserts `member` or moves it to `score`.
    pub fn add(&self, score: f64, member: &str) -> AddOutcome {
        self.inner.write().add(score, member)
    }

    /// Returns `false` when the member was not present.
    pub fn remove(&self, member: &str) -> bool {
        self.inner.write().remove(member)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().table.is_empty()
    }

    pub fn contains(&self, member: &str) -> bool {
        self.inner.read().table.contains(member)
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.inner.read().table.get(member)
    }

    /// 1-based position in ascending order.
    pub fn rank(&self, member: &str) -> Option<usize> {
        self.inner.read().rank(member)
    }

    /// 1-based position in descending order.
    pub fn rev_rank(&self, member: &str) -> Option<usize> {
        let inner = self.inner.read();
        let rank = inner.rank(member)?;
        Some(inner.len() - rank + 1)
    }

    /// Members with ranks from `r1` to `r2` inclusive, walking backwards
    /// when `r1 > r2`.
    ///
    /// Empty if either rank is below 1; a window running past the end is
    /// cut short rather than padded.
    pub fn range(&self, r1: isize, r2: isize) -> Vec<String> {
        let inner = self.inner.read();
        inner.range(r1, r2).map(|(m, _)| m.to_owned()).collect()
    }

    pub fn range_with_scores(&self, r1: isize, r2: isize) -> Vec<(String, f64)> {
        let inner = self.inner.read();
        inner.range(r1, r2).map(|(m, s)| (m.to_owned(), s)).collect()
    }

    /// [`ZSet::range`] over descending ranks. `r2` is clamped to the set's
    /// length before the ranks are mirrored.
    pub fn rev_range(&self, r1: isize, r2: isize) -> Vec<String> {
        let inner = self.inner.read();
        inner.rev_range(r1, r2).map(|(m, _)| m.to_owned()).collect()
    }

    pub fn rev_range_with_scores(&self, r1: isize, r2: isize) -> Vec<(String, f64)> {
        let inner = self.inner.read();
        inner
            .rev_range(r1, r2)
            .map(|(m, s)| (m.to_owned(), s))
            .collect()
    }

    /// Members scored between `s1` and `s2`, both inclusive. Ascending when
    /// `s1 <= s2`, descending from `s1` down to `s2` otherwise.
    pub fn range_by_score(&self, s1: f64, s2: f64) -> Vec<String> {
        let inner = self.inner.read();
        inner
            .range_by_score(s1, s2)
            .map(|(m, _)| m.to_owned())
            .collect()
    }

    pub fn range_by_score_with_scores(&self, s1: f64, s2: f64) -> Vec<(String, f64)> {
        let inner = self.inner.read();
        inner
            .range_by_score(s1, s2)
            .map(|(m, s)| (m.to_owned(), s))
            .collect()
    }

    /// Keeps the `count` lowest-ranked members and returns how many were
    /// evicted.
    pub fn limit(&self, count: usize) -> usize {
        let mut inner = self.inner.write();
        let total = inner.len();
        if total <= count {
            return 0;
        }
        let removed = inner.trim(count + 1, total);
        debug!(kept = count, removed, "trimmed sorted set from the top");
        removed
    }

    /// Keeps the `count` highest-ranked members and returns how many were
    /// evicted.
    pub fn rev_limit(&self, count: usize) -> usize {
        let mut inner = self.inner.write();
        let total = inner.len();
        if total <= count {
            return 0;
        }
        let removed = inner.trim(1, total - count);
        debug!(kept = count, removed, "trimmed sorted set from the bottom");
        removed
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        debug!(removed = inner.len(), "clearing sorted set");
        inner.clear();
    }

    /// Ascending `(member, score)` snapshot; feeding it to
    /// [`ZSet::from_entries`] rebuilds an equal set.
    pub fn entries(&self) -> Vec<(String, f64)> {
        let inner = self.inner.read();
        inner.index.iter().map(|(m, s)| (m.to_owned(), s)).collect()
    }

    /// Releases the set. Dropping it has the same effect.
    pub fn dispose(self) {
        debug!(len = self.len(), "disposing sorted set");
    }

    /// Human-readable listing: a header, then `rank member score` per line.
    pub fn dump(&self) -> String {
        let inner = self.inner.read();
        let mut out = format!("zset len={} level={}\n", inner.len(), inner.index.level());
        with_fmt_buf(|buf| {
            for (idx, (member, score)) in inner.index.iter().enumerate() {
                out.push_str(&format!("{} {member} {}\n", idx + 1, fmt_score(buf, score)));
            }
        });
        out
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let inner = self.inner.read();
        inner.index.check_invariants();
        assert_eq!(inner.index.len(), inner.table.len(), "index/table size");
        for (member, score) in inner.table.iter() {
            assert!(
                inner.index.rank(score, member).is_some(),
                "{member} scored {score} is missing from the index"
            );
        }
    }

    #[cfg(test)]
    pub(crate) fn heights(&self) -> Vec<usize> {
        self.inner.read().index.heights()
    }
}

impl Default for ZSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ZSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ZSet")
            .field("len", &inner.len())
            .field("level", &inner.index.level())
            .finish()
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for ZSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

impl<S: AsRef<str>> Extend<(S, f64)> for ZSet {
    fn extend<I: IntoIterator<Item = (S, f64)>>(&mut self, iter: I) {
        self.add_all(iter);
    }
}
