//! Score index: a skip list ordered by `(score, member)`.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Slot 0 is
//! the head sentinel, which carries a link for every level the generator can
//! produce. Every link records its span, the number of level-0 steps it
//! covers, which is what makes rank lookups logarithmic. A link with no
//! forward node spans the nodes remaining to the end of the list.

use ordered_float::OrderedFloat;
use smallvec::{smallvec, SmallVec};
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::sync::Arc;
use tracing::trace;

use crate::level::{LevelGenerator, MAX_LEVEL};

pub type NodeId = u32;

const HEAD: NodeId = 0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Link {
    forward: Option<NodeId>,
    span: usize,
}

#[derive(Debug)]
struct Node {
    member: Arc<str>,
    score: f64,
    backward: Option<NodeId>,
    links: SmallVec<[Link; 4]>,
}

impl Node {
    #[inline]
    fn cmp_key(&self, score: f64, member: &str) -> Ordering {
        OrderedFloat(self.score)
            .cmp(&OrderedFloat(score))
            .then_with(|| (*self.member).cmp(member))
    }
}

/// Which way a [`Walk`] follows the level-0 chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug)]
pub struct SkipList {
    nodes: Vec<Option<Node>>,
    free: Vec<NodeId>,
    tail: Option<NodeId>,
    level: usize,
    length: usize,
    levels: LevelGenerator,
}

impl SkipList {
    pub fn new(levels: LevelGenerator) -> Self {
        let head = Node {
            member: Arc::from(""),
            score: 0.0,
            backward: None,
            links: smallvec![Link::default(); levels.max_level()],
        };
        Self {
            nodes: vec![Some(head)],
            free: Vec::new(),
            tail: None,
            level: 1,
            length: 0,
            levels,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of levels currently linked from the head.
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    #[inline]
    pub fn first(&self) -> Option<NodeId> {
        self.link(HEAD, 0).forward
    }

    #[inline]
    pub fn last(&self) -> Option<NodeId> {
        self.tail
    }

    #[inline]
    pub fn member(&self, id: NodeId) -> &str {
        &self.node(id).member
    }

    #[inline]
    pub fn score(&self, id: NodeId) -> f64 {
        self.node(id).score
    }

    /// Links a new node for `(score, member)`.
    ///
    /// The caller guarantees the key is not already present.
    pub fn insert(&mut self, score: f64, member: Arc<str>) -> NodeId {
        let mut update = [HEAD; MAX_LEVEL];
        let mut rank = [0usize; MAX_LEVEL];
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            rank[i] = if i + 1 == self.level { 0 } else { rank[i + 1] };
            while let Some(next) = self.link(x, i).forward {
                if self.node(next).cmp_key(score, &member) != Ordering::Less {
                    break;
                }
                rank[i] += self.link(x, i).span;
                x = next;
            }
            update[i] = x;
        }
        debug_assert!(
            self.link(x, 0)
                .forward
                .map_or(true, |n| self.node(n).cmp_key(score, &member) != Ordering::Equal),
            "duplicate key inserted into skip list"
        );

        let height = self.levels.next_level();
        if height > self.level {
            for i in self.level..height {
                rank[i] = 0;
                update[i] = HEAD;
                self.link_mut(HEAD, i).span = self.length;
            }
            trace!(from = self.level, to = height, "skip list level grew");
            self.level = height;
        }

        let id = self.alloc(Node {
            member,
            score,
            backward: None,
            links: smallvec![Link::default(); height],
        });
        for i in 0..height {
            let prev = self.link(update[i], i);
            let passed = rank[0] - rank[i];
            *self.link_mut(id, i) = Link {
                forward: prev.forward,
                span: prev.span - passed,
            };
            *self.link_mut(update[i], i) = Link {
                forward: Some(id),
                span: passed + 1,
            };
        }
        for i in height..self.level {
            self.link_mut(update[i], i).span += 1;
        }

        self.node_mut(id).backward = (update[0] != HEAD).then_some(update[0]);
        match self.link(id, 0).forward {
            Some(next) => self.node_mut(next).backward = Some(id),
            None => self.tail = Some(id),
        }
        self.length += 1;
        id
    }

    /// Unlinks the node holding exactly `(score, member)` and hands back its
    /// member, or `None` when no such node exists.
    pub fn delete(&mut self, score: f64, member: &str) -> Option<Arc<str>> {
        let mut update = [HEAD; MAX_LEVEL];
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                if self.node(next).cmp_key(score, member) != Ordering::Less {
                    break;
                }
                x = next;
            }
            update[i] = x;
        }
        let target = self.link(x, 0).forward?;
        if self.node(target).cmp_key(score, member) != Ordering::Equal {
            return None;
        }
        self.unlink(target, &update);
        Some(self.release(target).member)
    }

    /// Removes every node whose 1-based rank lies in `start..=end` and
    /// returns their members in ascending order.
    pub fn delete_range_by_rank(&mut self, start: usize, end: usize) -> Vec<Arc<str>> {
        let end = end.min(self.length);
        if start == 0 || start > end {
            return Vec::new();
        }
        let mut update = [HEAD; MAX_LEVEL];
        let mut traversed = 0usize;
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                let span = self.link(x, i).span;
                if traversed + span >= start {
                    break;
                }
                traversed += span;
                x = next;
            }
            update[i] = x;
        }

        let mut removed = Vec::with_capacity(end - start + 1);
        let mut cursor = self.link(x, 0).forward;
        traversed += 1;
        while let Some(id) = cursor {
            if traversed > end {
                break;
            }
            cursor = self.link(id, 0).forward;
            self.unlink(id, &update);
            removed.push(self.release(id).member);
            traversed += 1;
        }
        removed
    }

    /// 1-based rank of `(score, member)`.
    pub fn rank(&self, score: f64, member: &str) -> Option<usize> {
        let mut rank = 0usize;
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                if self.node(next).cmp_key(score, member) == Ordering::Greater {
                    break;
                }
                rank += self.link(x, i).span;
                x = next;
            }
            if x != HEAD && self.node(x).cmp_key(score, member) == Ordering::Equal {
                return Some(rank);
            }
        }
        None
    }

    /// Node sitting at 1-based `rank`.
    pub fn node_at_rank(&self, rank: usize) -> Option<NodeId> {
        if rank == 0 || rank > self.length {
            return None;
        }
        let mut traversed = 0usize;
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                let span = self.link(x, i).span;
                if traversed + span > rank {
                    break;
                }
                traversed += span;
                x = next;
            }
            if traversed == rank {
                return Some(x);
            }
        }
        None
    }

    /// Lowest-ranked node with `min <= score <= max`.
    pub fn first_in_range(&self, min: f64, max: f64) -> Option<NodeId> {
        if !(min <= max) {
            return None;
        }
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                if !(self.node(next).score < min) {
                    break;
                }
                x = next;
            }
        }
        let first = self.link(x, 0).forward?;
        let score = self.node(first).score;
        (score >= min && score <= max).then_some(first)
    }

    /// Highest-ranked node with `min <= score <= max`.
    pub fn last_in_range(&self, min: f64, max: f64) -> Option<NodeId> {
        if !(min <= max) {
            return None;
        }
        let mut x = HEAD;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                if !(self.node(next).score <= max) {
                    break;
                }
                x = next;
            }
        }
        if x == HEAD {
            return None;
        }
        (self.node(x).score >= min).then_some(x)
    }

    /// Iterates `(member, score)` pairs starting at `from` (inclusive).
    pub fn walk(&self, from: Option<NodeId>, direction: Direction) -> Walk<'_> {
        Walk {
            list: self,
            cursor: from,
            direction,
        }
    }

    pub fn iter(&self) -> Walk<'_> {
        self.walk(self.first(), Direction::Forward)
    }

    /// Drops every node but keeps the level generator's state.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.free.clear();
        for link in self.node_mut(HEAD).links.iter_mut() {
            *link = Link::default();
        }
        self.tail = None;
        self.level = 1;
        self.length = 0;
    }

    fn unlink(&mut self, id: NodeId, update: &[NodeId; MAX_LEVEL]) {
        for i in 0..self.level {
            if self.link(update[i], i).forward == Some(id) {
                let gone = self.link(id, i);
                let link = self.link_mut(update[i], i);
                link.span = link.span + gone.span - 1;
                link.forward = gone.forward;
            } else {
                self.link_mut(update[i], i).span -= 1;
            }
        }
        let (backward, next) = {
            let node = self.node(id);
            (node.backward, node.links[0].forward)
        };
        match next {
            Some(next) => self.node_mut(next).backward = backward,
            None => self.tail = backward,
        }
        let before = self.level;
        while self.level > 1 && self.link(HEAD, self.level - 1).forward.is_none() {
            self.level -= 1;
        }
        if self.level != before {
            trace!(from = before, to = self.level, "skip list level shrank");
        }
        self.length -= 1;
    }

    #[inline]
    fn node(&self, id: NodeId) -> &Node {
        self.nodes
            .get(id as usize)
            .and_then(|slot| slot.as_ref())
            .expect("invalid node id")
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes
            .get_mut(id as usize)
            .and_then(|slot| slot.as_mut())
            .expect("invalid node id")
    }

    #[inline]
    fn link(&self, id: NodeId, level: usize) -> Link {
        self.node(id).links[level]
    }

    #[inline]
    fn link_mut(&mut self, id: NodeId, level: usize) -> &mut Link {
        &mut self.node_mut(id).links[level]
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            let slot = self
                .nodes
                .get_mut(id as usize)
                .expect("reused node id out of bounds");
            debug_assert!(slot.is_none(), "reused node slot must be empty");
            *slot = Some(node);
            id
        } else {
            let id = NodeId::try_from(self.nodes.len()).expect("too many nodes in skip list");
            self.nodes.push(Some(node));
            id
        }
    }

    fn release(&mut self, id: NodeId) -> Node {
        debug_assert_ne!(id, HEAD, "head sentinel is never released");
        let node = self
            .nodes
            .get_mut(id as usize)
            .and_then(Option::take)
            .expect("invalid node id");
        self.free.push(id);
        node
    }

    /// Tower height of every node in ascending order.
    #[cfg(test)]
    pub(crate) fn heights(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.length);
        let mut cursor = self.first();
        while let Some(id) = cursor {
            let node = self.node(id);
            out.push(node.links.len());
            cursor = node.links[0].forward;
        }
        out
    }

    /// Audits ordering, back links, length and every span.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        use std::collections::HashMap;

        let mut pos: HashMap<NodeId, usize> = HashMap::new();
        pos.insert(HEAD, 0);
        let mut prev = HEAD;
        let mut cursor = self.first();
        while let Some(id) = cursor {
            let node = self.node(id);
            if prev != HEAD {
                let p = self.node(prev);
                assert_eq!(
                    p.cmp_key(node.score, &node.member),
                    Ordering::Less,
                    "keys out of order at {}",
                    node.member
                );
                assert_eq!(node.backward, Some(prev), "bad back link at {}", node.member);
            } else {
                assert_eq!(node.backward, None, "first node must not link back");
            }
            pos.insert(id, pos.len());
            prev = id;
            cursor = node.links[0].forward;
        }
        assert_eq!(pos.len() - 1, self.length, "length mismatch");
        assert_eq!(self.tail, (prev != HEAD).then_some(prev), "tail mismatch");

        for i in 0..self.level {
            let mut x = HEAD;
            loop {
                let link = self.link(x, i);
                match link.forward {
                    Some(next) => {
                        assert_eq!(link.span, pos[&next] - pos[&x], "span at level {i}");
                        x = next;
                    }
                    None => {
                        assert_eq!(link.span, self.length - pos[&x], "tail span at level {i}");
                        break;
                    }
                }
            }
        }
        if self.level > 1 {
            assert!(
                self.link(HEAD, self.level - 1).forward.is_some(),
                "top level must be in use"
            );
        }
    }
}

/// Level-0 traversal over a [`SkipList`].
#[derive(Clone, Debug)]
pub struct Walk<'a> {
    list: &'a SkipList,
    cursor: Option<NodeId>,
    direction: Direction,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (&'a str, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let list = self.list;
        let node = list.node(id);
        self.cursor = match self.direction {
            Direction::Forward => node.links[0].forward,
            Direction::Backward => node.backward,
        };
        Some((&*node.member, node.score))
    }
}
