use ordered_float::OrderedFloat;
use quickcheck::{quickcheck, Arbitrary, Gen};
use std::collections::{BTreeSet, HashMap};
use zset::ZSet;

#[derive(Clone, Debug)]
enum Op {
    Add(u8, i8),
    Remove(u8),
    Limit(u8),
    RevLimit(u8),
}

impl Arbitrary for Op {
    fn arbitrary(g: &mut Gen) -> Self {
        match u8::arbitrary(g) % 10 {
            0..=5 => Op::Add(u8::arbitrary(g) % 64, i8::arbitrary(g) % 16),
            6 | 7 => Op::Remove(u8::arbitrary(g) % 64),
            8 => Op::Limit(u8::arbitrary(g) % 48),
            _ => Op::RevLimit(u8::arbitrary(g) % 48),
        }
    }
}

/// Reference model: a sorted set of keys plus a score map.
#[derive(Default)]
struct Model {
    order: BTreeSet<(OrderedFloat<f64>, String)>,
    scores: HashMap<String, f64>,
}

impl Model {
    fn add(&mut self, score: f64, member: &str) {
        if let Some(old) = self.scores.insert(member.to_owned(), score) {
            self.order.remove(&(OrderedFloat(old), member.to_owned()));
        }
        self.order.insert((OrderedFloat(score), member.to_owned()));
    }

    fn remove(&mut self, member: &str) {
        if let Some(old) = self.scores.remove(member) {
            self.order.remove(&(OrderedFloat(old), member.to_owned()));
        }
    }

    fn keep(&mut self, keep: Vec<(OrderedFloat<f64>, String)>) {
        self.order = keep.into_iter().collect();
        self.scores = self
            .order
            .iter()
            .map(|(s, m)| (m.clone(), s.0))
            .collect();
    }

    fn members(&self) -> Vec<String> {
        self.order.iter().map(|(_, m)| m.clone()).collect()
    }
}

fn apply(ops: &[Op]) -> (ZSet, Model) {
    let set = ZSet::with_seed(17);
    let mut model = Model::default();
    for op in ops {
        match *op {
            Op::Add(m, s) => {
                let member = format!("m{m}");
                set.add(f64::from(s), &member);
                model.add(f64::from(s), &member);
            }
            Op::Remove(m) => {
                let member = format!("m{m}");
                set.remove(&member);
                model.remove(&member);
            }
            Op::Limit(n) => {
                let n = n as usize;
                let expected = model.order.len().saturating_sub(n);
                assert_eq!(set.limit(n), expected);
                let keep = model.order.iter().take(n).cloned().collect();
                model.keep(keep);
            }
            Op::RevLimit(n) => {
                let n = n as usize;
                let expected = model.order.len().saturating_sub(n);
                assert_eq!(set.rev_limit(n), expected);
                let keep = model.order.iter().rev().take(n).cloned().collect();
                model.keep(keep);
            }
        }
    }
    (set, model)
}

/// Members at 1-based ranks `r1..=r2`, walking backwards when `r1 > r2`.
fn rank_window(members: &[String], r1: isize, r2: isize) -> Vec<String> {
    if r1 < 1 || r2 < 1 {
        return Vec::new();
    }
    let (r1, r2) = (r1 as usize, r2 as usize);
    if r1 <= r2 {
        members.iter().skip(r1 - 1).take(r2 - r1 + 1).cloned().collect()
    } else if r1 <= members.len() {
        members[..r1].iter().rev().take(r1 - r2 + 1).cloned().collect()
    } else {
        Vec::new()
    }
}

quickcheck! {
    fn matches_model_order(ops: Vec<Op>) -> bool {
        let (set, model) = apply(&ops);
        set.len() == model.order.len()
            && set.range(1, set.len().max(1) as isize) == model.members()
    }

    fn ranks_match_positions(ops: Vec<Op>) -> bool {
        let (set, model) = apply(&ops);
        let len = model.order.len();
        model.order.iter().enumerate().all(|(idx, (score, member))| {
            set.rank(member) == Some(idx + 1)
                && set.rev_rank(member) == Some(len - idx)
                && set.score(member) == Some(score.0)
        })
    }

    fn rank_windows_match_model(ops: Vec<Op>, r1: u8, r2: u8) -> bool {
        let (set, model) = apply(&ops);
        let (r1, r2) = (r1 as isize % 70 + 1, r2 as isize % 70 + 1);
        set.range(r1, r2) == rank_window(&model.members(), r1, r2)
    }

    fn rev_range_windows_match_model(ops: Vec<Op>, r1: i8, r2: i8) -> bool {
        let (set, model) = apply(&ops);
        let members = model.members();
        let count = members.len() as isize;
        let (r1, r2) = (r1 as isize % 72, r2 as isize % 72);
        let reverse_rank = |r: isize| count - r + 1;
        let expected = rank_window(&members, reverse_rank(r1), reverse_rank(r2.min(count)));
        set.rev_range(r1, r2) == expected
    }

    fn score_windows_match_model(ops: Vec<Op>, lo: i8, hi: i8) -> bool {
        let (set, model) = apply(&ops);
        let (s1, s2) = (f64::from(lo % 20), f64::from(hi % 20));
        let (min, max) = if s1 <= s2 { (s1, s2) } else { (s2, s1) };
        let mut expected: Vec<String> = model
            .order
            .iter()
            .filter(|(s, _)| s.0 >= min && s.0 <= max)
            .map(|(_, m)| m.clone())
            .collect();
        if s1 > s2 {
            expected.reverse();
        }
        set.range_by_score(s1, s2) == expected
    }
}
