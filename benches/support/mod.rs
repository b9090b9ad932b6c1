#![allow(dead_code)]

use std::{sync::Mutex, time::Duration};

use once_cell::sync::Lazy;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use zset::ZSet;

static BASE_SEED: Lazy<u64> = Lazy::new(|| {
    std::env::var("ZSET_BENCH_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0x7d11_5eed_f065_cafe)
});

static RNG_COUNTER: Lazy<Mutex<u64>> = Lazy::new(|| Mutex::new(0));

pub fn usize_env(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

pub fn duration_env(name: &str, default_secs: f64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(default_secs);
    Duration::from_secs_f64(secs)
}

#[inline]
pub fn seeded_rng() -> StdRng {
    let mut guard = RNG_COUNTER.lock().unwrap();
    let seed = BASE_SEED.wrapping_add(*guard);
    *guard = guard.wrapping_add(1);
    StdRng::seed_from_u64(seed)
}

pub fn unique_increasing(n: usize) -> Vec<(f64, String)> {
    (0..n).map(|i| (i as f64, format!("member:{i}"))).collect()
}

pub fn uniform_random(n: usize, score_range: f64) -> Vec<(f64, String)> {
    let mut rng = seeded_rng();
    (0..n)
        .map(|i| (rng.gen_range(0.0..score_range), format!("rand:{i}")))
        .collect()
}

pub fn same_score(n: usize, score: f64) -> Vec<(f64, String)> {
    (0..n).map(|i| (score, format!("same:{i}"))).collect()
}

pub fn build_set(entries: &[(f64, String)]) -> ZSet {
    let set = ZSet::with_seed(*BASE_SEED);
    set.add_all(entries.iter().map(|(score, member)| (member.as_str(), *score)));
    set
}

pub fn pick_members(entries: &[(f64, String)], k: usize) -> Vec<String> {
    let mut rng = seeded_rng();
    let mut names: Vec<String> = entries.iter().map(|(_, m)| m.clone()).collect();
    names.shuffle(&mut rng);
    names.truncate(names.len().min(k));
    names
}
