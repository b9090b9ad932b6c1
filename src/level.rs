use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::ConfigError;

/// Hard ceiling on tower height; enough for 4^32 members at p = 1/4.
pub const MAX_LEVEL: usize = 32;

/// Default chance that a node is promoted one more level.
pub const DEFAULT_PROBABILITY: f64 = 0.25;

/// Draws node heights from a geometric distribution.
///
/// Each skip list owns its own generator, so two lists built from the same
/// seed and fed the same keys end up with identical tower layouts.
#[derive(Debug, Clone)]
pub struct LevelGenerator {
    rng: StdRng,
    max_level: usize,
    probability: f64,
}

impl LevelGenerator {
    /// Fails unless `max_level` is in `1..=MAX_LEVEL` and `probability` is
    /// strictly between 0 and 1.
    pub fn new(
        seed: Option<u64>,
        max_level: usize,
        probability: f64,
    ) -> Result<Self, ConfigError> {
        check_params(max_level, probability)?;
        Ok(Self::build(seed, max_level, probability))
    }

    /// Generator with the default height cap and promotion chance.
    pub fn with_seed(seed: Option<u64>) -> Self {
        Self::build(seed, MAX_LEVEL, DEFAULT_PROBABILITY)
    }

    fn build(seed: Option<u64>, max_level: usize, probability: f64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            max_level,
            probability,
        }
    }

    #[inline]
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Returns a height in `1..=max_level`.
    pub fn next_level(&mut self) -> usize {
        let mut level = 1;
        while level < self.max_level && self.rng.gen_bool(self.probability) {
            level += 1;
        }
        level
    }
}

impl Default for LevelGenerator {
    fn default() -> Self {
        Self::with_seed(None)
    }
}

pub(crate) fn check_params(max_level: usize, probability: f64) -> Result<(), ConfigError> {
    if !(1..=MAX_LEVEL).contains(&max_level) {
        return Err(ConfigError::MaxLevel { value: max_level });
    }
    if !(probability > 0.0 && probability < 1.0) {
        return Err(ConfigError::Probability { value: probability });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_heights() {
        let mut a = LevelGenerator::with_seed(Some(7));
        let mut b = LevelGenerator::with_seed(Some(7));
        let xs: Vec<_> = (0..1_000).map(|_| a.next_level()).collect();
        let ys: Vec<_> = (0..1_000).map(|_| b.next_level()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn heights_stay_in_bounds() {
        let mut gen = LevelGenerator::new(Some(1), 4, 0.9).unwrap();
        for _ in 0..10_000 {
            let level = gen.next_level();
            assert!((1..=4).contains(&level), "level {level}");
        }
    }

    #[test]
    fn distribution_is_roughly_geometric() {
        let mut gen = LevelGenerator::with_seed(Some(42));
        let n = 100_000;
        let promoted = (0..n).filter(|_| gen.next_level() > 1).count();
        let ratio = promoted as f64 / n as f64;
        assert!((0.22..0.28).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        for max_level in [0, MAX_LEVEL + 1, 40] {
            assert_eq!(
                LevelGenerator::new(Some(1), max_level, 0.9).unwrap_err(),
                ConfigError::MaxLevel { value: max_level }
            );
        }
        for probability in [0.0, 1.0, 1.5, -0.25] {
            assert_eq!(
                LevelGenerator::new(Some(1), MAX_LEVEL, probability).unwrap_err(),
                ConfigError::Probability { value: probability }
            );
        }
        assert!(matches!(
            LevelGenerator::new(None, MAX_LEVEL, f64::NAN),
            Err(ConfigError::Probability { .. })
        ));
        assert_eq!(
            LevelGenerator::new(Some(1), MAX_LEVEL, 0.9).unwrap().max_level(),
            MAX_LEVEL
        );
    }
}
