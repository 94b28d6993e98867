//! Weighted discrete distributions over arbitrary items.

use rand::RngCore;
use rand::distributions::{Distribution, WeightedIndex};

/// A finite set of items, each drawn with probability proportional to its
/// weight. Zero-weight items are dropped at construction.
#[derive(Debug, Clone)]
pub struct DiscreteDistribution<T> {
    items: Vec<T>,
    index: WeightedIndex<f64>,
}

impl<T> DiscreteDistribution<T> {
    /// Returns `None` if no item has a finite, positive weight.
    pub fn new(weighted: impl IntoIterator<Item = (T, f64)>) -> Option<Self> {
        let (items, weights): (Vec<T>, Vec<f64>) = weighted
            .into_iter()
            .filter(|(_, w)| w.is_finite() && *w > 0.0)
            .unzip();
        let index = WeightedIndex::new(&weights).ok()?;
        Some(Self { items, index })
    }

    pub fn sample(&self, rng: &mut dyn RngCore) -> &T {
        &self.items[self.index.sample(rng)]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_zero_weights_dropped() {
        let dist = DiscreteDistribution::new([("a", 0.0), ("b", 2.0), ("c", f64::NAN)]).unwrap();
        assert_eq!(dist.items(), &["b"]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(*dist.sample(&mut rng), "b");
    }

    #[test]
    fn test_all_zero_is_none() {
        assert!(DiscreteDistribution::new([("a", 0.0)]).is_none());
        assert!(DiscreteDistribution::<u8>::new([]).is_none());
    }

    #[test]
    fn test_sampling_follows_weights() {
        let dist = DiscreteDistribution::new([(0usize, 1.0), (1usize, 3.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0usize; 2];
        for _ in 0..4000 {
            counts[*dist.sample(&mut rng)] += 1;
        }
        let ratio = counts[1] as f64 / 4000.0;
        assert!((ratio - 0.75).abs() < 0.05, "ratio {ratio}");
    }
}
