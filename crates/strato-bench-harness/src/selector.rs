//! Per-round perturbation selection

use rand::Rng;
use strato_bench_core::NodeHandle;

/// Nodes picked for one round
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    /// Nodes the mutator shifts
    pub to_change: Vec<NodeHandle>,
    /// Subset of `to_change` whose layout completion is timed
    pub to_sample: Vec<NodeHandle>,
}

/// Draw `min(m, |candidates|)` distinct nodes to change, then
/// `min(p, |to_change|)` distinct nodes of those to sample.
///
/// Every draw is uniform without replacement.
pub fn select<R: Rng + ?Sized>(candidates: &[NodeHandle], m: usize, p: usize, rng: &mut R) -> Selection {
    let mut pool = candidates.to_vec();
    let to_change = draw(&mut pool, m, rng);

    let mut pool = to_change.clone();
    let to_sample = draw(&mut pool, p, rng);

    Selection {
        to_change,
        to_sample,
    }
}

/// Remove up to `count` random entries from `pool`.
fn draw<R: Rng + ?Sized>(pool: &mut Vec<NodeHandle>, count: usize, rng: &mut R) -> Vec<NodeHandle> {
    let count = count.min(pool.len());
    let mut picked = Vec::with_capacity(count);
    for _ in 0..count {
        let index = rng.random_range(0..pool.len());
        picked.push(pool.swap_remove(index));
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn handles(n: usize) -> Vec<NodeHandle> {
        (0..n).map(NodeHandle::new).collect()
    }

    #[test]
    fn test_select_sizes() {
        let mut rng = SmallRng::seed_from_u64(1);
        let selection = select(&handles(1000), 100, 1, &mut rng);
        assert_eq!(selection.to_change.len(), 100);
        assert_eq!(selection.to_sample.len(), 1);
        assert!(selection.to_change.contains(&selection.to_sample[0]));
    }

    #[test]
    fn test_select_clamps_to_pool() {
        let mut rng = SmallRng::seed_from_u64(2);
        let selection = select(&handles(3), 10, 10, &mut rng);
        assert_eq!(selection.to_change.len(), 3);
        assert_eq!(selection.to_sample.len(), 3);

        let empty = select(&[], 5, 1, &mut rng);
        assert_eq!(empty, Selection::default());
    }

    #[test]
    fn test_full_draw_is_a_permutation() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut selection = select(&handles(50), 50, 0, &mut rng);
        selection.to_change.sort();
        assert_eq!(selection.to_change, handles(50));
        assert!(selection.to_sample.is_empty());
    }

    #[test]
    fn test_same_seed_same_selection() {
        let candidates = handles(500);
        let a = select(&candidates, 20, 5, &mut SmallRng::seed_from_u64(42));
        let b = select(&candidates, 20, 5, &mut SmallRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_selection_is_distinct_and_nested(
            n in 0usize..300,
            m in 0usize..400,
            p in 0usize..400,
            seed in any::<u64>(),
        ) {
            let candidates = handles(n);
            let mut rng = SmallRng::seed_from_u64(seed);
            let selection = select(&candidates, m, p, &mut rng);

            prop_assert_eq!(selection.to_change.len(), m.min(n));
            prop_assert_eq!(selection.to_sample.len(), p.min(selection.to_change.len()));

            let changed: HashSet<_> = selection.to_change.iter().copied().collect();
            prop_assert_eq!(changed.len(), selection.to_change.len());
            let sampled: HashSet<_> = selection.to_sample.iter().copied().collect();
            prop_assert_eq!(sampled.len(), selection.to_sample.len());
            prop_assert!(sampled.is_subset(&changed));
            prop_assert!(selection.to_change.iter().all(|h| h.index() < n));
        }
    }
}
