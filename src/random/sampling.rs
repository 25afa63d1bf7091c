//! Uniform sampling without replacement from slices of agent ids.

use rand::seq::index::sample as choose_range;
use rand::Rng;

/// Samples `requested` elements uniformly without replacement, preserving the order in which
/// they appear in `items`. If more samples are requested than exist, every element is returned.
pub fn sample_multiple_from_known_length<R, T>(rng: &mut R, items: &[T], requested: usize) -> Vec<T>
where
    R: Rng,
    T: Copy,
{
    if requested >= items.len() {
        return items.to_vec();
    }
    if requested == 0 {
        return Vec::new();
    }
    let mut indexes = choose_range(rng, items.len(), requested).into_vec();
    indexes.sort_unstable();
    indexes.into_iter().map(|idx| items[idx]).collect()
}

/// Samples a single element uniformly, or `None` if `items` is empty.
pub fn sample_single<R, T>(rng: &mut R, items: &[T]) -> Option<T>
where
    R: Rng,
    T: Copy,
{
    if items.is_empty() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let index = rng.random_range(0..items.len() as u32) as usize;
    Some(items[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use rustc_hash::FxHashSet;

    #[test]
    fn sample_multiple_returns_distinct_members() {
        let mut rng = SmallRng::seed_from_u64(42);
        let items: Vec<u32> = (0..100).collect();
        let sample = sample_multiple_from_known_length(&mut rng, &items, 10);
        assert_eq!(sample.len(), 10);
        let unique: FxHashSet<u32> = sample.iter().copied().collect();
        assert_eq!(unique.len(), 10);
        assert!(sample.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn sample_multiple_oversized_request_returns_all() {
        let mut rng = SmallRng::seed_from_u64(42);
        let items = [3, 1, 2];
        assert_eq!(sample_multiple_from_known_length(&mut rng, &items, 5), vec![3, 1, 2]);
    }

    #[test]
    fn sample_single_empty() {
        let mut rng = SmallRng::seed_from_u64(42);
        let items: [u8; 0] = [];
        assert_eq!(sample_single(&mut rng, &items), None);
    }

    #[test]
    fn sample_single_is_roughly_uniform() {
        let mut rng = SmallRng::seed_from_u64(42);
        let items = [0usize, 1, 2, 3];
        let mut counts = [0usize; 4];
        for _ in 0..40_000 {
            counts[sample_single(&mut rng, &items).unwrap()] += 1;
        }
        for count in counts {
            assert!((9_000..11_000).contains(&count), "count {count}");
        }
    }
}
