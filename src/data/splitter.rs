// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Holds out a random subset of the nominal training set for
// validation:
//   - Validation set: floor(total * val_fraction) samples
//   - Training set:   everything else
//
// The permutation comes from a StdRng seeded with the run seed,
// so the same seed always yields the same partition.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// # Arguments
/// * `samples`      - All available samples (consumed by this function)
/// * `val_fraction` - Proportion held out for validation, e.g. 0.2 = 20%
///
/// # Returns
/// A tuple (train_samples, val_samples)
pub fn split_train_val<T>(mut samples: Vec<T>, val_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total   = samples.len();
    let n_val   = ((total as f64) * val_fraction).floor() as usize;
    let n_train = total - n_val.min(total);

    // split_off(n) removes elements [n..] from the Vec and returns them
    let val = samples.split_off(n_train);

    tracing::debug!(
        "Dataset split (seed {}): {} training, {} validation",
        seed,
        samples.len(),
        val.len(),
    );

    (samples, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val)      = split_train_val(items, 0.2, 25);
        assert_eq!(train.len(), 80);
        assert_eq!(val.len(),   20);
    }

    #[test]
    fn test_validation_size_is_floored() {
        let items: Vec<usize> = (0..99).collect();
        let (train, val)      = split_train_val(items, 0.2, 25);
        assert_eq!(val.len(),   19);
        assert_eq!(train.len(), 80);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, val)      = split_train_val(items, 0.3, 7);
        let mut all: Vec<usize> = train.into_iter().chain(val).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_partition() {
        let first  = split_train_val((0..1000).collect::<Vec<usize>>(), 0.2, 25);
        let second = split_train_val((0..1000).collect::<Vec<usize>>(), 0.2, 25);
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seed_different_partition() {
        let first  = split_train_val((0..1000).collect::<Vec<usize>>(), 0.2, 25);
        let second = split_train_val((0..1000).collect::<Vec<usize>>(), 0.2, 26);
        assert_ne!(first.1, second.1);
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, val)      = split_train_val(items, 0.2, 25);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }
}
