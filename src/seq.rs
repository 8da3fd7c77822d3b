//! Sequence helpers: index search, shuffling and class-index predicates.

use rand::Rng;

/// Every index whose element satisfies `predicate`, ascending.
pub fn find_all_indices<T>(items: &[T], mut predicate: impl FnMut(&T) -> bool) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, v)| predicate(v).then_some(i))
        .collect()
}

/// Every index whose element equals `value`, ascending.
pub fn find_all_indices_of<'a, T, I>(items: I, value: &T) -> Vec<usize>
where
    T: PartialEq + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| (v == value).then_some(i))
        .collect()
}

/// In-place Fisher–Yates shuffle. Uniform over all permutations when `rng`
/// is uniform.
pub fn shuffle<T, R: Rng + ?Sized>(rng: &mut R, items: &mut [T]) {
    let mut n = items.len();
    while n > 1 {
        let k = rng.random_range(0..n);
        n -= 1;
        items.swap(n, k);
    }
}

// ============================================================================
// Class-index predicates
// ============================================================================

/// Class index of target trials.
pub const TARGET_CLASS: i32 = 1;
/// Class index of non-target trials.
pub const NONTARGET_CLASS: i32 = 0;

pub fn is_target(class_idx: i32) -> bool {
    class_idx == TARGET_CLASS
}

pub fn is_nontarget(class_idx: i32) -> bool {
    class_idx == NONTARGET_CLASS
}

pub fn is_class(class_idx: i32, expected: i32) -> bool {
    class_idx == expected
}
