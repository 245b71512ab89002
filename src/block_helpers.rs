use crate::consts::FEATURE_ZERO_EPSILON;
use crate::feature_flags::FeatureFlags;

#[macro_export]
macro_rules! assert_epsilon {
    ($x:expr, $y:expr) => {
        let x = $x; // Make sure we evaluate only once
        let y = $y;
        if !(x - y < 0.000005 && y - x < 0.000005) {
            println!("Expectation: {}, Got: {}", y, x);
            panic!();
        }
    };
}

/// (index, value) of the features that take part in interaction terms:
/// not excluded by partial FM and not (almost) zero
#[inline(always)]
pub fn interaction_features<'a>(
    x: &'a [f32],
    flags: &'a FeatureFlags,
) -> impl Iterator<Item = (usize, f32)> + 'a {
    x.iter()
        .enumerate()
        .filter(move |(k, value)| !flags.is_excluded(*k) && value.abs() >= FEATURE_ZERO_EPSILON)
        .map(|(k, value)| (k, *value))
}

/// Feature indices whose factors are trained, i.e. everything partial FM does not exclude
#[inline(always)]
pub fn trained_factor_indices(flags: &FeatureFlags) -> impl Iterator<Item = usize> + '_ {
    (0..flags.sparse.len()).filter(move |k| !flags.is_excluded(*k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_features() {
        let x = vec![1.0, 0.0, 1e-7, -2.0, 3.0];
        let mut flags = FeatureFlags::new_all_dense(5);
        let active: Vec<(usize, f32)> = interaction_features(&x, &flags).collect();
        assert_eq!(active, vec![(0, 1.0), (3, -2.0), (4, 3.0)]);

        flags.sparse[3] = true;
        assert_eq!(interaction_features(&x, &flags).count(), 3);
        flags.partial_fm = true;
        let active: Vec<usize> = interaction_features(&x, &flags).map(|(k, _)| k).collect();
        assert_eq!(active, vec![0, 4]);
        let trained: Vec<usize> = trained_factor_indices(&flags).collect();
        assert_eq!(trained, vec![0, 1, 2, 4]);
    }
}
