use crate::consts;
use crate::dataset::Sample;

/// Per-feature "almost always zero" flags. With partial FM on, flagged features
/// are left out of every interaction term; the linear term always sees all features.
#[derive(Clone, Debug)]
pub struct FeatureFlags {
    pub sparse: Vec<bool>,
    pub partial_fm: bool,
}

impl FeatureFlags {
    /// Nothing excluded, used when there is no training data to look at (test mode)
    pub fn new_all_dense(feature_count: usize) -> FeatureFlags {
        FeatureFlags {
            sparse: vec![false; feature_count],
            partial_fm: false,
        }
    }

    pub fn new_from_samples(
        samples: &[Sample],
        feature_count: usize,
        partial_fm: bool,
    ) -> FeatureFlags {
        let mut zero_counts = vec![0usize; feature_count];
        for sample in samples {
            for (k, x) in sample.features.iter().enumerate() {
                if x.abs() < consts::FEATURE_ZERO_EPSILON {
                    zero_counts[k] += 1;
                }
            }
        }

        let ratio_threshold = consts::SPARSE_ZERO_RATIO_THRESHOLD * samples.len() as f32;
        let sparse: Vec<bool> = zero_counts
            .iter()
            .map(|&zeros| {
                zeros > consts::SPARSE_ZERO_COUNT_THRESHOLD && zeros as f32 > ratio_threshold
            })
            .collect();

        log::debug!(
            "{} of {} features are almost always zero",
            sparse.iter().filter(|s| **s).count(),
            feature_count
        );
        FeatureFlags { sparse, partial_fm }
    }

    #[inline(always)]
    pub fn is_excluded(&self, k: usize) -> bool {
        self.partial_fm && self.sparse[k]
    }

    pub fn excluded_count(&self) -> usize {
        (0..self.sparse.len()).filter(|k| self.is_excluded(*k)).count()
    }
}
