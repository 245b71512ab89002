use std::any::Any;

use crate::block_fm::BlockFM;
use crate::block_lr::BlockLR;
use crate::dataset::LabelRange;
use crate::feature_flags::FeatureFlags;
use crate::model_instance::{ModelInstance, RegularizationNorm};
use crate::optimizer::{OptimizerMomentumL2, OptimizerProximalL1};
use crate::parameters::{ModelShape, Parameters};
use crate::port_buffer::PortBuffer;

/// A slice of the model. Blocks own no weights, they read and write their part of `Parameters`.
pub trait BlockTrait {
    fn as_any(&mut self) -> &mut dyn Any; // This enables downcasting
    fn get_name(&self) -> String;

    /// Contribution to the raw score. May leave intermediate results in `pb` for `backward`.
    fn forward(
        &self,
        weights: &Parameters,
        x: &[f32],
        flags: &FeatureFlags,
        pb: &mut PortBuffer,
    ) -> f32;

    /// Adds d(loss)/d(parameter) to `gradients`; `error_gradient` is d(loss)/d(score)
    fn backward(
        &self,
        weights: &Parameters,
        x: &[f32],
        flags: &FeatureFlags,
        pb: &PortBuffer,
        error_gradient: f32,
        gradients: &mut Parameters,
    );

    fn update(
        &self,
        weights: &mut Parameters,
        gradients: &Parameters,
        momentum: &mut Parameters,
        flags: &FeatureFlags,
    );

    fn penalty(&self, weights: &Parameters, flags: &FeatureFlags) -> f32;
}

pub struct Regressor {
    pub regressor_name: String,
    pub weights: Parameters,
    pub feature_flags: FeatureFlags,
    pub label_range: LabelRange,
    pub blocks_boxes: Vec<Box<dyn BlockTrait>>,
}

impl Regressor {
    pub fn new(
        mi: &ModelInstance,
        weights: Parameters,
        feature_flags: FeatureFlags,
        label_range: LabelRange,
    ) -> Regressor {
        let shape = weights.shape();
        let blocks_boxes: Vec<Box<dyn BlockTrait>> = match mi.regularization_norm {
            RegularizationNorm::L1 => vec![
                BlockLR::<OptimizerProximalL1>::new_without_weights(mi),
                BlockFM::<OptimizerProximalL1>::new_without_weights(mi, shape),
            ],
            RegularizationNorm::L2 => vec![
                BlockLR::<OptimizerMomentumL2>::new_without_weights(mi),
                BlockFM::<OptimizerMomentumL2>::new_without_weights(mi, shape),
            ],
        };

        let mut rg = Regressor {
            regressor_name: String::new(),
            weights,
            feature_flags,
            label_range,
            blocks_boxes,
        };
        rg.regressor_name = format!(
            "Regressor with blocks: {}",
            rg.blocks_boxes
                .iter()
                .map(|b| b.get_name())
                .collect::<Vec<String>>()
                .join(", ")
        );
        rg
    }

    pub fn shape(&self) -> ModelShape {
        self.weights.shape()
    }

    pub fn new_port_buffer(&self) -> PortBuffer {
        PortBuffer::new(self.shape())
    }

    /// Score clamped to the label range. `pb` keeps the score and the interaction sums
    /// that `accumulate_gradients` needs for the same sample.
    pub fn predict(&self, x: &[f32], pb: &mut PortBuffer) -> f32 {
        pb.reset();
        let mut wsum: f32 = 0.0;
        for block in self.blocks_boxes.iter() {
            wsum += block.forward(&self.weights, x, &self.feature_flags, pb);
        }
        pb.score = self.label_range.clamp(wsum);
        pb.score
    }

    /// Squared error gradients, accumulated. `pb` must come from `predict` on the same `x`
    /// with the current weights.
    pub fn accumulate_gradients(
        &self,
        x: &[f32],
        label: i32,
        pb: &PortBuffer,
        gradients: &mut Parameters,
    ) {
        let error_gradient = 2.0 * (pb.score - label as f32);
        for block in self.blocks_boxes.iter() {
            block.backward(
                &self.weights,
                x,
                &self.feature_flags,
                pb,
                error_gradient,
                gradients,
            );
        }
    }

    pub fn update(&mut self, gradients: &Parameters, momentum: &mut Parameters) {
        for block in self.blocks_boxes.iter() {
            block.update(&mut self.weights, gradients, momentum, &self.feature_flags);
        }
    }

    /// L1 or L2 norm of all regularized parameters, not multiplied by the regularization factor
    pub fn regularization_penalty(&self) -> f32 {
        self.blocks_boxes
            .iter()
            .map(|block| block.penalty(&self.weights, &self.feature_flags))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_epsilon;
    use crate::dataset::Sample;
    use rand_xoshiro::rand_core::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn wide_range() -> LabelRange {
        LabelRange {
            min: -1000,
            max: 1000,
        }
    }

    fn pair_regressor(mi: &ModelInstance) -> Regressor {
        // one pair, one component: score = w0 + w.x + v0*x0*v1*x1
        let shape = ModelShape::new(2, 1, 2);
        let mut p = Parameters::zeroed(shape);
        p.w0 = 0.5;
        p.w = vec![1.0, -1.0];
        p.v.set(1, 0, 0, 2.0);
        p.v.set(1, 0, 1, 3.0);
        Regressor::new(mi, p, FeatureFlags::new_all_dense(2), wide_range())
    }

    #[test]
    fn test_predict_and_clamp() {
        let mi = ModelInstance::new_empty();
        let mut rg = pair_regressor(&mi);
        let mut pb = rg.new_port_buffer();
        // 0.5 + 1 - 2 + 2*1*3*2
        assert_epsilon!(rg.predict(&[1.0, 2.0], &mut pb), 11.5);
        assert_epsilon!(pb.score, 11.5);
        assert_epsilon!(pb.interaction_sum(1, 0), 8.0);

        rg.label_range = LabelRange { min: 0, max: 1 };
        assert_eq!(rg.predict(&[1.0, 2.0], &mut pb), 1.0);
        assert_eq!(rg.predict(&[-1.0, 2.0], &mut pb), 0.0);
        assert_eq!(rg.regressor_name, "Regressor with blocks: LR<MomentumL2>, FM<MomentumL2>");
    }

    #[test]
    fn test_gradients() {
        let mi = ModelInstance::new_empty();
        let rg = pair_regressor(&mi);
        let mut pb = rg.new_port_buffer();
        let x = [1.0, 2.0];
        rg.predict(&x, &mut pb);
        let mut g = Parameters::zeroed(rg.shape());
        rg.accumulate_gradients(&x, 10, &pb, &mut g);
        // error 1.5, doubled
        assert_epsilon!(g.w0, 3.0);
        assert_epsilon!(g.w[0], 3.0);
        assert_epsilon!(g.w[1], 6.0);
        // d/dv0 = x0 * v1 * x1 = 6, d/dv1 = x1 * v0 * x0 = 4
        assert_epsilon!(g.v.get(1, 0, 0), 18.0);
        assert_epsilon!(g.v.get(1, 0, 1), 12.0);

        // accumulating a second sample adds up
        rg.predict(&x, &mut pb);
        rg.accumulate_gradients(&x, 10, &pb, &mut g);
        assert_epsilon!(g.w0, 6.0);
    }

    #[test]
    fn test_clamped_score_drives_the_error() {
        let mi = ModelInstance::new_empty();
        let mut rg = pair_regressor(&mi);
        rg.label_range = LabelRange { min: 0, max: 1 };
        let mut pb = rg.new_port_buffer();
        rg.predict(&[1.0, 2.0], &mut pb);
        let mut g = Parameters::zeroed(rg.shape());
        rg.accumulate_gradients(&[1.0, 2.0], 1, &pb, &mut g);
        assert_eq!(g.w0, 0.0);
    }

    #[test]
    fn test_update_step_reduces_error() {
        let mut mi = ModelInstance::new_empty();
        mi.learning_rate = 0.001;
        let mut rg = pair_regressor(&mi);
        let mut pb = rg.new_port_buffer();
        let x = [1.0, 2.0];
        let before = rg.predict(&x, &mut pb);
        let mut g = Parameters::zeroed(rg.shape());
        let mut m = Parameters::zeroed(rg.shape());
        rg.accumulate_gradients(&x, 10, &pb, &mut g);
        rg.update(&g, &mut m);
        let after = rg.predict(&x, &mut pb);
        assert!((after - 10.0).abs() < (before - 10.0).abs());
    }

    #[test]
    fn test_penalty_by_norm() {
        let mut mi = ModelInstance::new_empty();
        let rg = pair_regressor(&mi);
        assert_epsilon!(rg.regularization_penalty(), 0.25 + 1.0 + 1.0 + 4.0 + 9.0);
        mi.regularization_norm = RegularizationNorm::L1;
        let rg = pair_regressor(&mi);
        assert_epsilon!(rg.regularization_penalty(), 0.5 + 1.0 + 1.0 + 2.0 + 3.0);
        assert!(rg.blocks_boxes[0].get_name().contains("ProximalL1"));
    }

    #[test]
    fn test_partial_fm_changes_only_the_excluded_contribution() {
        // feature 2 is set in one sample out of 300
        let samples: Vec<Sample> = (0..300)
            .map(|i| Sample {
                label: 1,
                features: vec![1.0, (i % 5) as f32 * 0.5, if i == 7 { 2.0 } else { 0.0 }],
                score: 0.0,
            })
            .collect();
        let shape = ModelShape::new(3, 2, 3);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let mut p = Parameters::new_random(shape, 0.3, &mut rng).unwrap();
        p.w = vec![0.1, 0.2, 0.3];

        let mi = ModelInstance::new_empty();
        let dense = Regressor::new(
            &mi,
            p.clone(),
            FeatureFlags::new_from_samples(&samples, 3, false),
            wide_range(),
        );
        let partial = Regressor::new(
            &mi,
            p.clone(),
            FeatureFlags::new_from_samples(&samples, 3, true),
            wide_range(),
        );
        assert_eq!(partial.feature_flags.excluded_count(), 1);

        let mut pb = dense.new_port_buffer();
        for sample in samples.iter() {
            let a = dense.predict(&sample.features, &mut pb);
            let b = partial.predict(&sample.features, &mut pb);
            if sample.features[2] == 0.0 {
                assert_eq!(a, b);
            } else {
                // interactions that involve feature 2: drop the feature, put its linear term back
                let mut without = sample.features.clone();
                without[2] = 0.0;
                let excluded_contribution =
                    a - (dense.predict(&without, &mut pb) + 0.3 * sample.features[2]);
                assert!(excluded_contribution.abs() > 0.0);
                assert!((a - b - excluded_contribution).abs() < 1e-4);
            }
        }
    }
}
