use std::any::Any;

use crate::block_helpers::{interaction_features, trained_factor_indices};
use crate::consts::MAX_INTERACTION_DEGREE_INDEX;
use crate::feature_flags::FeatureFlags;
use crate::model_instance;
use crate::optimizer::OptimizerTrait;
use crate::parameters::{ModelShape, Parameters};
use crate::port_buffer::PortBuffer;
use crate::regressor::BlockTrait;

/*
Interaction terms in closed form. For degree index d and component j, with t_k = v[d][j,k] * x[k]:
    pairs   (d = 1):  0.5 * (S^2 - Q)
    triples (d = 2):  (S^3 - 3*Q*S + 2*C) / 6
where S = Σ t_k, Q = Σ t_k^2, C = Σ t_k^3.
Factors of degree indices above 2 are allocated, regularized and stored, but never scored.
*/
pub struct BlockFM<L: OptimizerTrait> {
    pub optimizer_fm: L,
    pub shape: ModelShape,
}

impl<L: OptimizerTrait + 'static> BlockFM<L> {
    pub fn new_without_weights(
        mi: &model_instance::ModelInstance,
        shape: ModelShape,
    ) -> Box<dyn BlockTrait> {
        let mut optimizer_fm = L::new();
        optimizer_fm.init(mi.learning_rate, mi.regularization_factor, mi.momentum_factor);
        Box::new(BlockFM::<L> {
            optimizer_fm,
            shape,
        })
    }

    /// Degree indices with defined interaction math
    #[inline(always)]
    fn scored_degrees(&self) -> std::ops::Range<usize> {
        1..self.shape.degree.min(MAX_INTERACTION_DEGREE_INDEX + 1).max(1)
    }
}

impl<L: OptimizerTrait + 'static> BlockTrait for BlockFM<L> {
    fn as_any(&mut self) -> &mut dyn Any {
        self
    }

    fn get_name(&self) -> String {
        format!("FM<{}>", L::get_name())
    }

    fn forward(
        &self,
        weights: &Parameters,
        x: &[f32],
        flags: &FeatureFlags,
        pb: &mut PortBuffer,
    ) -> f32 {
        let mut wsum: f32 = 0.0;
        for d in self.scored_degrees() {
            for j in 0..self.shape.factor_size {
                let v = weights.v.component(d, j);
                let mut sum: f32 = 0.0;
                let mut square_sum: f32 = 0.0;
                let mut cube_sum: f32 = 0.0;
                for (k, value) in interaction_features(x, flags) {
                    let t = v[k] * value;
                    sum += t;
                    square_sum += t * t;
                    if d == 2 {
                        cube_sum += t * t * t;
                    }
                }
                pb.set_interaction_sum(d, j, sum);
                wsum += match d {
                    1 => 0.5 * (sum * sum - square_sum),
                    _ => (sum * sum * sum - 3.0 * square_sum * sum + 2.0 * cube_sum) / 6.0,
                };
            }
        }
        wsum
    }

    fn backward(
        &self,
        weights: &Parameters,
        x: &[f32],
        flags: &FeatureFlags,
        pb: &PortBuffer,
        error_gradient: f32,
        gradients: &mut Parameters,
    ) {
        for d in self.scored_degrees() {
            for j in 0..self.shape.factor_size {
                let v = weights.v.component(d, j);
                let g = gradients.v.component_mut(d, j);
                // S comes from the forward pass of this very sample, one per (d, j).
                // A single per-sample sum shared by all components would give wrong gradients.
                let sum = pb.interaction_sum(d, j);
                if d == 1 {
                    for (k, value) in interaction_features(x, flags) {
                        let item = v[k] * value;
                        g[k] += error_gradient * value * (sum - item);
                    }
                } else {
                    let mut square_sum: f32 = 0.0;
                    for (k, value) in interaction_features(x, flags) {
                        let item = v[k] * value;
                        square_sum += item * item;
                    }
                    let half_sum_square = 0.5 * sum * sum;
                    let half_square_sum = 0.5 * square_sum;
                    for (k, value) in interaction_features(x, flags) {
                        let item = v[k] * value;
                        g[k] += error_gradient
                            * value
                            * (half_sum_square - sum * item - half_square_sum + item * item);
                    }
                }
            }
        }
    }

    fn update(
        &self,
        weights: &mut Parameters,
        gradients: &Parameters,
        momentum: &mut Parameters,
        flags: &FeatureFlags,
    ) {
        for d in self.shape.interaction_degrees() {
            for j in 0..self.shape.factor_size {
                let v = weights.v.component_mut(d, j);
                let g = gradients.v.component(d, j);
                let m = momentum.v.component_mut(d, j);
                for k in trained_factor_indices(flags) {
                    v[k] = self.optimizer_fm.calculate_update(v[k], g[k], &mut m[k]);
                }
            }
        }
    }

    fn penalty(&self, weights: &Parameters, flags: &FeatureFlags) -> f32 {
        let mut penalty: f32 = 0.0;
        for d in self.shape.interaction_degrees() {
            for j in 0..self.shape.factor_size {
                let v = weights.v.component(d, j);
                for k in trained_factor_indices(flags) {
                    penalty += self.optimizer_fm.penalty(v[k]);
                }
            }
        }
        penalty
    }
}
