use std::any::Any;

use crate::feature_flags::FeatureFlags;
use crate::model_instance;
use crate::optimizer::OptimizerTrait;
use crate::parameters::Parameters;
use crate::port_buffer::PortBuffer;
use crate::regressor::BlockTrait;

/// Bias and linear weights. Sees every feature, partial FM never applies here.
pub struct BlockLR<L: OptimizerTrait> {
    pub optimizer_lr: L,
}

impl<L: OptimizerTrait + 'static> BlockLR<L> {
    pub fn new_without_weights(mi: &model_instance::ModelInstance) -> Box<dyn BlockTrait> {
        let mut optimizer_lr = L::new();
        optimizer_lr.init(mi.learning_rate, mi.regularization_factor, mi.momentum_factor);
        Box::new(BlockLR::<L> { optimizer_lr })
    }
}

impl<L: OptimizerTrait + 'static> BlockTrait for BlockLR<L> {
    fn as_any(&mut self) -> &mut dyn Any {
        self
    }

    fn get_name(&self) -> String {
        format!("LR<{}>", L::get_name())
    }

    #[inline(always)]
    fn forward(
        &self,
        weights: &Parameters,
        x: &[f32],
        _flags: &FeatureFlags,
        _pb: &mut PortBuffer,
    ) -> f32 {
        let mut wsum = weights.w0;
        for (w, value) in weights.w.iter().zip(x.iter()) {
            wsum += w * value;
        }
        wsum
    }

    #[inline(always)]
    fn backward(
        &self,
        _weights: &Parameters,
        x: &[f32],
        _flags: &FeatureFlags,
        _pb: &PortBuffer,
        error_gradient: f32,
        gradients: &mut Parameters,
    ) {
        gradients.w0 += error_gradient;
        for (g, value) in gradients.w.iter_mut().zip(x.iter()) {
            *g += error_gradient * value;
        }
    }

    fn update(
        &self,
        weights: &mut Parameters,
        gradients: &Parameters,
        momentum: &mut Parameters,
        _flags: &FeatureFlags,
    ) {
        weights.w0 = self
            .optimizer_lr
            .calculate_update(weights.w0, gradients.w0, &mut momentum.w0);
        for ((w, g), m) in weights
            .w
            .iter_mut()
            .zip(gradients.w.iter())
            .zip(momentum.w.iter_mut())
        {
            *w = self.optimizer_lr.calculate_update(*w, *g, m);
        }
    }

    fn penalty(&self, weights: &Parameters, _flags: &FeatureFlags) -> f32 {
        let mut penalty = self.optimizer_lr.penalty(weights.w0);
        for w in weights.w.iter() {
            penalty += self.optimizer_lr.penalty(*w);
        }
        penalty
    }
}
