use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::ops::Range;

use crate::error::FmError;

/// Fixed for the lifetime of a model: set at initialization or when loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelShape {
    pub degree: usize,
    pub factor_size: usize,
    pub feature_count: usize,
}

impl ModelShape {
    pub fn new(degree: usize, factor_size: usize, feature_count: usize) -> ModelShape {
        ModelShape {
            degree,
            factor_size,
            feature_count,
        }
    }

    /// Degree index d stands for (d+1)-way interactions; index 0 is the linear term
    pub fn interaction_degrees(&self) -> Range<usize> {
        1..self.degree.max(1)
    }

    pub fn interaction_degree_count(&self) -> usize {
        self.degree.max(1) - 1
    }

    /// Bias, weights and factors together, None on overflow
    pub fn checked_parameter_count(&self) -> Option<usize> {
        self.factor_size
            .checked_mul(self.feature_count)?
            .checked_mul(self.interaction_degree_count())?
            .checked_add(self.feature_count)?
            .checked_add(1)
    }

    /// Values per degree index: factor_size * feature_count
    pub fn factor_slab_len(&self) -> usize {
        self.factor_size * self.feature_count
    }
}

/// Latent factors for all interaction degrees in one allocation.
/// Within a degree the layout is component-major: value (j, k) lives at j * feature_count + k,
/// which is also the order of the model file.
#[derive(Clone, Debug, PartialEq)]
pub struct FactorTensor {
    shape: ModelShape,
    values: Vec<f32>,
}

impl FactorTensor {
    pub fn zeroed(shape: ModelShape) -> FactorTensor {
        FactorTensor {
            shape,
            values: vec![0.0; shape.interaction_degree_count() * shape.factor_slab_len()],
        }
    }

    #[inline(always)]
    fn offset(&self, d: usize, j: usize) -> usize {
        debug_assert!(d >= 1 && d < self.shape.degree);
        debug_assert!(j < self.shape.factor_size);
        ((d - 1) * self.shape.factor_size + j) * self.shape.feature_count
    }

    #[inline(always)]
    pub fn get(&self, d: usize, j: usize, k: usize) -> f32 {
        self.values[self.offset(d, j) + k]
    }

    #[inline(always)]
    pub fn set(&mut self, d: usize, j: usize, k: usize, value: f32) {
        let offset = self.offset(d, j);
        self.values[offset + k] = value;
    }

    /// Factors of component j at degree index d, one per feature
    #[inline(always)]
    pub fn component(&self, d: usize, j: usize) -> &[f32] {
        let offset = self.offset(d, j);
        &self.values[offset..offset + self.shape.feature_count]
    }

    #[inline(always)]
    pub fn component_mut(&mut self, d: usize, j: usize) -> &mut [f32] {
        let offset = self.offset(d, j);
        let len = self.shape.feature_count;
        &mut self.values[offset..offset + len]
    }

    /// All values of degree index d in j * feature_count + k order
    pub fn slab(&self, d: usize) -> &[f32] {
        let offset = self.offset(d, 0);
        &self.values[offset..offset + self.shape.factor_slab_len()]
    }

    pub fn slab_mut(&mut self, d: usize) -> &mut [f32] {
        let offset = self.offset(d, 0);
        let len = self.shape.factor_slab_len();
        &mut self.values[offset..offset + len]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }
}

/// One full set of model-shaped scalars: bias, linear weights, factors.
/// Used for the weights themselves and for the gradient, momentum and running-sum mirrors.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameters {
    pub w0: f32,
    pub w: Vec<f32>,
    pub v: FactorTensor,
}

impl Parameters {
    pub fn zeroed(shape: ModelShape) -> Parameters {
        Parameters {
            w0: 0.0,
            w: vec![0.0; shape.feature_count],
            v: FactorTensor::zeroed(shape),
        }
    }

    /// Zero bias and weights, factors drawn from N(0, init_std_dev)
    pub fn new_random<R: Rng>(
        shape: ModelShape,
        init_std_dev: f32,
        rng: &mut R,
    ) -> Result<Parameters, FmError> {
        let normal = Normal::new(0.0, init_std_dev).map_err(|e| {
            FmError::Configuration(format!("Invalid init_std_dev {}: {}", init_std_dev, e))
        })?;
        let mut p = Parameters::zeroed(shape);
        for value in p.v.values_mut().iter_mut() {
            *value = normal.sample(rng);
        }
        Ok(p)
    }

    pub fn shape(&self) -> ModelShape {
        self.v.shape
    }

    pub fn reset(&mut self) {
        self.w0 = 0.0;
        self.w.iter_mut().for_each(|x| *x = 0.0);
        self.v.values_mut().iter_mut().for_each(|x| *x = 0.0);
    }

    /// Adds weights and factors of `other`; the bias is left alone
    pub fn accumulate_weights_and_factors(&mut self, other: &Parameters) {
        debug_assert_eq!(self.shape(), other.shape());
        for (sum, x) in self.w.iter_mut().zip(other.w.iter()) {
            *sum += x;
        }
        for (sum, x) in self.v.values_mut().iter_mut().zip(other.v.values().iter()) {
            *sum += x;
        }
    }

    /// Replaces weights and factors with running_sum / count. The bias keeps its last value.
    pub fn assign_average_of(&mut self, running_sum: &Parameters, count: u32) {
        debug_assert_eq!(self.shape(), running_sum.shape());
        let count = count as f32;
        for (w, sum) in self.w.iter_mut().zip(running_sum.w.iter()) {
            *w = sum / count;
        }
        for (v, sum) in self
            .v
            .values_mut()
            .iter_mut()
            .zip(running_sum.v.values().iter())
        {
            *v = sum / count;
        }
    }
}
