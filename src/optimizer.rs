pub trait OptimizerTrait: std::clone::Clone {
    fn new() -> Self;
    fn init(&mut self, learning_rate: f32, regularization_factor: f32, momentum_factor: f32);
    /// Returns the new value of `weight`, given its accumulated mini-batch gradient
    fn calculate_update(&self, weight: f32, gradient: f32, momentum: &mut f32) -> f32;
    /// Contribution of one weight to the regularization norm (not multiplied by the factor)
    fn penalty(&self, weight: f32) -> f32;
    fn get_name() -> &'static str;
}

/******************* Proximal L1 **************************/
// Gradient step followed by soft thresholding. Momentum is not used with L1.
#[derive(Clone)]
pub struct OptimizerProximalL1 {
    learning_rate: f32,
    threshold: f32,
}

#[inline(always)]
pub fn proximal_l1(x: f32, threshold: f32) -> f32 {
    if x >= threshold {
        x - threshold
    } else if x <= -threshold {
        x + threshold
    } else {
        0.0
    }
}

impl OptimizerTrait for OptimizerProximalL1 {
    fn get_name() -> &'static str {
        "ProximalL1"
    }

    fn new() -> Self {
        OptimizerProximalL1 {
            learning_rate: 0.0,
            threshold: 0.0,
        }
    }

    fn init(&mut self, learning_rate: f32, regularization_factor: f32, _momentum_factor: f32) {
        self.learning_rate = learning_rate;
        self.threshold = regularization_factor * learning_rate;
    }

    #[inline(always)]
    fn calculate_update(&self, weight: f32, gradient: f32, _momentum: &mut f32) -> f32 {
        proximal_l1(weight - self.learning_rate * gradient, self.threshold)
    }

    #[inline(always)]
    fn penalty(&self, weight: f32) -> f32 {
        weight.abs()
    }
}

/******************* Momentum L2 **************************/
// Ridge gradient is added before the step. With momentum_factor 0.0 this is plain SGD.
#[derive(Clone)]
pub struct OptimizerMomentumL2 {
    learning_rate: f32,
    regularization_factor: f32,
    momentum_factor: f32,
}

impl OptimizerTrait for OptimizerMomentumL2 {
    fn get_name() -> &'static str {
        "MomentumL2"
    }

    fn new() -> Self {
        OptimizerMomentumL2 {
            learning_rate: 0.0,
            regularization_factor: 0.0,
            momentum_factor: 0.0,
        }
    }

    fn init(&mut self, learning_rate: f32, regularization_factor: f32, momentum_factor: f32) {
        self.learning_rate = learning_rate;
        self.regularization_factor = regularization_factor;
        self.momentum_factor = momentum_factor;
    }

    #[inline(always)]
    fn calculate_update(&self, weight: f32, gradient: f32, momentum: &mut f32) -> f32 {
        let gradient = gradient + 2.0 * self.regularization_factor * weight;
        *momentum = self.momentum_factor * *momentum - self.learning_rate * gradient;
        weight + *momentum
    }

    #[inline(always)]
    fn penalty(&self, weight: f32) -> f32 {
        weight * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_epsilon;

    #[test]
    fn test_proximal_l1_threshold() {
        // threshold 0.5
        assert_eq!(proximal_l1(0.5, 0.5), 0.0);
        assert_eq!(proximal_l1(-0.5, 0.5), 0.0);
        assert_eq!(proximal_l1(0.3, 0.5), 0.0);
        assert_eq!(proximal_l1(-0.49, 0.5), 0.0);
        assert_eq!(proximal_l1(2.0, 0.5), 1.5);
        assert_eq!(proximal_l1(-2.0, 0.5), -1.5);
        // zero threshold is the identity
        assert_eq!(proximal_l1(0.25, 0.0), 0.25);
        assert_eq!(proximal_l1(-0.25, 0.0), -0.25);
    }

    #[test]
    fn test_proximal_l1_update() {
        let mut l = OptimizerProximalL1::new();
        l.init(0.1, 2.0, 0.9);
        let mut momentum = 0.0;
        // 1.0 - 0.1*1.0 = 0.9, threshold 0.2
        assert_epsilon!(l.calculate_update(1.0, 1.0, &mut momentum), 0.7);
        assert_eq!(momentum, 0.0);
        assert_eq!(l.calculate_update(0.1, 0.5, &mut momentum), 0.0);
        assert_eq!(l.penalty(-3.0), 3.0);
        assert_eq!(OptimizerProximalL1::get_name(), "ProximalL1");
    }

    #[test]
    fn test_l2_without_momentum_is_sgd() {
        let mut l = OptimizerMomentumL2::new();
        l.init(0.1, 0.0, 0.0);
        let mut momentum = 0.0;
        assert_epsilon!(l.calculate_update(1.0, 2.0, &mut momentum), 0.8);
        assert_epsilon!(momentum, -0.2);
        assert_epsilon!(l.calculate_update(1.0, 2.0, &mut momentum), 0.8);
        assert_eq!(l.penalty(-3.0), 9.0);
    }

    #[test]
    fn test_l2_ridge_and_momentum() {
        let mut l = OptimizerMomentumL2::new();
        l.init(0.1, 0.5, 0.5);
        let mut momentum = 0.0;
        // g = 0 + 2*0.5*1.0 = 1.0, m = -0.1, w = 0.9
        let w = l.calculate_update(1.0, 0.0, &mut momentum);
        assert_epsilon!(w, 0.9);
        assert_epsilon!(momentum, -0.1);
        // g = 0.9, m = 0.5*-0.1 - 0.09 = -0.14, w = 0.76
        let w = l.calculate_update(w, 0.0, &mut momentum);
        assert_epsilon!(w, 0.76);
        assert_epsilon!(momentum, -0.14);
    }
}
