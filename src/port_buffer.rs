use crate::parameters::ModelShape;

/// Scratch filled by the forward pass and read by the backward pass of the same sample.
/// Holds the first-order interaction sum Σ v[d][j,k]*x[k] per (degree index, component).
#[derive(Clone, Debug)]
pub struct PortBuffer {
    pub interaction_sums: Vec<f32>,
    pub factor_size: usize,
    pub score: f32,
}

impl PortBuffer {
    pub fn new(shape: ModelShape) -> PortBuffer {
        PortBuffer {
            interaction_sums: vec![0.0; shape.interaction_degree_count() * shape.factor_size],
            factor_size: shape.factor_size,
            score: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.interaction_sums.iter_mut().for_each(|x| *x = 0.0);
        self.score = 0.0;
    }

    #[inline(always)]
    pub fn interaction_sum(&self, d: usize, j: usize) -> f32 {
        self.interaction_sums[(d - 1) * self.factor_size + j]
    }

    #[inline(always)]
    pub fn set_interaction_sum(&mut self, d: usize, j: usize, sum: f32) {
        self.interaction_sums[(d - 1) * self.factor_size + j] = sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sums_per_degree_and_component() {
        let mut pb = PortBuffer::new(ModelShape::new(3, 2, 10));
        assert_eq!(pb.interaction_sums.len(), 4);
        pb.set_interaction_sum(1, 1, 2.0);
        pb.set_interaction_sum(2, 0, 3.0);
        assert_eq!(pb.interaction_sums, vec![0.0, 2.0, 3.0, 0.0]);
        assert_eq!(pb.interaction_sum(2, 0), 3.0);
        pb.score = 1.0;
        pb.reset();
        assert_eq!(pb.interaction_sums, vec![0.0; 4]);
        assert_eq!(pb.score, 0.0);

        assert!(PortBuffer::new(ModelShape::new(1, 2, 10)).interaction_sums.is_empty());
    }
}
