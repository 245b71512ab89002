use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::ops::Range;
use std::time::Instant;

use crate::dataset::SampleStore;
use crate::error::FmError;
use crate::feature_flags::FeatureFlags;
use crate::model_instance::ModelInstance;
use crate::parameters::{ModelShape, Parameters};
use crate::port_buffer::PortBuffer;
use crate::regressor::Regressor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrainerState {
    Uninitialized,
    Initialized,
    Shuffling,
    BatchUpdate,
    Averaging,
    Done,
}

/// Mini-batch SGD over an in-memory sample store, with tail-averaging of weights and factors
pub struct Trainer {
    pub mi: ModelInstance,
    pub store: SampleStore,
    pub regressor: Regressor,
    pub state: TrainerState,
    gradients: Parameters,
    momentum: Parameters,
    running_sum: Parameters,
    averaged_iterations: u32,
    pb: PortBuffer,
    rng: Xoshiro256PlusPlus,
}

/// Contiguous batches of `batch_size`; a tail shorter than that is not returned.
/// Batch size 0, or one that covers the whole store, gives a single batch.
pub fn mini_batch_ranges(sample_count: usize, batch_size: usize) -> Vec<Range<usize>> {
    if sample_count == 0 {
        return Vec::new();
    }
    if batch_size == 0 || batch_size >= sample_count {
        return vec![0..sample_count];
    }
    (0..sample_count / batch_size)
        .map(|i| i * batch_size..(i + 1) * batch_size)
        .collect()
}

impl Trainer {
    pub fn new(mi: ModelInstance, store: SampleStore) -> Result<Trainer, FmError> {
        mi.validate()?;
        if store.is_empty() || store.feature_count == 0 {
            return Err(FmError::EmptyDataset("training sample store".to_string()));
        }
        let shape = ModelShape::new(
            mi.fm_degree as usize,
            mi.factor_size as usize,
            store.feature_count,
        );
        let seed = mi.seed.unwrap_or_else(rand::random);
        log::debug!("Random seed: {}", seed);

        let regressor = Regressor::new(
            &mi,
            Parameters::zeroed(shape),
            FeatureFlags::new_all_dense(store.feature_count),
            store.label_range,
        );
        Ok(Trainer {
            regressor,
            state: TrainerState::Uninitialized,
            gradients: Parameters::zeroed(shape),
            momentum: Parameters::zeroed(shape),
            running_sum: Parameters::zeroed(shape),
            averaged_iterations: 0,
            pb: PortBuffer::new(shape),
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            mi,
            store,
        })
    }

    /// Zero bias and weights, random factors, cleared buffers, fresh feature flags
    pub fn initialize(&mut self) -> Result<(), FmError> {
        let shape = self.regressor.shape();
        self.regressor.weights = Parameters::new_random(shape, self.mi.init_std_dev, &mut self.rng)?;
        self.gradients.reset();
        self.momentum.reset();
        self.running_sum.reset();
        self.averaged_iterations = 0;
        self.regressor.feature_flags = FeatureFlags::new_from_samples(
            &self.store.samples,
            self.store.feature_count,
            self.mi.partial_fm,
        );
        if self.mi.partial_fm {
            log::info!(
                "Partial FM: {} of {} features excluded from interactions",
                self.regressor.feature_flags.excluded_count(),
                self.store.feature_count
            );
        }
        self.state = TrainerState::Initialized;
        Ok(())
    }

    pub fn train(&mut self) -> Result<(), FmError> {
        match self.state {
            TrainerState::Uninitialized => self.initialize()?,
            TrainerState::Initialized => {}
            state => {
                return Err(FmError::Configuration(format!(
                    "Training can only start from a freshly initialized model, state is {:?}",
                    state
                )))
            }
        }
        if let Ok(json) = serde_json::to_string(&self.mi) {
            log::info!("Model instance: {}", json);
        }
        log::info!(
            "Training on {} samples with {} features, {}",
            self.store.len(),
            self.store.feature_count,
            self.regressor.regressor_name
        );

        let now = Instant::now();
        self.score_all();
        log::info!("Initial loss: {:.6}", self.calculate_loss());

        let batches = mini_batch_ranges(self.store.len(), self.mi.mini_batch_size);
        log::debug!(
            "{} mini-batches per iteration, {} samples left out",
            batches.len(),
            self.store.len() - batches.last().map_or(0, |b| b.end)
        );
        for iteration in 0..self.mi.iteration_count {
            self.run_iteration(iteration, &batches);
        }

        self.state = TrainerState::Averaging;
        self.average();
        self.score_all();
        log::info!(
            "Final loss: {:.6}, elapsed: {:.2?}",
            self.calculate_loss(),
            now.elapsed()
        );
        self.state = TrainerState::Done;
        Ok(())
    }

    fn run_iteration(&mut self, iteration: u32, batches: &[Range<usize>]) {
        self.state = TrainerState::Shuffling;
        self.store.shuffle(&mut self.rng);

        self.state = TrainerState::BatchUpdate;
        for batch in batches {
            self.run_mini_batch(batch.clone());
        }

        if iteration >= self.mi.burn_in_iterations {
            self.running_sum
                .accumulate_weights_and_factors(&self.regressor.weights);
            self.averaged_iterations += 1;
        }
        log::info!(
            "Iteration {}: loss {:.6}, w0 {:.6}",
            iteration + 1,
            self.calculate_loss(),
            self.regressor.weights.w0
        );
    }

    pub fn run_mini_batch(&mut self, batch: Range<usize>) {
        self.gradients.reset();
        for sample in self.store.samples[batch].iter_mut() {
            sample.score = self.regressor.predict(&sample.features, &mut self.pb);
            self.regressor.accumulate_gradients(
                &sample.features,
                sample.label,
                &self.pb,
                &mut self.gradients,
            );
        }
        self.regressor.update(&self.gradients, &mut self.momentum);
    }

    fn average(&mut self) {
        if self.averaged_iterations == 0 {
            log::info!("No iterations past burn-in, keeping the last weights");
            return;
        }
        self.regressor
            .weights
            .assign_average_of(&self.running_sum, self.averaged_iterations);
        log::info!(
            "Averaged weights and factors over the last {} iterations",
            self.averaged_iterations
        );
    }

    pub fn score_all(&mut self) {
        for sample in self.store.samples.iter_mut() {
            sample.score = self.regressor.predict(&sample.features, &mut self.pb);
        }
    }

    /// Squared error over the cached scores plus the weighted regularization norm
    pub fn calculate_loss(&self) -> f32 {
        let squared_error: f32 = self
            .store
            .samples
            .iter()
            .map(|s| {
                let error = s.score - s.label as f32;
                error * error
            })
            .sum();
        squared_error + self.mi.regularization_factor * self.regressor.regularization_penalty()
    }

    pub fn averaged_iterations(&self) -> u32 {
        self.averaged_iterations
    }

    pub fn into_regressor(self) -> Regressor {
        self.regressor
    }
}
