use std::fs;
use std::io;
use std::io::Write;
use std::time::Instant;

use crate::dataset::{SampleStore, SparseDataset};
use crate::error::FmError;
use crate::feature_flags::FeatureFlags;
use crate::model_instance::ModelInstance;
use crate::parameters::Parameters;
use crate::persistence;
use crate::regressor::Regressor;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvaluationSummary {
    pub sample_count: usize,
    pub mean_squared_error: f32,
}

/// Test data is densified to the model's width; data wider than the model is an error
pub fn new_test_store(ds: SparseDataset, weights: &Parameters) -> Result<SampleStore, FmError> {
    SampleStore::new_from_sparse(ds, weights.shape().feature_count)
}

/// Regressor for scoring only. Feature flags come from the data being scored, so with
/// partial FM the almost-always-zero features stay out of interactions as in training.
/// Predictions are clamped to the label range of that same data.
pub fn new_inference_regressor(
    mi: &ModelInstance,
    weights: Parameters,
    store: &SampleStore,
) -> Regressor {
    let feature_count = weights.shape().feature_count;
    let feature_flags =
        FeatureFlags::new_from_samples(&store.samples, feature_count, mi.partial_fm);
    Regressor::new(mi, weights, feature_flags, store.label_range)
}

/// Scores every sample and writes "score\tmax_label\tlabel" lines
pub fn evaluate(
    re: &Regressor,
    store: &mut SampleStore,
    output_bufwriter: &mut dyn io::Write,
) -> io::Result<EvaluationSummary> {
    let mut pb = re.new_port_buffer();
    let mut squared_error: f64 = 0.0;
    for sample in store.samples.iter_mut() {
        sample.score = re.predict(&sample.features, &mut pb);
        let error = (sample.score - sample.label as f32) as f64;
        squared_error += error * error;
        writeln!(
            output_bufwriter,
            "{:.6}\t{}\t{}",
            sample.score, store.label_range.max, sample.label
        )?;
    }
    Ok(EvaluationSummary {
        sample_count: store.samples.len(),
        mean_squared_error: (squared_error / store.samples.len().max(1) as f64) as f32,
    })
}

pub fn evaluate_to_filename(
    mi: &ModelInstance,
    model_filename: &str,
    data_filename: &str,
    predictions_filename: &str,
) -> Result<EvaluationSummary, FmError> {
    let now = Instant::now();
    let weights = persistence::new_parameters_from_filename(model_filename)?;
    let ds = SparseDataset::from_filename(data_filename)?;
    let mut store = new_test_store(ds, &weights)?;
    let re = new_inference_regressor(mi, weights, &store);

    let file = fs::File::create(predictions_filename)
        .map_err(|e| FmError::io(predictions_filename, e))?;
    let mut output_bufwriter = io::BufWriter::new(file);
    let summary = evaluate(&re, &mut store, &mut output_bufwriter)
        .and_then(|summary| output_bufwriter.flush().map(|_| summary))
        .map_err(|e| FmError::io(predictions_filename, e))?;

    log::info!(
        "Scored {} samples, MSE {:.6}, predictions in {}, elapsed: {:.2?}",
        summary.sample_count,
        summary.mean_squared_error,
        predictions_filename,
        now.elapsed()
    );
    Ok(summary)
}
