use flate2::read::MultiGzDecoder;
use rand::Rng;
use std::fs::File;
use std::io;
use std::io::BufRead;
use std::path::Path;
use zstd::stream::read::Decoder as ZstdDecoder;

use crate::error::FmError;
use crate::parser::{DataParser, SparseSample};

#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub label: i32,
    pub features: Vec<f32>,
    pub score: f32,
}

/// Range predictions get clamped to. Starts at (0, 0) and widens with every label.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelRange {
    pub min: i32,
    pub max: i32,
}

impl LabelRange {
    pub fn new() -> LabelRange {
        LabelRange { min: 0, max: 0 }
    }

    pub fn observe(&mut self, label: i32) {
        self.min = self.min.min(label);
        self.max = self.max.max(label);
    }

    #[inline(always)]
    pub fn clamp(&self, score: f32) -> f32 {
        score.max(self.min as f32).min(self.max as f32)
    }
}

impl Default for LabelRange {
    fn default() -> Self {
        LabelRange::new()
    }
}

/// Parsed samples, before we know how wide the dense vectors have to be
pub struct SparseDataset {
    pub samples: Vec<SparseSample>,
    pub feature_count: usize,
    pub dropped_lines: usize,
}

pub struct SampleStore {
    pub samples: Vec<Sample>,
    pub feature_count: usize,
    pub label_range: LabelRange,
}

pub fn create_buffered_input(input_filename: &str) -> Result<Box<dyn BufRead>, FmError> {
    // Handler for different (or no) compression types
    let input = File::open(input_filename).map_err(|e| FmError::io(input_filename, e))?;

    let input_format = Path::new(input_filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match input_format {
        "gz" => {
            let gz_decoder = MultiGzDecoder::new(input);
            Ok(Box::new(io::BufReader::new(gz_decoder)))
        }
        "zst" => {
            let zstd_decoder =
                ZstdDecoder::new(input).map_err(|e| FmError::io(input_filename, e))?;
            Ok(Box::new(io::BufReader::new(zstd_decoder)))
        }
        _ => Ok(Box::new(io::BufReader::new(input))),
    }
}

impl SparseDataset {
    pub fn read(
        input_bufread: &mut dyn BufRead,
        source_name: &str,
    ) -> Result<SparseDataset, FmError> {
        let mut pa = DataParser::new(source_name);
        let mut ds = SparseDataset {
            samples: Vec::new(),
            feature_count: 0,
            dropped_lines: 0,
        };
        loop {
            match pa.next_sample(input_bufread) {
                Ok(None) => break,
                Ok(Some(sample)) => {
                    ds.feature_count = ds.feature_count.max(sample.max_feature_index());
                    ds.samples.push(sample);
                }
                Err(e) if e.is_recoverable() => {
                    log::warn!("{}: {}, dropping the line", source_name, e);
                    ds.dropped_lines += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if ds.samples.is_empty() {
            return Err(FmError::EmptyDataset(source_name.to_string()));
        }
        if ds.feature_count == 0 {
            // a model needs at least one feature to be saved and loaded again
            return Err(FmError::EmptyDataset(format!(
                "{} (no features on any line)",
                source_name
            )));
        }
        log::info!(
            "Read {} samples with {} features from {} ({} lines dropped)",
            ds.samples.len(),
            ds.feature_count,
            source_name,
            ds.dropped_lines
        );
        Ok(ds)
    }

    pub fn from_filename(input_filename: &str) -> Result<SparseDataset, FmError> {
        let mut input = create_buffered_input(input_filename)?;
        SparseDataset::read(&mut input, input_filename)
    }
}

impl SampleStore {
    /// Densifies to exactly `feature_count` features, which can't be less than the
    /// dataset's own feature count.
    pub fn new_from_sparse(
        ds: SparseDataset,
        feature_count: usize,
    ) -> Result<SampleStore, FmError> {
        if ds.feature_count > feature_count {
            return Err(FmError::ModelShapeMismatch {
                data_feature_count: ds.feature_count,
                model_feature_count: feature_count,
            });
        }
        let mut label_range = LabelRange::new();
        let samples = ds
            .samples
            .iter()
            .map(|s| {
                label_range.observe(s.label);
                Sample {
                    label: s.label,
                    features: s.to_dense(feature_count),
                    score: 0.0,
                }
            })
            .collect();
        Ok(SampleStore {
            samples,
            feature_count,
            label_range,
        })
    }

    pub fn from_filename(input_filename: &str) -> Result<SampleStore, FmError> {
        let ds = SparseDataset::from_filename(input_filename)?;
        let feature_count = ds.feature_count;
        SampleStore::new_from_sparse(ds, feature_count)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// In-place uniform permutation: element i is swapped with a random index in [0, i]
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        for i in 0..self.samples.len() {
            let j = rng.gen_range(0..=i);
            if j != i {
                self.samples.swap(i, j);
            }
        }
    }
}
