// Feature values with smaller magnitude are treated as zero in interaction terms
pub const FEATURE_ZERO_EPSILON: f32 = 1e-6;

// A feature is excluded from partial FM when its zero count exceeds both thresholds
pub const SPARSE_ZERO_COUNT_THRESHOLD: usize = 2;
pub const SPARSE_ZERO_RATIO_THRESHOLD: f32 = 0.99;

pub const MAX_FM_DEGREE: u32 = 10;

// Loaded models larger than this (bias + weights + factors) are treated as corrupt
pub const MAX_MODEL_PARAMETERS: usize = 1 << 30;

// Interaction math exists for degree indices 1 (pairs) and 2 (triples) only
pub const MAX_INTERACTION_DEGREE_INDEX: usize = 2;

pub const DEFAULT_FM_DEGREE: u32 = 2;
pub const DEFAULT_FACTOR_SIZE: u32 = 3;
pub const DEFAULT_LEARNING_RATE: f32 = 0.01;
pub const DEFAULT_INIT_STD_DEV: f32 = 0.1;
pub const DEFAULT_MINI_BATCH_SIZE: usize = 200;
pub const DEFAULT_ITERATION_COUNT: u32 = 200;
pub const DEFAULT_BURN_IN_ITERATIONS: u32 = 10;

pub const MODEL_FILE_EXTENSION: &str = "model";
pub const PREDICTIONS_FILE_EXTENSION: &str = "res";
