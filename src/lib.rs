pub mod block_fm;
pub mod block_helpers;
pub mod block_lr;
pub mod cmdline;
pub mod consts;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod feature_flags;
pub mod logging_layer;
pub mod model_instance;
pub mod optimizer;
pub mod parameters;
pub mod parser;
pub mod persistence;
pub mod port_buffer;
pub mod regressor;
pub mod trainer;
