use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FmError {
    /// Out-of-range or unparseable parameter, raised before any state is touched
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A single dataset line that can't be used; loaders skip it and go on
    #[error("Invalid data at line {line}: {reason}")]
    DataFormat { line: usize, reason: String },

    #[error("No valid samples in {0}")]
    EmptyDataset(String),

    #[error("I/O error on \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Data has {data_feature_count} features, but the model only knows {model_feature_count}")]
    ModelShapeMismatch {
        data_feature_count: usize,
        model_feature_count: usize,
    },

    #[error("Malformed model file at line {line}: {reason}")]
    ModelFormat { line: usize, reason: String },
}

impl FmError {
    pub fn io(path: &str, source: io::Error) -> FmError {
        FmError::Io {
            path: path.to_string(),
            source,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, FmError::DataFormat { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_data_format_is_recoverable() {
        let e = FmError::DataFormat {
            line: 3,
            reason: "bad label".to_string(),
        };
        assert!(e.is_recoverable());
        assert_eq!(e.to_string(), "Invalid data at line 3: bad label");

        assert!(!FmError::EmptyDataset("a.txt".to_string()).is_recoverable());
        assert!(!FmError::Configuration("x".to_string()).is_recoverable());
        let e = FmError::io("missing.txt", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(!e.is_recoverable());
        assert!(e.to_string().contains("missing.txt"));
    }
}
