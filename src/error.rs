use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("network expects {expected} input features, got {found}")]
    InputShape { expected: usize, found: usize },
    #[error("parameter `{0}` is missing or has a mismatched shape")]
    ParameterMismatch(String),
    #[error("parameter dictionaries differ in size: {expected} vs {found}")]
    ParameterCount { expected: usize, found: usize },
    #[error("backward pass requested without a preceding forward pass")]
    MissingForwardState,
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("snapshot {path} is malformed: {source}")]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("snapshot does not fit the network: {0}")]
    Parameters(#[from] NetworkError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("not enough transitions to sample: requested {requested}, available {available}")]
    InsufficientData { requested: usize, available: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("feature of length {found} does not match the staged length {expected}")]
    FeatureShape { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum TrainerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}
