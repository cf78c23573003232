use std::io;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for similarity computation and classification.
///
/// Every variant aborts the enclosing operation (matrix build, scoring or
/// classification call). There is no retry and no partial result: a failed
/// matrix is discarded entirely rather than returned with gaps.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("compression failure: {0}")]
    Compression(#[from] CompressionError),

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Errors raised while validating a run configuration.
///
/// All of these are surfaced before any compression work starts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("compression level {level} out of range {}..={} for {codec}", range.start(), range.end())]
    CompressionLevel {
        codec: &'static str,
        level: u32,
        range: RangeInclusive<u32>,
    },

    #[error("unknown compressor: {0}")]
    UnknownCodec(String),

    #[error("unknown classification scheme: {0}")]
    UnknownScheme(String),

    #[error("K must be in 1..={max} for KNN classification, got {k}")]
    KnnRange { k: usize, max: usize },

    #[error("classification requires a non-empty reference set")]
    EmptyReference,

    #[error("matrix of size {n} cannot be split into blocks of {files_per_group}")]
    GroupShape { n: usize, files_per_group: usize },

    #[error("expected {expected} group labels, got {got}")]
    LabelCount { expected: usize, got: usize },

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// A compressor invocation failed.
///
/// Fatal to the in-flight matrix or classification call.
#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("{codec} failed on {len} input bytes: {source}")]
    Codec {
        codec: &'static str,
        len: usize,
        #[source]
        source: io::Error,
    },
}

/// Errors related to dataset layout and file content.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("path {0} is not a regular file")]
    NotAFile(PathBuf),

    #[error("dataset root {0} is missing or not a directory")]
    MissingRoot(PathBuf),

    #[error("requested {requested} groups, dataset has {available}")]
    NotEnoughGroups { requested: usize, available: usize },

    #[error("group {group} has {available} files, {requested} requested")]
    NotEnoughFiles {
        group: usize,
        requested: usize,
        available: usize,
    },

    #[error("file {0} has no group label")]
    UnassignedGroup(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
