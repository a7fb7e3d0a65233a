// PDP Runner - Error types
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

use pdp::{ConfigError, PipelineError, StorageError};
use pdp_testdata::BatchError;
use thiserror::Error;

/// Runner error types.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Generation error: {0}")]
    Batch(#[from] BatchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid config file {path}: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid timestamp '{0}' (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)")]
    Timestamp(String),

    #[error("No raw events in {0}; run `generate` first")]
    NoRawEvents(String),
}

pub type Result<T> = std::result::Result<T, RunnerError>;
