//! Error taxonomy for the discovery engine and its ambient CLI/config layers.
//!
//! The teacher binary gets away with `Box<dyn std::error::Error>` because it has one
//! failure path (an HTTP/IO error bubbling out of `main`). This crate's CLI needs to
//! distinguish configuration mistakes (exit non-zero, no scan attempted) from
//! in-run failures (logged, scan continues), so the error set is a closed enum.

use std::path::PathBuf;

use thiserror::Error;

use crate::surface::SurfaceTag;

/// Top-level error type returned by the CLI and configuration layers.
#[derive(Debug, Error)]
pub enum ParamHuntError {
    #[error("no target specified: supply -u <url> or -r <raw request file>")]
    NoTarget,

    #[error("no injection surface enabled: pass -fa, -fh, -fp, or -fc")]
    NoSurfaceEnabled,

    #[error("retry count must be positive, got {0}")]
    NonPositiveRetry(i64),

    #[error("timeout must be positive, got {0}")]
    NonPositiveTimeout(i64),

    #[error("wordlist path does not exist: {0}")]
    WordlistNotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid proxy URL {0}: {1}")]
    InvalidProxy(String, String),

    #[error("could not parse raw request file {path}: {reason}")]
    RawRequestParse { path: PathBuf, reason: String },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("all target requests failed to obtain a baseline response")]
    AllBaselinesFailed,

    #[error("unsupported output format: {0}")]
    UnknownOutputFormat(String),

    #[error("failed to write output file {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Non-fatal, per-(request, surface) errors that the orchestrator logs and skips,
/// rather than aborting the whole run (spec §7 "Chunk verdict errors").
#[derive(Debug, Error, Clone)]
pub enum SurfaceError {
    #[error("surface {0:?} is not searchable for this request")]
    NotSearchable(SurfaceTag),

    #[error("bucket size could not be determined for surface {0:?}")]
    NoBucketSize(SurfaceTag),

    #[error("request body is not valid JSON for BODY_JSON surface")]
    UnparsableJson,

    #[error("request body is not valid form-encoding for BODY_FORM surface")]
    UnparsableForm,
}
