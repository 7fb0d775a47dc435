//! Unified error type for the merge core.
//!
//! Defines [`SemmergeError`], covering every fatal path: worker protocol
//! failures, a missing analyzer binary, and config errors. Composition
//! conflicts and verifier rejection are not fatal — they are reported
//! through `MergeOutcome` so the caller can still inspect the rejected
//! tree. Non-fatal outcomes (an applier miss, a collaborator's optional
//! failure, a cleanup failure) are not represented here at all — they are
//! logged at `warn` and the pipeline continues.

use std::fmt;
use std::path::PathBuf;

/// Unified error type for merge-core operations.
///
/// Each variant carries enough context to print an actionable message
/// without the caller reaching for additional state.
#[derive(Debug)]
pub enum SemmergeError {
    /// The worker sent a malformed JSON-RPC payload, an `error` field, or
    /// closed its stream before responding.
    WorkerProtocol {
        /// The RPC method being called (`buildAndDiff`, `diff`).
        method: String,
        detail: String,
    },

    /// No worker binary could be found for the requested language.
    AnalyzerUnavailable { language: String, command: String },

    /// A configuration file could not be parsed.
    ConfigError { path: PathBuf, detail: String },

    /// An I/O error occurred during a merge operation.
    Io(std::io::Error),

    /// A JSON payload (op, conflict, worker response) failed to parse.
    Json(serde_json::Error),
}

impl fmt::Display for SemmergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkerProtocol { method, detail } => {
                write!(
                    f,
                    "worker protocol error during '{method}': {detail}\n To fix: check the analyzer's stderr output; a fatal protocol error aborts the merge."
                )
            }
            Self::AnalyzerUnavailable { language, command } => {
                write!(
                    f,
                    "no analyzer available for language '{language}' (expected `{command}` on PATH).\n To fix: install the worker binary, or set `worker_command` for '{language}' in `.semmerge.toml`."
                )
            }
            Self::ConfigError { path, detail } => {
                write!(
                    f,
                    "configuration error in '{}': {}\n To fix: edit the config file and correct the issue.",
                    path.display(),
                    detail
                )
            }
            Self::Io(err) => {
                write!(
                    f,
                    "I/O error: {err}\n To fix: check file permissions and disk space."
                )
            }
            Self::Json(err) => {
                write!(
                    f,
                    "malformed JSON: {err}\n To fix: check the payload against the expected op/conflict schema."
                )
            }
        }
    }
}

impl std::error::Error for SemmergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SemmergeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for SemmergeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<crate::config::ConfigError> for SemmergeError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::ConfigError {
            path: err.path.unwrap_or_default(),
            detail: err.message,
        }
    }
}
