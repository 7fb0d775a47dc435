//! Orchestrator (C7): sequence snapshot → diff → compose → apply → hand off
//! to collaborators.
//!
//! On every exit path — success, conflict, verifier rejection, or a fatal
//! protocol error — temporary trees are dropped and the worker is released.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::collaborators::{run_formatter, run_verifier, write_notes, VerifierOutcome};
use crate::config::SemmergeConfig;
use crate::error::SemmergeError;
use crate::merge::{apply, compose};
use crate::model::conflict::Conflict;
use crate::model::op::OpLog;
use crate::model::types::CommitHash;
use crate::snapshot::snapshot;
use crate::worker::Worker;

/// The outcome of a full merge run, used by the CLI to pick an exit code.
pub enum MergeOutcome {
    /// The merge succeeded; `merged_tree` holds the final projected tree and
    /// `op_log` the composed ops that produced it, for the caller to hand to
    /// [`record_notes`].
    Success {
        merged_tree: PathBuf,
        op_log: OpLog,
    },
    /// Composition produced conflicts; nothing was applied.
    Conflicts(Vec<Conflict>),
    /// The merge applied cleanly but the external verifier rejected it.
    VerifierRejected(VerifierOutcome),
}

/// Inputs to a single merge run: three checked-out trees plus the language
/// whose worker should analyze them.
pub struct MergeInputs<'a> {
    pub base: &'a Path,
    pub left: &'a Path,
    pub right: &'a Path,
    pub language: &'a str,
}

/// Run the full pipeline for a single language: launch the worker,
/// snapshot all three trees, diff, compose, and — if clean — apply, format,
/// and verify.
///
/// # Errors
/// Returns [`SemmergeError`] for any fatal path: worker protocol
/// failure, missing analyzer binary, or I/O failure materializing the
/// merged tree. Conflicts and verifier rejection are reported via
/// [`MergeOutcome`], not as an `Err`.
pub fn run_merge(
    inputs: &MergeInputs<'_>,
    config: &SemmergeConfig,
) -> Result<MergeOutcome, SemmergeError> {
    let lang_config = config
        .languages
        .get(inputs.language)
        .cloned()
        .unwrap_or_default();
    let worker_command = lang_config.worker_command_or_default(inputs.language);
    let mut worker = Worker::new(inputs.language, worker_command);

    let base_snap = snapshot(inputs.base, &lang_config.suffixes, &config.ignore);
    let left_snap = snapshot(inputs.left, &lang_config.suffixes, &config.ignore);
    let right_snap = snapshot(inputs.right, &lang_config.suffixes, &config.ignore);

    info!(language = inputs.language, "requesting buildAndDiff from worker");
    let diff_result = worker.build_and_diff(&base_snap, &left_snap, &right_snap, Value::Null);
    worker.close();
    let diff_result = diff_result?;

    let composed = compose(&diff_result.op_log_left.ops, &diff_result.op_log_right.ops);
    if !composed.conflicts.is_empty() {
        info!(
            count = composed.conflicts.len(),
            "composition produced conflicts"
        );
        return Ok(MergeOutcome::Conflicts(composed.conflicts));
    }

    let op_log = OpLog::new(composed.ops.clone());
    let merged = apply(inputs.base, &composed.ops)?;
    run_formatter(merged.path(), &config.formatter);

    let outcome = run_verifier(merged.path(), &config.verifier);
    if !outcome.ok {
        return Ok(MergeOutcome::VerifierRejected(outcome));
    }

    // Ownership of the directory passes to the caller from here — it still
    // needs projecting into the working directory, then its own cleanup.
    let merged_path = merged.keep();

    Ok(MergeOutcome::Success {
        merged_tree: merged_path,
        op_log,
    })
}

/// Persist `diff_result`'s composed-op input as a side-channel note on
/// `commit`, tolerating any failure.
pub fn record_notes(
    repo_root: &Path,
    commit: &CommitHash,
    op_log: &crate::model::op::OpLog,
    config: &SemmergeConfig,
) {
    write_notes(repo_root, commit, op_log, &config.notes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_analyzer_binary_is_a_fatal_error() {
        let base = tempfile::tempdir().expect("tempdir");
        let left = tempfile::tempdir().expect("tempdir");
        let right = tempfile::tempdir().expect("tempdir");
        let mut config = SemmergeConfig::default();
        config.languages.insert(
            "typescript".into(),
            crate::config::LanguageConfig {
                suffixes: vec![".ts".into()],
                worker_command: Some("semmerge-worker-does-not-exist-xyz".into()),
            },
        );

        let inputs = MergeInputs {
            base: base.path(),
            left: left.path(),
            right: right.path(),
            language: "typescript",
        };
        let result = run_merge(&inputs, &config);
        assert!(matches!(
            result,
            Err(SemmergeError::AnalyzerUnavailable { .. })
        ));
    }
}
