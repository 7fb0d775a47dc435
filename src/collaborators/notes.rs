//! Side-channel notes collaborator: given a commit hash and an `OpLog`,
//! persist it under a named namespace. Failures are swallowed — notes are
//! advisory, never load-bearing.

use std::path::Path;
use std::process::Command;

use tracing::warn;

use crate::config::NotesConfig;
use crate::model::op::OpLog;
use crate::model::types::CommitHash;

/// Attach `log` to `commit` as a git note under `config.namespace`.
///
/// Always returns successfully to the caller's eyes — any failure (disabled
/// in config, `git notes` exits non-zero, I/O error) is logged at `warn` and
/// otherwise ignored.
pub fn write_notes(repo_root: &Path, commit: &CommitHash, log: &OpLog, config: &NotesConfig) {
    if !config.enabled {
        return;
    }

    let payload = log.to_json();
    let result = Command::new("git")
        .args([
            "notes",
            "--ref",
            &config.namespace,
            "add",
            "-f",
            "-m",
            &payload,
            commit.as_str(),
        ])
        .current_dir(repo_root)
        .output();

    match result {
        Ok(output) if output.status.success() => {}
        Ok(output) => {
            warn!(
                commit = %commit,
                namespace = %config.namespace,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "failed to write side-channel notes; continuing"
            );
        }
        Err(err) => {
            warn!(commit = %commit, error = %err, "could not invoke git notes; continuing");
        }
    }
}
