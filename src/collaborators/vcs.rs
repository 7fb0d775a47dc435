//! VCS snapshot collaborator: given a revision, produce a tree path and a
//! resolved commit hash. Shells out to `git`, the only VCS this system
//! targets.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::model::types::CommitHash;

/// A checked-out tree plus the commit hash it resolves to.
pub struct ResolvedRevision {
    pub tree: tempfile::TempDir,
    pub commit: CommitHash,
}

/// Resolve `revision` against the repository at `repo_root`, checking its
/// tree out into a fresh temporary directory via `git archive`.
///
/// # Errors
/// Returns an I/O error if `git` cannot be spawned or exits non-zero.
pub fn resolve_revision(repo_root: &Path, revision: &str) -> std::io::Result<ResolvedRevision> {
    let commit_output = Command::new("git")
        .args(["rev-parse", revision])
        .current_dir(repo_root)
        .output()?;
    if !commit_output.status.success() {
        return Err(std::io::Error::other(format!(
            "git rev-parse {revision} failed: {}",
            String::from_utf8_lossy(&commit_output.stderr)
        )));
    }
    let hash_str = String::from_utf8_lossy(&commit_output.stdout)
        .trim()
        .to_owned();
    let commit = CommitHash::new(hash_str)
        .map_err(|e| std::io::Error::other(format!("git returned an invalid commit hash: {e}")))?;

    let tree = tempfile::tempdir()?;
    debug!(revision, commit = %commit, tree = %tree.path().display(), "checking out revision");
    checkout_tree(repo_root, commit.as_str(), tree.path())?;

    Ok(ResolvedRevision { tree, commit })
}

fn checkout_tree(repo_root: &Path, commit: &str, dest: &Path) -> std::io::Result<()> {
    let archive = Command::new("git")
        .args(["archive", "--format=tar", commit])
        .current_dir(repo_root)
        .output()?;
    if !archive.status.success() {
        return Err(std::io::Error::other(format!(
            "git archive {commit} failed: {}",
            String::from_utf8_lossy(&archive.stderr)
        )));
    }

    use std::io::Write;
    let mut tar = Command::new("tar")
        .args(["-x", "-C"])
        .arg(dest)
        .stdin(std::process::Stdio::piped())
        .spawn()?;
    tar.stdin
        .take()
        .expect("piped stdin")
        .write_all(&archive.stdout)?;
    let status = tar.wait()?;
    if !status.success() {
        return Err(std::io::Error::other(
            "tar extraction of git archive failed",
        ));
    }
    Ok(())
}

/// Resolve a revision without producing a tree — used where only the commit
/// hash is needed (e.g. before a side-channel notes write).
pub fn resolve_commit(repo_root: &Path, revision: &str) -> std::io::Result<CommitHash> {
    let output = Command::new("git")
        .args(["rev-parse", revision])
        .current_dir(repo_root)
        .output()?;
    if !output.status.success() {
        return Err(std::io::Error::other(format!(
            "git rev-parse {revision} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    let hash_str = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    CommitHash::new(hash_str)
        .map_err(|e| std::io::Error::other(format!("git returned an invalid commit hash: {e}")))
}
