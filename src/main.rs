use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use semmerge::cli::{Cli, Commands, DiffArgs, DriverArgs, MergeArgs};
use semmerge::collaborators::{self, vcs};
use semmerge::config::SemmergeConfig;
use semmerge::orchestrate::{self, MergeInputs, MergeOutcome};
use semmerge::{error, model, snapshot, worker};

/// Exit codes: 0 success, 1 conflicts, 2 verifier rejection, other non-zero
/// for I/O or protocol failure.
const EXIT_SUCCESS: u8 = 0;
const EXIT_CONFLICTS: u8 = 1;
const EXIT_VERIFIER_REJECTED: u8 = 2;
const EXIT_FAILURE: u8 = 3;

fn init_logging() {
    let filter = EnvFilter::try_from_env("SEMMERGE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(repo: &Path) -> SemmergeConfig {
    match SemmergeConfig::load(&repo.join(".semmerge.toml")) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(%err, "failed to load `.semmerge.toml`");
            std::process::exit(i32::from(EXIT_FAILURE));
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Diff(args) => run_diff(&args),
        Commands::Merge(args) => run_merge_cmd(&args),
        Commands::Driver(args) => run_driver(&args),
    };
    ExitCode::from(code)
}

fn run_diff(args: &DiffArgs) -> u8 {
    let repo = args.repo.clone().unwrap_or_else(|| PathBuf::from("."));
    let config = load_config(&repo);
    let lang_config = config
        .languages
        .get(&args.language)
        .cloned()
        .unwrap_or_default();

    let base = match vcs::resolve_revision(&repo, &args.base) {
        Ok(r) => r,
        Err(err) => {
            error!(%err, "failed to resolve base revision");
            return EXIT_FAILURE;
        }
    };
    let right = match vcs::resolve_revision(&repo, &args.revision) {
        Ok(r) => r,
        Err(err) => {
            error!(%err, "failed to resolve revision");
            return EXIT_FAILURE;
        }
    };

    let base_snap = snapshot::snapshot(base.tree.path(), &lang_config.suffixes, &config.ignore);
    let right_snap = snapshot::snapshot(right.tree.path(), &lang_config.suffixes, &config.ignore);

    let mut worker = worker::Worker::new(
        &args.language,
        lang_config.worker_command_or_default(&args.language),
    );
    let result = worker.diff(&base_snap, &right_snap);
    worker.close();

    match result {
        Ok(diff) => {
            println!("{}", diff.op_log_right.to_json());
            EXIT_SUCCESS
        }
        Err(err) => {
            error!(%err, "diff failed");
            EXIT_FAILURE
        }
    }
}

fn run_merge_cmd(args: &MergeArgs) -> u8 {
    let repo = args.repo.clone().unwrap_or_else(|| PathBuf::from("."));
    let config = load_config(&repo);

    let base = match vcs::resolve_revision(&repo, &args.base) {
        Ok(r) => r,
        Err(err) => {
            error!(%err, "failed to resolve base revision");
            return EXIT_FAILURE;
        }
    };
    let left = match vcs::resolve_revision(&repo, &args.left) {
        Ok(r) => r,
        Err(err) => {
            error!(%err, "failed to resolve left revision");
            return EXIT_FAILURE;
        }
    };
    let right = match vcs::resolve_revision(&repo, &args.right) {
        Ok(r) => r,
        Err(err) => {
            error!(%err, "failed to resolve right revision");
            return EXIT_FAILURE;
        }
    };

    let inputs = MergeInputs {
        base: base.tree.path(),
        left: left.tree.path(),
        right: right.tree.path(),
        language: &args.language,
    };

    let result = orchestrate::run_merge(&inputs, &config);
    if let Ok(MergeOutcome::Success { ref op_log, .. }) = result {
        orchestrate::record_notes(&repo, &right.commit, op_log, &config);
    }
    handle_merge_outcome(result, &repo)
}

fn handle_merge_outcome(result: Result<MergeOutcome, error::SemmergeError>, repo: &Path) -> u8 {
    match result {
        Ok(MergeOutcome::Success { merged_tree, .. }) => {
            info!(tree = %merged_tree.display(), "merge succeeded");
            EXIT_SUCCESS
        }
        Ok(MergeOutcome::Conflicts(conflicts)) => {
            let path = repo.join(".semmerge-conflicts.json");
            if let Err(err) = write_conflicts_file(&path, &conflicts) {
                error!(%err, "failed to write conflicts file");
            } else {
                error!(path = %path.display(), count = conflicts.len(), "merge produced conflicts");
            }
            EXIT_CONFLICTS
        }
        Ok(MergeOutcome::VerifierRejected(outcome)) => {
            for diagnostic in &outcome.diagnostics {
                eprintln!("{diagnostic}");
            }
            EXIT_VERIFIER_REJECTED
        }
        Err(err) => {
            error!(%err, "merge failed");
            EXIT_FAILURE
        }
    }
}

fn write_conflicts_file(
    path: &Path,
    conflicts: &[model::conflict::Conflict],
) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(conflicts)?;
    std::fs::write(path, json)
}

fn run_driver(args: &DriverArgs) -> u8 {
    let git_dir = match std::process::Command::new("git")
        .args(["rev-parse", "--git-dir"])
        .output()
    {
        Ok(output) if output.status.success() => {
            PathBuf::from(String::from_utf8_lossy(&output.stdout).trim())
        }
        _ => {
            error!("could not determine git directory");
            return EXIT_FAILURE;
        }
    };

    match collaborators::MergeDriverLock::acquire(&git_dir) {
        Ok(Some(lock)) => {
            let code = run_driver_primary(args, &git_dir);
            drop(lock);
            code
        }
        Ok(None) => {
            info!("merge driver lock already held; skipping duplicate invocation");
            EXIT_SUCCESS
        }
        Err(err) => {
            error!(%err, "failed to acquire merge-driver lock");
            EXIT_FAILURE
        }
    }
}

/// The invocation that wins the merge-driver lock runs the real merge,
/// using the three per-file temp paths git already checked out for us.
fn run_driver_primary(args: &DriverArgs, _git_dir: &Path) -> u8 {
    let repo = PathBuf::from(".");
    let config = load_config(&repo);
    let lang_config = config
        .languages
        .get(&args.language)
        .cloned()
        .unwrap_or_default();

    let base_dir = match single_file_tree(&args.base, &args.original_path) {
        Ok(dir) => dir,
        Err(err) => {
            error!(%err, "failed to stage base file");
            return EXIT_FAILURE;
        }
    };
    let ours_dir = match single_file_tree(&args.ours, &args.original_path) {
        Ok(dir) => dir,
        Err(err) => {
            error!(%err, "failed to stage ours file");
            return EXIT_FAILURE;
        }
    };
    let theirs_dir = match single_file_tree(&args.theirs, &args.original_path) {
        Ok(dir) => dir,
        Err(err) => {
            error!(%err, "failed to stage theirs file");
            return EXIT_FAILURE;
        }
    };

    let inputs = MergeInputs {
        base: base_dir.path(),
        left: ours_dir.path(),
        right: theirs_dir.path(),
        language: &args.language,
    };

    match orchestrate::run_merge(&inputs, &config) {
        Ok(MergeOutcome::Success {
            merged_tree,
            op_log,
        }) => {
            let merged_file = merged_tree.join(&args.original_path);
            if let Err(err) = std::fs::copy(&merged_file, &args.ours) {
                error!(%err, "failed to write merged result back into working copy");
                return EXIT_FAILURE;
            }
            match vcs::resolve_commit(&repo, "MERGE_HEAD") {
                Ok(commit) => orchestrate::record_notes(&repo, &commit, &op_log, &config),
                Err(err) => {
                    error!(%err, "could not resolve MERGE_HEAD; skipping side-channel notes");
                }
            }
            EXIT_SUCCESS
        }
        other => handle_merge_outcome(other, &repo),
    }
}

/// Stage a single merge-driver temp file into a one-file tree rooted at
/// `relative_path`, so it can be fed through the same snapshot/apply
/// machinery a full-tree merge uses.
fn single_file_tree(source: &Path, relative_path: &Path) -> std::io::Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    let dest = dir.path().join(relative_path);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(source, dest)?;
    Ok(dir)
}
