//! Thin clap-derive CLI surface (C10) over the merge core: `diff`, `merge`,
//! and the git-invoked `driver` entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Semantic three-way merge for source-code revisions
///
/// semmerge computes symbol-level operation logs on each side of a branch,
/// composes them deterministically, and materializes a merged working tree.
/// It can be run directly or wired up as a git merge driver.
///
/// QUICK START:
///
///   semmerge diff HEAD~1 HEAD --language typescript
///   semmerge merge main~1 main feature --language typescript
///
/// AS A GIT MERGE DRIVER, in `.gitattributes`:
///
///   *.ts merge=semmerge
///
/// and in `.git/config`:
///
///   [merge "semmerge"]
///       driver = semmerge driver %O %A %B %P --language typescript
#[derive(Parser)]
#[command(name = "semmerge")]
#[command(version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read-only: diff a revision against a base, print the resulting op log
    ///
    /// Runs the worker's `diff` RPC only — no compose, no apply. Useful for
    /// inspecting what the analyzer sees before attempting a real merge.
    Diff(DiffArgs),

    /// Run the full semantic merge pipeline: snapshot, diff, compose, apply
    Merge(MergeArgs),

    /// Git merge-driver entry point: `semmerge driver %O %A %B %P`
    ///
    /// Acquires the merge-driver lock so a single logical merge — invoked
    /// once per conflicted file by git — only runs the pipeline once.
    Driver(DriverArgs),
}

#[derive(clap::Args)]
pub struct DiffArgs {
    /// Base revision
    pub base: String,
    /// Revision to diff against the base
    pub revision: String,
    /// Language whose worker should analyze the trees
    #[arg(long)]
    pub language: String,
    /// Repository root (defaults to the current directory)
    #[arg(long)]
    pub repo: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct MergeArgs {
    /// Base (common ancestor) revision
    pub base: String,
    /// "Ours" revision
    pub left: String,
    /// "Theirs" revision
    pub right: String,
    /// Language whose worker should analyze the trees
    #[arg(long)]
    pub language: String,
    /// Repository root (defaults to the current directory)
    #[arg(long)]
    pub repo: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct DriverArgs {
    /// %O — base version's temp file path
    pub base: PathBuf,
    /// %A — ours version's temp file path (overwritten with the result on success)
    pub ours: PathBuf,
    /// %B — theirs version's temp file path
    pub theirs: PathBuf,
    /// %P — original path of the conflicted file, relative to the repo root
    pub original_path: PathBuf,
    /// Language whose worker should analyze the trees
    #[arg(long)]
    pub language: String,
}
