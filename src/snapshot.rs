//! Workspace snapshot (C4): recursively enumerate source files under a tree
//! and produce the `{path, content}` payload the worker transport consumes.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::worker::{SnapshotFile, WorkerSnapshot};

/// Recursively enumerate files under `root`, returning paths relative to it.
/// Entries whose name matches a glob in `ignore` are pruned before recursing
/// into them. An uncompilable pattern never matches rather than aborting the
/// walk.
fn walk_dir(root: &Path, current: &Path, ignore: &[String], files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(current) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let ignored = ignore.iter().any(|pat| {
            glob::Pattern::new(pat)
                .ok()
                .is_some_and(|p| p.matches(&name))
        });
        if ignored {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            walk_dir(root, &path, ignore, files);
        } else if let Ok(rel) = path.strip_prefix(root) {
            files.push(rel.to_path_buf());
        }
    }
}

/// Build a [`WorkerSnapshot`] from every file under `root` whose suffix is
/// in `suffixes`. Files that aren't valid UTF-8 are skipped with a
/// `tracing::warn!` diagnostic rather than failing the whole snapshot.
#[must_use]
pub fn snapshot(root: &Path, suffixes: &[String], ignore: &[String]) -> WorkerSnapshot {
    let mut paths = Vec::new();
    walk_dir(root, root, ignore, &mut paths);
    paths.sort();

    let mut files = Vec::new();
    for rel in paths {
        let matches_suffix = suffixes
            .iter()
            .any(|suf| rel.to_string_lossy().ends_with(suf.as_str()));
        if !matches_suffix {
            continue;
        }
        let abs = root.join(&rel);
        match std::fs::read(&abs) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(content) => files.push(SnapshotFile {
                    path: rel.to_string_lossy().replace('\\', "/"),
                    content,
                }),
                Err(_) => warn!(path = %rel.display(), "skipping non-UTF-8 file in snapshot"),
            },
            Err(err) => {
                warn!(path = %rel.display(), error = %err, "could not read file for snapshot");
            }
        }
    }
    WorkerSnapshot::new(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn snapshot_includes_only_matching_suffixes() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.ts"), "const x = 1;").expect("write");
        fs::write(dir.path().join("b.md"), "# notes").expect("write");

        let snap = snapshot(
            dir.path(),
            &[".ts".to_owned()],
            &[".git".to_owned(), "target".to_owned()],
        );
        assert_eq!(snap.files.len(), 1);
        assert_eq!(snap.files[0].path, "a.ts");
    }

    #[test]
    fn snapshot_prunes_ignored_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("node_modules")).expect("mkdir");
        fs::write(dir.path().join("node_modules/dep.ts"), "export const x = 1;").expect("write");
        fs::write(dir.path().join("main.ts"), "const y = 1;").expect("write");

        let snap = snapshot(
            dir.path(),
            &[".ts".to_owned()],
            &["node_modules".to_owned()],
        );
        assert_eq!(snap.files.len(), 1);
        assert_eq!(snap.files[0].path, "main.ts");
    }

    #[test]
    fn snapshot_prunes_files_matching_ignore_glob() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.generated.ts"), "const x = 1;").expect("write");
        fs::write(dir.path().join("main.ts"), "const y = 1;").expect("write");

        let snap = snapshot(
            dir.path(),
            &[".ts".to_owned()],
            &["*.generated.ts".to_owned()],
        );
        assert_eq!(snap.files.len(), 1);
        assert_eq!(snap.files[0].path, "main.ts");
    }

    #[test]
    fn snapshot_paths_are_posix_relative_and_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("src")).expect("mkdir");
        fs::write(dir.path().join("src/b.ts"), "1").expect("write");
        fs::write(dir.path().join("a.ts"), "2").expect("write");

        let snap = snapshot(dir.path(), &[".ts".to_owned()], &[]);
        let paths: Vec<&str> = snap.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.ts", "src/b.ts"]);
    }
}
