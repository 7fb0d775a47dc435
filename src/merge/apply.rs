//! Applier (C6): deterministic projection of a composed op sequence onto a
//! copy of the base tree. The base tree itself is never touched.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::model::op::{Op, OperationKind};

/// Project `ops` (in composed order) onto a fresh copy of `base`, returning
/// the path to the new tree. `base` is read-only throughout.
///
/// # Errors
/// Returns an I/O error only if the initial recursive copy of `base` fails;
/// per-op failures (missing source file, unknown kind) are logged and
/// skipped, never propagated.
pub fn apply(base: &Path, ops: &[Op]) -> std::io::Result<tempfile::TempDir> {
    let out = tempfile::tempdir()?;
    copy_tree(base, out.path())?;

    for op in ops {
        apply_one(out.path(), op);
    }

    Ok(out)
}

fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)?.flatten() {
        let path = entry.path();
        let target = dst.join(entry.file_name());
        let meta = entry.metadata()?;
        if meta.is_dir() {
            std::fs::create_dir_all(&target)?;
            copy_tree(&path, &target)?;
        } else {
            std::fs::copy(&path, &target)?;
        }
    }
    Ok(())
}

/// Normalize a tree-relative path from op params: an absolute path is
/// rejected down to its final component; `..`/`.` segments are dropped
/// everywhere, so a malicious or buggy analyzer payload can never escape
/// the tree root.
fn normalize(root: &Path, raw: &str) -> PathBuf {
    let candidate = Path::new(raw);
    let is_absolute = matches!(
        candidate.components().next(),
        Some(Component::RootDir | Component::Prefix(_))
    );

    let mut safe = PathBuf::new();
    for component in candidate.components() {
        if let Component::Normal(part) = component {
            safe.push(part);
        }
    }

    if is_absolute {
        if let Some(Component::Normal(last)) = candidate.components().last() {
            safe = PathBuf::from(last);
        }
    }

    root.join(safe)
}

fn apply_one(root: &Path, op: &Op) {
    match &op.kind {
        OperationKind::MoveDecl => apply_move(root, op, "oldFile", "newFile"),
        OperationKind::MoveFile => apply_move(root, op, "oldPath", "newPath"),
        OperationKind::RenameSymbol => apply_rename_symbol(root, op),
        OperationKind::ModifyImport => apply_modify_import(root, op),
        other => {
            warn!(op_id = %op.id, kind = %other, "unknown or unhandled op kind; skipping");
        }
    }
}

fn apply_move(root: &Path, op: &Op, old_key: &str, new_key: &str) {
    let (Some(old_raw), Some(new_raw)) = (op.param_str(old_key), op.param_str(new_key)) else {
        return;
    };
    if old_raw == new_raw {
        return;
    }
    let old_path = normalize(root, old_raw);
    let new_path = normalize(root, new_raw);

    if !old_path.exists() {
        warn!(op_id = %op.id, path = %old_path.display(), "move source missing; skipping");
        return;
    }
    if let Some(parent) = new_path.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            warn!(op_id = %op.id, error = %err, "could not create parent directory for move");
            return;
        }
    }
    if let Err(err) = std::fs::rename(&old_path, &new_path) {
        warn!(op_id = %op.id, error = %err, "move failed");
    }
}

/// Rewrite whole-word occurrences of `oldName` with `newName` in the file
/// named by `params.file` (or `params.newFile` if a preceding move already
/// relocated it).
fn apply_rename_symbol(root: &Path, op: &Op) {
    let (Some(old_name), Some(new_name)) = (op.param_str("oldName"), op.param_str("newName"))
    else {
        return;
    };
    let Some(file_raw) = op.param_str("newFile").or_else(|| op.param_str("file")) else {
        return;
    };
    let path = normalize(root, file_raw);
    let Ok(contents) = std::fs::read_to_string(&path) else {
        warn!(op_id = %op.id, path = %path.display(), "rename target missing; skipping");
        return;
    };
    let rewritten = replace_word_boundary(&contents, old_name, new_name);
    if let Err(err) = std::fs::write(&path, rewritten) {
        warn!(op_id = %op.id, error = %err, "could not write renamed file");
    }
}

fn apply_modify_import(root: &Path, op: &Op) {
    let (Some(old_import), Some(new_import)) =
        (op.param_str("oldImport"), op.param_str("newImport"))
    else {
        return;
    };
    let Some(file_raw) = op.param_str("file") else {
        return;
    };
    let path = normalize(root, file_raw);
    let Ok(contents) = std::fs::read_to_string(&path) else {
        warn!(op_id = %op.id, path = %path.display(), "import target missing; skipping");
        return;
    };
    let rewritten = contents.replace(old_import, new_import);
    if let Err(err) = std::fs::write(&path, rewritten) {
        warn!(op_id = %op.id, error = %err, "could not write modified import");
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace whole-word occurrences of `needle` with `replacement` in `text`.
/// A "whole word" match is bounded on both sides by a non-identifier
/// character or the start/end of the string.
fn replace_word_boundary(text: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        if text[i..].starts_with(needle) {
            let before_ok = i == 0 || !is_word_char(text[..i].chars().next_back().unwrap_or(' '));
            let after_idx = i + needle.len();
            let after_ok = after_idx >= text.len()
                || !is_word_char(text[after_idx..].chars().next().unwrap_or(' '));
            if before_ok && after_ok {
                out.push_str(replacement);
                i = after_idx;
                continue;
            }
        }
        let ch = text[i..].chars().next().unwrap_or('\u{0}');
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}
