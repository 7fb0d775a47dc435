//! Integration coverage for the composer/applier pipeline wired together
//! through the crate's public API.

use std::fs;

use semmerge::merge::{apply, compose};
use semmerge::model::op::{Op, OperationKind, Provenance, Target};

fn rename(symbol: &str, file: &str, old: &str, new: &str, ts: &str) -> Op {
    let mut op = Op::new(
        OperationKind::RenameSymbol,
        Target::new(symbol.into(), None),
        Provenance::new(ts),
    );
    op.set_param("file", file);
    op.set_param("oldName", old);
    op.set_param("newName", new);
    op
}

fn move_file(old_path: &str, new_path: &str, ts: &str) -> Op {
    let mut op = Op::new(
        OperationKind::MoveFile,
        Target::new("s1".into(), None),
        Provenance::new(ts),
    );
    op.set_param("oldPath", old_path);
    op.set_param("newPath", new_path);
    op
}

#[test]
fn compose_then_apply_end_to_end_rename() {
    let base = tempfile::tempdir().expect("tempdir");
    fs::write(base.path().join("a.ts"), "function add(){} add();").expect("write");

    let a = vec![rename("s1", "a.ts", "add", "plus", "2024-01-01T00:00:00Z")];
    let b = vec![];

    let composed = compose(&a, &b);
    assert!(composed.conflicts.is_empty());

    let merged = apply(base.path(), &composed.ops).expect("apply succeeds");
    let contents = fs::read_to_string(merged.path().join("a.ts")).expect("read merged");
    assert_eq!(contents, "function plus(){} plus();");
}

#[test]
fn compose_then_apply_end_to_end_move_file() {
    let base = tempfile::tempdir().expect("tempdir");
    fs::create_dir(base.path().join("src")).expect("mkdir");
    fs::write(base.path().join("src/x.ts"), "export const x = 1;").expect("write");

    let a = vec![move_file("src/x.ts", "lib/x.ts", "2024-01-01T00:00:00Z")];
    let composed = compose(&a, &[]);

    let merged = apply(base.path(), &composed.ops).expect("apply succeeds");
    assert!(!merged.path().join("src/x.ts").exists());
    assert_eq!(
        fs::read_to_string(merged.path().join("lib/x.ts")).expect("read moved"),
        "export const x = 1;"
    );
}

#[test]
fn divergent_rename_surfaces_as_conflict_and_applies_nothing_for_that_symbol() {
    let base = tempfile::tempdir().expect("tempdir");
    fs::write(base.path().join("a.ts"), "function add(){} add();").expect("write");

    let a = vec![rename("s1", "a.ts", "add", "plus", "2024-01-01T00:00:00Z")];
    let b = vec![rename("s1", "a.ts", "add", "sum", "2024-01-01T00:00:01Z")];

    let composed = compose(&a, &b);
    assert_eq!(composed.conflicts.len(), 1);
    assert!(composed.ops.is_empty());

    // Nothing touched the symbol, so applying the (empty) composed sequence
    // leaves the file exactly as the base had it.
    let merged = apply(base.path(), &composed.ops).expect("apply succeeds");
    let contents = fs::read_to_string(merged.path().join("a.ts")).expect("read merged");
    assert_eq!(contents, "function add(){} add();");
}

#[test]
fn composition_is_byte_identical_across_repeated_runs() {
    let a = vec![rename("s1", "a.ts", "add", "plus", "2024-01-01T00:00:00Z")];
    let b = vec![move_file("src/x.ts", "lib/x.ts", "2024-01-01T00:00:01Z")];

    let first = compose(&a, &b);
    let second = compose(&a, &b);
    let first_json: Vec<String> = first.ops.iter().map(Op::to_json).collect();
    let second_json: Vec<String> = second.ops.iter().map(Op::to_json).collect();
    assert_eq!(first_json, second_json);
}
