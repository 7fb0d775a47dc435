//! Composer (C5): deterministic merge of two op logs into one sequence plus
//! a conflict list.
//!
//! The same inputs always produce byte-identical output regardless of
//! execution environment — no wall clock, no process id, no hash
//! randomization anywhere in the ordering.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::model::conflict::Conflict;
use crate::model::op::{Op, OperationKind};

/// The result of composing two op logs: the merged sequence plus any
/// conflicts the merge could not reconcile.
#[derive(Debug, Default)]
pub struct ComposeResult {
    pub ops: Vec<Op>,
    pub conflicts: Vec<Conflict>,
}

/// Sort key for an op: `(priority, timestamp, id)`. Stable under
/// repeated sorts since ties are broken by the globally-unique `id`.
fn sort_key(op: &Op) -> (u8, String, String) {
    let timestamp = if op.provenance.timestamp.is_empty() {
        crate::model::op::Provenance::EPOCH.to_owned()
    } else {
        op.provenance.timestamp.clone()
    };
    (op.kind.priority(), timestamp, op.id.clone())
}

fn is_rename(op: &Op) -> bool {
    op.kind == OperationKind::RenameSymbol
}

fn is_move_decl(op: &Op) -> bool {
    op.kind == OperationKind::MoveDecl
}

/// Merge `delta_a` and `delta_b` into one deterministic sequence plus a
/// conflict list.
#[must_use]
pub fn compose(delta_a: &[Op], delta_b: &[Op]) -> ComposeResult {
    let mut a: Vec<Op> = delta_a.to_vec();
    let mut b: Vec<Op> = delta_b.to_vec();
    a.sort_by_key(sort_key);
    b.sort_by_key(sort_key);

    let mut rename_chain: BTreeMap<String, String> = BTreeMap::new();
    let mut move_chain: BTreeMap<String, String> = BTreeMap::new();

    let mut result = ComposeResult::default();
    let mut i = 0usize;
    let mut j = 0usize;

    while i < a.len() || j < b.len() {
        let head_a = a.get(i);
        let head_b = b.get(j);

        // Both heads rename the same symbol: coalesce on agreement, else conflict.
        if let (Some(ha), Some(hb)) = (head_a, head_b) {
            if is_rename(ha) && is_rename(hb) && ha.symbol_id() == hb.symbol_id() {
                let new_name_a = ha.param_str("newName");
                let new_name_b = hb.param_str("newName");
                if new_name_a.is_some() && new_name_a == new_name_b {
                    let chosen = clone_with_chains(ha, &rename_chain, &move_chain);
                    if let Some(name) = new_name_a {
                        rename_chain.insert(ha.symbol_id().to_owned(), name.to_owned());
                    }
                    result.ops.push(chosen);
                    i += 1;
                    j += 1;
                    continue;
                }
                result.conflicts.push(Conflict::divergent_rename(ha, hb));
                i += 1;
                j += 1;
                continue;
            }
        }

        let take_from_a = match (head_a, head_b) {
            (Some(ha), Some(hb)) => sort_key(ha) <= sort_key(hb),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => unreachable!("loop condition guarantees at least one head"),
        };

        let chosen_src = if take_from_a {
            let op = &a[i];
            i += 1;
            op
        } else {
            let op = &b[j];
            j += 1;
            op
        };

        let symbol = chosen_src.symbol_id().to_owned();
        let chosen = clone_with_chains(chosen_src, &rename_chain, &move_chain);

        if is_rename(chosen_src) {
            if let Some(name) = chosen_src.param_str("newName") {
                rename_chain.insert(symbol.clone(), name.to_owned());
            }
        }
        if is_move_decl(chosen_src) {
            if let Some(addr) = chosen_src.param_str("newAddress") {
                move_chain.insert(symbol, addr.to_owned());
            }
        }

        result.ops.push(chosen);
    }

    result
}

/// Deep-clone `op` and rewrite it according to any chain entries for its own
/// symbol — never another symbol's.
fn clone_with_chains(
    op: &Op,
    rename_chain: &BTreeMap<String, String>,
    move_chain: &BTreeMap<String, String>,
) -> Op {
    let mut clone = op.clone();

    if let Some(address) = move_chain.get(op.symbol_id()) {
        clone.target.address_id = Some(address.clone());
        if clone.kind == OperationKind::MoveDecl {
            clone.set_param("newAddress", Value::String(address.clone()));
        }
    }

    if !is_rename(op) {
        if let Some(new_name) = rename_chain.get(op.symbol_id()) {
            clone.set_param("renameContext", Value::String(new_name.clone()));
        }
    }

    clone
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::op::{Provenance, Target};

    fn op(kind: OperationKind, symbol: &str, ts: &str) -> Op {
        Op::new(kind, Target::new(symbol.into(), None), Provenance::new(ts))
    }

    fn rename(symbol: &str, new_name: &str, ts: &str) -> Op {
        let mut o = op(OperationKind::RenameSymbol, symbol, ts);
        o.set_param("newName", new_name);
        o
    }

    #[test]
    fn s1_single_move_composes() {
        let mut move_op = op(OperationKind::MoveDecl, "s1", "2024-01-01T00:00:00Z");
        move_op.target.address_id = Some("old".into());
        move_op.set_param("newAddress", "new");

        let result = compose(&[move_op], &[]);
        assert_eq!(result.ops.len(), 1);
        assert!(result.conflicts.is_empty());
        assert_eq!(result.ops[0].target.address_id.as_deref(), Some("new"));
        assert_eq!(result.ops[0].param_str("newAddress"), Some("new"));
    }

    #[test]
    fn s2_divergent_rename_emits_conflict() {
        let a = rename("s1", "foo", "2024-01-01T00:00:00Z");
        let b = rename("s1", "bar", "2024-01-01T00:00:01Z");
        let result = compose(&[a], &[b]);
        assert!(result.ops.is_empty());
        assert_eq!(result.conflicts.len(), 1);
        let conflict = &result.conflicts[0];
        assert_eq!(conflict.suggestions.len(), 2);
        assert!(conflict.suggestions[0].label.ends_with("foo"));
        assert!(conflict.suggestions[1].label.ends_with("bar"));
    }

    #[test]
    fn s3_converging_rename_coalesces() {
        let a = rename("s1", "foo", "2024-01-01T00:00:00Z");
        let b = rename("s1", "foo", "2024-01-01T00:00:01Z");
        let result = compose(&[a], &[b]);
        assert_eq!(result.ops.len(), 1);
        assert!(result.conflicts.is_empty());
        assert_eq!(result.ops[0].param_str("newName"), Some("foo"));
    }

    #[test]
    fn s4_rename_then_unrelated_edit_carries_rename_context() {
        let a = rename("s1", "foo", "2024-01-01T00:00:00Z");
        let b = op(OperationKind::EditStmtBlock, "s1", "2024-01-01T00:00:01Z");
        let result = compose(&[a], &[b]);
        assert_eq!(result.ops.len(), 2);
        assert_eq!(result.ops[1].param_str("renameContext"), Some("foo"));
    }

    #[test]
    fn output_length_never_exceeds_sum_of_inputs() {
        let a = vec![
            rename("s1", "foo", "2024-01-01T00:00:00Z"),
            op(OperationKind::AddDecl, "s2", "2024-01-01T00:00:01Z"),
        ];
        let b = vec![op(OperationKind::DeleteDecl, "s3", "2024-01-01T00:00:02Z")];
        let result = compose(&a, &b);
        assert!(result.ops.len() <= a.len() + b.len());
    }

    #[test]
    fn output_ids_are_unique() {
        let a = vec![op(OperationKind::AddDecl, "s1", "2024-01-01T00:00:00Z")];
        let b = vec![op(OperationKind::AddDecl, "s2", "2024-01-01T00:00:01Z")];
        let result = compose(&a, &b);
        let mut ids: Vec<&str> = result.ops.iter().map(|o| o.id.as_str()).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn composition_is_deterministic_across_repeated_calls() {
        let a = vec![
            rename("s1", "foo", "2024-01-01T00:00:00Z"),
            op(OperationKind::AddDecl, "s2", "2024-01-01T00:00:01Z"),
        ];
        let b = vec![op(OperationKind::EditStmtBlock, "s1", "2024-01-01T00:00:02Z")];

        let first = compose(&a, &b);
        let second = compose(&a, &b);
        assert_eq!(
            first.ops.iter().map(Op::to_json).collect::<Vec<_>>(),
            second.ops.iter().map(Op::to_json).collect::<Vec<_>>()
        );
    }

    #[test]
    fn inputs_are_not_mutated_by_composition() {
        let a = vec![rename("s1", "foo", "2024-01-01T00:00:00Z")];
        let b = vec![op(OperationKind::EditStmtBlock, "s1", "2024-01-01T00:00:01Z")];
        let a_before = a.clone();
        let b_before = b.clone();
        let _ = compose(&a, &b);
        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }

    #[test]
    fn unrelated_symbol_never_inherits_rename_context() {
        let a = rename("s1", "foo", "2024-01-01T00:00:00Z");
        let b = op(OperationKind::ReorderImports, "s2", "2024-01-01T00:00:01Z");
        let result = compose(&[a], &[b]);
        let unrelated = result
            .ops
            .iter()
            .find(|o| o.symbol_id() == "s2")
            .expect("s2 op present");
        assert!(unrelated.param_str("renameContext").is_none());
    }
}
