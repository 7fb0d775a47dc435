//! Structured conflict model (C2): the record the composer emits when it
//! cannot reconcile two ops on the same symbol, and the remediation
//! suggestions offered alongside it.
//!
//! # Serialization
//!
//! All categories share one flat shape, tagged by `category`, matching the
//! literal schema in:
//!
//! ```json
//! {
//!   "id": "a1b2c3d4-e5f6a7b8",
//!   "category": "DivergentRename",
//!   "symbolId": "s1",
//!   "addressIds": {"a": "a.ts:1-2", "b": "a.ts:1-2"},
//!   "opA": { ... },
//!   "opB": { ... },
//!   "minimalSlice": "s1",
//!   "suggestions": [{"id": "keepA", "label": "keep foo", "opIds": ["..."]}]
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::op::Op;

/// The closed set of conflict categories. Only [`Conflict::divergent_rename`]
/// ships a working factory; the rest are declared so they round-trip through
/// the conflicts file, but no composer rule constructs them today.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictCategory {
    DivergentRename,
    DivergentMove,
    DeleteVsEdit,
    SignatureClash,
    ImportClash,
}

impl fmt::Display for ConflictCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivergentRename => write!(f, "DivergentRename"),
            Self::DivergentMove => write!(f, "DivergentMove"),
            Self::DeleteVsEdit => write!(f, "DeleteVsEdit"),
            Self::SignatureClash => write!(f, "SignatureClash"),
            Self::ImportClash => write!(f, "ImportClash"),
        }
    }
}

/// The two (or three, including `base`) addresses a conflict straddles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictAddresses {
    pub a: Option<String>,
    pub b: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

/// One remediation choice offered alongside a conflict: `{id, label, opIds}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub label: String,
    pub op_ids: Vec<String>,
}

/// A structured record of two incompatible ops on the same symbol.
///
/// Emitted by the composer, never resolved by the core — it is written to
/// `.semmerge-conflicts.json` for a human or a downstream tool to act on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: String,
    pub category: ConflictCategory,
    pub symbol_id: String,
    pub address_ids: ConflictAddresses,
    pub op_a: ConflictOp,
    pub op_b: ConflictOp,
    pub minimal_slice: String,
    pub suggestions: Vec<Suggestion>,
}

/// The op-id/kind pair a conflict cites — enough to cross-reference the
/// originating ops without inlining the full `Op` payload twice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictOp {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ConflictOp {
    fn from_op(op: &Op) -> Self {
        Self {
            id: op.id.clone(),
            kind: op.kind.to_string(),
        }
    }
}

impl Conflict {
    /// `id` is derived deterministically from the first 8 characters of each
    /// op id — never from randomness or the wall clock.
    fn derive_id(op_a: &Op, op_b: &Op) -> String {
        let a = op_a.id.chars().take(8).collect::<String>();
        let b = op_b.id.chars().take(8).collect::<String>();
        format!("{a}-{b}")
    }

    /// Build a `DivergentRename` conflict from two `renameSymbol` ops on the
    /// same symbol whose `newName`s disagree.
    #[must_use]
    pub fn divergent_rename(op_a: &Op, op_b: &Op) -> Self {
        let id = Self::derive_id(op_a, op_b);
        let new_name_a = op_a.param_str("newName").unwrap_or_default();
        let new_name_b = op_b.param_str("newName").unwrap_or_default();

        Self {
            id,
            category: ConflictCategory::DivergentRename,
            symbol_id: op_a.symbol_id().to_owned(),
            address_ids: ConflictAddresses {
                a: op_a.target.address_id.clone(),
                b: op_b.target.address_id.clone(),
                base: None,
            },
            op_a: ConflictOp::from_op(op_a),
            op_b: ConflictOp::from_op(op_b),
            minimal_slice: op_a.symbol_id().to_owned(),
            suggestions: vec![
                Suggestion {
                    id: "keepA".to_owned(),
                    label: format!("keep rename to {new_name_a}"),
                    op_ids: vec![op_a.id.clone()],
                },
                Suggestion {
                    id: "keepB".to_owned(),
                    label: format!("keep rename to {new_name_b}"),
                    op_ids: vec![op_b.id.clone()],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::op::{OperationKind, Provenance, Target};

    fn rename_op(id: &str, new_name: &str) -> Op {
        let mut op = Op::new(
            OperationKind::RenameSymbol,
            Target::new("s1".into(), Some("a.ts:1-2".into())),
            Provenance::new("2024-01-01T00:00:00Z"),
        );
        op.id = id.to_owned();
        op.set_param("newName", new_name);
        op
    }

    #[test]
    fn divergent_rename_id_is_deterministic() {
        let a = rename_op("11111111-aaaa", "foo");
        let b = rename_op("22222222-bbbb", "bar");
        let c1 = Conflict::divergent_rename(&a, &b);
        let c2 = Conflict::divergent_rename(&a, &b);
        assert_eq!(c1.id, c2.id);
        assert_eq!(c1.id, "11111111-22222222");
    }

    #[test]
    fn divergent_rename_suggestions_reference_new_names() {
        let a = rename_op("11111111-aaaa", "foo");
        let b = rename_op("22222222-bbbb", "bar");
        let conflict = Conflict::divergent_rename(&a, &b);
        assert_eq!(conflict.suggestions.len(), 2);
        assert!(conflict.suggestions[0].label.ends_with("foo"));
        assert!(conflict.suggestions[1].label.ends_with("bar"));
        assert_eq!(conflict.suggestions[0].op_ids, vec![a.id.clone()]);
        assert_eq!(conflict.suggestions[1].op_ids, vec![b.id.clone()]);
    }

    #[test]
    fn conflict_round_trips_through_json() {
        let a = rename_op("11111111-aaaa", "foo");
        let b = rename_op("22222222-bbbb", "bar");
        let conflict = Conflict::divergent_rename(&a, &b);
        let json = serde_json::to_string(&conflict).expect("serializes");
        let back: Conflict = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(conflict, back);
    }
}
