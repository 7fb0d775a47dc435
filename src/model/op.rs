//! Canonical operation schema: [`Op`], [`OpLog`], and the closed set of
//! [`OperationKind`]s a symbol-level analyzer can emit.
//!
//! An `Op` is never mutated once created — the composer clones before it
//! annotates, the applier only ever reads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The closed, exhaustive set of operation kinds an analyzer may emit.
///
/// An unrecognized tag deserializes to [`OperationKind::Unknown`] rather than
/// failing — the composer sorts unknown kinds last (priority 99) and the
/// applier logs and skips them. Nothing here ever panics on unfamiliar input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationKind {
    RenameSymbol,
    MoveDecl,
    AddDecl,
    DeleteDecl,
    ChangeSignature,
    ReorderParams,
    AddParam,
    RemoveParam,
    ExtractMethod,
    InlineMethod,
    UpdateCall,
    EditStmtBlock,
    ModifyImport,
    ReorderImports,
    MoveFile,
    RenameFile,
    ModifyNamespace,
    /// Anything the core doesn't recognize. Preserves the original tag so it
    /// can still round-trip through `to_dict`/`from_dict`.
    Unknown(String),
}

impl OperationKind {
    const fn as_wire_str(&self) -> Option<&'static str> {
        Some(match self {
            Self::RenameSymbol => "renameSymbol",
            Self::MoveDecl => "moveDecl",
            Self::AddDecl => "addDecl",
            Self::DeleteDecl => "deleteDecl",
            Self::ChangeSignature => "changeSignature",
            Self::ReorderParams => "reorderParams",
            Self::AddParam => "addParam",
            Self::RemoveParam => "removeParam",
            Self::ExtractMethod => "extractMethod",
            Self::InlineMethod => "inlineMethod",
            Self::UpdateCall => "updateCall",
            Self::EditStmtBlock => "editStmtBlock",
            Self::ModifyImport => "modifyImport",
            Self::ReorderImports => "reorderImports",
            Self::MoveFile => "moveFile",
            Self::RenameFile => "renameFile",
            Self::ModifyNamespace => "modifyNamespace",
            Self::Unknown(_) => return None,
        })
    }

    fn from_wire_str(s: &str) -> Self {
        match s {
            "renameSymbol" => Self::RenameSymbol,
            "moveDecl" => Self::MoveDecl,
            "addDecl" => Self::AddDecl,
            "deleteDecl" => Self::DeleteDecl,
            "changeSignature" => Self::ChangeSignature,
            "reorderParams" => Self::ReorderParams,
            "addParam" => Self::AddParam,
            "removeParam" => Self::RemoveParam,
            "extractMethod" => Self::ExtractMethod,
            "inlineMethod" => Self::InlineMethod,
            "updateCall" => Self::UpdateCall,
            "editStmtBlock" => Self::EditStmtBlock,
            "modifyImport" => Self::ModifyImport,
            "reorderImports" => Self::ReorderImports,
            "moveFile" => Self::MoveFile,
            "renameFile" => Self::RenameFile,
            "modifyNamespace" => Self::ModifyNamespace,
            other => Self::Unknown(other.to_owned()),
        }
    }

    /// Composer precedence: lower sorts first. Unknown kinds sort last.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::MoveDecl => 10,
            Self::RenameSymbol => 11,
            Self::ModifyImport => 12,
            Self::ReorderImports => 13,
            Self::ChangeSignature => 20,
            Self::UpdateCall => 21,
            Self::AddDecl => 30,
            Self::DeleteDecl => 31,
            Self::ExtractMethod => 40,
            Self::InlineMethod => 41,
            Self::EditStmtBlock => 50,
            Self::ReorderParams => 51,
            Self::AddParam => 52,
            Self::RemoveParam => 53,
            Self::MoveFile => 60,
            Self::RenameFile => 61,
            Self::ModifyNamespace => 70,
            Self::Unknown(_) => 99,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_wire_str() {
            Some(s) => write!(f, "{s}"),
            None => match self {
                Self::Unknown(tag) => write!(f, "{tag}"),
                _ => unreachable!("as_wire_str only returns None for Unknown"),
            },
        }
    }
}

impl Serialize for OperationKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.as_wire_str() {
            Some(s) => serializer.serialize_str(s),
            None => match self {
                Self::Unknown(tag) => serializer.serialize_str(tag),
                _ => unreachable!("as_wire_str only returns None for Unknown"),
            },
        }
    }
}

impl<'de> Deserialize<'de> for OperationKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_wire_str(&raw))
    }
}

/// `{ symbolId, addressId? }`. `symbolId` is an opaque analyzer-minted
/// identity for a logical declaration; `addressId` an opaque identity for a
/// concrete file+range. Neither is ever parsed or compared structurally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub symbol_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_id: Option<String>,
}

impl Target {
    #[must_use]
    pub const fn new(symbol_id: String, address_id: Option<String>) -> Self {
        Self {
            symbol_id,
            address_id,
        }
    }
}

/// `{ timestamp, author?, commit? }`. `timestamp` is the sole composer
/// tie-breaker; it is never read from the wall clock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl Provenance {
    /// The fallback timestamp used in the composer sort key when an op
    /// carries none.
    pub const EPOCH: &'static str = "1970-01-01T00:00:00Z";

    #[must_use]
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            author: None,
            commit: None,
        }
    }
}

/// An atomic, addressable semantic change.
///
/// `params`/`guards`/`effects` are free-form JSON objects — their shape is
/// kind-specific and the core never interprets them beyond the handful of
/// `params` keys the composer and applier read by name (`newName`,
/// `newAddress`, `oldFile`/`newFile`, `oldPath`/`newPath`, `renameContext`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Op {
    pub id: String,
    pub schema_version: u32,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub target: Target,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    #[serde(default)]
    pub guards: BTreeMap<String, Value>,
    #[serde(default)]
    pub effects: BTreeMap<String, Value>,
    pub provenance: Provenance,
}

/// The current op schema version. Ops with any other `schema_version` are
/// rejected by [`Op::from_json`]/[`OpLog::from_json`].
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

impl Op {
    /// Construct a fresh op: a new globally-unique `id`, the current schema
    /// version, and empty param/guard/effect maps.
    #[must_use]
    pub fn new(kind: OperationKind, target: Target, provenance: Provenance) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            schema_version: CURRENT_SCHEMA_VERSION,
            kind,
            target,
            params: BTreeMap::new(),
            guards: BTreeMap::new(),
            effects: BTreeMap::new(),
            provenance,
        }
    }

    #[must_use]
    pub fn symbol_id(&self) -> &str {
        &self.target.symbol_id
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(key.into(), value.into());
    }

    /// Lossless dict round trip. Unknown top-level keys in the serialized
    /// form are stripped, not preserved.
    #[must_use]
    pub fn to_dict(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// # Errors
    /// Returns an error if `value` does not match the `Op` schema, or if the
    /// op carries an unrecognized `schema_version`.
    pub fn from_dict(value: Value) -> Result<Self, serde_json::Error> {
        let op: Self = serde_json::from_value(value)?;
        op.check_schema_version()?;
        Ok(op)
    }

    fn check_schema_version(&self) -> Result<(), serde_json::Error> {
        if self.schema_version == CURRENT_SCHEMA_VERSION {
            Ok(())
        } else {
            Err(serde::de::Error::custom(format!(
                "op {} carries unrecognized schema_version {} (expected {CURRENT_SCHEMA_VERSION})",
                self.id, self.schema_version
            )))
        }
    }

    /// # Errors
    /// Returns an error if `s` is not valid JSON matching the `Op` schema, or
    /// if the op carries an unrecognized `schema_version`.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let op: Self = serde_json::from_str(s)?;
        op.check_schema_version()?;
        Ok(op)
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// An ordered sequence of [`Op`]s. Order on the wire carries no semantic
/// weight — composition is what imposes a canonical order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpLog {
    pub ops: Vec<Op>,
}

impl OpLog {
    #[must_use]
    pub const fn new(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.ops).unwrap_or_default()
    }

    /// # Errors
    /// Returns an error if `s` is not a valid JSON array of `Op`s, or if any
    /// op carries an unrecognized `schema_version`.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let ops: Vec<Op> = serde_json::from_str(s)?;
        for op in &ops {
            op.check_schema_version()?;
        }
        Ok(Self { ops })
    }
}

impl FromIterator<Op> for OpLog {
    fn from_iter<T: IntoIterator<Item = Op>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_op() -> Op {
        let mut op = Op::new(
            OperationKind::RenameSymbol,
            Target::new("s1".into(), Some("a.ts:1-2".into())),
            Provenance::new("2024-01-01T00:00:00Z"),
        );
        op.set_param("oldName", "add");
        op.set_param("newName", "plus");
        op
    }

    #[test]
    fn op_round_trips_through_dict() {
        let op = sample_op();
        let dict = op.to_dict();
        let back = Op::from_dict(dict).expect("valid dict");
        assert_eq!(op, back);
    }

    #[test]
    fn op_round_trips_through_json() {
        let op = sample_op();
        let json = op.to_json();
        let back = Op::from_json(&json).expect("valid json");
        assert_eq!(op, back);
    }

    #[test]
    fn unknown_kind_is_preserved_and_sorts_last() {
        let json = r#"{
            "id": "x1", "schemaVersion": 1, "type": "futureOp",
            "target": {"symbolId": "s1"}, "params": {}, "guards": {},
            "effects": {}, "provenance": {"timestamp": "2024-01-01T00:00:00Z"}
        }"#;
        let op = Op::from_json(json).expect("parses despite unknown kind");
        assert_eq!(op.kind, OperationKind::Unknown("futureOp".into()));
        assert_eq!(op.kind.priority(), 99);
    }

    #[test]
    fn new_op_gets_fresh_unique_id() {
        let a = Op::new(
            OperationKind::AddDecl,
            Target::new("s1".into(), None),
            Provenance::new("2024-01-01T00:00:00Z"),
        );
        let b = Op::new(
            OperationKind::AddDecl,
            Target::new("s1".into(), None),
            Provenance::new("2024-01-01T00:00:00Z"),
        );
        assert_ne!(a.id, b.id);
        assert_eq!(a.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn oplog_round_trips_through_json() {
        let log = OpLog::new(vec![sample_op()]);
        let json = log.to_json();
        let back = OpLog::from_json(&json).expect("valid json");
        assert_eq!(log, back);
    }

    #[test]
    fn op_with_unrecognized_schema_version_is_rejected() {
        let json = r#"{
            "id": "x1", "schemaVersion": 99, "type": "addDecl",
            "target": {"symbolId": "s1"}, "params": {}, "guards": {},
            "effects": {}, "provenance": {"timestamp": "2024-01-01T00:00:00Z"}
        }"#;
        let err = Op::from_json(json).expect_err("unrecognized schema_version must be rejected");
        assert!(err.to_string().contains("schema_version"));
    }

    #[test]
    fn oplog_rejects_any_op_with_unrecognized_schema_version() {
        let mut stale = sample_op();
        stale.schema_version = CURRENT_SCHEMA_VERSION + 1;
        let json = format!("[{}]", stale.to_json());
        let err = OpLog::from_json(&json).expect_err("stale schema_version must be rejected");
        assert!(err.to_string().contains("schema_version"));
    }

    #[test]
    fn priority_table_matches_precedence_table() {
        assert_eq!(OperationKind::MoveDecl.priority(), 10);
        assert_eq!(OperationKind::RenameSymbol.priority(), 11);
        assert_eq!(OperationKind::ModifyNamespace.priority(), 70);
    }
}
