//! Core data model: operations, op logs, conflicts, and the small validated
//! value types they're built from (C1, C2).

pub mod conflict;
pub mod op;
pub mod types;
