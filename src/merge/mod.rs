//! Deterministic symbol-level merge: compose two op logs (C5), then apply
//! the composed sequence to a copy of the base tree (C6).
//!
//! # Determinism guarantee
//!
//! The same pair of op logs always produces byte-identical composed output,
//! and applying that output to the same base tree always produces the same
//! merged tree — no wall clock, process id, or hash randomization anywhere
//! on this path.

pub mod apply;
pub mod compose;

pub use apply::apply;
pub use compose::{compose, ComposeResult};
