//! semmerge library crate — re-exports the merge core for integration tests.
//!
//! The primary interface is the `semmerge` CLI binary (`src/main.rs`); this
//! crate exists so `tests/` can exercise the core directly.

pub mod cli;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod merge;
pub mod model;
pub mod orchestrate;
pub mod snapshot;
pub mod worker;
