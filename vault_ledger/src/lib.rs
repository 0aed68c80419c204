//! Cross-run state and orchestration for bar-list verification.
//!
//! The engine crate reconciles one snapshot; this crate remembers the
//! previous ones. It keeps a SQLite ledger of every bar ever seen per fund,
//! feeds the previous snapshot back into the reconciler, computes a
//! human-readable delta per run, and drives the whole chain from the
//! `vault-ledger` binary.

pub mod db;
pub mod delta;
pub mod history;
pub mod models;
pub mod registry;
pub mod schema;
pub mod verify;
