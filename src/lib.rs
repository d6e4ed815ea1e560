//! Purpose: Library crate behind the `unjson` CLI and its tests.
//! Exports: `api` (stable entry points), `core` (table, payload, flatten, errors), `notice`.
//! Role: Flattens a double-encoded JSON column of a TSV file into one column per key.
//! Invariants: Core modules take explicit inputs (text, config) and hold no global state.
//! Invariants: Only `api::flatten_file` and `core::files` touch the filesystem.
pub mod api;
pub mod core;
pub mod notice;
