//! Purpose: Library crate behind the `kirkpatrick` CLI, dashboard server, and tests.
//! Exports: `api` (store client, config, pipeline types) and `core` (model, filter, export, analytics).
//! Role: Keeps the data-processing pipeline independent of any presentation layer.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
//! Invariants: Only `api` performs network I/O.
pub mod api;
pub mod core;
pub mod notice;
