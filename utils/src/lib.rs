//! Shared infrastructure utilities for presence-lsp.
//!
//! - **`persist`**: Crash-safe file creation (temp + rename) used when the
//!   default configuration is materialized on first run.

pub mod persist;

pub use persist::{FileSyncPolicy, PersistOptions, ensure_parent_dir, persist_new};
