//! Core domain types for presence-lsp.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod activity;
mod document;
mod editor;

pub use activity::{ActivityKind, ActivityPayload, Button, ImagePair, Slot, SlotUsage};
pub use document::{DocumentChange, file_extension};
pub use editor::{ApplicationId, EditorName};

use thiserror::Error;

/// How the process should terminate once the editor session ends.
///
/// `exit` after a proper `shutdown` is clean; any other ending (an `exit`
/// without `shutdown`, or the editor closing stdin) is abnormal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Clean,
    Abnormal,
}

impl ExitStatus {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            ExitStatus::Clean => 0,
            ExitStatus::Abnormal => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value '{raw}'; expected one of: {expected:?}")]
pub struct EnumParseError {
    kind: &'static str,
    raw: String,
    expected: &'static [&'static str],
}

impl EnumParseError {
    #[must_use]
    pub fn new(kind: &'static str, raw: impl Into<String>, expected: &'static [&'static str]) -> Self {
        Self {
            kind,
            raw: raw.into(),
            expected,
        }
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}
