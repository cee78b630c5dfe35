//! Shapes of document change events.

/// What a `textDocument/didChange` notification told us about the edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentChange {
    /// Incremental edit; `line` is the 0-based start line of the first range.
    RangedEdit { line: u32 },
    /// Full-document replacement without range information.
    WholeReplace,
    /// No content changes, or a shape we do not recognise.
    Unknown,
}

impl DocumentChange {
    #[must_use]
    pub fn line(self) -> Option<u32> {
        match self {
            DocumentChange::RangedEdit { line } => Some(line),
            DocumentChange::WholeReplace | DocumentChange::Unknown => None,
        }
    }
}

/// Extension of `file_name` including the leading dot.
///
/// Everything from the last `.` onward, so `.bashrc` is its own extension and
/// `Makefile` has none. Case is preserved.
#[must_use]
pub fn file_extension(file_name: &str) -> Option<&str> {
    file_name.rfind('.').map(|idx| &file_name[idx..])
}
