//! Atomic file creation helpers.
//!
//! Uses a temp file + rename pattern so a crash mid-write never leaves a
//! truncated file at the destination. Creation never clobbers: if the target
//! appears between our existence check and the rename, the write fails.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSyncPolicy {
    SyncAll,
    SkipSync,
}

#[derive(Debug, Clone, Copy)]
pub struct PersistOptions {
    /// File sync policy for the temp file before persisting.
    pub file_sync: FileSyncPolicy,
    /// Unix mode applied to the created file. Ignored elsewhere.
    pub mode: Option<u32>,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            file_sync: FileSyncPolicy::SyncAll,
            mode: Some(0o644),
        }
    }
}

/// Create every missing directory above `path`.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Write `bytes` to a new file at `path`, creating parent directories.
///
/// Fails with [`io::ErrorKind::AlreadyExists`] if `path` already exists.
pub fn persist_new(path: impl AsRef<Path>, bytes: &[u8], options: PersistOptions) -> io::Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    if matches!(options.file_sync, FileSyncPolicy::SyncAll) {
        tmp.as_file().sync_all()?;
    }

    if let Err(err) = tmp.persist_noclobber(path) {
        return Err(err.error);
    }

    #[cfg(unix)]
    if let Some(mode) = options.mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = options.mode;

    debug!(path = %path.display(), bytes = bytes.len(), "Persisted new file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{FileSyncPolicy, PersistOptions, persist_new};

    fn fast() -> PersistOptions {
        PersistOptions {
            file_sync: FileSyncPolicy::SkipSync,
            mode: None,
        }
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a").join("b").join("config.toml");

        persist_new(&path, b"x = 1", fast()).expect("write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "x = 1");
    }

    #[test]
    fn refuses_to_clobber_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "original").expect("seed");

        let err = persist_new(&path, b"replacement", fast()).unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&path).expect("read"), "original");
    }

    #[cfg(unix)]
    #[test]
    fn applies_unix_mode_when_configured() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let opts = PersistOptions {
            file_sync: FileSyncPolicy::SkipSync,
            mode: Some(0o600),
        };

        persist_new(&path, b"secret", opts).expect("write");

        let mode = fs::metadata(&path).expect("metadata").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
