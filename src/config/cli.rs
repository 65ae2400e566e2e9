use crate::domain::ports::Storage;
use crate::utils::error::{Result, TimelineError};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Mode for newly created outputs; they are served as static files.
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o644;

/// Filesystem storage. Relative paths resolve against `base_path`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base_path.join(path)
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Storage for LocalStorage {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let full_path = self.resolve(path);
        fs::read(&full_path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TimelineError::MissingFileError { path: full_path },
            _ => TimelineError::IoError(e),
        })
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);
        let parent = match full_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        // Staged next to the target so the rename never crosses filesystems.
        let mut staged = NamedTempFile::new_in(&parent)?;
        staged.write_all(data)?;

        // Temp files start out owner-only; keep the target's mode instead.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = match fs::metadata(&full_path) {
                Ok(metadata) => metadata.permissions(),
                Err(_) => fs::Permissions::from_mode(OUTPUT_MODE),
            };
            staged.as_file().set_permissions(permissions)?;
        }
        staged.as_file().sync_all()?;
        staged
            .persist(&full_path)
            .map_err(|e| TimelineError::IoError(e.error))?;

        tracing::debug!("Wrote {} bytes to {}", data.len(), full_path.display());
        Ok(())
    }
}
