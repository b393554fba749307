//! Bearer credential storage.
//!
//! The services treat the stored credential as an opaque string. Its presence
//! gates every authenticated request.

use crate::error::{FeedError, FeedResult};
use parking_lot::RwLock;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Storage for the bearer credential.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored credential, if any.
    fn get(&self) -> Option<String>;

    /// Replaces the stored credential. `None` removes it.
    fn set(&self, credential: Option<String>) -> FeedResult<()>;

    /// Removes the stored credential.
    fn clear(&self) -> FeedResult<()> {
        self.set(None)
    }
}

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credential: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `credential`.
    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            credential: RwLock::new(Some(credential.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.credential.read().clone()
    }

    fn set(&self, credential: Option<String>) -> FeedResult<()> {
        *self.credential.write() = credential;
        Ok(())
    }
}

/// Credential store backed by a single file.
///
/// The file holds the raw credential; surrounding whitespace is ignored and
/// an empty file counts as no credential. Writes go through a temporary file
/// and a rename so a crash never leaves a truncated token behind.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store reading and writing `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> FeedResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let trimmed = content.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_owned()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FeedError::Storage(format!("{}: {e}", self.path.display()))),
        }
    }

    fn write(&self, credential: &str) -> FeedResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, credential)?;
        restrict_to_owner(&tmp)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn remove(&self) -> FeedResult<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// The credential is a bearer token; keep it owner-only.
#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> FeedResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> FeedResult<()> {
    Ok(())
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<String> {
        match self.read() {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "credential file unreadable");
                None
            }
        }
    }

    fn set(&self, credential: Option<String>) -> FeedResult<()> {
        match credential {
            Some(credential) => self.write(&credential),
            None => self.remove(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get(), None);

        store.set(Some("tok".into())).unwrap();
        assert_eq!(store.get().as_deref(), Some("tok"));

        store.clear().unwrap();
        assert_eq!(store.get(), None);

        let store = MemoryCredentialStore::with_credential("preset");
        assert_eq!(store.get().as_deref(), Some("preset"));
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested").join("token"));
        assert_eq!(store.get(), None);

        store.set(Some("secret-token".into())).unwrap();
        assert_eq!(store.get().as_deref(), Some("secret-token"));

        let reopened = FileCredentialStore::new(store.path());
        assert_eq!(reopened.get().as_deref(), Some("secret-token"));

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.get(), None);
    }

    #[test]
    fn file_store_trims_and_ignores_blank() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token");
        let store = FileCredentialStore::new(&path);

        fs::write(&path, "  tok\n").unwrap();
        assert_eq!(store.get().as_deref(), Some("tok"));

        fs::write(&path, "\n\n").unwrap();
        assert_eq!(store.get(), None);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token"));
        store.set(Some("tok".into())).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn unreadable_path_counts_as_logged_out() {
        let dir = tempdir().unwrap();
        // A directory cannot be read as a file.
        let store = FileCredentialStore::new(dir.path());
        assert!(matches!(store.read(), Err(FeedError::Storage(_))));
        assert_eq!(store.get(), None);
    }

    #[test]
    fn clearing_missing_file_is_ok() {
        let dir = tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token"));
        assert!(store.clear().is_ok());
    }
}
