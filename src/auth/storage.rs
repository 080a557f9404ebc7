//! Where the current session is kept between calls and between runs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::debug;

use super::Session;
use crate::config::ClientOptions;
use crate::error::Error;

/// Backing store for the current session
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<Session>, Error>;
    fn save(&self, session: &Session) -> Result<(), Error>;
    fn clear(&self) -> Result<(), Error>;
}

/// Pick the storage described by the options
pub fn session_storage(options: &ClientOptions) -> Arc<dyn SessionStorage> {
    match (&options.session_file, options.persist_session) {
        (Some(path), true) => Arc::new(FileStorage::new(path)),
        _ => Arc::new(MemoryStorage::default()),
    }
}

/// Keeps the session for the lifetime of the process only
#[derive(Debug, Default)]
pub struct MemoryStorage {
    session: RwLock<Option<Session>>,
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Session>, Error> {
        let guard = self
            .session
            .read()
            .map_err(|_| Error::storage("session lock poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, session: &Session) -> Result<(), Error> {
        let mut guard = self
            .session
            .write()
            .map_err(|_| Error::storage("session lock poisoned"))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        let mut guard = self
            .session
            .write()
            .map_err(|_| Error::storage("session lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}

/// Persists the session as a JSON file
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<Session>, Error> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)
            .map_err(|e| Error::storage(format!("{}: {}", self.path.display(), e)))?;
        let session = serde_json::from_str(&text)?;
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::storage(format!("{}: {}", parent.display(), e)))?;
            }
        }
        let text = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, text)
            .map_err(|e| Error::storage(format!("{}: {}", self.path.display(), e)))?;
        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| Error::storage(format!("{}: {}", self.path.display(), e)))?;
            debug!("Session file {} removed", self.path.display());
        }
        Ok(())
    }
}
