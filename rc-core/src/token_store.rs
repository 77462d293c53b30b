//! On-disk persistence for the access token.
//!
//! The token is stored as a single line in a plain file under the data
//! directory. An empty or missing file means "signed out".

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::RcResult;
use crate::platform::Platform;

const TOKEN_FILE_NAME: &str = "auth_token";

/// File-backed access token storage.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Store the token at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store the token in the platform data directory.
    pub fn default_location() -> RcResult<Self> {
        Ok(Self::new(Platform::data_dir()?.join(TOKEN_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token, if any.
    pub fn load(&self) -> RcResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a token, replacing any previous one.
    pub fn save(&self, token: &str) -> RcResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token.trim())?;
        debug!("token saved to {}", self.path.display());
        Ok(())
    }

    /// Remove the stored token. Removing a missing token is not an error.
    pub fn clear(&self) -> RcResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("token removed from {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
