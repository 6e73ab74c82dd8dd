// Token persistence. The token is stored as JSON so refresh tokens and
// device codes survive between runs.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::models::Token;

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TokenStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored token. A missing file means "not logged in"; a
    /// corrupt one is ignored so the user can log in again.
    pub fn load(&self) -> Result<Option<Token>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("read token file {}", self.path.display()))
            }
        };

        match serde_json::from_str::<Token>(&data) {
            Ok(token) => Ok(Some(token)),
            Err(err) => {
                warn!("Token file {} is invalid ({err}), ignoring it", self.path.display());
                Ok(None)
            }
        }
    }

    pub fn save(&self, token: &Token) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("create token dir {}", dir.display()))?;
            }
        }
        let data = serde_json::to_string(token).context("encode token")?;
        fs::write(&self.path, data)
            .with_context(|| format!("write token file {}", self.path.display()))?;
        debug!("Token saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> Token {
        Token {
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            device_code: None,
        }
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token.json"));
        store.save(&token()).unwrap();
        assert_eq!(store.load().unwrap(), Some(token()));
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(TokenStore::new(path).load().unwrap(), None);
    }
}
