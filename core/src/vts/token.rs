//! Persistence for the VTube Studio authentication token
//!
//! VTS hands out one token per plugin identity after the user approves
//! the popup; reusing it across runs skips re-approval. The token is a
//! single line in a file next to the config.

use std::path::{Path, PathBuf};

use crate::error::Result;

pub const DEFAULT_TOKEN_FILE: &str = "vts_token.txt";

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The saved token, if a previous run left one behind.
    pub fn load(&self) -> Option<String> {
        let token = std::fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    pub fn save(&self, token: &str) -> Result<()> {
        std::fs::write(&self.path, token)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
