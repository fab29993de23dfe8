use crate::hash::DEFAULT_BCRYPT_COST;
use std::path::{Path, PathBuf};

/// File used when no path is configured.
pub const DEFAULT_FILE: &str = ".htpasswd";

/// Settings for a [`CredentialStore`](crate::CredentialStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    path: PathBuf,
    bcrypt_cost: u32,
}

impl Config {
    /// Default settings with the credential file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Overrides the bcrypt work factor used for new hashes.
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Path of the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// bcrypt work factor.
    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_FILE),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}
