#![warn(missing_docs)]

//! A flat-file credential store in the htpasswd format.
//!
//! The file maps usernames to salted password hashes, one `username:hash`
//! line per user. Every operation reads the whole file; every mutation writes
//! the whole file back. Passwords are hashed with bcrypt by default, and
//! further methods can be plugged in through [`Hashers`].
//!
//! # Example
//!
//! ```no_run
//! use htstore::{Config, CredentialStore, WriteOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CredentialStore::new(Config::new(".htpasswd"));
//!
//! // Add a new user, creating the file if needed
//! store.add("alice", "password123", &WriteOptions::default())?;
//!
//! // Look up the stored hash
//! if let Some(user) = store.find("alice")? {
//!     println!("{} -> {}", user.username, user.password);
//! }
//!
//! // Change the password, proving knowledge of the current one
//! store.change_password("alice", "hunter2", Some("password123"), &WriteOptions::default())?;
//!
//! // Removing is idempotent
//! store.remove("alice")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! The store holds no lock on the file. Two writers operating on the same
//! file at the same time, in one process or several, can overwrite each
//! other's changes.

mod config;
mod error;
mod file;
mod hash;
#[cfg(feature = "tokio")]
mod nonblocking;
mod store;

pub use config::{Config, DEFAULT_FILE};
pub use error::{Error, Result};
pub use file::{FileStore, FsFileStore};
pub use hash::{
    BCRYPT, BcryptHasher, DEFAULT_BCRYPT_COST, Hashers, PasswordHasher, credential_line,
    hash_password, verify_password,
};
#[cfg(feature = "tokio")]
pub use nonblocking::AsyncCredentialStore;
pub use store::{CredentialStore, User, WriteOptions};
