use snafu::Snafu;
use std::path::PathBuf;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported by credential store operations and password hashing.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// A required field was empty or malformed.
    #[snafu(display("Invalid input: {reason}"))]
    InvalidInput { reason: &'static str },

    /// No hasher is registered under the requested method tag.
    #[snafu(display("Unsupported hash method '{method}'"))]
    UnsupportedMethod { method: String },

    /// User already exists in the credential file.
    #[snafu(display("User '{username}' already exists"))]
    UserAlreadyExists { username: String },

    /// User is not in the credential file, or the file does not exist.
    #[snafu(display("User '{username}' does not exist"))]
    UserNotFound { username: String },

    /// The current password did not verify against the stored hash.
    #[snafu(display("Invalid credentials for user '{username}'"))]
    InvalidCredentials { username: String },

    /// Failed to read the credential file for a reason other than absence.
    #[snafu(display("Failed to read credential file '{}'", path.display()))]
    FileRead {
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to write the credential file.
    #[snafu(display("Failed to write credential file '{}'", path.display()))]
    FileWrite {
        source: std::io::Error,
        path: PathBuf,
    },

    /// The hashing primitive itself failed.
    #[snafu(display("Failed to hash password"))]
    Hash { source: bcrypt::BcryptError },

    /// A background task was cancelled before it finished. Only produced by
    /// the async store.
    #[snafu(display("Background task failed: {message}"))]
    TaskJoin { message: String },
}

impl Error {
    /// Returns the underlying I/O error for file failures.
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            Error::FileRead { source, .. } | Error::FileWrite { source, .. } => Some(source),
            _ => None,
        }
    }
}
