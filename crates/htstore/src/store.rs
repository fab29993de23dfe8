use crate::config::Config;
use crate::error::{
    FileReadSnafu, FileWriteSnafu, InvalidCredentialsSnafu, InvalidInputSnafu, Result,
    UserAlreadyExistsSnafu, UserNotFoundSnafu,
};
use crate::file::{FileStore, FsFileStore};
use crate::hash::{Hashers, validate_username};
use snafu::{OptionExt, ResultExt, ensure};
use std::io;
use std::path::{Path, PathBuf};

/// A parsed `username:hash` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Name in the first column.
    pub username: String,
    /// Stored hash from the second column. Never the plaintext password.
    pub password: String,
}

impl User {
    /// Splits a line on its first colon. A line without one yields an empty hash.
    pub fn from_line(line: &str) -> Self {
        let (username, password) = split_line(line);
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

/// The file as loaded: its lines plus the line ending to write them back with.
struct Lines {
    lines: Vec<String>,
    newline: &'static str,
}

impl Lines {
    fn parse(contents: &str) -> Self {
        Self {
            lines: contents.lines().map(str::to_string).collect(),
            newline: if contents.contains("\r\n") { "\r\n" } else { "\n" },
        }
    }

    fn render(&self) -> String {
        self.lines
            .iter()
            .map(|line| format!("{line}{}", self.newline))
            .collect()
    }
}

impl Default for Lines {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            newline: "\n",
        }
    }
}

/// Options for operations that write a new hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Hash method tag; `None` selects the store's default method.
    pub method: Option<String>,
    /// For `add`, overwrite an existing user. For `change_password`, skip
    /// verification of the current password.
    pub force: bool,
}

impl WriteOptions {
    /// Options with `force` set.
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }

    /// Selects the hash method by tag.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }
}

/// Credential file mapping usernames to password hashes.
///
/// Every call reads the whole file and every mutation writes the whole file
/// back; nothing is cached between calls. There is no locking, so concurrent
/// writers (threads or processes) can lose each other's updates.
///
/// When a username occurs more than once, the last occurrence is the one
/// found, overwritten, or removed.
#[derive(Debug)]
pub struct CredentialStore<F = FsFileStore> {
    path: PathBuf,
    files: F,
    hashers: Hashers,
}

impl CredentialStore {
    /// A store on the local file system.
    pub fn new(config: Config) -> Self {
        Self::with_file_store(config, FsFileStore)
    }

    /// A store on the local file system at `path`, with default settings.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(Config::new(path))
    }
}

impl<F: FileStore> CredentialStore<F> {
    /// A store reading and writing through `files`.
    pub fn with_file_store(config: Config, files: F) -> Self {
        Self {
            hashers: Hashers::with_bcrypt_cost(config.bcrypt_cost()),
            path: config.path().to_path_buf(),
            files,
        }
    }

    /// Replaces the hash method registry.
    pub fn with_hashers(mut self, hashers: Hashers) -> Self {
        self.hashers = hashers;
        self
    }

    /// Path of the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hash methods available to this store.
    pub fn hashers(&self) -> &Hashers {
        &self.hashers
    }

    /// Looks up a user. A missing file has no users.
    pub fn find(&self, username: &str) -> Result<Option<User>> {
        let Some(Lines { lines, .. }) = self.load()? else {
            return Ok(None);
        };
        Ok(find_user_index(username, &lines).map(|index| User::from_line(&lines[index])))
    }

    /// All lines of the file, verbatim. A missing file has no lines.
    pub fn find_all_raw(&self) -> Result<Vec<String>> {
        Ok(self.load()?.unwrap_or_default().lines)
    }

    /// All credential lines, parsed. Blank and `#` comment lines are skipped.
    pub fn find_all(&self) -> Result<Vec<User>> {
        Ok(self
            .find_all_raw()?
            .iter()
            .filter(|line| is_credential_line(line))
            .map(|line| User::from_line(line))
            .collect())
    }

    /// Adds a user, creating the file if needed.
    ///
    /// Fails with `UserAlreadyExists` unless `options.force` is set, in which
    /// case the existing line is replaced in place.
    pub fn add(&self, username: &str, password: &str, options: &WriteOptions) -> Result<()> {
        validate_username(username)?;
        ensure_password(password)?;
        let hasher = self.hashers.get(options.method())?;

        let mut file = self.load()?.unwrap_or_default();
        let index = find_user_index(username, &file.lines);
        ensure!(
            index.is_none() || options.force,
            UserAlreadyExistsSnafu { username }
        );

        let line = format!("{}:{}", username, hasher.hash(password)?);
        match index {
            Some(index) => file.lines[index] = line,
            None => file.lines.push(line),
        }
        self.save(&file)?;

        tracing::info!(
            user = username,
            path = %self.path.display(),
            replaced = index.is_some(),
            "Added user"
        );
        Ok(())
    }

    /// Removes a user. Absent users and a missing file are not errors.
    ///
    /// Returns whether a line was removed.
    pub fn remove(&self, username: &str) -> Result<bool> {
        let Some(mut file) = self.load()? else {
            return Ok(false);
        };
        let Some(index) = find_user_index(username, &file.lines) else {
            tracing::debug!(user = username, "Nothing to remove");
            return Ok(false);
        };

        file.lines.remove(index);
        self.save(&file)?;

        tracing::info!(user = username, path = %self.path.display(), "Removed user");
        Ok(true)
    }

    /// Replaces a user's hash.
    ///
    /// Unless `options.force` is set, `current_password` must verify against
    /// the stored hash with the default method; the new hash uses
    /// `options.method`. A missing file reports `UserNotFound`, the same as an
    /// absent user.
    pub fn change_password(
        &self,
        username: &str,
        password: &str,
        current_password: Option<&str>,
        options: &WriteOptions,
    ) -> Result<()> {
        ensure_password(password)?;
        let current_password = match current_password {
            Some(current) if !current.is_empty() => Some(current),
            _ => {
                ensure!(
                    options.force,
                    InvalidInputSnafu {
                        reason: "current password must not be empty"
                    }
                );
                None
            }
        };
        let hasher = self.hashers.get(options.method())?;

        let mut file = self.load()?.context(UserNotFoundSnafu { username })?;
        let index =
            find_user_index(username, &file.lines).context(UserNotFoundSnafu { username })?;

        if !options.force {
            let (_, stored) = split_line(&file.lines[index]);
            let verified = match current_password {
                Some(current) if !stored.is_empty() => {
                    self.hashers.get(None)?.verify(current, stored)?
                }
                _ => false,
            };
            ensure!(verified, InvalidCredentialsSnafu { username });
        }

        file.lines[index] = format!("{}:{}", username, hasher.hash(password)?);
        self.save(&file)?;

        tracing::info!(user = username, path = %self.path.display(), "Changed password");
        Ok(())
    }

    /// Checks a user's password with the default method.
    pub fn verify_user(&self, username: &str, password: &str) -> Result<bool> {
        let user = self.find(username)?.context(UserNotFoundSnafu { username })?;
        if user.password.is_empty() {
            return Ok(false);
        }
        self.hashers.verify(password, &user.password, None)
    }

    /// Reads the file into lines; `None` when it does not exist.
    fn load(&self) -> Result<Option<Lines>> {
        match self.files.read_all(&self.path) {
            Ok(contents) => Ok(Some(Lines::parse(&contents))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Credential file does not exist");
                Ok(None)
            }
            Err(e) => Err(e).context(FileReadSnafu { path: &self.path }),
        }
    }

    fn save(&self, file: &Lines) -> Result<()> {
        self.files
            .write_all(&self.path, &file.render())
            .context(FileWriteSnafu { path: &self.path })
    }
}

fn ensure_password(password: &str) -> Result<()> {
    ensure!(
        !password.is_empty(),
        InvalidInputSnafu {
            reason: "password must not be empty"
        }
    );
    Ok(())
}

fn split_line(line: &str) -> (&str, &str) {
    line.split_once(':').unwrap_or((line, ""))
}

fn is_credential_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// Index of the last line belonging to `username`.
fn find_user_index(username: &str, lines: &[String]) -> Option<usize> {
    lines
        .iter()
        .rposition(|line| is_credential_line(line) && split_line(line).0 == username)
}
