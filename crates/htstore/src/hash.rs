use crate::error::{HashSnafu, InvalidInputSnafu, Result, UnsupportedMethodSnafu};
use snafu::{OptionExt, ResultExt, ensure};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Method tag of the built-in bcrypt hasher.
pub const BCRYPT: &str = "BCRYPT";

/// Default bcrypt work factor.
pub const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// A salted, one-way password hashing method.
///
/// Implementations must use a slow, adaptive algorithm and compare digests in
/// constant time.
pub trait PasswordHasher: Send + Sync {
    /// Hash `password` with a freshly generated salt.
    fn hash(&self, password: &str) -> Result<String>;

    /// Check `password` against a digest previously produced by [`Self::hash`].
    fn verify(&self, password: &str, digest: &str) -> Result<bool>;
}

/// bcrypt, producing `$2b$` digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Creates a hasher with the given work factor (4 to 31).
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// The configured work factor.
    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String> {
        bcrypt::hash(password, self.cost).context(HashSnafu)
    }

    fn verify(&self, password: &str, digest: &str) -> Result<bool> {
        // All bcrypt variants ($2a$, $2b$, $2y$) are compatible for verification
        match bcrypt::verify(password, digest) {
            Ok(matches) => Ok(matches),
            Err(e) => {
                tracing::debug!("Stored digest is not a valid bcrypt hash: {e}");
                Ok(false)
            }
        }
    }
}

/// Registry of hashing methods keyed by their (case-insensitive) tag.
///
/// Every operation that takes a password also takes an optional method tag;
/// `None` selects the default method. New methods can be added with
/// [`Hashers::register`] without touching any call site.
pub struct Hashers {
    methods: HashMap<String, Box<dyn PasswordHasher>>,
    default_method: String,
}

impl Hashers {
    /// A registry holding only bcrypt at the given cost, which is also the default.
    pub fn with_bcrypt_cost(cost: u32) -> Self {
        let mut hashers = Self {
            methods: HashMap::new(),
            default_method: BCRYPT.to_string(),
        };
        hashers.register(BCRYPT, BcryptHasher::new(cost));
        hashers
    }

    /// Adds (or replaces) the hasher for `tag`.
    pub fn register(&mut self, tag: &str, hasher: impl PasswordHasher + 'static) -> &mut Self {
        self.methods.insert(normalize(tag), Box::new(hasher));
        self
    }

    /// Makes `tag` the method used when callers pass no tag.
    pub fn set_default(&mut self, tag: &str) -> Result<&mut Self> {
        let tag = normalize(tag);
        ensure!(
            self.methods.contains_key(&tag),
            UnsupportedMethodSnafu { method: tag }
        );
        self.default_method = tag;
        Ok(self)
    }

    /// Tag of the default method.
    pub fn default_method(&self) -> &str {
        &self.default_method
    }

    /// Registered method tags, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Resolves a method tag, falling back to the default one.
    pub fn get(&self, method: Option<&str>) -> Result<&dyn PasswordHasher> {
        let tag = method.map_or_else(|| self.default_method.clone(), normalize);
        let hasher = self
            .methods
            .get(&tag)
            .context(UnsupportedMethodSnafu { method: tag })?;
        Ok(hasher.as_ref())
    }

    /// Hash `password` with the selected method.
    pub fn hash(&self, password: &str, method: Option<&str>) -> Result<String> {
        ensure!(
            !password.is_empty(),
            InvalidInputSnafu {
                reason: "password must not be empty"
            }
        );
        self.get(method)?.hash(password)
    }

    /// Check `password` against `digest` with the selected method.
    pub fn verify(&self, password: &str, digest: &str, method: Option<&str>) -> Result<bool> {
        ensure!(
            !password.is_empty(),
            InvalidInputSnafu {
                reason: "password must not be empty"
            }
        );
        ensure!(
            !digest.is_empty(),
            InvalidInputSnafu {
                reason: "hash must not be empty"
            }
        );
        self.get(method)?.verify(password, digest)
    }

    /// Format a `username:hash` credential line.
    pub fn line(&self, username: &str, password: &str, method: Option<&str>) -> Result<String> {
        validate_username(username)?;
        Ok(format!("{}:{}", username, self.hash(password, method)?))
    }
}

impl Default for Hashers {
    fn default() -> Self {
        Self::with_bcrypt_cost(DEFAULT_BCRYPT_COST)
    }
}

impl fmt::Debug for Hashers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hashers")
            .field("methods", &self.methods())
            .field("default_method", &self.default_method)
            .finish()
    }
}

fn normalize(tag: &str) -> String {
    tag.to_ascii_uppercase()
}

/// Usernames are the first column of a `username:hash` line, so they can't be
/// empty or carry a colon or a line break. A leading `#` or surrounding
/// whitespace would make the line read back as a comment or never match.
pub(crate) fn validate_username(username: &str) -> Result<()> {
    ensure!(
        !username.is_empty(),
        InvalidInputSnafu {
            reason: "username must not be empty"
        }
    );
    ensure!(
        !username.contains([':', '\n', '\r']),
        InvalidInputSnafu {
            reason: "username must not contain ':' or line breaks"
        }
    );
    ensure!(
        !username.starts_with('#'),
        InvalidInputSnafu {
            reason: "username must not start with '#'"
        }
    );
    ensure!(
        username.trim() == username,
        InvalidInputSnafu {
            reason: "username must not start or end with whitespace"
        }
    );
    Ok(())
}

fn default_hashers() -> &'static Hashers {
    static HASHERS: OnceLock<Hashers> = OnceLock::new();
    HASHERS.get_or_init(Hashers::default)
}

/// Hash a password with the default registry.
pub fn hash_password(password: &str, method: Option<&str>) -> Result<String> {
    default_hashers().hash(password, method)
}

/// Verify a password against a hash with the default registry.
pub fn verify_password(password: &str, hash: &str, method: Option<&str>) -> Result<bool> {
    default_hashers().verify(password, hash, method)
}

/// Build a `username:hash` line with the default registry.
pub fn credential_line(username: &str, password: &str, method: Option<&str>) -> Result<String> {
    default_hashers().line(username, password, method)
}
