use std::fs::{self, OpenOptions};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Whole-file text storage backing a credential store.
///
/// A missing file must be reported as [`io::ErrorKind::NotFound`]; the store
/// treats that kind specially and propagates every other error.
pub trait FileStore: Send + Sync {
    /// Read the complete file as UTF-8 text.
    fn read_all(&self, path: &Path) -> io::Result<String>;

    /// Replace the file contents with `contents`, creating it if absent.
    fn write_all(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// [`FileStore`] on the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFileStore;

impl FileStore for FsFileStore {
    fn read_all(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write_all(&self, path: &Path, contents: &str) -> io::Result<()> {
        // Create parent directories if needed
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);

        // Only applies when the file gets created; existing files keep their mode
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path)?;
        file.write_all(contents.as_bytes())?;
        file.flush()
    }
}
