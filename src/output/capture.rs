//! Page captures
//!
//! Every visited page is captured into one shared folder. Writes into the
//! folder are serialized by their own lock, independent of the record sink.

use crate::output::traits::OutputResult;
use crate::session::{Session, SessionResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Creates `base/name` (and `base`) if missing and returns its path
pub fn create_subfolder(base: &Path, name: &str) -> OutputResult<PathBuf> {
    let path = base.join(name);
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Replaces characters that are not allowed in file names
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// File name for the capture of one page
///
/// # Examples
///
/// ```
/// use parts_harvester::output::capture_file_name;
///
/// assert_eq!(
///     capture_file_name("0986494104", "BOSCH", 2, "png"),
///     "0986494104 BOSCH page 2.png"
/// );
/// assert_eq!(capture_file_name("a/b", "C:D", 1, "html"), "a_b C_D page 1.html");
/// ```
pub fn capture_file_name(keyword: &str, manufacturer: &str, page: u32, extension: &str) -> String {
    format!(
        "{} {} page {}.{}",
        sanitize(keyword),
        sanitize(manufacturer),
        page,
        extension
    )
}

/// The shared capture folder
pub struct CaptureStore {
    directory: PathBuf,
    lock: Mutex<()>,
    written: AtomicUsize,
}

impl CaptureStore {
    /// Creates the capture folder `name` under `base`
    pub fn create(base: &Path, name: &str) -> OutputResult<Self> {
        let directory = create_subfolder(base, name)?;
        tracing::debug!("Captures will be written to {}", directory.display());
        Ok(Self {
            directory,
            lock: Mutex::new(()),
            written: AtomicUsize::new(0),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of captures written so far
    pub fn written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    /// Captures the session's current page
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Where the capture was written
    /// * `Err(SessionError)` - The session failed to produce the capture
    pub async fn capture(
        &self,
        session: &mut dyn Session,
        keyword: &str,
        manufacturer: &str,
        page: u32,
    ) -> SessionResult<PathBuf> {
        let file_name = capture_file_name(keyword, manufacturer, page, session.capture_extension());
        let path = self.directory.join(file_name);

        let _guard = self.lock.lock().await;
        session.screenshot(&path).await?;
        self.written.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Captured {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_subfolder_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let first = create_subfolder(dir.path(), "APEC Screenshots").unwrap();
        let second = create_subfolder(dir.path(), "APEC Screenshots").unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn test_create_subfolder_creates_parents() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out");
        let folder = create_subfolder(&nested, "shots").unwrap();
        assert!(folder.is_dir());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(" brake|pad? "), "brake_pad_");
        assert_eq!(sanitize("FEBI BILSTEIN"), "FEBI BILSTEIN");
    }

    #[test]
    fn test_store_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = CaptureStore::create(dir.path(), "shots").unwrap();
        assert_eq!(store.written(), 0);
        assert_eq!(store.directory(), dir.path().join("shots"));
    }
}
