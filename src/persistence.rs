// File: src/persistence.rs
use crate::error::{DictionaryError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;
use tempfile::NamedTempFile;

/// Resources with this prefix are packaged assets, never writable.
pub const ASSET_SCHEME: &str = "asset:";

/// Last-modified time of a dictionary file, shared with background saves.
pub(crate) type SharedTimestamp = Arc<Mutex<Option<SystemTime>>>;

pub fn is_asset(resource: &str) -> bool {
    resource.starts_with(ASSET_SCHEME)
}

/// Turns dictionary resource identifiers into filesystem paths.
///
/// `asset:<package>:<path>` resolves under `<asset_root>/<package>/`;
/// anything else is a plain path.
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    asset_root: PathBuf,
}

impl ResourceResolver {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self { asset_root: asset_root.into() }
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    pub fn filename(&self, resource: &str) -> PathBuf {
        match resource.strip_prefix(ASSET_SCHEME) {
            Some(asset) => match asset.split_once(':') {
                Some((package, path)) => self.asset_root.join(package).join(path),
                None => self.asset_root.join(asset),
            },
            None => PathBuf::from(resource),
        }
    }
}

impl Default for ResourceResolver {
    fn default() -> Self {
        Self::new("assets")
    }
}

pub fn resource_timestamp(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| DictionaryError::io(path, e))
}

pub fn is_writable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| !meta.permissions().readonly())
        .unwrap_or(false)
}

/// Writes `bytes` to a temp file beside `path`, then moves it into place, so
/// a partial file is never visible at `path`. Returns the new file's
/// modification time.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<SystemTime> {
    let parent_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file());
        writer.write_all(bytes)?;
        writer.flush()?;
    }
    let timestamp = temp_file.as_file().metadata()?.modified()?;

    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(timestamp)
}

/// How a dictionary runs its saves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveMode {
    /// On the caller's thread, no locking.
    Immediate,
    /// On the caller's thread, holding the saver's lock.
    Locked,
    /// On a background thread, holding the saver's lock, in call order.
    #[default]
    Background,
}

/// Save policy with its lock and pending background writes.
///
/// Each dictionary gets its own saver. Clones share the lock and the pending
/// list, so dictionaries built with the same saver never write at the same
/// time, even from different threads. A lone dictionary cannot be saved from
/// two threads at once anyway: it is not `Sync`.
#[derive(Debug, Clone)]
pub struct Saver {
    mode: SaveMode,
    lock: Arc<Mutex<()>>,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Saver {
    pub fn new(mode: SaveMode) -> Self {
        Self {
            mode,
            lock: Arc::new(Mutex::new(())),
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn mode(&self) -> SaveMode {
        self.mode
    }

    /// Writes already encoded dictionary bytes to `path` under this policy.
    pub(crate) fn run(&self, path: PathBuf, bytes: Vec<u8>, timestamp: SharedTimestamp) -> Result<()> {
        match self.mode {
            SaveMode::Immediate => store(&path, &bytes, &timestamp),
            SaveMode::Locked => {
                let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
                store(&path, &bytes, &timestamp)
            }
            SaveMode::Background => {
                let lock = Arc::clone(&self.lock);
                let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
                // Saves land in call order: each one waits for the earlier ones.
                let earlier: Vec<_> = pending.drain(..).collect();
                let handle = thread::spawn(move || {
                    for handle in earlier {
                        if handle.join().is_err() {
                            tracing::error!("background dictionary save panicked");
                        }
                    }
                    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
                    if let Err(e) = store(&path, &bytes, &timestamp) {
                        tracing::error!(error = %e, "background dictionary save failed");
                    }
                });
                pending.push(handle);
                Ok(())
            }
        }
    }

    /// Blocks until every background save started so far has finished.
    pub fn wait(&self) {
        let handles: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("background dictionary save panicked");
            }
        }
    }
}

fn store(path: &Path, bytes: &[u8], timestamp: &SharedTimestamp) -> Result<()> {
    let modified = write_atomic(path, bytes).map_err(|e| DictionaryError::io(path, e))?;
    *timestamp.lock().unwrap_or_else(PoisonError::into_inner) = Some(modified);
    tracing::debug!(path = %path.display(), size = bytes.len(), "dictionary saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_assets_under_root() {
        let resolver = ResourceResolver::new("/opt/steno");
        assert_eq!(
            resolver.filename("asset:steno:assets/main.json"),
            PathBuf::from("/opt/steno/steno/assets/main.json")
        );
        assert_eq!(resolver.filename("user.json"), PathBuf::from("user.json"));
        assert!(is_asset("asset:steno:assets/main.json"));
        assert!(!is_asset("/home/me/asset.json"));
    }

    #[test]
    fn write_atomic_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dict.json");
        write_atomic(&path, b"first version").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
        // Only the target is left behind.
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn every_mode_updates_the_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        for mode in [SaveMode::Immediate, SaveMode::Locked, SaveMode::Background] {
            let saver = Saver::new(mode);
            let timestamp: SharedTimestamp = Arc::default();
            let path = dir.path().join(format!("{mode:?}.bin"));
            saver.run(path.clone(), vec![1, 2, 3], Arc::clone(&timestamp)).unwrap();
            saver.wait();
            assert_eq!(fs::read(&path).unwrap(), [1, 2, 3]);
            assert_eq!(*timestamp.lock().unwrap(), Some(resource_timestamp(&path).unwrap()));
        }
    }

    #[test]
    fn clones_share_one_lock() {
        fn assert_shareable<T: Send + Sync + Clone>() {}
        assert_shareable::<Saver>();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.json");
        let saver = Saver::new(SaveMode::Locked);
        let other = saver.clone();

        let guard = saver.lock.lock().unwrap();
        let writer = {
            let path = path.clone();
            thread::spawn(move || other.run(path, b"{}".to_vec(), Arc::default()))
        };
        thread::sleep(std::time::Duration::from_millis(50));
        assert!(!path.exists());

        drop(guard);
        writer.join().unwrap().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
    }

    #[test]
    fn clones_wait_for_each_others_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queued.bin");
        let saver = Saver::new(SaveMode::Background);
        let other = saver.clone();

        let guard = saver.lock.lock().unwrap();
        other.run(path.clone(), vec![7], Arc::default()).unwrap();
        drop(guard);
        saver.wait();
        assert_eq!(fs::read(&path).unwrap(), [7]);
    }

    #[test]
    fn save_mode_reads_lowercase() {
        let mode: SaveMode = serde_json::from_str("\"locked\"").unwrap();
        assert_eq!(mode, SaveMode::Locked);
        assert_eq!(SaveMode::default(), SaveMode::Background);
    }
}
