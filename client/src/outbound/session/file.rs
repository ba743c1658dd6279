//! File-backed session store.
//!
//! The session is kept as one JSON object keyed by storage name. Every
//! mutation rewrites the whole file through a temporary sibling and a rename,
//! so readers never observe a partial write.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use cap_std::ambient_authority;
use cap_std::fs::{Dir, OpenOptions};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use super::ChangeFeed;
use crate::domain::ports::{SessionKey, SessionStore, SessionStoreError, StorageChange};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);
const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

type Entries = BTreeMap<SessionKey, String>;

/// Session store persisted to a JSON file.
pub struct FileSessionStore {
    dir: Dir,
    file_name: String,
    path: PathBuf,
    entries: Mutex<Entries>,
    feed: ChangeFeed,
}

impl FileSessionStore {
    /// Open the store at `path`, creating its parent directory when missing.
    /// A missing file is an empty session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStoreError::Io`] when the directory cannot be opened
    /// and [`SessionStoreError::Corrupt`] when the file is not a JSON object
    /// of strings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionStoreError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| SessionStoreError::io("session path must name a UTF-8 file"))?
            .to_owned();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Dir::create_ambient_dir_all(parent, ambient_authority())
            .map_err(|error| io_error(parent, &error))?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority())
            .map_err(|error| io_error(parent, &error))?;

        let entries = read_entries(&dir, &file_name, path)?;
        debug!(path = %path.display(), keys = entries.len(), "session file opened");
        Ok(Self {
            dir,
            file_name,
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
            feed: ChangeFeed::new(),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and publish a change for every key another process
    /// modified since the last read or write.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`FileSessionStore::open`].
    pub fn reload(&self) -> Result<usize, SessionStoreError> {
        let mut entries = self.lock();
        let fresh = read_entries(&self.dir, &self.file_name, &self.path)?;
        let changed: Vec<StorageChange> = SessionKey::ALL
            .into_iter()
            .filter(|key| entries.get(key) != fresh.get(key))
            .map(|key| StorageChange {
                key,
                value: fresh.get(&key).cloned(),
            })
            .collect();
        *entries = fresh;
        drop(entries);

        for change in &changed {
            self.feed.publish(change.key, change.value.clone());
        }
        Ok(changed.len())
    }

    /// Reload the file every `period` on the current runtime until the
    /// returned poller is dropped. Periods below one millisecond are rounded
    /// up.
    pub fn poll(self: &Arc<Self>, period: Duration) -> SessionFilePoller {
        let store = Arc::clone(self);
        let period = period.max(MIN_POLL_PERIOD);
        let task = tokio::spawn(async move {
            let mut ticks = time::interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                match store.reload() {
                    Ok(0) => {}
                    Ok(changed) => {
                        debug!(path = %store.path.display(), changed, "session file changed externally");
                    }
                    Err(error) => {
                        warn!(path = %store.path.display(), %error, "session file reload failed");
                    }
                }
            }
        });
        SessionFilePoller { task }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &Entries) -> Result<(), SessionStoreError> {
        let named: BTreeMap<&str, &str> = entries
            .iter()
            .map(|(key, value)| (key.storage_name(), value.as_str()))
            .collect();
        let contents = serde_json::to_string_pretty(&named)
            .map_err(|error| SessionStoreError::io(error.to_string()))?;
        write_atomic(&self.dir, &self.file_name, contents.as_bytes())
            .map_err(|error| io_error(&self.path, &error))
    }
}

/// Background reload of a [`FileSessionStore`]. Stops when dropped.
pub struct SessionFilePoller {
    task: JoinHandle<()>,
}

impl Drop for SessionFilePoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: SessionKey) -> Option<String> {
        self.lock().get(&key).cloned()
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), SessionStoreError> {
        let mut entries = self.lock();
        let mut next = entries.clone();
        next.insert(key, value.to_owned());
        self.persist(&next)?;
        *entries = next;
        drop(entries);

        self.feed.publish(key, Some(value.to_owned()));
        Ok(())
    }

    fn clear(&self, keys: &[SessionKey]) -> Result<(), SessionStoreError> {
        let mut entries = self.lock();
        let mut next = entries.clone();
        let removed: Vec<SessionKey> = keys
            .iter()
            .copied()
            .filter(|key| next.remove(key).is_some())
            .collect();
        if removed.is_empty() {
            return Ok(());
        }
        self.persist(&next)?;
        *entries = next;
        drop(entries);

        for key in removed {
            self.feed.publish(key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.feed.subscribe()
    }
}

fn read_entries(dir: &Dir, file_name: &str, path: &Path) -> Result<Entries, SessionStoreError> {
    let contents = match dir.read_to_string(file_name) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Entries::new()),
        Err(error) => return Err(io_error(path, &error)),
    };
    if contents.trim().is_empty() {
        return Ok(Entries::new());
    }

    let named: BTreeMap<String, String> = serde_json::from_str(&contents).map_err(|error| {
        SessionStoreError::corrupt(format!("{}: {error}", path.display()))
    })?;
    let mut entries = Entries::new();
    for (name, value) in named {
        match SessionKey::from_storage_name(&name) {
            Some(key) => {
                entries.insert(key, value);
            }
            None => warn!(path = %path.display(), key = %name, "ignoring unknown session key"),
        }
    }
    Ok(entries)
}

fn write_atomic(dir: &Dir, file_name: &str, contents: &[u8]) -> io::Result<()> {
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(".{file_name}.tmp.{}.{counter}", std::process::id());

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    let written = dir.open_with(&tmp_name, &options).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    if let Err(error) = written.and_then(|()| replace(dir, &tmp_name, file_name)) {
        match dir.remove_file(&tmp_name) {
            Ok(()) => {}
            Err(cleanup) if cleanup.kind() == io::ErrorKind::NotFound => {}
            Err(cleanup) => {
                warn!(file = %tmp_name, error = %cleanup, "failed to remove temporary session file");
            }
        }
        return Err(error);
    }
    Ok(())
}

#[cfg(windows)]
fn replace(dir: &Dir, tmp_name: &str, target: &str) -> io::Result<()> {
    match dir.remove_file(target) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(error),
    }
    dir.rename(tmp_name, dir, target)
}

#[cfg(not(windows))]
fn replace(dir: &Dir, tmp_name: &str, target: &str) -> io::Result<()> {
    dir.rename(tmp_name, dir, target)
}

fn io_error(path: &Path, error: &io::Error) -> SessionStoreError {
    SessionStoreError::io(format!("{}: {error}", path.display()))
}
