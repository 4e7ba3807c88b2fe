//! The persisted "liked artworks" set and its change notifications.
//!
//! The persisted set is the single source of truth for like status. Reads
//! always go back to the storage port so that writes from other contexts are
//! observed without resubscribing; both local toggles and external storage
//! changes are delivered through one broadcast channel, so a single
//! subscriber implementation suffices.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Storage key for the liked set; the file adapter appends `.json`.
pub const LIKED_STORAGE_KEY: &str = "arttok-liked-art";

/// Poll interval for foreign writes to the backing file.
const WATCH_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum LikedStorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Events emitted when the liked set changes, regardless of origin.
#[derive(Clone, Debug)]
pub enum LikedEvent {
    /// The set changed — a local toggle or an external write.
    Changed,
}

/// Durable storage port for the liked set.
///
/// `read` must be lenient: missing or corrupt data reads as the empty set.
/// Order is preserved — the persisted array order is the set's iteration
/// order.
pub trait LikedStorage: Send + Sync {
    fn read(&self) -> Vec<i64>;
    fn write(&self, ids: &[i64]) -> Result<(), LikedStorageError>;
}

/// The liked set, backed by a storage port shared across views.
#[derive(Clone)]
pub struct LikedStore {
    storage: Arc<dyn LikedStorage>,
    event_tx: broadcast::Sender<LikedEvent>,
}

impl LikedStore {
    pub fn new(storage: Arc<dyn LikedStorage>) -> Self {
        let (event_tx, _) = broadcast::channel(16);
        LikedStore { storage, event_tx }
    }

    /// Subscribe to liked-set change events, local and external.
    pub fn subscribe(&self) -> broadcast::Receiver<LikedEvent> {
        self.event_tx.subscribe()
    }

    /// Whether `id` is liked, read fresh from storage on every call so
    /// cross-context writes are observed without resubscribing.
    pub fn is_liked(&self, id: i64) -> bool {
        self.storage.read().contains(&id)
    }

    /// All liked ids in persisted (insertion) order.
    pub fn liked_ids(&self) -> Vec<i64> {
        self.storage.read()
    }

    /// Flip membership of `id`, persist, and notify subscribers.
    ///
    /// A failed write is logged and swallowed: the toggle interaction must
    /// not crash, and current-context observers still get the notification.
    /// Returns the liked state `id` was toggled to.
    pub fn toggle_like(&self, id: i64) -> bool {
        let mut ids = self.storage.read();
        let liked = if let Some(pos) = ids.iter().position(|&known| known == id) {
            ids.remove(pos);
            false
        } else {
            ids.push(id);
            true
        };
        if let Err(e) = self.storage.write(&ids) {
            warn!("failed to persist liked set: {}", e);
        }
        self.notify_changed();
        liked
    }

    /// Route an external storage change (another process wrote the backing
    /// store) through the same channel local toggles use.
    pub fn notify_external_change(&self) {
        self.notify_changed();
    }

    fn notify_changed(&self) {
        let _ = self.event_tx.send(LikedEvent::Changed);
    }
}

/// `LikedStorage` adapter over a JSON file in the application directory —
/// the durable local storage of this platform.
pub struct LikedFileStorage {
    path: PathBuf,
    /// Modification time of our own last write, so the external watcher can
    /// tell foreign writes apart from ours.
    last_self_write: Mutex<Option<SystemTime>>,
}

impl LikedFileStorage {
    /// Storage under `dir`, keyed by [`LIKED_STORAGE_KEY`].
    pub fn new(dir: impl AsRef<Path>) -> Self {
        LikedFileStorage {
            path: dir.as_ref().join(format!("{LIKED_STORAGE_KEY}.json")),
            last_self_write: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|meta| meta.modified()).ok()
    }

    fn last_self_write(&self) -> Option<SystemTime> {
        *self.last_self_write.lock().unwrap()
    }
}

impl LikedStorage for LikedFileStorage {
    fn read(&self) -> Vec<i64> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            // A missing file is the empty set, not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("failed to read liked set: {}", e);
                return Vec::new();
            }
        };
        parse_liked_array(&raw)
    }

    fn write(&self, ids: &[i64]) -> Result<(), LikedStorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(ids)?;
        fs::write(&self.path, json)?;
        *self.last_self_write.lock().unwrap() = self.modified();
        Ok(())
    }
}

/// Parse the persisted payload leniently: anything that isn't a JSON array
/// reads as the empty set, and non-integer elements are skipped. Corruption
/// is never surfaced to the user.
fn parse_liked_array(raw: &str) -> Vec<i64> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("corrupt liked set payload, treating as empty: {}", e);
            return Vec::new();
        }
    };
    let Some(items) = value.as_array() else {
        warn!("liked set payload is not an array, treating as empty");
        return Vec::new();
    };
    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        if let Some(id) = item.as_i64() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// Watch the backing file for writes made by other processes and relay them
/// to `store` subscribers. This is the cross-context half of the
/// notification contract; local toggles already notify directly and are not
/// re-announced.
///
/// Runs until aborted or the runtime shuts down.
pub fn spawn_external_watcher(
    storage: Arc<LikedFileStorage>,
    store: LikedStore,
) -> JoinHandle<()> {
    // Captured before spawning so a write racing the task startup is still
    // detected on the first tick.
    let mut last_seen = storage.modified();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(WATCH_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let modified = storage.modified();
            if modified == last_seen {
                continue;
            }
            last_seen = modified;
            if modified == storage.last_self_write() {
                continue;
            }
            debug!("liked set changed on disk, notifying subscribers");
            store.notify_external_change();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_array_in_order() {
        assert_eq!(parse_liked_array("[3, 1, 2]"), vec![3, 1, 2]);
    }

    #[test]
    fn corrupt_payload_reads_as_empty() {
        assert_eq!(parse_liked_array("not json"), Vec::<i64>::new());
        assert_eq!(parse_liked_array("{\"a\": 1}"), Vec::<i64>::new());
        assert_eq!(parse_liked_array("42"), Vec::<i64>::new());
    }

    #[test]
    fn non_integer_elements_are_skipped() {
        assert_eq!(parse_liked_array("[1, \"two\", 3, null, 4.5]"), vec![1, 3]);
    }

    #[test]
    fn duplicate_elements_collapse() {
        assert_eq!(parse_liked_array("[7, 7, 8]"), vec![7, 8]);
    }

    #[test]
    fn file_storage_round_trips_and_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LikedFileStorage::new(dir.path());

        assert_eq!(storage.read(), Vec::<i64>::new());

        storage.write(&[5, 3, 9]).unwrap();
        assert_eq!(storage.read(), vec![5, 3, 9]);

        let raw = fs::read_to_string(storage.path()).unwrap();
        assert_eq!(raw, "[5,3,9]");
    }

    #[test]
    fn file_storage_reads_corruption_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LikedFileStorage::new(dir.path());
        fs::write(storage.path(), "{{{").unwrap();
        assert_eq!(storage.read(), Vec::<i64>::new());
    }
}
