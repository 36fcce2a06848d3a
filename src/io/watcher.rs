use chrono::{DateTime, Utc};
use notify::{EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::io::webdav::{WebdavClient, WebdavConfig};
use crate::io::StorageError;
use crate::model::file::FileChangedEvent;

/// Coalescing window for bursts of filesystem events from one logical write.
const DEBOUNCE: Duration = Duration::from_secs(4);
/// Remote metadata poll interval.
const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// How often watcher threads check their stop flag.
const STOP_CHECK: Duration = Duration::from_millis(250);

/// Cancellation handle for one background watcher.
///
/// Stopping is explicit and blocking: [`WatcherHandle::stop`] (or dropping
/// the handle) signals the watcher thread and joins it, so a superseded
/// watcher never overlaps with its replacement.
#[derive(Debug)]
pub struct WatcherHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Signal the watcher to stop and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Watch a local file for changes via filesystem notifications.
///
/// Bursts of OS events from a single logical write are coalesced: the first
/// event arms a debounce timer and further events are suppressed until it
/// fires, emitting one [`FileChangedEvent`].
pub(crate) fn watch_local(
    path: PathBuf,
    tx: Sender<FileChangedEvent>,
) -> Result<WatcherHandle, StorageError> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let (raw_tx, raw_rx) = mpsc::channel::<String>();
    let mut watcher = notify::recommended_watcher(move |result: Result<notify::Event, notify::Error>| {
        let Ok(event) = result else { return };
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
                let _ = raw_tx.send(format!("{:?}", event.kind));
            }
            _ => {}
        }
    })?;
    watcher.watch(&path, RecursiveMode::NonRecursive)?;

    let thread = thread::spawn(move || {
        // The notify watcher must live as long as the thread.
        let _watcher = watcher;
        let mut pending: Option<(Instant, String)> = None;
        loop {
            if stop_flag.load(Ordering::Relaxed) {
                debug!(path = %path.display(), "stop watching");
                break;
            }
            let timeout = match &pending {
                Some((deadline, _)) => deadline
                    .saturating_duration_since(Instant::now())
                    .min(STOP_CHECK),
                None => STOP_CHECK,
            };
            match raw_rx.recv_timeout(timeout) {
                Ok(kind) => {
                    if pending.is_none() {
                        debug!(path = %path.display(), %kind, "modified");
                        pending = Some((Instant::now() + DEBOUNCE, kind));
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if let Some((deadline, kind)) = pending.take() {
                        if Instant::now() >= deadline {
                            if tx.send(FileChangedEvent { kind }).is_err() {
                                break;
                            }
                        } else {
                            pending = Some((deadline, kind));
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    Ok(WatcherHandle {
        stop,
        thread: Some(thread),
    })
}

/// Watch a remote file by polling its modification time every 5 seconds,
/// emitting one event each time it advances past the last known value.
pub(crate) fn watch_remote(
    cfg: WebdavConfig,
    remote: PathBuf,
    last_known: DateTime<Utc>,
    tx: Sender<FileChangedEvent>,
) -> WatcherHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let thread = thread::spawn(move || {
        let client = WebdavClient::new(cfg);
        let mut last = last_known;
        let mut next_poll = Instant::now() + POLL_INTERVAL;
        loop {
            if stop_flag.load(Ordering::Relaxed) {
                debug!(path = %remote.display(), "stop watching");
                break;
            }
            if Instant::now() < next_poll {
                thread::sleep(STOP_CHECK.min(next_poll.saturating_duration_since(Instant::now())));
                continue;
            }
            next_poll = Instant::now() + POLL_INTERVAL;
            debug!(path = %remote.display(), "checking remote");
            match client.modified(&remote) {
                Ok(modified) if modified > last => {
                    last = modified;
                    let event = FileChangedEvent {
                        kind: "webdav".to_string(),
                    };
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %remote.display(), "remote watch failed: {e}");
                    break;
                }
            }
        }
    });

    WatcherHandle {
        stop,
        thread: Some(thread),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn handle_stop_joins_the_thread() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("todo.txt");
        fs::write(&path, "a task\n").unwrap();

        let (tx, _rx) = mpsc::channel();
        let handle = watch_local(path, tx).unwrap();
        // Must return promptly even though the debounce window is long.
        handle.stop();
    }
}
