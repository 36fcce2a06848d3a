pub mod local;
pub mod watcher;
pub mod webdav;

pub use local::sibling_path;
pub use watcher::WatcherHandle;
pub use webdav::WebdavConfig;

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::io::webdav::WebdavClient;
use crate::model::file::{LoadOpts, TaskFile};
use crate::model::task::Task;

/// Error type for persistence and sync operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("webdav request failed for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("webdav response {status} for {url}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("watch setup failed: {0}")]
    Notify(#[from] notify::Error),
}

/// Which backend a [`Storage`] talks to.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    Local,
    Webdav(WebdavConfig),
}

impl BackendConfig {
    /// Remote mode requires all four settings; anything empty means local.
    pub fn from_settings(url: &str, username: &str, password: &str, temp_dir: &str) -> BackendConfig {
        if url.is_empty() || username.is_empty() || password.is_empty() || temp_dir.is_empty() {
            BackendConfig::Local
        } else {
            BackendConfig::Webdav(WebdavConfig {
                base_url: url.to_string(),
                username: username.to_string(),
                password: password.to_string(),
                temp_dir: PathBuf::from(temp_dir),
            })
        }
    }
}

/// The persistence and sync layer: loads, writes, and watches one backend.
///
/// Owns the write lock that serializes all writes; shareable across `Storage`
/// values via [`Storage::with_write_lock`] so one process never interleaves
/// partial writes, local or remote.
pub struct Storage {
    config: BackendConfig,
    write_lock: Arc<Mutex<()>>,
    sort_on_write: bool,
}

impl Storage {
    pub fn new(config: BackendConfig) -> Storage {
        Storage {
            config,
            write_lock: Arc::new(Mutex::new(())),
            sort_on_write: false,
        }
    }

    pub fn local() -> Storage {
        Storage::new(BackendConfig::Local)
    }

    /// Sort the file alphabetically by raw line on every write.
    pub fn with_sort_on_write(mut self, sort: bool) -> Storage {
        self.sort_on_write = sort;
        self
    }

    /// Share a write lock with another `Storage`.
    pub fn with_write_lock(mut self, lock: Arc<Mutex<()>>) -> Storage {
        self.write_lock = lock;
        self
    }

    pub fn write_lock(&self) -> Arc<Mutex<()>> {
        self.write_lock.clone()
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.config, BackendConfig::Webdav(_))
    }

    /// Load the task file from the backend.
    ///
    /// Local: a missing file is created empty. Remote: the file is downloaded
    /// to a temp copy and parsed there; not-found yields an empty task set
    /// with the current time as modification time.
    pub fn load(&self, path: &Path, opts: LoadOpts) -> Result<TaskFile, StorageError> {
        let mut tf = TaskFile::new(path.to_path_buf(), opts);
        match &self.config {
            BackendConfig::Local => {
                let (tasks, modified) = local::read_tasks(path)?;
                tf.tasks = tasks;
                tf.last_update = modified;
            }
            BackendConfig::Webdav(cfg) => {
                let client = WebdavClient::new(cfg.clone());
                let (tmp, modified) = client.download(path)?;
                let (tasks, _) = local::read_tasks(&tmp)?;
                tf.tasks = tasks;
                tf.last_update = modified;
            }
        }
        Ok(tf)
    }

    /// Load the task file and start watching it for external changes.
    /// The returned `TaskFile` owns the watcher and its event channel.
    pub fn watch(&self, path: &Path, opts: LoadOpts) -> Result<TaskFile, StorageError> {
        let mut tf = self.load(path, opts)?;
        let (tx, rx) = mpsc::channel();
        let handle = match &self.config {
            BackendConfig::Local => watcher::watch_local(path.to_path_buf(), tx)?,
            BackendConfig::Webdav(cfg) => {
                watcher::watch_remote(cfg.clone(), path.to_path_buf(), tf.last_update, tx)
            }
        };
        tf.attach_watch(rx, handle);
        Ok(tf)
    }

    /// Serialize the full task set back to the backend, one original line per
    /// task in load order.
    pub fn write(&self, tf: &TaskFile) -> Result<(), StorageError> {
        let _guard = self.lock();
        let mut by_line: Vec<&Task> = tf.tasks.iter().collect();
        by_line.sort_by_key(|t| t.line_number);
        let mut lines: Vec<String> = by_line.iter().map(|t| t.original().to_string()).collect();
        if self.sort_on_write {
            lines.sort();
        }
        match &self.config {
            BackendConfig::Local => local::write_lines(&tf.path, &lines),
            BackendConfig::Webdav(cfg) => {
                let client = WebdavClient::new(cfg.clone());
                let (tmp, _) = client.download(&tf.path)?;
                local::write_lines(&tmp, &lines)?;
                client.upload(&tmp, &tf.path)
            }
        }
    }

    /// Append lines to a file on the backend (used for trash/done siblings).
    pub fn append(&self, path: &Path, lines: &[String]) -> Result<(), StorageError> {
        let _guard = self.lock();
        let mut lines = lines.to_vec();
        if self.sort_on_write {
            lines.sort();
        }
        match &self.config {
            BackendConfig::Local => local::append_lines(path, &lines),
            BackendConfig::Webdav(cfg) => {
                let client = WebdavClient::new(cfg.clone());
                let (tmp, _) = client.download(path)?;
                local::append_lines(&tmp, &lines)?;
                client.upload(&tmp, path)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}
