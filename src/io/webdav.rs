use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::header::LAST_MODIFIED;
use reqwest::StatusCode;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::io::StorageError;

/// Remote backend settings. All four must be present for remote mode; the
/// temp dir holds the local working copy of the remote file.
#[derive(Debug, Clone)]
pub struct WebdavConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub temp_dir: PathBuf,
}

/// Minimal WebDAV client: the remote is an opaque blob store reached with
/// plain GET/PUT/HEAD plus basic auth.
pub struct WebdavClient {
    cfg: WebdavConfig,
    http: Client,
}

impl WebdavClient {
    pub fn new(cfg: WebdavConfig) -> WebdavClient {
        WebdavClient {
            cfg,
            http: Client::new(),
        }
    }

    fn url_for(&self, remote: &Path) -> String {
        let base = self.cfg.base_url.trim_end_matches('/');
        let rel = remote.to_string_lossy();
        format!("{base}/{}", rel.trim_start_matches('/'))
    }

    /// Local working copy path for a remote file: `<temp_dir>/__<basename>`.
    pub fn temp_path(&self, remote: &Path) -> PathBuf {
        let name = remote
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("todo.txt");
        self.cfg.temp_dir.join(format!("__{name}"))
    }

    /// Download the remote file to its temp path.
    ///
    /// A 404 means the file doesn't exist yet: returns an empty temp copy
    /// with the current time as modification time. Any other failure is
    /// fatal for the operation.
    pub fn download(&self, remote: &Path) -> Result<(PathBuf, DateTime<Utc>), StorageError> {
        let url = self.url_for(remote);
        let tmp = self.temp_path(remote);

        let resp = self.send(self.http.get(&url), &url)?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(%url, "remote file not found, starting empty");
            write_temp(&tmp, &[])?;
            return Ok((tmp, Utc::now()));
        }
        let resp = check_status(resp, &url)?;

        let modified = last_modified(&resp).unwrap_or_else(Utc::now);
        let bytes = resp
            .bytes()
            .map_err(|source| StorageError::Http { url, source })?;
        write_temp(&tmp, &bytes)?;
        Ok((tmp, modified))
    }

    /// Upload a local file to the remote path.
    pub fn upload(&self, local: &Path, remote: &Path) -> Result<(), StorageError> {
        let url = self.url_for(remote);
        let bytes = fs::read(local).map_err(|source| StorageError::Read {
            path: local.to_path_buf(),
            source,
        })?;
        let resp = self.send(self.http.put(&url).body(bytes), &url)?;
        check_status(resp, &url)?;
        Ok(())
    }

    /// Modification time of the remote file.
    pub fn modified(&self, remote: &Path) -> Result<DateTime<Utc>, StorageError> {
        let url = self.url_for(remote);
        let resp = self.send(self.http.head(&url), &url)?;
        let resp = check_status(resp, &url)?;
        Ok(last_modified(&resp).unwrap_or_else(Utc::now))
    }

    fn send(
        &self,
        req: reqwest::blocking::RequestBuilder,
        url: &str,
    ) -> Result<Response, StorageError> {
        req.basic_auth(&self.cfg.username, Some(&self.cfg.password))
            .send()
            .map_err(|source| StorageError::Http {
                url: url.to_string(),
                source,
            })
    }
}

fn check_status(resp: Response, url: &str) -> Result<Response, StorageError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(StorageError::HttpStatus {
            url: url.to_string(),
            status: resp.status(),
        })
    }
}

fn last_modified(resp: &Response) -> Option<DateTime<Utc>> {
    resp.headers()
        .get(LAST_MODIFIED)?
        .to_str()
        .ok()
        .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn write_temp(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    fs::write(path, bytes).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })
}
